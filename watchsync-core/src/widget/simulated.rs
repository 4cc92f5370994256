use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use crate::clock::{Clock, SystemClock};
use crate::models::VideoId;

use super::{PlaybackWidget, PlayerState, WidgetNotification};

/// Command received through [`PlaybackWidget`]
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetCommand {
    Play,
    Pause,
    Seek(f64),
    Load(VideoId),
}

type Listener = Box<dyn FnMut(WidgetNotification) + Send>;

/// In-memory player that behaves like an embedded video widget.
///
/// Position advances with the injected clock while playing. Every transition
/// produces the notification a real player would fire: to the registered
/// listener when there is one, otherwise into a queue read by
/// [`SimulatedPlayer::drain_notifications`].
pub struct SimulatedPlayer {
    clock: Arc<dyn Clock>,
    state: PlayerState,
    /// Position at `anchor`, or the frozen position when not playing
    position: f64,
    anchor: Option<Instant>,
    video: Option<VideoId>,
    commands: Vec<WidgetCommand>,
    queued: VecDeque<WidgetNotification>,
    listener: Option<Listener>,
}

impl std::fmt::Debug for SimulatedPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedPlayer")
            .field("state", &self.state)
            .field("position", &self.current_time())
            .field("video", &self.video)
            .finish_non_exhaustive()
    }
}

impl SimulatedPlayer {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            state: PlayerState::Other,
            position: 0.0,
            anchor: None,
            video: None,
            commands: Vec::new(),
            queued: VecDeque::new(),
            listener: None,
        }
    }

    /// Forward notifications to `listener` instead of queueing them
    #[must_use]
    pub fn with_listener(mut self, listener: impl FnMut(WidgetNotification) + Send + 'static) -> Self {
        self.listener = Some(Box::new(listener));
        self
    }

    #[must_use]
    pub fn loaded_video(&self) -> Option<&VideoId> {
        self.video.as_ref()
    }

    /// Commands issued through [`PlaybackWidget`], oldest first
    #[must_use]
    pub fn commands(&self) -> &[WidgetCommand] {
        &self.commands
    }

    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    pub fn drain_notifications(&mut self) -> Vec<WidgetNotification> {
        self.queued.drain(..).collect()
    }

    /// The viewer presses play on the player itself
    pub fn user_play(&mut self) {
        self.start();
    }

    /// The viewer presses pause on the player itself
    pub fn user_pause(&mut self) {
        self.stop();
    }

    /// The viewer drags the seek bar
    pub fn user_seek(&mut self, position: f64) {
        self.jump(position);
    }

    /// The player stalls while loading
    pub fn stall(&mut self) {
        self.freeze();
        self.state = PlayerState::Buffering;
        self.notify(PlayerState::Buffering);
    }

    fn freeze(&mut self) {
        self.position = self.current_time();
        self.anchor = None;
    }

    fn start(&mut self) {
        if self.state == PlayerState::Playing {
            return;
        }
        self.freeze();
        self.anchor = Some(self.clock.now());
        self.state = PlayerState::Playing;
        self.notify(PlayerState::Playing);
    }

    fn stop(&mut self) {
        if self.state == PlayerState::Paused {
            return;
        }
        self.freeze();
        self.state = PlayerState::Paused;
        self.notify(PlayerState::Paused);
    }

    fn jump(&mut self, position: f64) {
        self.position = position.max(0.0);
        if self.state == PlayerState::Playing {
            self.anchor = Some(self.clock.now());
            // Players rebuffer after a jump and then resume
            self.notify(PlayerState::Buffering);
            self.notify(PlayerState::Playing);
        }
    }

    fn notify(&mut self, state: PlayerState) {
        let notification = WidgetNotification::new(state, self.current_time());
        match self.listener.as_mut() {
            Some(listener) => listener(notification),
            None => self.queued.push_back(notification),
        }
    }
}

impl PlaybackWidget for SimulatedPlayer {
    fn state(&self) -> PlayerState {
        self.state
    }

    fn current_time(&self) -> f64 {
        match self.anchor {
            Some(anchor) => {
                self.position + self.clock.now().saturating_duration_since(anchor).as_secs_f64()
            }
            None => self.position,
        }
    }

    fn play(&mut self) {
        self.commands.push(WidgetCommand::Play);
        self.start();
    }

    fn pause(&mut self) {
        self.commands.push(WidgetCommand::Pause);
        self.stop();
    }

    fn seek(&mut self, position: f64) {
        self.commands.push(WidgetCommand::Seek(position));
        self.jump(position);
    }

    fn load_video(&mut self, video_id: &VideoId) {
        self.commands.push(WidgetCommand::Load(video_id.clone()));
        self.video = Some(video_id.clone());
        self.position = 0.0;
        self.anchor = None;
        self.state = PlayerState::Other;
        self.notify(PlayerState::Other);
    }
}

impl Default for SimulatedPlayer {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}
