//! Turns raw player notifications into outbound playback intents.

use std::time::{Duration, Instant};
use tracing::trace;

use crate::config::SyncConfig;
use crate::models::PlaybackAction;
use crate::timer::Timer;
use crate::widget::{PlayerState, WidgetNotification};

/// Something the local viewer did that the room should hear about
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intent {
    pub action: PlaybackAction,
    pub position: f64,
}

impl Intent {
    #[must_use]
    pub const fn play(position: f64) -> Self {
        Self {
            action: PlaybackAction::Play,
            position,
        }
    }

    #[must_use]
    pub const fn pause(position: f64) -> Self {
        Self {
            action: PlaybackAction::Pause,
            position,
        }
    }
}

#[derive(Debug)]
pub struct LocalEmitter {
    /// Position captured when the pause was observed
    pending_pause: Timer<f64>,
    debounce: Duration,
}

impl LocalEmitter {
    #[must_use]
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            pending_pause: Timer::new(),
            debounce: config.pause_debounce(),
        }
    }

    /// React to a player notification.
    ///
    /// `suppressed` is the reconciler's window; `intends_playing` is the play
    /// state the session last asked the player to show.
    pub fn on_widget_notification(
        &mut self,
        notification: WidgetNotification,
        suppressed: bool,
        intends_playing: bool,
        now: Instant,
    ) -> Option<Intent> {
        if suppressed {
            trace!(state = ?notification.state, "Player notification inside suppression window");
            return None;
        }

        if self.pending_pause.cancel().is_some() {
            trace!(state = ?notification.state, "Pending pause superseded");
        }

        let position = notification.current_time;
        match notification.state {
            // Whatever we assumed, the player is playing now
            PlayerState::Playing => Some(Intent::play(position)),
            PlayerState::Paused => {
                self.pending_pause.schedule_in(now, self.debounce, position);
                None
            }
            PlayerState::Buffering if intends_playing => Some(Intent::play(position)),
            // Buffering while paused may be a seek or a stall; send nothing
            PlayerState::Buffering | PlayerState::Other => None,
        }
    }

    /// Fire the debounced pause if it is due
    pub fn poll(&mut self, now: Instant) -> Option<Intent> {
        self.pending_pause.take_due(now).map(Intent::pause)
    }

    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending_pause.deadline()
    }

    pub fn reset(&mut self) {
        self.pending_pause.cancel();
    }
}
