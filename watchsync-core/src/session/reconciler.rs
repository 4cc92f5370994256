//! Applies remote playback messages to the local player.
//!
//! Every programmatic change to the player opens a suppression window. Player
//! notifications arriving while it is open are attributed to the change just
//! made, not to the viewer, and are never re-broadcast.

use std::time::{Duration, Instant};
use tracing::{debug, trace};

use crate::config::SyncConfig;
use crate::models::{PlaybackAction, PlaybackMessage, PlaybackState, VideoId};
use crate::timer::Timer;
use crate::widget::{PlaybackWidget, PlayerState};

use super::context::SessionContext;

/// Window during which player notifications are treated as echoes.
///
/// Active exactly while its expiry timer is pending. Re-engaging pushes the
/// expiry out; it never shortens an open window.
#[derive(Debug, Default)]
pub struct SuppressionWindow {
    expiry: Timer<()>,
}

impl SuppressionWindow {
    pub fn engage(&mut self, now: Instant, length: Duration) {
        let until = now + length;
        if self.expiry.deadline().is_none_or(|current| current < until) {
            self.expiry.schedule(until, ());
        }
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.expiry.is_pending()
    }

    /// Close the window if it has expired; returns whether it closed
    pub fn poll(&mut self, now: Instant) -> bool {
        self.expiry.take_due(now).is_some()
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.expiry.deadline()
    }

    pub fn clear(&mut self) {
        self.expiry.cancel();
    }
}

/// What the reconciler did with an inbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOutcome {
    Applied,
    /// An `ASK_SYNC` for the session authority to answer
    SyncRequested,
    /// Addressed to another room
    Ignored,
}

#[derive(Debug)]
pub struct RemoteReconciler {
    suppression: SuppressionWindow,
    window: Duration,
    drift_tolerance: f64,
    /// Video the player currently has loaded, as far as we commanded it
    loaded_video: Option<VideoId>,
}

impl RemoteReconciler {
    #[must_use]
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            suppression: SuppressionWindow::default(),
            window: config.suppression_window(),
            drift_tolerance: config.drift_tolerance_secs,
            loaded_video: None,
        }
    }

    pub fn on_remote_message<W: PlaybackWidget>(
        &mut self,
        ctx: &mut SessionContext,
        widget: &mut W,
        message: &PlaybackMessage,
        now: Instant,
    ) -> RemoteOutcome {
        if message.room_id != *ctx.room_id() {
            debug!(
                room_id = %ctx.room_id(),
                message_room_id = %message.room_id,
                action = %message.action,
                "Ignoring playback message for another room"
            );
            return RemoteOutcome::Ignored;
        }

        if !message.action.carries_state() {
            return RemoteOutcome::SyncRequested;
        }

        let next = next_state(ctx.playback(), message);
        debug!(
            room_id = %ctx.room_id(),
            sender = %message.sender,
            action = %message.action,
            video_id = %next.video_id,
            position = next.position_seconds,
            "Applying remote playback state"
        );
        self.adopt(ctx, widget, next, now);
        RemoteOutcome::Applied
    }

    /// Make `state` the session's playback state and show it
    pub fn adopt<W: PlaybackWidget>(
        &mut self,
        ctx: &mut SessionContext,
        widget: &mut W,
        state: PlaybackState,
        now: Instant,
    ) {
        ctx.set_playback(state);
        self.apply(ctx, widget, now);
    }

    /// Bring the player in line with the session's playback state
    pub fn apply<W: PlaybackWidget>(&mut self, ctx: &SessionContext, widget: &mut W, now: Instant) {
        let target = ctx.playback();
        self.suppression.engage(now, self.window);

        if self.loaded_video.as_ref() != Some(&target.video_id) {
            widget.load_video(&target.video_id);
            self.loaded_video = Some(target.video_id.clone());
        }

        let show_playing = ctx.intends_playing();
        let is_playing = widget.state() == PlayerState::Playing;
        if show_playing && !is_playing {
            widget.play();
        } else if !show_playing && is_playing {
            widget.pause();
        }

        let drift = (widget.current_time() - target.position_seconds).abs();
        if drift > self.drift_tolerance {
            trace!(drift, position = target.position_seconds, "Correcting drift");
            widget.seek(target.position_seconds);
        }
    }

    #[must_use]
    pub const fn is_suppressed(&self) -> bool {
        self.suppression.is_active()
    }

    pub fn poll(&mut self, now: Instant) {
        if self.suppression.poll(now) {
            trace!("Suppression window closed");
        }
    }

    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.suppression.deadline()
    }

    pub fn reset(&mut self) {
        self.suppression.clear();
    }
}

/// The message is a full snapshot: play state always comes from its type
fn next_state(current: &PlaybackState, message: &PlaybackMessage) -> PlaybackState {
    let video_id = VideoId::parse(&message.video_id).unwrap_or_else(|_| current.video_id.clone());
    let position_seconds = if message.timestamp.is_finite() {
        message.timestamp.max(0.0)
    } else {
        current.position_seconds
    };
    let video_origin_timestamp = if video_id == current.video_id {
        current.video_origin_timestamp
    } else {
        None
    };

    PlaybackState {
        video_id,
        is_playing: message.action == PlaybackAction::Play,
        position_seconds,
        video_origin_timestamp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use crate::models::Role;
    use crate::test_helpers::{remote, simulated_player, test_room_id, test_user_id};
    use crate::widget::{SimulatedPlayer, WidgetCommand};

    const OTHER_VIDEO: &str = "dQw4w9WgXcQ";

    struct Fixture {
        clock: ManualClock,
        ctx: SessionContext,
        player: SimulatedPlayer,
        reconciler: RemoteReconciler,
    }

    fn fixture(role: Role, synced: bool) -> Fixture {
        let clock = ManualClock::new();
        let mut ctx = SessionContext::new(test_user_id("alice"), test_room_id());
        ctx.assume_role(role);
        if synced {
            ctx.mark_synced();
        }
        let mut player = simulated_player(&clock);
        let mut reconciler = RemoteReconciler::new(&SyncConfig::default());
        // Load the default video as a join would, then start from a clean slate
        reconciler.adopt(&mut ctx, &mut player, PlaybackState::default(), clock.now());
        reconciler.reset();
        player.clear_commands();
        player.drain_notifications();
        Fixture {
            clock,
            ctx,
            player,
            reconciler,
        }
    }

    impl Fixture {
        fn receive(&mut self, message: &PlaybackMessage) -> RemoteOutcome {
            let now = self.clock.now();
            self.reconciler
                .on_remote_message(&mut self.ctx, &mut self.player, message, now)
        }
    }

    #[test]
    fn test_play_message_starts_player_and_seeks() {
        let mut f = fixture(Role::Guest, true);

        let outcome = f.receive(&remote(PlaybackAction::Play, "", 30.0, "bob"));

        assert_eq!(outcome, RemoteOutcome::Applied);
        assert!(f.ctx.playback().is_playing);
        assert_eq!(f.player.commands(), &[WidgetCommand::Play, WidgetCommand::Seek(30.0)]);
        assert!(f.reconciler.is_suppressed());
    }

    #[test]
    fn test_pause_overwrites_play_state() {
        let mut f = fixture(Role::Guest, true);
        f.receive(&remote(PlaybackAction::Play, "", 0.0, "bob"));
        f.player.clear_commands();

        f.receive(&remote(PlaybackAction::Pause, "", 0.5, "bob"));

        assert!(!f.ctx.playback().is_playing);
        assert_eq!(f.player.commands(), &[WidgetCommand::Pause]);
    }

    #[test]
    fn test_drift_boundary_does_not_seek() {
        let mut f = fixture(Role::Host, true);

        f.receive(&remote(PlaybackAction::Pause, "", 1.0, "bob"));
        assert!(f.player.commands().is_empty(), "exactly 1.0s of drift is tolerated");

        f.receive(&remote(PlaybackAction::Pause, "", 1.001, "bob"));
        assert_eq!(f.player.commands(), &[WidgetCommand::Seek(1.001)]);
    }

    #[test]
    fn test_unsynced_guest_never_plays_but_tracks_position() {
        let mut f = fixture(Role::Guest, false);

        f.receive(&remote(PlaybackAction::Play, "", 42.0, "bob"));

        assert!(f.ctx.playback().is_playing);
        assert_ne!(f.player.state(), PlayerState::Playing);
        assert_eq!(f.player.commands(), &[WidgetCommand::Seek(42.0)]);
    }

    #[test]
    fn test_change_video_loads_and_restarts() {
        let mut f = fixture(Role::Guest, true);
        f.receive(&remote(PlaybackAction::Play, "", 90.0, "bob"));
        f.player.clear_commands();

        f.receive(&remote(PlaybackAction::ChangeVideo, OTHER_VIDEO, 0.0, "bob"));

        assert_eq!(f.ctx.playback().video_id.as_str(), OTHER_VIDEO);
        assert!(!f.ctx.playback().is_playing);
        assert_eq!(
            f.player.commands(),
            &[WidgetCommand::Load(VideoId::parse(OTHER_VIDEO).unwrap())]
        );
    }

    #[test]
    fn test_malformed_video_id_keeps_current_video() {
        let mut f = fixture(Role::Guest, true);

        f.receive(&remote(PlaybackAction::Pause, "bogus", 5.0, "bob"));

        assert_eq!(f.ctx.playback().video_id, VideoId::default());
        assert!((f.ctx.playback().position_seconds - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_ask_sync_does_not_touch_state() {
        let mut f = fixture(Role::Host, true);
        let before = f.ctx.playback().clone();

        let outcome = f.receive(&remote(PlaybackAction::AskSync, "", 0.0, "bob"));

        assert_eq!(outcome, RemoteOutcome::SyncRequested);
        assert_eq!(f.ctx.playback(), &before);
        assert!(f.player.commands().is_empty());
        assert!(!f.reconciler.is_suppressed());
    }

    #[test]
    fn test_other_room_is_ignored() {
        let mut f = fixture(Role::Guest, true);
        let mut message = remote(PlaybackAction::Play, "", 12.0, "bob");
        message.room_id = "elsewhere".into();

        assert_eq!(f.receive(&message), RemoteOutcome::Ignored);
        assert!(!f.ctx.playback().is_playing);
    }

    #[test]
    fn test_suppression_window_expires() {
        let mut f = fixture(Role::Guest, true);
        f.receive(&remote(PlaybackAction::Play, "", 0.0, "bob"));

        f.reconciler.poll(f.clock.advance(Duration::from_millis(499)));
        assert!(f.reconciler.is_suppressed());
        f.reconciler.poll(f.clock.advance(Duration::from_millis(1)));
        assert!(!f.reconciler.is_suppressed());
        assert_eq!(f.reconciler.next_deadline(), None);
    }

    #[test]
    fn test_reengaging_extends_window() {
        let start = Instant::now();
        let mut window = SuppressionWindow::default();
        window.engage(start, Duration::from_millis(500));
        window.engage(start + Duration::from_millis(400), Duration::from_millis(500));

        assert!(!window.poll(start + Duration::from_millis(500)));
        assert!(window.is_active());
        assert!(window.poll(start + Duration::from_millis(900)));
        assert!(!window.is_active());
    }
}
