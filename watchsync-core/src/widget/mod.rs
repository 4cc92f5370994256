//! Boundary to the video player the session drives.

mod simulated;

pub use simulated::{SimulatedPlayer, WidgetCommand};

use serde::{Deserialize, Serialize};

use crate::models::VideoId;

/// Discrete player states the session distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayerState {
    Playing,
    Paused,
    Buffering,
    /// Unstarted, ended, cued and anything else the player reports
    Other,
}

/// A raw state transition reported by the player
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WidgetNotification {
    pub state: PlayerState,
    pub current_time: f64,
}

impl WidgetNotification {
    #[must_use]
    pub const fn new(state: PlayerState, current_time: f64) -> Self {
        Self {
            state,
            current_time,
        }
    }
}

/// Commands and queries the session issues against the player.
///
/// Commands are fire-and-forget: their effects are observed later through
/// state-change notifications, never through return values.
pub trait PlaybackWidget {
    fn state(&self) -> PlayerState;

    /// Current position in seconds
    fn current_time(&self) -> f64;

    fn play(&mut self);

    fn pause(&mut self);

    fn seek(&mut self, position: f64);

    /// Replace the loaded video; the player starts over at 0 without playing
    fn load_video(&mut self, video_id: &VideoId);
}
