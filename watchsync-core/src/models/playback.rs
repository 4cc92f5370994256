use serde::{Deserialize, Serialize};

use super::video::VideoId;

/// Last known authoritative playback position of the room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    pub video_id: VideoId,
    pub is_playing: bool,
    pub position_seconds: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_origin_timestamp: Option<f64>,
}

impl PlaybackState {
    /// A paused state at `position_seconds`
    #[must_use]
    pub const fn paused(video_id: VideoId, position_seconds: f64) -> Self {
        Self {
            video_id,
            is_playing: false,
            position_seconds,
            video_origin_timestamp: None,
        }
    }

    /// A freshly loaded video, paused at the beginning
    #[must_use]
    pub const fn restarted(video_id: VideoId) -> Self {
        Self::paused(video_id, 0.0)
    }
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self::restarted(VideoId::default())
    }
}
