//! Boundary to the room's publish/subscribe channel.

use crate::error::Result;
use crate::models::{ChatMessage, PlaybackMessage};

/// Outbound side of the room channel as seen by a session.
///
/// Publishing is fire-and-forget. Inbound messages are delivered to the
/// session as [`crate::SessionEvent`]s by whoever owns the subscription.
#[cfg_attr(test, mockall::automock)]
pub trait Transport {
    fn is_connected(&self) -> bool;

    fn publish_playback(&self, message: &PlaybackMessage) -> Result<()>;

    fn publish_chat(&self, message: &ChatMessage) -> Result<()>;
}
