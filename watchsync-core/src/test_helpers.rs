//! Test helpers and fixtures for watchsync-core tests

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::clock::ManualClock;
use crate::error::{Error, Result};
use crate::models::{ChatMessage, PlaybackAction, PlaybackMessage, RoomId, UserId};
use crate::transport::Transport;
use crate::widget::SimulatedPlayer;

pub const ROOM: &str = "lobby";

pub fn test_user_id(id: &str) -> UserId {
    UserId::from_string(id.to_string())
}

pub fn test_room_id() -> RoomId {
    RoomId::from(ROOM)
}

/// A playback message from `sender` in the test room
pub fn remote(action: PlaybackAction, video_id: &str, timestamp: f64, sender: &str) -> PlaybackMessage {
    PlaybackMessage::new(action, video_id, timestamp, test_room_id(), test_user_id(sender))
}

pub fn simulated_player(clock: &ManualClock) -> SimulatedPlayer {
    SimulatedPlayer::new(Arc::new(clock.clone()))
}

/// Transport that records everything published through it
#[derive(Clone, Default)]
pub struct RecordingTransport {
    disconnected: Arc<AtomicBool>,
    failing: Arc<AtomicBool>,
    playback: Arc<Mutex<Vec<PlaybackMessage>>>,
    chat: Arc<Mutex<Vec<ChatMessage>>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_connected(&self, connected: bool) {
        self.disconnected.store(!connected, Ordering::SeqCst);
    }

    /// Make every publish fault
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn published(&self) -> Vec<PlaybackMessage> {
        self.playback.lock().clone()
    }

    pub fn actions(&self) -> Vec<PlaybackAction> {
        self.playback.lock().iter().map(|m| m.action).collect()
    }

    pub fn chat(&self) -> Vec<ChatMessage> {
        self.chat.lock().clone()
    }

    pub fn clear(&self) {
        self.playback.lock().clear();
        self.chat.lock().clear();
    }
}

impl Transport for RecordingTransport {
    fn is_connected(&self) -> bool {
        !self.disconnected.load(Ordering::SeqCst)
    }

    fn publish_playback(&self, message: &PlaybackMessage) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::TransportPublish("broker unavailable".to_string()));
        }
        self.playback.lock().push(message.clone());
        Ok(())
    }

    fn publish_chat(&self, message: &ChatMessage) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::TransportPublish("broker unavailable".to_string()));
        }
        self.chat.lock().push(message.clone());
        Ok(())
    }
}
