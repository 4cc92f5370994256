use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use watchsync_core::models::{ChatMessage, JoinAck, PlaybackMessage, RoomId, UserId};
use watchsync_core::SessionEvent;

/// Channel a room event travels on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Playback messages
    Video,
    Chat,
    /// Join handshakes and membership updates
    System,
}

impl Topic {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Chat => "chat",
            Self::System => "system",
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events delivered to room subscribers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RoomEvent {
    /// Join acknowledgment, sent only to the joining connection
    Joined(JoinAck),

    Playback(PlaybackMessage),

    Chat(ChatMessage),

    /// Membership or host designation changed
    MembersChanged {
        room_id: RoomId,
        host: UserId,
        members: Vec<UserId>,
        timestamp: DateTime<Utc>,
    },
}

impl RoomEvent {
    #[must_use]
    pub const fn topic(&self) -> Topic {
        match self {
            Self::Playback(_) => Topic::Video,
            Self::Chat(_) => Topic::Chat,
            Self::Joined(_) | Self::MembersChanged { .. } => Topic::System,
        }
    }

    /// Get a short description of the event type
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::Joined(_) => "joined",
            Self::Playback(_) => "playback",
            Self::Chat(_) => "chat",
            Self::MembersChanged { .. } => "members_changed",
        }
    }

    /// What a client session reacts to; membership updates are informational
    #[must_use]
    pub fn into_session_event(self) -> Option<SessionEvent> {
        match self {
            Self::Joined(ack) => Some(SessionEvent::Joined(ack)),
            Self::Playback(message) => Some(SessionEvent::Remote(message)),
            Self::Chat(message) => Some(SessionEvent::Chat(message)),
            Self::MembersChanged { .. } => None,
        }
    }
}
