//! Messages exchanged on a room's shared channel.

use serde::{Deserialize, Serialize};

use super::id::{RoomId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlaybackAction {
    Play,
    Pause,
    ChangeVideo,
    AskSync,
}

impl PlaybackAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Play => "PLAY",
            Self::Pause => "PAUSE",
            Self::ChangeVideo => "CHANGE_VIDEO",
            Self::AskSync => "ASK_SYNC",
        }
    }

    /// Whether receiving this action replaces the room's playback state
    #[must_use]
    pub const fn carries_state(self) -> bool {
        !matches!(self, Self::AskSync)
    }
}

impl std::fmt::Display for PlaybackAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Playback command on the `video` topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackMessage {
    #[serde(rename = "type")]
    pub action: PlaybackAction,
    /// Raw identifier as sent; may be empty or malformed on the wire
    #[serde(default)]
    pub video_id: String,
    /// Position in seconds
    #[serde(default)]
    pub timestamp: f64,
    pub room_id: RoomId,
    #[serde(alias = "username")]
    pub sender: UserId,
}

impl PlaybackMessage {
    #[must_use]
    pub fn new(
        action: PlaybackAction,
        video_id: impl Into<String>,
        timestamp: f64,
        room_id: RoomId,
        sender: UserId,
    ) -> Self {
        Self {
            action,
            video_id: video_id.into(),
            timestamp,
            room_id,
            sender,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChatKind {
    #[default]
    #[serde(rename = "CHAT")]
    Chat,
}

/// Chat line on the `chat` topic, relayed verbatim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(rename = "type", default)]
    pub kind: ChatKind,
    pub content: String,
    pub sender: UserId,
}

impl ChatMessage {
    #[must_use]
    pub fn new(sender: UserId, content: impl Into<String>) -> Self {
        Self {
            kind: ChatKind::Chat,
            content: content.into(),
            sender,
        }
    }
}

/// Room controller's answer to a join request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinAck {
    #[serde(alias = "hostName")]
    pub host_identity: UserId,
    pub current_video_id: String,
    #[serde(default)]
    pub current_time: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_playback_message_wire_shape() {
        let message = PlaybackMessage::new(
            PlaybackAction::ChangeVideo,
            "M7lc1UVf-VE",
            0.0,
            RoomId::from("lobby"),
            UserId::from("alice"),
        );

        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "CHANGE_VIDEO",
                "videoId": "M7lc1UVf-VE",
                "timestamp": 0.0,
                "roomId": "lobby",
                "sender": "alice",
            })
        );
    }

    #[test]
    fn test_playback_message_accepts_username_and_missing_fields() {
        let message: PlaybackMessage = serde_json::from_value(json!({
            "type": "ASK_SYNC",
            "roomId": "lobby",
            "username": "bob",
        }))
        .unwrap();

        assert_eq!(message.action, PlaybackAction::AskSync);
        assert_eq!(message.sender.as_str(), "bob");
        assert!(message.video_id.is_empty());
        assert!(message.timestamp.abs() < f64::EPSILON);
    }

    #[test]
    fn test_chat_message_wire_shape() {
        let chat = ChatMessage::new(UserId::from("alice"), "hi");
        let value = serde_json::to_value(&chat).unwrap();
        assert_eq!(value, json!({"type": "CHAT", "content": "hi", "sender": "alice"}));
    }

    #[test]
    fn test_join_ack_accepts_host_name() {
        let ack: JoinAck = serde_json::from_value(json!({
            "hostName": "alice",
            "currentVideoId": "M7lc1UVf-VE",
            "currentTime": 12.5,
        }))
        .unwrap();

        assert_eq!(ack.host_identity.as_str(), "alice");
        assert!((ack.current_time - 12.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_only_ask_sync_carries_no_state() {
        assert!(PlaybackAction::Play.carries_state());
        assert!(PlaybackAction::Pause.carries_state());
        assert!(PlaybackAction::ChangeVideo.carries_state());
        assert!(!PlaybackAction::AskSync.carries_state());
    }
}
