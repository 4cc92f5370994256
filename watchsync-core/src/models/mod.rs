pub mod id;
pub mod message;
pub mod playback;
pub mod role;
pub mod video;

pub use id::{generate_id, RoomId, UserId};
pub use message::{ChatKind, ChatMessage, JoinAck, PlaybackAction, PlaybackMessage};
pub use playback::PlaybackState;
pub use role::{Role, SyncStatus};
pub use video::{extract_video_id, VideoId, DEFAULT_VIDEO_ID, VIDEO_ID_LEN};
