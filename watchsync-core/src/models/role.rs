use serde::{Deserialize, Serialize};

/// Authority of a participant within a room session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Host,
    Guest,
}

impl Role {
    #[must_use]
    pub const fn is_host(self) -> bool {
        matches!(self, Self::Host)
    }

    /// Status a participant holds right after the join handshake
    #[must_use]
    pub const fn initial_sync_status(self) -> SyncStatus {
        match self {
            Self::Host => SyncStatus::Synced,
            Self::Guest => SyncStatus::Unsynced,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Host => write!(f, "host"),
            Self::Guest => write!(f, "guest"),
        }
    }
}

/// Whether a participant follows and may influence shared playback.
///
/// An unsynced participant only displays: the player is kept paused and its
/// local actions never reach the room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncStatus {
    #[default]
    Unsynced,
    Synced,
}

impl SyncStatus {
    #[must_use]
    pub const fn is_synced(self) -> bool {
        matches!(self, Self::Synced)
    }
}
