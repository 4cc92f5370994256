use crate::models::{PlaybackState, Role, RoomId, SyncStatus, UserId};

/// Explicit state of one participant's room session.
///
/// Each field has a single writer: playback is written by the remote
/// reconciler (and by a validated local video change), role and sync status
/// only by the session authority. Writers live in this module tree; everything
/// else reads.
#[derive(Debug, Clone)]
pub struct SessionContext {
    local_identity: UserId,
    room_id: RoomId,
    role: Option<Role>,
    sync_status: SyncStatus,
    playback: PlaybackState,
}

impl SessionContext {
    #[must_use]
    pub fn new(local_identity: UserId, room_id: RoomId) -> Self {
        Self {
            local_identity,
            room_id,
            role: None,
            sync_status: SyncStatus::Unsynced,
            playback: PlaybackState::default(),
        }
    }

    #[must_use]
    pub const fn local_identity(&self) -> &UserId {
        &self.local_identity
    }

    #[must_use]
    pub const fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// `None` until the join handshake completes
    #[must_use]
    pub const fn role(&self) -> Option<Role> {
        self.role
    }

    #[must_use]
    pub const fn is_host(&self) -> bool {
        matches!(self.role, Some(Role::Host))
    }

    #[must_use]
    pub const fn sync_status(&self) -> SyncStatus {
        self.sync_status
    }

    #[must_use]
    pub const fn playback(&self) -> &PlaybackState {
        &self.playback
    }

    /// Whether local intents may reach the room channel
    #[must_use]
    pub const fn may_publish(&self) -> bool {
        self.is_host() || self.sync_status.is_synced()
    }

    /// Play state the local player should show.
    ///
    /// An unsynced participant always shows a paused player, whatever the
    /// room is doing.
    #[must_use]
    pub const fn intends_playing(&self) -> bool {
        self.sync_status.is_synced() && self.playback.is_playing
    }

    pub(super) fn set_playback(&mut self, playback: PlaybackState) {
        self.playback = playback;
    }

    pub(super) fn assume_role(&mut self, role: Role) {
        self.role = Some(role);
        self.sync_status = role.initial_sync_status();
    }

    /// One-way for the lifetime of the session
    pub(super) fn mark_synced(&mut self) {
        self.sync_status = SyncStatus::Synced;
    }

    pub(super) fn reset_membership(&mut self) {
        self.role = None;
        self.sync_status = SyncStatus::Unsynced;
    }
}
