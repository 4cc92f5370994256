//! Room controller: membership, host designation and join handshakes.
//!
//! Hosts are designated here, never on the client. The first member of an
//! empty room becomes its host; when the host disconnects the longest-present
//! remaining member takes over. Sessions that are already joined keep the role
//! they were given until they rejoin.

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};
use watchsync_core::models::{
    generate_id, ChatMessage, JoinAck, PlaybackMessage, RoomId, UserId, VideoId,
};

use crate::error::{Error, Result};
use crate::events::RoomEvent;
use crate::hub::{ConnectionId, RoomHub};

#[derive(Debug, Clone)]
struct Member {
    user_id: UserId,
    connection_id: ConnectionId,
    joined_at: DateTime<Utc>,
}

#[derive(Debug)]
struct RoomState {
    host: UserId,
    /// In join order
    members: Vec<Member>,
    /// Last relayed video and position, handed to new joiners
    video_id: VideoId,
    position: f64,
}

impl RoomState {
    fn new(host: UserId) -> Self {
        Self {
            host,
            members: Vec::new(),
            video_id: VideoId::default(),
            position: 0.0,
        }
    }

    fn join_ack(&self) -> JoinAck {
        JoinAck {
            host_identity: self.host.clone(),
            current_video_id: self.video_id.as_str().to_string(),
            current_time: self.position,
        }
    }

    fn member_ids(&self) -> Vec<UserId> {
        self.members.iter().map(|m| m.user_id.clone()).collect()
    }

    fn record(&mut self, message: &PlaybackMessage) {
        if !message.action.carries_state() {
            return;
        }
        if let Ok(video_id) = VideoId::parse(&message.video_id) {
            self.video_id = video_id;
        }
        if message.timestamp.is_finite() {
            self.position = message.timestamp.max(0.0);
        }
    }
}

/// A joined connection and its event stream
#[derive(Debug)]
pub struct Membership {
    pub connection_id: ConnectionId,
    pub events: mpsc::UnboundedReceiver<RoomEvent>,
}

#[derive(Clone, Default)]
pub struct RoomRegistry {
    hub: RoomHub,
    rooms: Arc<DashMap<RoomId, RoomState>>,
}

impl RoomRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn hub(&self) -> &RoomHub {
        &self.hub
    }

    /// Add a connection to a room and answer with a join acknowledgment
    pub fn join(&self, room_id: &RoomId, user_id: &UserId) -> Membership {
        let connection_id = generate_id();
        let events = self
            .hub
            .subscribe(room_id.clone(), user_id.clone(), connection_id.clone());

        let (ack, members) = {
            let mut room = self
                .rooms
                .entry(room_id.clone())
                .or_insert_with(|| RoomState::new(user_id.clone()));
            room.members.push(Member {
                user_id: user_id.clone(),
                connection_id: connection_id.clone(),
                joined_at: Utc::now(),
            });
            (room.join_ack(), room.member_ids())
        };

        info!(
            room_id = %room_id,
            user_id = %user_id,
            host = %ack.host_identity,
            video_id = %ack.current_video_id,
            position = ack.current_time,
            "Member joined room"
        );

        let host = ack.host_identity.clone();
        self.hub
            .send_to_connection(&connection_id, &RoomEvent::Joined(ack));
        self.announce(room_id, host, members);

        Membership {
            connection_id,
            events,
        }
    }

    /// Remove a connection, handing the host role on if its holder left.
    ///
    /// A connection the hub already pruned is still removed from its room.
    pub fn leave(&self, connection_id: &str) -> Result<()> {
        let room_id = match self.hub.unsubscribe(connection_id) {
            Some((room_id, _)) => room_id,
            None => self
                .room_of(connection_id)
                .ok_or_else(|| Error::NotFound(format!("connection {connection_id}")))?,
        };

        self.remove_member(&room_id, connection_id);
        Ok(())
    }

    /// Record and fan out a playback message to the sender's room
    pub fn relay_playback(&self, message: PlaybackMessage) -> Result<usize> {
        let room_id = message.room_id.clone();
        self.rooms
            .get_mut(&room_id)
            .ok_or_else(|| Error::NotFound(format!("room {room_id}")))?
            .record(&message);

        Ok(self.broadcast(&room_id, &RoomEvent::Playback(message)))
    }

    pub fn relay_chat(&self, room_id: &RoomId, message: ChatMessage) -> Result<usize> {
        if !self.rooms.contains_key(room_id) {
            return Err(Error::NotFound(format!("room {room_id}")));
        }
        Ok(self.broadcast(room_id, &RoomEvent::Chat(message)))
    }

    #[must_use]
    pub fn host(&self, room_id: &RoomId) -> Option<UserId> {
        self.rooms.get(room_id).map(|room| room.host.clone())
    }

    #[must_use]
    pub fn members(&self, room_id: &RoomId) -> Vec<UserId> {
        self.rooms
            .get(room_id)
            .map(|room| room.member_ids())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    fn announce(&self, room_id: &RoomId, host: UserId, members: Vec<UserId>) {
        let event = RoomEvent::MembersChanged {
            room_id: room_id.clone(),
            host,
            members,
            timestamp: Utc::now(),
        };
        self.broadcast(room_id, &event);
    }

    /// Fan an event out, dropping members whose connection turned out dead
    fn broadcast(&self, room_id: &RoomId, event: &RoomEvent) -> usize {
        let delivery = self.hub.broadcast(room_id, event);
        for connection_id in &delivery.pruned {
            self.remove_member(room_id, connection_id);
        }
        delivery.sent
    }

    fn room_of(&self, connection_id: &str) -> Option<RoomId> {
        self.rooms.iter().find_map(|room| {
            room.members
                .iter()
                .any(|m| m.connection_id == connection_id)
                .then(|| room.key().clone())
        })
    }

    /// Drop a member from its room state, promoting a new host or dropping
    /// the room as needed, then announce the new membership.
    fn remove_member(&self, room_id: &RoomId, connection_id: &str) {
        let update = match self.rooms.entry(room_id.clone()) {
            Entry::Occupied(mut entry) => {
                let room = entry.get_mut();
                let Some(index) = room
                    .members
                    .iter()
                    .position(|m| m.connection_id == connection_id)
                else {
                    return;
                };
                let left = room.members.remove(index);
                info!(room_id = %room_id, user_id = %left.user_id, "Member left room");

                let successor = room.members.first().cloned();
                if let Some(successor) = successor {
                    let host_gone = !room.members.iter().any(|m| m.user_id == room.host);
                    if host_gone {
                        info!(
                            room_id = %room_id,
                            previous_host = %room.host,
                            host = %successor.user_id,
                            member_since = %successor.joined_at,
                            "Host left, promoting longest-present member"
                        );
                        room.host = successor.user_id;
                    }
                    Some((room.host.clone(), room.member_ids()))
                } else {
                    entry.remove();
                    debug!(room_id = %room_id, "Room is empty, dropped");
                    None
                }
            }
            Entry::Vacant(_) => None,
        };

        if let Some((host, members)) = update {
            self.announce(room_id, host, members);
        }
    }
}
