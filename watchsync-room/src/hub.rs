use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use watchsync_core::models::{RoomId, UserId};

use crate::events::RoomEvent;

/// Handle for a client connection subscription
pub type ConnectionId = String;

/// Message sender for a client connection
pub type EventSender = mpsc::UnboundedSender<RoomEvent>;

#[derive(Debug, Clone)]
pub struct Subscriber {
    pub connection_id: ConnectionId,
    pub user_id: UserId,
    pub sender: EventSender,
}

/// Outcome of fanning one event out to a room
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Delivery {
    pub sent: usize,
    /// Connections whose receiver was gone; already unsubscribed
    pub pruned: Vec<ConnectionId>,
}

/// In-memory hub routing room events to connected clients
#[derive(Clone, Default)]
pub struct RoomHub {
    /// room_id -> subscribers, in subscription order
    rooms: Arc<DashMap<RoomId, Vec<Subscriber>>>,

    /// connection_id -> (room_id, user_id) for cleanup
    connections: Arc<DashMap<ConnectionId, (RoomId, UserId)>>,
}

impl RoomHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a connection to a room's events
    pub fn subscribe(
        &self,
        room_id: RoomId,
        user_id: UserId,
        connection_id: ConnectionId,
    ) -> mpsc::UnboundedReceiver<RoomEvent> {
        let (tx, rx) = mpsc::unbounded_channel();

        self.rooms
            .entry(room_id.clone())
            .or_default()
            .push(Subscriber {
                connection_id: connection_id.clone(),
                user_id: user_id.clone(),
                sender: tx,
            });
        self.connections
            .insert(connection_id.clone(), (room_id.clone(), user_id.clone()));

        info!(
            room_id = %room_id,
            user_id = %user_id,
            connection_id = %connection_id,
            "Client subscribed to room"
        );

        rx
    }

    /// Drop a connection's subscription, returning where it was subscribed
    pub fn unsubscribe(&self, connection_id: &str) -> Option<(RoomId, UserId)> {
        let Some((_, (room_id, user_id))) = self.connections.remove(connection_id) else {
            warn!(connection_id = %connection_id, "Attempted to unsubscribe unknown connection");
            return None;
        };

        if let Some(mut subscribers) = self.rooms.get_mut(&room_id) {
            subscribers.retain(|sub| sub.connection_id != connection_id);

            if subscribers.is_empty() {
                drop(subscribers);
                self.rooms.remove_if(&room_id, |_, subs| subs.is_empty());
                debug!(room_id = %room_id, "Room has no more subscribers, removed");
            }
        }

        info!(
            room_id = %room_id,
            user_id = %user_id,
            connection_id = %connection_id,
            "Client unsubscribed from room"
        );

        Some((room_id, user_id))
    }

    /// Send an event to every subscriber of a room.
    ///
    /// Subscribers whose receiver was dropped are unsubscribed and reported in
    /// [`Delivery::pruned`] so the owner of room membership can follow up.
    pub fn broadcast(&self, room_id: &RoomId, event: &RoomEvent) -> Delivery {
        self.deliver(room_id, event, |_| true)
    }

    /// Send an event to a single connection
    pub fn send_to_connection(&self, connection_id: &str, event: &RoomEvent) -> bool {
        let Some(room_id) = self
            .connections
            .get(connection_id)
            .map(|entry| entry.0.clone())
        else {
            return false;
        };

        self.deliver(&room_id, event, |sub| sub.connection_id == connection_id).sent > 0
    }

    fn deliver(&self, room_id: &RoomId, event: &RoomEvent, wanted: impl Fn(&Subscriber) -> bool) -> Delivery {
        let mut sent_count = 0;
        let mut failed_connections = Vec::new();

        if let Some(subscribers) = self.rooms.get(room_id) {
            for subscriber in subscribers.iter().filter(|sub| wanted(sub)) {
                if subscriber.sender.send(event.clone()).is_ok() {
                    sent_count += 1;
                } else {
                    warn!(
                        room_id = %room_id,
                        user_id = %subscriber.user_id,
                        connection_id = %subscriber.connection_id,
                        "Failed to send event to client, marking for cleanup"
                    );
                    failed_connections.push(subscriber.connection_id.clone());
                }
            }
        }

        for connection_id in &failed_connections {
            self.unsubscribe(connection_id);
        }

        debug!(
            room_id = %room_id,
            topic = %event.topic(),
            event_type = event.event_type(),
            sent_count,
            "Event delivered"
        );

        Delivery {
            sent: sent_count,
            pruned: failed_connections,
        }
    }

    #[must_use]
    pub fn subscriber_count(&self, room_id: &RoomId) -> usize {
        self.rooms.get(room_id).map_or(0, |subscribers| subscribers.len())
    }

    #[must_use]
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}
