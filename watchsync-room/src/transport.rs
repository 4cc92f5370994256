use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use watchsync_core::models::{ChatMessage, PlaybackMessage, RoomId, UserId};
use watchsync_core::{Error, Result, Transport};

use crate::events::RoomEvent;
use crate::hub::ConnectionId;
use crate::registry::RoomRegistry;

/// [`Transport`] over an in-process [`RoomRegistry`].
///
/// Clones share the connection, so a driver and an observer see the same
/// connectivity.
#[derive(Clone)]
pub struct LocalTransport {
    registry: RoomRegistry,
    room_id: RoomId,
    user_id: UserId,
    connected: Arc<AtomicBool>,
    connection: Arc<Mutex<Option<ConnectionId>>>,
}

impl LocalTransport {
    #[must_use]
    pub fn new(registry: RoomRegistry, room_id: RoomId, user_id: UserId) -> Self {
        Self {
            registry,
            room_id,
            user_id,
            connected: Arc::new(AtomicBool::new(false)),
            connection: Arc::new(Mutex::new(None)),
        }
    }

    /// Join the room; the join acknowledgment is the first event received.
    ///
    /// An existing connection is closed first.
    pub fn connect(&self) -> mpsc::UnboundedReceiver<RoomEvent> {
        self.disconnect();

        let membership = self.registry.join(&self.room_id, &self.user_id);
        *self.connection.lock() = Some(membership.connection_id);
        self.connected.store(true, Ordering::SeqCst);
        membership.events
    }

    /// Leave the room and drop the subscription
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
        let Some(connection_id) = self.connection.lock().take() else {
            return;
        };

        if let Err(err) = self.registry.leave(&connection_id) {
            warn!(
                room_id = %self.room_id,
                user_id = %self.user_id,
                error = %err,
                "Leaving room failed"
            );
        }
    }

    #[must_use]
    pub fn connection_id(&self) -> Option<ConnectionId> {
        self.connection.lock().clone()
    }

    #[must_use]
    pub const fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    fn ensure_connected(&self, what: &str) -> Result<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(Error::NotConnected(format!("cannot publish {what}")))
        }
    }
}

impl std::fmt::Debug for LocalTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalTransport")
            .field("room_id", &self.room_id)
            .field("user_id", &self.user_id)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

impl Transport for LocalTransport {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn publish_playback(&self, message: &PlaybackMessage) -> Result<()> {
        self.ensure_connected("playback message")?;
        let delivered = self.registry.relay_playback(message.clone())?;
        debug!(
            room_id = %self.room_id,
            action = %message.action,
            delivered,
            "Relayed playback message"
        );
        Ok(())
    }

    fn publish_chat(&self, message: &ChatMessage) -> Result<()> {
        self.ensure_connected("chat message")?;
        self.registry.relay_chat(&self.room_id, message.clone())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use watchsync_core::models::PlaybackAction;

    fn transport(registry: &RoomRegistry, user: &str) -> LocalTransport {
        LocalTransport::new(registry.clone(), RoomId::from("lobby"), UserId::from(user))
    }

    #[tokio::test]
    async fn test_connect_receives_join_ack_first() {
        let registry = RoomRegistry::new();
        let alice = transport(&registry, "alice");

        let mut events = alice.connect();

        assert!(alice.is_connected());
        assert!(matches!(events.recv().await, Some(RoomEvent::Joined(_))));
    }

    #[tokio::test]
    async fn test_publish_reaches_every_member() {
        let registry = RoomRegistry::new();
        let alice = transport(&registry, "alice");
        let bob = transport(&registry, "bob");
        let _alice_events = alice.connect();
        let mut bob_events = bob.connect();
        while bob_events.try_recv().is_ok() {}

        let message = PlaybackMessage::new(
            PlaybackAction::Play,
            "M7lc1UVf-VE",
            3.0,
            RoomId::from("lobby"),
            UserId::from("alice"),
        );
        alice.publish_playback(&message).unwrap();

        match bob_events.recv().await {
            Some(RoomEvent::Playback(received)) => assert_eq!(received, message),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_disconnected_publish_fails() {
        let registry = RoomRegistry::new();
        let alice = transport(&registry, "alice");

        let result = alice.publish_chat(&ChatMessage::new(UserId::from("alice"), "hi"));

        assert!(matches!(result, Err(Error::NotConnected(_))));
    }

    #[test]
    fn test_disconnect_leaves_room() {
        let registry = RoomRegistry::new();
        let alice = transport(&registry, "alice");
        let _events = alice.connect();
        assert_eq!(registry.members(&RoomId::from("lobby")).len(), 1);

        alice.disconnect();

        assert!(!alice.is_connected());
        assert_eq!(alice.connection_id(), None);
        assert_eq!(registry.room_count(), 0);
    }

    #[test]
    fn test_reconnect_replaces_connection() {
        let registry = RoomRegistry::new();
        let alice = transport(&registry, "alice");
        let _first = alice.connect();
        let first_id = alice.connection_id();

        let _second = alice.connect();

        assert_ne!(alice.connection_id(), first_id);
        assert_eq!(registry.members(&RoomId::from("lobby")).len(), 1);
    }
}
