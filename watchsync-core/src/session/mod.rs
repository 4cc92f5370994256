//! Playback reconciliation for one participant of a room.
//!
//! [`SyncSession`] is a single dispatcher over typed events. It owns the
//! player, the transport and the session context, and wires the three parts
//! together: the remote reconciler applies inbound messages, the local emitter
//! turns player notifications into intents, and the session authority decides
//! which intents reach the room.
//!
//! Nothing here reads a clock. Every entry point takes the current instant and
//! first fires whatever timers are due at it, so a runtime driver only has to
//! call [`SyncSession::poll`] at [`SyncSession::next_deadline`].

mod authority;
mod context;
mod emitter;
mod reconciler;

pub use authority::{SessionAuthority, SyncOutcome};
pub use context::SessionContext;
pub use emitter::{Intent, LocalEmitter};
pub use reconciler::{RemoteOutcome, RemoteReconciler, SuppressionWindow};

use std::collections::VecDeque;
use std::time::Instant;
use tracing::{info, warn};

use crate::config::SyncConfig;
use crate::error::{Error, Result};
use crate::models::{
    ChatMessage, JoinAck, PlaybackMessage, PlaybackState, Role, RoomId, SyncStatus, UserId, VideoId,
};
use crate::timer::earliest;
use crate::transport::Transport;
use crate::widget::{PlaybackWidget, WidgetNotification};

/// Inputs a session reacts to
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The room controller acknowledged our join
    Joined(JoinAck),
    /// A playback message arrived on the room channel
    Remote(PlaybackMessage),
    /// The player reported a state change
    Widget(WidgetNotification),
    /// A chat line arrived on the room channel
    Chat(ChatMessage),
}

pub struct SyncSession<W, T> {
    ctx: SessionContext,
    reconciler: RemoteReconciler,
    emitter: LocalEmitter,
    authority: SessionAuthority,
    widget: W,
    transport: T,
    chat: VecDeque<ChatMessage>,
    chat_limit: usize,
}

impl<W, T> std::fmt::Debug for SyncSession<W, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncSession")
            .field("ctx", &self.ctx)
            .field("suppressed", &self.reconciler.is_suppressed())
            .finish_non_exhaustive()
    }
}

impl<W: PlaybackWidget, T: Transport> SyncSession<W, T> {
    pub fn new(
        local_identity: UserId,
        room_id: RoomId,
        widget: W,
        transport: T,
        config: &SyncConfig,
    ) -> Self {
        Self {
            ctx: SessionContext::new(local_identity, room_id),
            reconciler: RemoteReconciler::new(config),
            emitter: LocalEmitter::new(config),
            authority: SessionAuthority::new(config),
            widget,
            transport,
            chat: VecDeque::new(),
            chat_limit: config.chat_history_limit.max(1),
        }
    }

    pub fn handle(&mut self, event: SessionEvent, now: Instant) {
        self.poll(now);

        match event {
            SessionEvent::Joined(ack) => self.on_joined(&ack, now),
            SessionEvent::Remote(message) => self.on_remote(&message, now),
            SessionEvent::Widget(notification) => self.on_widget(notification, now),
            SessionEvent::Chat(message) => self.on_chat(message),
        }
    }

    /// Fire every timer due at `now`
    pub fn poll(&mut self, now: Instant) {
        self.reconciler.poll(now);
        if let Some(intent) = self.emitter.poll(now) {
            self.dispatch(intent);
        }
    }

    /// When [`Self::poll`] next has something to do
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        earliest(self.reconciler.next_deadline(), self.emitter.next_deadline())
    }

    /// The viewer pressed "sync" (or "resync")
    pub fn request_sync(&mut self, now: Instant) -> Result<SyncOutcome> {
        self.poll(now);
        let outcome = self
            .authority
            .request_sync(&mut self.ctx, &self.widget, &self.transport)?;

        if outcome == SyncOutcome::Requested {
            // Leaving display-only mode: show the room state we already know
            self.reconciler.apply(&self.ctx, &mut self.widget, now);
        }
        Ok(outcome)
    }

    /// The viewer submitted a link or video id
    pub fn request_video_change(&mut self, reference: &str, now: Instant) -> Result<VideoId> {
        self.poll(now);
        self.authority
            .request_video_change(&mut self.ctx, &self.transport, reference)
    }

    pub fn send_chat(&mut self, content: &str) -> Result<()> {
        let content = content.trim();
        if content.is_empty() {
            return Ok(());
        }
        if !self.transport.is_connected() {
            return Err(Error::NotConnected("cannot chat while disconnected".to_string()));
        }

        let message = ChatMessage::new(self.ctx.local_identity().clone(), content);
        if let Err(err) = self.transport.publish_chat(&message) {
            warn!(room_id = %self.ctx.room_id(), error = %err, "Failed to publish chat message");
        }
        Ok(())
    }

    /// Exit the room: cancel timers and forget role and sync status
    pub fn leave(&mut self) {
        self.emitter.reset();
        self.reconciler.reset();
        self.ctx.reset_membership();
        self.chat.clear();
        info!(
            room_id = %self.ctx.room_id(),
            user_id = %self.ctx.local_identity(),
            "Left room"
        );
    }

    fn on_joined(&mut self, ack: &JoinAck, now: Instant) {
        // A join always starts from scratch, including after a reconnect
        self.emitter.reset();
        let initial = self.authority.on_join_ack(&mut self.ctx, ack);
        self.reconciler
            .adopt(&mut self.ctx, &mut self.widget, initial, now);
    }

    fn on_remote(&mut self, message: &PlaybackMessage, now: Instant) {
        let outcome = self
            .reconciler
            .on_remote_message(&mut self.ctx, &mut self.widget, message, now);

        if outcome == RemoteOutcome::SyncRequested {
            if let Err(err) = self
                .authority
                .on_ask_sync(&self.ctx, &self.widget, &self.transport, message)
            {
                warn!(
                    room_id = %self.ctx.room_id(),
                    requester = %message.sender,
                    error = %err,
                    "Could not answer sync request"
                );
            }
        }
    }

    fn on_widget(&mut self, notification: WidgetNotification, now: Instant) {
        let intent = self.emitter.on_widget_notification(
            notification,
            self.reconciler.is_suppressed(),
            self.ctx.intends_playing(),
            now,
        );
        if let Some(intent) = intent {
            self.dispatch(intent);
        }
    }

    fn dispatch(&mut self, intent: Intent) {
        if let Err(err) = self.authority.gate(&self.ctx, &self.transport, intent) {
            warn!(
                room_id = %self.ctx.room_id(),
                action = %intent.action,
                error = %err,
                "Dropping local playback intent"
            );
        }
    }

    fn on_chat(&mut self, message: ChatMessage) {
        if self.chat.len() == self.chat_limit {
            self.chat.pop_front();
        }
        self.chat.push_back(message);
    }
}

impl<W, T> SyncSession<W, T> {
    #[must_use]
    pub const fn context(&self) -> &SessionContext {
        &self.ctx
    }

    #[must_use]
    pub const fn role(&self) -> Option<Role> {
        self.ctx.role()
    }

    #[must_use]
    pub const fn sync_status(&self) -> SyncStatus {
        self.ctx.sync_status()
    }

    #[must_use]
    pub const fn playback(&self) -> &PlaybackState {
        self.ctx.playback()
    }

    #[must_use]
    pub const fn is_suppressed(&self) -> bool {
        self.reconciler.is_suppressed()
    }

    /// Received chat lines, oldest first
    pub fn chat_messages(&self) -> impl Iterator<Item = &ChatMessage> {
        self.chat.iter()
    }

    #[must_use]
    pub const fn widget(&self) -> &W {
        &self.widget
    }

    pub fn widget_mut(&mut self) -> &mut W {
        &mut self.widget
    }

    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }
}
