//! Runs one [`SyncSession`] on tokio.
//!
//! The session itself never touches a clock or a socket. The driver feeds it
//! room events, player notifications and viewer commands, and sleeps until the
//! session's next timer deadline in between.

use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, Instant as TokioInstant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use watchsync_core::clock::Clock;
use watchsync_core::config::SyncConfig;
use watchsync_core::models::{PlaybackState, Role, RoomId, SyncStatus, UserId};
use watchsync_core::widget::SimulatedPlayer;
use watchsync_core::{SessionEvent, SyncSession, Transport, WidgetNotification};

use crate::error::{Error, Result};
use crate::events::RoomEvent;
use crate::registry::RoomRegistry;
use crate::transport::LocalTransport;

const COMMAND_BUFFER: usize = 64;

pub type DrivenSession = SyncSession<SimulatedPlayer, LocalTransport>;

/// Reads the tokio clock, so paused test time applies to the player too
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> std::time::Instant {
        TokioInstant::now().into_std()
    }
}

/// What a viewer can do
#[derive(Debug, Clone, PartialEq)]
pub enum UserCommand {
    /// Press the sync (or resync) button
    Sync,
    /// Submit a video link or id
    ChangeVideo(String),
    Chat(String),
    /// Press play on the player
    Play,
    /// Press pause on the player
    Pause,
    /// Drag the seek bar
    Seek(f64),
    /// Lose the connection without leaving
    Disconnect,
    /// Rejoin from scratch
    Reconnect,
    Leave,
}

/// Snapshot of a running session
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionStatus {
    pub role: Option<Role>,
    pub sync_status: SyncStatus,
    pub playback: PlaybackState,
    pub connected: bool,
    /// Chat lines received since joining
    pub chat_messages: usize,
}

impl SessionStatus {
    fn of(session: &DrivenSession) -> Self {
        Self {
            role: session.role(),
            sync_status: session.sync_status(),
            playback: session.playback().clone(),
            connected: session.transport().is_connected(),
            chat_messages: session.chat_messages().count(),
        }
    }
}

/// Cloneable control handle for a running [`SessionDriver`]
#[derive(Debug, Clone)]
pub struct DriverHandle {
    commands: mpsc::Sender<UserCommand>,
    status: watch::Receiver<SessionStatus>,
    shutdown: CancellationToken,
}

impl DriverHandle {
    pub async fn send(&self, command: UserCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|err| Error::Closed(format!("session driver stopped, dropped {:?}", err.0)))
    }

    /// Latest session snapshot, updated after every handled input
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

pub struct SessionDriver {
    session: DrivenSession,
    notifications: mpsc::UnboundedReceiver<WidgetNotification>,
    commands: mpsc::Receiver<UserCommand>,
    status: watch::Sender<SessionStatus>,
    shutdown: CancellationToken,
}

impl SessionDriver {
    #[must_use]
    pub fn new(
        user_id: UserId,
        room_id: RoomId,
        registry: RoomRegistry,
        config: &SyncConfig,
        shutdown: CancellationToken,
    ) -> (Self, DriverHandle) {
        let (notify_tx, notifications) = mpsc::unbounded_channel();
        let player = SimulatedPlayer::new(Arc::new(TokioClock)).with_listener(move |notification| {
            // Receiver lives as long as the driver
            let _ = notify_tx.send(notification);
        });
        let transport = LocalTransport::new(registry, room_id.clone(), user_id.clone());
        let session = SyncSession::new(user_id, room_id, player, transport, config);

        let (commands_tx, commands) = mpsc::channel(COMMAND_BUFFER);
        let (status, status_rx) = watch::channel(SessionStatus::of(&session));
        let handle = DriverHandle {
            commands: commands_tx,
            status: status_rx,
            shutdown: shutdown.clone(),
        };

        let driver = Self {
            session,
            notifications,
            commands,
            status,
            shutdown,
        };
        (driver, handle)
    }

    /// Join the room and run until shutdown or [`UserCommand::Leave`].
    ///
    /// Returns the session after leaving, for inspection.
    pub async fn run(mut self) -> DrivenSession {
        let mut events = self.session.transport().connect();
        info!(
            room_id = %self.session.context().room_id(),
            user_id = %self.session.context().local_identity(),
            "Session driver started"
        );

        loop {
            let deadline = self.session.next_deadline();

            tokio::select! {
                () = self.shutdown.cancelled() => break,

                // A dropped connection closes the stream until the next connect
                event = events.recv(), if self.session.transport().is_connected() => {
                    let Some(event) = event else {
                        warn!(room_id = %self.session.context().room_id(), "Room event stream closed");
                        break;
                    };
                    if let Some(event) = event.into_session_event() {
                        self.session.handle(event, now());
                    }
                }

                Some(notification) = self.notifications.recv() => {
                    self.session.handle(SessionEvent::Widget(notification), now());
                }

                command = self.commands.recv() => {
                    let Some(command) = command else { break };
                    if !self.execute(command, &mut events) {
                        break;
                    }
                }

                () = sleep_until_deadline(deadline) => {
                    self.session.poll(now());
                }
            }

            self.publish_status();
        }

        self.session.leave();
        self.session.transport().disconnect();
        self.publish_status();
        self.session
    }

    fn publish_status(&self) {
        let current = SessionStatus::of(&self.session);
        self.status.send_if_modified(|status| {
            if *status == current {
                false
            } else {
                *status = current;
                true
            }
        });
    }

    /// Apply a viewer command; returns false once the viewer has left
    fn execute(&mut self, command: UserCommand, events: &mut mpsc::UnboundedReceiver<RoomEvent>) -> bool {
        let user_id = self.session.context().local_identity().clone();
        debug!(user_id = %user_id, ?command, "Viewer command");

        match command {
            UserCommand::Sync => match self.session.request_sync(now()) {
                Ok(outcome) => info!(user_id = %user_id, ?outcome, "Sync requested"),
                Err(err) => warn!(user_id = %user_id, error = %err, "Sync refused"),
            },
            UserCommand::ChangeVideo(reference) => {
                match self.session.request_video_change(&reference, now()) {
                    Ok(video_id) => info!(user_id = %user_id, video_id = %video_id, "Video changed"),
                    Err(err) => warn!(user_id = %user_id, error = %err, "Video change refused"),
                }
            }
            UserCommand::Chat(content) => {
                if let Err(err) = self.session.send_chat(&content) {
                    warn!(user_id = %user_id, error = %err, "Chat not sent");
                }
            }
            UserCommand::Play => self.session.widget_mut().user_play(),
            UserCommand::Pause => self.session.widget_mut().user_pause(),
            UserCommand::Seek(position) => self.session.widget_mut().user_seek(position),
            UserCommand::Disconnect => self.session.transport().disconnect(),
            UserCommand::Reconnect => {
                self.session.leave();
                *events = self.session.transport().connect();
            }
            UserCommand::Leave => return false,
        }
        true
    }
}

fn now() -> std::time::Instant {
    TokioClock.now()
}

async fn sleep_until_deadline(deadline: Option<std::time::Instant>) {
    match deadline {
        Some(deadline) => sleep_until(TokioInstant::from_std(deadline)).await,
        None => std::future::pending().await,
    }
}
