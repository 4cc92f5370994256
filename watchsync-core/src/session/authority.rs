//! Host/guest authority and the gate in front of the room channel.

use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::error::{Error, Result};
use crate::models::{
    extract_video_id, JoinAck, PlaybackAction, PlaybackMessage, PlaybackState, Role, VideoId,
};
use crate::transport::Transport;
use crate::widget::{PlaybackWidget, PlayerState};

use super::context::SessionContext;
use super::emitter::Intent;

/// Result of a successful sync request
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SyncOutcome {
    /// The host pushed its own state to everyone
    Pushed { action: PlaybackAction, position: f64 },
    /// A guest asked the host for the room state
    Requested,
}

#[derive(Debug, Clone)]
pub struct SessionAuthority {
    /// Host resync sends the host's real play/pause state rather than PLAY
    mirror_host_state: bool,
}

impl SessionAuthority {
    #[must_use]
    pub const fn new(config: &SyncConfig) -> Self {
        Self {
            mirror_host_state: config.host_resync_mirrors_state,
        }
    }

    /// Derive role and sync status from a join acknowledgment.
    ///
    /// Returns the state the player starts from: the room's video and
    /// position, always paused.
    pub fn on_join_ack(&self, ctx: &mut SessionContext, ack: &JoinAck) -> PlaybackState {
        let role = if ack.host_identity == *ctx.local_identity() {
            Role::Host
        } else {
            Role::Guest
        };
        ctx.assume_role(role);

        let video_id = VideoId::parse(&ack.current_video_id).unwrap_or_else(|err| {
            warn!(
                room_id = %ctx.room_id(),
                video_id = %ack.current_video_id,
                error = %err,
                "Join acknowledgment carries an invalid video id, keeping current video"
            );
            ctx.playback().video_id.clone()
        });
        let position = if ack.current_time.is_finite() {
            ack.current_time.max(0.0)
        } else {
            0.0
        };

        info!(
            room_id = %ctx.room_id(),
            user_id = %ctx.local_identity(),
            host = %ack.host_identity,
            role = %role,
            "Joined room"
        );

        PlaybackState::paused(video_id, position)
    }

    /// Forward a local intent to the room if this participant may affect it.
    ///
    /// Returns whether the intent went out. Intents from an unsynced guest are
    /// dropped silently.
    pub fn gate<T: Transport>(&self, ctx: &SessionContext, transport: &T, intent: Intent) -> Result<bool> {
        if !ctx.may_publish() {
            debug!(
                room_id = %ctx.room_id(),
                user_id = %ctx.local_identity(),
                action = %intent.action,
                "Dropping local intent from unsynced participant"
            );
            return Ok(false);
        }

        publish(ctx, transport, intent.action, ctx.playback().video_id.as_str(), intent.position)
    }

    /// Explicit "sync" action.
    ///
    /// A host pushes its current position to everyone. A guest becomes synced
    /// and asks the host for the room state.
    pub fn request_sync<W: PlaybackWidget, T: Transport>(
        &self,
        ctx: &mut SessionContext,
        widget: &W,
        transport: &T,
    ) -> Result<SyncOutcome> {
        if !transport.is_connected() {
            return Err(Error::NotConnected("cannot sync while disconnected".to_string()));
        }

        match ctx.role() {
            None => Err(Error::NotJoined("cannot sync before joining a room".to_string())),
            Some(Role::Host) => {
                let (action, position) = host_snapshot(widget, self.mirror_host_state);
                publish(ctx, transport, action, ctx.playback().video_id.as_str(), position)?;
                info!(room_id = %ctx.room_id(), action = %action, position, "Pushed host state to room");
                Ok(SyncOutcome::Pushed { action, position })
            }
            Some(Role::Guest) => {
                ctx.mark_synced();
                publish(
                    ctx,
                    transport,
                    PlaybackAction::AskSync,
                    ctx.playback().video_id.as_str(),
                    0.0,
                )?;
                info!(room_id = %ctx.room_id(), user_id = %ctx.local_identity(), "Asked host for room state");
                Ok(SyncOutcome::Requested)
            }
        }
    }

    /// Answer another participant's `ASK_SYNC`; only the host replies.
    ///
    /// Returns whether a reply went out.
    pub fn on_ask_sync<W: PlaybackWidget, T: Transport>(
        &self,
        ctx: &SessionContext,
        widget: &W,
        transport: &T,
        request: &PlaybackMessage,
    ) -> Result<bool> {
        if !ctx.is_host() {
            return Ok(false);
        }
        if request.sender == *ctx.local_identity() {
            debug!(room_id = %ctx.room_id(), "Ignoring own sync request");
            return Ok(false);
        }

        let (action, position) = host_snapshot(widget, true);
        debug!(
            room_id = %ctx.room_id(),
            requester = %request.sender,
            action = %action,
            position,
            "Answering sync request"
        );
        publish(ctx, transport, action, ctx.playback().video_id.as_str(), position)
    }

    /// Switch the room to another video, starting from the beginning.
    ///
    /// Any joined participant may do this, synced or not. Fails with
    /// `NotJoined` before a join acknowledgment arrived.
    pub fn request_video_change<T: Transport>(
        &self,
        ctx: &mut SessionContext,
        transport: &T,
        reference: &str,
    ) -> Result<VideoId> {
        let video_id = extract_video_id(reference).inspect_err(|err| {
            warn!(room_id = %ctx.room_id(), reference, error = %err, "Rejected video reference");
        })?;
        if ctx.role().is_none() {
            return Err(Error::NotJoined("cannot change video before joining a room".to_string()));
        }

        if publish(ctx, transport, PlaybackAction::ChangeVideo, video_id.as_str(), 0.0)? {
            ctx.set_playback(PlaybackState::restarted(video_id.clone()));
        }
        Ok(video_id)
    }
}

/// Host's current action and position as seen on its player
fn host_snapshot<W: PlaybackWidget>(widget: &W, mirror_state: bool) -> (PlaybackAction, f64) {
    let action = if !mirror_state || widget.state() == PlayerState::Playing {
        PlaybackAction::Play
    } else {
        PlaybackAction::Pause
    };
    (action, widget.current_time())
}

/// Publish one playback message.
///
/// Being disconnected is reported to the caller. A publish fault is logged and
/// absorbed: the next playback event corrects any resulting drift. Returns
/// whether the message was handed to the transport.
fn publish<T: Transport>(
    ctx: &SessionContext,
    transport: &T,
    action: PlaybackAction,
    video_id: &str,
    position: f64,
) -> Result<bool> {
    if !transport.is_connected() {
        return Err(Error::NotConnected(format!("cannot send {action} while disconnected")));
    }

    let message = PlaybackMessage::new(
        action,
        video_id,
        position,
        ctx.room_id().clone(),
        ctx.local_identity().clone(),
    );

    match transport.publish_playback(&message) {
        Ok(()) => {
            debug!(room_id = %ctx.room_id(), action = %action, position, "Published playback message");
            Ok(true)
        }
        Err(err @ Error::NotConnected(_)) => Err(err),
        Err(err) => {
            warn!(
                room_id = %ctx.room_id(),
                action = %action,
                error = %err,
                "Failed to publish playback message, dropping it"
            );
            Ok(false)
        }
    }
}
