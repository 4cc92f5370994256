//! Scripted watch party: one host and a handful of guests in one process.
//!
//! Every participant runs its own [`SessionDriver`] against a shared
//! [`RoomRegistry`]. The script exercises joining, pulling and pushing sync,
//! scrubbing, pausing from a guest, a video change, a rejected link and a
//! dropped connection. At the end every player is compared with the host's.

use anyhow::{Context, Result};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep_until, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use watchsync_core::config::SyncConfig;
use watchsync_core::models::{Role, RoomId, UserId};
use watchsync_core::{Config, PlaybackWidget, PlayerState};
use watchsync_room::{DriverHandle, DrivenSession, RoomRegistry, SessionDriver, SessionStatus, UserCommand};

/// Who a step is for
#[derive(Debug, Clone, Copy)]
enum Who {
    Host,
    /// Guest by zero-based index
    Guest(usize),
    /// Every guest but the last, who stays unsynced for a while (the only guest counts as early)
    EarlyGuests,
}

#[derive(Debug, Clone)]
enum Action {
    Join,
    Command(UserCommand),
}

#[derive(Debug, Clone)]
struct Step {
    /// Fraction of the party's duration
    at: f64,
    who: Who,
    action: Action,
}

impl Step {
    fn new(at: f64, who: Who, command: UserCommand) -> Self {
        Self {
            at,
            who,
            action: Action::Command(command),
        }
    }
}

fn script(guests: usize) -> Vec<Step> {
    let mut steps = vec![Step::new(0.0, Who::Host, UserCommand::Chat("welcome!".to_string()))];

    for guest in 0..guests {
        #[allow(clippy::cast_precision_loss)]
        let at = 0.05 + 0.02 * guest as f64;
        steps.push(Step {
            at,
            who: Who::Guest(guest),
            action: Action::Join,
        });
    }

    let last = guests.saturating_sub(1);
    steps.extend([
        Step::new(0.15, Who::Host, UserCommand::Play),
        Step::new(0.25, Who::EarlyGuests, UserCommand::Sync),
        Step::new(0.35, Who::Host, UserCommand::Seek(90.0)),
        Step::new(0.45, Who::Guest(0), UserCommand::Pause),
        Step::new(0.50, Who::Guest(0), UserCommand::Play),
        Step::new(0.55, Who::Guest(0), UserCommand::ChangeVideo("https://youtu.be/dQw4w9WgXcQ".to_string())),
        Step::new(0.60, Who::Host, UserCommand::Play),
        Step::new(0.65, Who::Guest(last), UserCommand::Sync),
        Step::new(0.70, Who::Guest(last), UserCommand::ChangeVideo("not a url".to_string())),
        Step::new(0.72, Who::Guest(0), UserCommand::Disconnect),
        Step::new(0.74, Who::Guest(0), UserCommand::Sync),
        Step::new(0.78, Who::Guest(0), UserCommand::Reconnect),
        Step::new(0.82, Who::Guest(0), UserCommand::Sync),
        Step::new(0.85, Who::Guest(0), UserCommand::Chat("back again".to_string())),
        Step::new(0.90, Who::Host, UserCommand::Sync),
    ]);

    // Stable, so same-time steps keep their order
    steps.sort_by(|a, b| a.at.total_cmp(&b.at));
    steps
}

struct Participant {
    name: String,
    handle: DriverHandle,
    task: JoinHandle<DrivenSession>,
}

struct Party {
    room_id: RoomId,
    registry: RoomRegistry,
    sync: SyncConfig,
    shutdown: CancellationToken,
    host: Participant,
    guests: Vec<Option<Participant>>,
}

impl Party {
    fn start(config: &Config, room_id: RoomId, shutdown: CancellationToken) -> Self {
        let registry = RoomRegistry::new();
        let host = spawn_participant(
            &config.simulation.host_name,
            &room_id,
            &registry,
            &config.sync,
            &shutdown,
        );
        Self {
            room_id,
            registry,
            sync: config.sync.clone(),
            shutdown,
            host,
            guests: std::iter::repeat_with(|| None)
                .take(config.simulation.guests)
                .collect(),
        }
    }

    fn targets(&self, who: Who) -> Vec<&Participant> {
        match who {
            Who::Host => vec![&self.host],
            Who::Guest(index) => self.guests.get(index).and_then(Option::as_ref).into_iter().collect(),
            Who::EarlyGuests => {
                let early = self.guests.len().saturating_sub(1).max(1);
                self.guests.iter().take(early).flatten().collect()
            }
        }
    }

    async fn perform(&mut self, step: Step) -> Result<()> {
        match step.action {
            Action::Join => {
                if let Who::Guest(index) = step.who {
                    let participant = spawn_participant(
                        &format!("guest-{}", index + 1),
                        &self.room_id,
                        &self.registry,
                        &self.sync,
                        &self.shutdown,
                    );
                    if let Some(slot) = self.guests.get_mut(index) {
                        *slot = Some(participant);
                    }
                }
            }
            Action::Command(command) => {
                for participant in self.targets(step.who) {
                    debug!(participant = %participant.name, ?command, "Scripted command");
                    participant.handle.send(command.clone()).await?;
                }
            }
        }
        Ok(())
    }

    fn log_status(&self) {
        for participant in std::iter::once(&self.host).chain(self.guests.iter().flatten()) {
            let status = participant.handle.status();
            debug!(
                participant = %participant.name,
                role = ?status.role,
                sync_status = ?status.sync_status,
                connected = status.connected,
                video_id = %status.playback.video_id,
                playing = status.playback.is_playing,
                position = status.playback.position_seconds,
                "Participant status"
            );
        }
    }

    async fn finish(self) -> Result<Report> {
        let mut finished = Vec::new();
        for participant in std::iter::once(self.host).chain(self.guests.into_iter().flatten()) {
            let status = participant.handle.status();
            participant.handle.shutdown();
            let session = participant
                .task
                .await
                .with_context(|| format!("session of {} panicked", participant.name))?;
            finished.push((participant.name, status, session));
        }

        // Sample every player at the same moment
        let host_time = finished
            .first()
            .map_or(0.0, |(_, _, session)| session.widget().current_time());
        let participants = finished
            .into_iter()
            .map(|(name, status, session)| {
                let position = session.widget().current_time();
                ParticipantReport {
                    name,
                    status,
                    state: session.widget().state(),
                    position,
                    drift: (position - host_time).abs(),
                }
            })
            .collect();

        Ok(Report { participants })
    }
}

#[derive(Debug)]
pub struct ParticipantReport {
    pub name: String,
    /// Status just before leaving
    pub status: SessionStatus,
    pub state: PlayerState,
    pub position: f64,
    /// Distance from the host's player
    pub drift: f64,
}

#[derive(Debug)]
pub struct Report {
    pub participants: Vec<ParticipantReport>,
}

impl Report {
    pub fn log(&self, tolerance: f64) {
        for p in &self.participants {
            info!(
                participant = %p.name,
                role = ?p.status.role,
                sync_status = ?p.status.sync_status,
                video_id = %p.status.playback.video_id,
                state = ?p.state,
                position = p.position,
                drift = p.drift,
                chat_messages = p.status.chat_messages,
                "Final participant state"
            );
            let synced = p.status.role == Some(Role::Host) || p.status.sync_status.is_synced();
            if synced && p.drift > tolerance {
                warn!(participant = %p.name, drift = p.drift, "Participant ended out of sync");
            }
        }
    }
}

fn spawn_participant(
    name: &str,
    room_id: &RoomId,
    registry: &RoomRegistry,
    sync: &SyncConfig,
    shutdown: &CancellationToken,
) -> Participant {
    let (driver, handle) = SessionDriver::new(
        UserId::from(name),
        room_id.clone(),
        registry.clone(),
        sync,
        shutdown.child_token(),
    );
    Participant {
        name: name.to_string(),
        handle,
        task: tokio::spawn(driver.run()),
    }
}

/// Run the scripted party until it ends or `shutdown` fires
pub async fn run(config: &Config, shutdown: CancellationToken) -> Result<Report> {
    let simulation = &config.simulation;
    let room_id = simulation
        .room_id
        .as_deref()
        .map_or_else(RoomId::new, RoomId::from);
    let duration = Duration::from_secs(simulation.duration_secs);

    info!(
        room_id = %room_id,
        host = %simulation.host_name,
        guests = simulation.guests,
        duration_secs = simulation.duration_secs,
        "Starting watch party"
    );

    let started = Instant::now();
    let mut party = Party::start(config, room_id, shutdown.clone());
    let mut steps = script(simulation.guests).into_iter();
    let mut next_step = steps.next();

    let mut ticker = interval(Duration::from_millis(simulation.tick_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let end = sleep_until(started + duration);
    tokio::pin!(end);

    loop {
        let due = next_step
            .as_ref()
            .map(|step| started + duration.mul_f64(step.at));

        tokio::select! {
            () = shutdown.cancelled() => {
                info!("Watch party interrupted");
                break;
            }
            () = &mut end => {
                info!("Watch party script finished");
                break;
            }
            _ = ticker.tick() => party.log_status(),
            () = wait_until(due) => {
                if let Some(step) = next_step.take() {
                    party.perform(step).await?;
                }
                next_step = steps.next();
            }
        }
    }

    party.finish().await
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(guests: usize) -> Config {
        let mut config = Config::default();
        config.simulation.guests = guests;
        config.simulation.room_id = Some("test-party".to_string());
        config.simulation.duration_secs = 20;
        config
    }

    #[tokio::test(start_paused = true)]
    async fn test_party_ends_in_sync() {
        let report = run(&config(2), CancellationToken::new()).await.unwrap();

        assert_eq!(report.participants.len(), 3);
        assert_eq!(report.participants[0].status.role, Some(Role::Host));
        for p in &report.participants {
            assert_eq!(p.state, PlayerState::Playing, "{} is not playing", p.name);
            assert!(p.drift <= 1.0, "{} drifted {}", p.name, p.drift);
            assert_eq!(p.status.playback.video_id.as_str(), "dQw4w9WgXcQ");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_chat_reaches_members_present() {
        let report = run(&config(1), CancellationToken::new()).await.unwrap();

        // The host saw its own welcome and the guest's message
        assert_eq!(report.participants[0].status.chat_messages, 2);
        assert_eq!(report.participants[1].status.chat_messages, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_interrupts_party() {
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let report = run(&config(3), shutdown).await.unwrap();

        assert_eq!(report.participants.len(), 1);
    }
}
