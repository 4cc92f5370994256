mod simulation;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use watchsync_core::{logging, Config};

#[derive(Parser, Debug)]
#[command(name = "watchsync")]
#[command(about = "Shared video playback synchronisation", long_about = None)]
struct Args {
    /// Configuration file (toml, yaml or json)
    #[arg(short, long, env = "WATCHSYNC_CONFIG_FILE")]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a scripted watch party with one host and several guests
    Simulate(SimulateArgs),
    /// Print the effective configuration and exit
    ShowConfig,
}

#[derive(clap::Args, Debug, Default)]
struct SimulateArgs {
    /// Number of guests joining the host
    #[arg(long)]
    guests: Option<usize>,

    /// Room to meet in (random when unset)
    #[arg(long)]
    room: Option<String>,

    /// Length of the scripted party in seconds
    #[arg(long)]
    duration: Option<u64>,
}

impl SimulateArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(guests) = self.guests {
            config.simulation.guests = guests;
        }
        if let Some(room) = &self.room {
            config.simulation.room_id = Some(room.clone());
        }
        if let Some(duration) = self.duration {
            config.simulation.duration_secs = duration;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let command = args
        .command
        .unwrap_or_else(|| Command::Simulate(SimulateArgs::default()));

    // 1. Load configuration, command line flags win
    let mut config = Config::load(args.config.as_deref())?;
    if let Command::Simulate(overrides) = &command {
        overrides.apply(&mut config);
    }

    if let Err(errors) = config.validate() {
        for e in &errors {
            eprintln!("Config validation error: {e}");
        }
        return Err(anyhow::anyhow!(
            "Configuration validation failed with {} error(s)",
            errors.len()
        ));
    }

    if matches!(command, Command::ShowConfig) {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    // 2. Initialize logging
    logging::init_logging(&config.logging)?;
    info!("watchsync starting...");

    // 3. Run until the script ends or a signal arrives
    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_token.cancel();
    });

    let report = simulation::run(&config, shutdown).await?;
    report.log(config.sync.drift_tolerance_secs);

    info!("watchsync stopped");
    Ok(())
}

/// Wait for a shutdown signal (SIGTERM or SIGINT/Ctrl+C)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("Received Ctrl+C"); }
        () = terminate => { info!("Received SIGTERM"); }
    }
}
