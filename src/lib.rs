pub mod cli;
pub mod config;
pub mod engine;
pub mod entry;
pub mod event;
pub mod kv;
pub mod matcher;
pub mod merge;
pub mod normalizer;
pub mod publish;
pub mod rules;
pub mod scheduler;
pub mod store;
pub mod timefmt;

pub use cli::{Cli, cli_parse};
pub use config::{EngineConfig, FilterRule, load_config};
pub use engine::{ControlSignal, Engine};
pub use entry::StoredEntry;
pub use event::LogEvent;
pub use kv::{FileStateStore, MemoryStateStore, StateStore, StateValue};

use anyhow::Context;
use tokio::io::AsyncBufReadExt;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

/// Host entry point: wire config, state file, the stdin event source and
/// shutdown handling around the engine, then run the scheduler loop.
pub async fn run() -> anyhow::Result<()> {
    let cli = cli_parse();

    let default_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    let config = config::load_config(cli.config.as_deref()).context("Failed to load config")?;
    if config.filters.iter().filter(|rule| rule.active).count() == 0 {
        anyhow::bail!("No active filters defined in the configuration");
    }

    let states = FileStateStore::open(&cli.states).context("Failed to open state file")?;
    let mut engine = Engine::new(config, Box::new(states));
    engine.restore();

    let (event_tx, event_rx) = mpsc::channel::<LogEvent>(1024);
    let (_signal_tx, signal_rx) = mpsc::channel::<ControlSignal>(16);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Stdin is the event source: one JSON event per line. EOF ends the
    // stream and shuts the engine down.
    let stdin_shutdown = shutdown_tx.clone();
    tokio::spawn(async move {
        let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<LogEvent>(line) {
                        Ok(event) => {
                            if event_tx.send(event).await.is_err() {
                                break;
                            }
                        }
                        Err(err) => warn!("Discarding undecodable event line: {err}"),
                    }
                }
                Ok(None) => {
                    info!("Event source closed");
                    break;
                }
                Err(err) => {
                    warn!("Event source read error: {err}");
                    break;
                }
            }
        }
        let _ = stdin_shutdown.send(true);
    });

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested");
            let _ = shutdown_tx.send(true);
        }
    });

    scheduler::run(engine, event_rx, signal_rx, shutdown_rx).await;

    Ok(())
}
