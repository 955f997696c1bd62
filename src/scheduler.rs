//! Scheduler — drives the engine from a single task.
//!
//! One `select!` loop owns the engine, so ingestion, control signals and
//! both periodic jobs (snapshot refresh, midnight date relabeling) are
//! serialized per construction; stores can never be observed mid-mutation.

use crate::engine::{ControlSignal, Engine};
use crate::event::LogEvent;
use chrono::{DateTime, Days, Local};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Time left until the next local 00:00:01. The extra second keeps the
/// relabel run safely on the new day's side of midnight.
fn until_midnight(now: DateTime<Local>) -> Duration {
    let next_day = now
        .date_naive()
        .checked_add_days(Days::new(1))
        .expect("tomorrow exists");
    let target = next_day
        .and_hms_opt(0, 0, 0)
        .expect("midnight exists")
        .and_local_timezone(Local)
        .earliest()
        .map(|night| night.timestamp_millis())
        .unwrap_or_else(|| now.timestamp_millis());
    let ms = (target - now.timestamp_millis()).max(0) as u64 + 1000;
    Duration::from_millis(ms)
}

/// Run the engine until `shutdown` fires or both input channels close.
///
/// The refresh interval ticks immediately once at startup (the initial
/// publish of restored snapshots) and every `update_interval_secs` after
/// that. The midnight sleep is re-armed on every loop pass, which also
/// cancels a pending instance whenever the loop wakes for other work.
pub async fn run(
    mut engine: Engine,
    mut events: mpsc::Receiver<LogEvent>,
    mut signals: mpsc::Receiver<ControlSignal>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut refresh = tokio::time::interval(Duration::from_secs(
        engine.config().update_interval_secs.max(1),
    ));
    refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut signals_open = true;

    info!(
        "Engine running: {} active filter(s), refresh every {}s",
        engine.active_filter_names().len(),
        engine.config().update_interval_secs
    );

    loop {
        let midnight = tokio::time::sleep(until_midnight(Local::now()));
        tokio::pin!(midnight);

        tokio::select! {
            result = shutdown.changed() => {
                if result.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            event = events.recv() => {
                match event {
                    Some(event) => engine.ingest(event, Local::now()),
                    None => break,
                }
            }
            signal = signals.recv(), if signals_open => {
                match signal {
                    Some(signal) => engine.handle_signal(signal, Local::now()),
                    None => signals_open = false,
                }
            }
            _ = refresh.tick() => {
                debug!("Refreshing snapshot states");
                engine.refresh_pass(Local::now());
            }
            _ = &mut midnight => {
                debug!("Midnight reached, relabeling stored dates");
                engine.relabel_pass(Local::now());
            }
        }
    }

    info!("Scheduler stopped, periodic tasks cancelled");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_until_midnight_spans_to_next_day() {
        let now = Local.with_ymd_and_hms(2024, 3, 2, 23, 0, 0).unwrap();
        let wait = until_midnight(now);
        // one hour to midnight plus the one-second guard
        assert_eq!(wait, Duration::from_secs(3601));
    }

    #[test]
    fn test_until_midnight_just_after_midnight() {
        let now = Local.with_ymd_and_hms(2024, 3, 2, 0, 0, 30).unwrap();
        let wait = until_midnight(now);
        assert!(wait > Duration::from_secs(23 * 3600));
        assert!(wait <= Duration::from_secs(24 * 3600 + 1));
    }
}
