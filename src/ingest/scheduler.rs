//! Periodic refresh of every known location.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::Ingestor;

/// Run `refresh_all` now and then every `interval` until `shutdown` flips to
/// true. A tick that comes due while a run is still going is delayed rather
/// than fired in a burst.
pub async fn run_scheduler(
    ingestor: Arc<Ingestor>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tracing::info!(interval_secs = interval.as_secs(), "scheduler started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
        }
        if *shutdown.borrow() {
            break;
        }

        match ingestor.refresh_all(Some(shutdown.clone())).await {
            Ok(summary) if summary.cancelled => break,
            Ok(_) => {}
            Err(e) => tracing::error!(error = %e, "scheduled refresh failed"),
        }
    }

    tracing::info!("scheduler stopped");
}

/// Spawn [`run_scheduler`] on the runtime.
pub fn spawn_scheduler(
    ingestor: Arc<Ingestor>,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(run_scheduler(ingestor, interval, shutdown))
}
