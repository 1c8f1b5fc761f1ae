//! Periodic background schema refresh.
//!
//! One re-armed task refreshes the schema cache on a fixed interval,
//! independent of request traffic. It never blocks request handling, a
//! single-flight guard keeps refreshes from overlapping, and a failed
//! refresh re-arms on a shorter backoff. The task stops cleanly when the
//! shutdown signal fires.

use std::sync::Arc;
use std::time::Duration;

use lodestone_pipeline::AskEngine;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// What one refresh tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A fresh digest replaced the cached one.
    Refreshed,
    /// Introspection failed; the stale digest stays.
    Failed,
    /// The store was unavailable; nothing was attempted.
    SkippedUnavailable,
    /// A refresh was already in flight.
    SkippedBusy,
}

/// Delay until the next tick. Pure so the backoff transition is testable:
/// only a failed refresh shortens the re-arm delay.
pub fn next_delay(outcome: RefreshOutcome, interval: Duration, error_backoff: Duration) -> Duration {
    match outcome {
        RefreshOutcome::Failed => error_backoff,
        _ => interval,
    }
}

/// The re-armed refresh task.
pub struct SchemaRefreshTask {
    engine: Arc<AskEngine>,
    interval: Duration,
    error_backoff: Duration,
    in_flight: Arc<Mutex<()>>,
}

impl SchemaRefreshTask {
    pub fn new(engine: Arc<AskEngine>, interval: Duration, error_backoff: Duration) -> Self {
        Self {
            engine,
            interval,
            error_backoff,
            in_flight: Arc::new(Mutex::new(())),
        }
    }

    /// One refresh attempt, guarded against overlap.
    pub async fn tick(&self) -> RefreshOutcome {
        let Ok(_guard) = self.in_flight.try_lock() else {
            debug!("schema refresh already in flight, skipping tick");
            return RefreshOutcome::SkippedBusy;
        };

        if !self.engine.graph().is_available().await {
            debug!("graph store unavailable, skipping schema refresh");
            return RefreshOutcome::SkippedUnavailable;
        }

        if self.engine.refresh_schema().await {
            info!("background schema refresh completed");
            RefreshOutcome::Refreshed
        } else {
            warn!("background schema refresh failed");
            RefreshOutcome::Failed
        }
    }

    /// Run until the shutdown signal flips. The first refresh waits one
    /// full interval - startup hydration already provided a digest.
    pub fn spawn(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut delay = self.interval;
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = shutdown.changed() => {
                        info!("schema refresh task shutting down");
                        return;
                    }
                }
                let outcome = self.tick().await;
                delay = next_delay(outcome, self.interval, self.error_backoff);
                debug!(?outcome, next_secs = delay.as_secs(), "schema refresh re-armed");
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: Duration = Duration::from_secs(300);
    const BACKOFF: Duration = Duration::from_secs(60);

    #[test]
    fn failure_rearms_on_backoff() {
        assert_eq!(next_delay(RefreshOutcome::Failed, INTERVAL, BACKOFF), BACKOFF);
    }

    #[test]
    fn success_and_skips_rearm_on_interval() {
        assert_eq!(
            next_delay(RefreshOutcome::Refreshed, INTERVAL, BACKOFF),
            INTERVAL
        );
        assert_eq!(
            next_delay(RefreshOutcome::SkippedUnavailable, INTERVAL, BACKOFF),
            INTERVAL
        );
        assert_eq!(
            next_delay(RefreshOutcome::SkippedBusy, INTERVAL, BACKOFF),
            INTERVAL
        );
    }
}
