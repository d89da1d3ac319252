//! The decay task — a tokio interval that polls the [`DecayScheduler`].
//!
//! The interval fires more often than the decay interval so a tick starts
//! close to when it becomes due; the scheduler decides whether a poll
//! actually runs one. Each poll runs on the blocking pool so a slow store
//! never stalls command handling.
//!
//! | Decay interval | Poll period |
//! |----------------|-------------|
//! | ≥ 1 h          | 60 s        |
//! | 1 min – 1 h    | interval/60 |
//! | < 1 min        | 1 s         |

use std::sync::Arc;
use std::time::Duration;

use petpal_core::clock::Clock;
use petpal_core::scheduler::{DecayScheduler, SchedulerStats, TickOutcome};
use petpal_core::PetService;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Longest gap between polls.
const MAX_POLL_PERIOD: Duration = Duration::from_secs(60);

/// Shortest gap between polls.
const MIN_POLL_PERIOD: Duration = Duration::from_secs(1);

/// How often to poll a scheduler with the given decay interval.
#[must_use]
pub fn poll_period(interval: Duration) -> Duration {
    (interval / 60).clamp(MIN_POLL_PERIOD, MAX_POLL_PERIOD)
}

/// Handle to a running decay task.
#[derive(Debug)]
pub struct DecayTaskHandle {
    scheduler: Arc<DecayScheduler>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl DecayTaskHandle {
    /// Scheduler counters so far.
    #[must_use]
    pub fn stats(&self) -> SchedulerStats {
        self.scheduler.stats()
    }

    /// The scheduler the task polls.
    #[must_use]
    pub fn scheduler(&self) -> &Arc<DecayScheduler> {
        &self.scheduler
    }

    /// Stop the task and wait for it. A tick already running finishes first.
    pub async fn shutdown(self) -> SchedulerStats {
        // The receiver is gone only if the task already exited.
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            error!(error = %e, "Decay task panicked");
        }
        self.scheduler.stats()
    }
}

/// Spawn the decay task on the current tokio runtime.
///
/// # Panics
///
/// Panics if called outside a tokio runtime.
pub fn spawn(
    service: Arc<PetService>,
    scheduler: Arc<DecayScheduler>,
    clock: Arc<dyn Clock>,
) -> DecayTaskHandle {
    let (shutdown, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(run(service, Arc::clone(&scheduler), clock, shutdown_rx));
    DecayTaskHandle {
        scheduler,
        shutdown,
        task,
    }
}

async fn run(
    service: Arc<PetService>,
    scheduler: Arc<DecayScheduler>,
    clock: Arc<dyn Clock>,
    mut shutdown: watch::Receiver<bool>,
) {
    let interval = scheduler.interval().to_std().unwrap_or(MAX_POLL_PERIOD);
    let period = poll_period(interval);
    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(interval_secs = interval.as_secs(), poll_secs = period.as_secs(), "Decay task started");

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                poll_once(&service, &scheduler, clock.as_ref()).await;
            }
        }
    }

    info!(stats = ?scheduler.stats(), "Decay task stopped");
}

async fn poll_once(service: &Arc<PetService>, scheduler: &Arc<DecayScheduler>, clock: &dyn Clock) {
    let now = clock.now();
    let service = Arc::clone(service);
    let scheduler = Arc::clone(scheduler);
    let polled = tokio::task::spawn_blocking(move || scheduler.poll(&service, now)).await;

    match polled {
        Ok(Ok(TickOutcome::Ran { updated })) => debug!(updated, "Decay tick ran"),
        Ok(Ok(TickOutcome::NotDue { .. } | TickOutcome::SkippedOverlap)) => {}
        // The scheduler already logged the failure; the next tick retries.
        Ok(Err(_)) => {}
        Err(e) => warn!(error = %e, "Decay tick task did not complete"),
    }
}
