//! Decay scheduler. Decides *when* a decay tick runs.
//!
//! The scheduler owns no timer. Something outside (a tokio interval in
//! production, a loop over a [`ManualClock`](crate::clock::ManualClock) in
//! tests) calls [`DecayScheduler::poll`] with the current time:
//!
//! - the first poll always runs a tick;
//! - later polls run a tick once `interval` has passed since the last one;
//! - missed intervals collapse into a single tick, they are never replayed;
//! - a poll that arrives while a tick is still running is skipped.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::config::MAX_DECAY_INTERVAL_SECS;
use crate::error::{PetpalError, Result};
use crate::service::PetService;

/// What a call to [`DecayScheduler::poll`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A tick ran and updated this many pets.
    Ran {
        /// Pets updated.
        updated: usize,
    },
    /// Too early; the next tick is due at the given time.
    NotDue {
        /// When the next tick becomes due.
        next_due: DateTime<Utc>,
    },
    /// Another tick was still running.
    SkippedOverlap,
}

/// Running totals, for logs and health checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Ticks that completed.
    pub ticks_run: u64,
    /// Ticks that returned an error.
    pub ticks_failed: u64,
    /// Polls skipped because a tick was in flight.
    pub ticks_skipped: u64,
}

/// Fixed-interval decay scheduler.
#[derive(Debug)]
pub struct DecayScheduler {
    interval: Duration,
    next_due: Mutex<Option<DateTime<Utc>>>,
    running: AtomicBool,
    ticks_run: AtomicU64,
    ticks_failed: AtomicU64,
    ticks_skipped: AtomicU64,
}

/// Clears the running flag when the tick finishes, even on panic.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl DecayScheduler {
    /// A scheduler that ticks every `interval`.
    ///
    /// # Errors
    ///
    /// [`PetpalError::Config`] if `interval` is zero or longer than
    /// [`MAX_DECAY_INTERVAL_SECS`].
    pub fn new(interval: std::time::Duration) -> Result<Self> {
        if interval.as_secs() > MAX_DECAY_INTERVAL_SECS {
            return Err(PetpalError::Config(format!(
                "decay interval must be at most {MAX_DECAY_INTERVAL_SECS} seconds"
            )));
        }
        let interval = Duration::from_std(interval)
            .map_err(|e| PetpalError::Config(format!("decay interval out of range: {e}")))?;
        if interval <= Duration::zero() {
            return Err(PetpalError::Config("decay interval must be positive".to_string()));
        }
        Ok(Self {
            interval,
            next_due: Mutex::new(None),
            running: AtomicBool::new(false),
            ticks_run: AtomicU64::new(0),
            ticks_failed: AtomicU64::new(0),
            ticks_skipped: AtomicU64::new(0),
        })
    }

    /// Tick interval.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// When the next tick is due; `None` before the first tick.
    #[must_use]
    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        *self.next_due.lock()
    }

    /// Running totals.
    #[must_use]
    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            ticks_run: self.ticks_run.load(Ordering::Relaxed),
            ticks_failed: self.ticks_failed.load(Ordering::Relaxed),
            ticks_skipped: self.ticks_skipped.load(Ordering::Relaxed),
        }
    }

    /// Run a decay tick on `service` if one is due at `now`.
    ///
    /// The next due time is pushed forward before the tick runs, so a failed
    /// tick is retried one interval later rather than on every poll.
    ///
    /// # Errors
    ///
    /// Whatever [`PetService::run_decay_tick`] returns.
    pub fn poll(&self, service: &PetService, now: DateTime<Utc>) -> Result<TickOutcome> {
        if self
            .running
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            self.ticks_skipped.fetch_add(1, Ordering::Relaxed);
            warn!(tick = %now, "Decay tick still running; skipping");
            return Ok(TickOutcome::SkippedOverlap);
        }
        let _running = RunningGuard(&self.running);

        {
            let mut next_due = self.next_due.lock();
            if let Some(due) = *next_due {
                if now < due {
                    debug!(next_due = %due, "Decay tick not due");
                    return Ok(TickOutcome::NotDue { next_due: due });
                }
            }
            let due = now.checked_add_signed(self.interval).ok_or_else(|| {
                PetpalError::Internal(format!("next decay tick after {now} is out of range"))
            })?;
            *next_due = Some(due);
        }

        match service.run_decay_tick(now) {
            Ok(updated) => {
                self.ticks_run.fetch_add(1, Ordering::Relaxed);
                Ok(TickOutcome::Ran { updated })
            }
            Err(err) => {
                self.ticks_failed.fetch_add(1, Ordering::Relaxed);
                warn!(error = %err, tick = %now, "Decay tick failed");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::species::Species;
    use crate::store::{MemoryStore, RecordStore};
    use crate::types::OwnerId;
    use std::sync::Arc;

    const HOUR: std::time::Duration = std::time::Duration::from_secs(3600);

    fn service_with_pet() -> (PetService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let service = PetService::new(store.clone());
        service
            .adopt_species(&OwnerId::from("1"), Species::Car)
            .expect("adopt");
        (service, store)
    }

    #[test]
    fn first_poll_runs_immediately() {
        let (service, _) = service_with_pet();
        let scheduler = DecayScheduler::new(HOUR).expect("scheduler");
        let t0 = Utc::now();
        assert_eq!(scheduler.poll(&service, t0).expect("poll"), TickOutcome::Ran { updated: 1 });
        assert_eq!(scheduler.next_due(), Some(t0 + Duration::hours(1)));
    }

    #[test]
    fn polls_before_interval_are_not_due() {
        let (service, store) = service_with_pet();
        let scheduler = DecayScheduler::new(HOUR).expect("scheduler");
        let t0 = Utc::now();
        scheduler.poll(&service, t0).expect("poll");
        let hunger = store.load_all().expect("load")[0].1.hunger;

        let early = scheduler.poll(&service, t0 + Duration::minutes(59)).expect("poll");
        assert!(matches!(early, TickOutcome::NotDue { .. }));
        assert_eq!(store.load_all().expect("load")[0].1.hunger, hunger);
    }

    #[test]
    fn missed_intervals_are_not_replayed() {
        let (service, store) = service_with_pet();
        let scheduler = DecayScheduler::new(HOUR).expect("scheduler");
        let t0 = Utc::now();
        scheduler.poll(&service, t0).expect("poll");

        // Five hours pass with nobody polling: one catch-up tick, not five.
        let late = t0 + Duration::hours(5);
        assert_eq!(scheduler.poll(&service, late).expect("poll"), TickOutcome::Ran { updated: 1 });
        assert!(matches!(
            scheduler.poll(&service, late + Duration::minutes(1)).expect("poll"),
            TickOutcome::NotDue { .. }
        ));
        // 50 + 5 + 5
        assert_eq!(store.load_all().expect("load")[0].1.hunger, 60);
        assert_eq!(scheduler.stats().ticks_run, 2);
    }

    #[test]
    fn overlapping_poll_is_skipped() {
        let (service, _) = service_with_pet();
        let scheduler = DecayScheduler::new(HOUR).expect("scheduler");
        scheduler.running.store(true, Ordering::SeqCst);
        assert_eq!(
            scheduler.poll(&service, Utc::now()).expect("poll"),
            TickOutcome::SkippedOverlap
        );
        assert_eq!(scheduler.stats().ticks_skipped, 1);
    }

    #[test]
    fn failed_tick_waits_a_full_interval() {
        let (service, store) = service_with_pet();
        let scheduler = DecayScheduler::new(HOUR).expect("scheduler");
        store.set_read_only(true);
        let t0 = Utc::now();
        assert!(scheduler.poll(&service, t0).is_err());
        assert_eq!(scheduler.stats().ticks_failed, 1);
        assert!(!scheduler.running.load(Ordering::SeqCst));

        store.set_read_only(false);
        assert!(matches!(
            scheduler.poll(&service, t0 + Duration::minutes(1)).expect("poll"),
            TickOutcome::NotDue { .. }
        ));
    }

    #[test]
    fn zero_interval_is_rejected() {
        assert!(DecayScheduler::new(std::time::Duration::ZERO).is_err());
    }

    #[test]
    fn interval_is_capped_at_a_year() {
        let year = std::time::Duration::from_secs(MAX_DECAY_INTERVAL_SECS);
        assert!(DecayScheduler::new(year).is_ok());
        assert!(matches!(
            DecayScheduler::new(year + std::time::Duration::from_secs(1)),
            Err(PetpalError::Config(_))
        ));
        assert!(DecayScheduler::new(std::time::Duration::from_secs(10_000_000_000_000)).is_err());
    }

    #[test]
    fn poll_near_the_end_of_time_errors_instead_of_panicking() {
        let (service, _) = service_with_pet();
        let scheduler = DecayScheduler::new(HOUR).expect("scheduler");
        let late = DateTime::<Utc>::MAX_UTC - Duration::minutes(1);

        assert!(matches!(scheduler.poll(&service, late), Err(PetpalError::Internal(_))));
        assert_eq!(scheduler.next_due(), None);
        assert!(!scheduler.running.load(Ordering::SeqCst));
    }
}
