//! A wall clock anchored to tokio's monotonic time.
//!
//! Reads `anchor + (tokio::time::Instant::now() - started)`. Under a paused
//! tokio test runtime it advances exactly as `tokio::time::advance` does,
//! which lets the decay task be tested without real sleeps.

use chrono::{DateTime, Duration, Utc};
use petpal_core::clock::Clock;
use tokio::time::Instant;

/// Wall clock that moves with tokio time.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    anchor: DateTime<Utc>,
    started: Instant,
}

impl TokioClock {
    /// Anchor at `anchor`; `now()` returns it until tokio time moves.
    #[must_use]
    pub fn anchored_at(anchor: DateTime<Utc>) -> Self {
        Self {
            anchor,
            started: Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = Duration::from_std(self.started.elapsed()).unwrap_or(Duration::MAX);
        self.anchor.checked_add_signed(elapsed).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn follows_paused_tokio_time() {
        let anchor = Utc::now();
        let clock = TokioClock::anchored_at(anchor);
        assert_eq!(clock.now(), anchor);

        tokio::time::advance(std::time::Duration::from_secs(90)).await;
        assert_eq!(clock.now(), anchor + Duration::seconds(90));
    }
}
