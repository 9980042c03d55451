//! Background eviction of stale admission records.
//!
//! Without a sweeper the limiter map grows by one entry per identifier
//! ever seen. The sweeper runs on a fixed interval, drops records whose
//! window has fully elapsed, and exits when shutdown is signalled.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tokio::time;

use super::limiter::RateLimiter;
use crate::observability::metrics;

/// Periodically evicts stale records from a shared [`RateLimiter`].
pub struct EvictionSweeper {
    limiter: Arc<RateLimiter>,
    interval: Duration,
}

impl EvictionSweeper {
    pub fn new(limiter: Arc<RateLimiter>, interval: Duration) -> Self {
        Self { limiter, interval }
    }

    /// Sweep until the shutdown channel fires.
    ///
    /// Spawned as a task at startup. Each tick takes the limiter lock
    /// once; a sweep is a single retain pass, so admission stalls for
    /// microseconds at worst.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval_ms = self.interval.as_millis() as u64,
            window_ms = self.limiter.window().as_millis() as u64,
            "Eviction sweeper starting"
        );

        let mut ticker = time::interval(self.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = self.limiter.evict(Instant::now());
                    let tracked = self.limiter.tracked();
                    if removed > 0 {
                        tracing::debug!(removed, tracked, "Evicted stale admission records");
                    }
                    metrics::record_sweep(removed, tracked);
                }
                _ = shutdown.recv() => {
                    tracing::info!("Eviction sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admission::identity::ClientId;
    use crate::lifecycle::Shutdown;

    #[tokio::test]
    async fn sweeps_stale_records_in_the_background() {
        let limiter = Arc::new(RateLimiter::new(Duration::from_millis(20)));
        assert!(limiter.admit(&ClientId::from("9.9.9.9"), Instant::now()));
        assert!(limiter.admit(&ClientId::from("8.8.8.8"), Instant::now()));

        let shutdown = Shutdown::new();
        let sweeper = EvictionSweeper::new(limiter.clone(), Duration::from_millis(25));
        let handle = tokio::spawn(sweeper.run(shutdown.subscribe()));

        time::sleep(Duration::from_millis(150)).await;
        assert_eq!(limiter.tracked(), 0);

        shutdown.trigger();
        time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweeper did not stop after shutdown")
            .expect("sweeper task panicked");
    }

    #[tokio::test]
    async fn stops_promptly_when_idle() {
        let limiter = Arc::new(RateLimiter::new(Duration::from_millis(800)));
        let shutdown = Shutdown::new();
        let sweeper = EvictionSweeper::new(limiter, Duration::from_secs(3600));
        let handle = tokio::spawn(sweeper.run(shutdown.subscribe()));

        time::sleep(Duration::from_millis(20)).await;
        shutdown.trigger();
        time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweeper did not stop after shutdown")
            .expect("sweeper task panicked");
    }
}
