// Periodic position polling
//
// Each poller runs on its own thread and carries a generation number. Drivers
// compare the generation of an incoming tick against the live poller, so a
// tick that races a cancellation is dropped.

use crate::error::{AudioError, Result};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Default position update frequency (seconds)
pub const DEFAULT_POSITION_UPDATE_FREQUENCY_SECS: f64 = 1.0;

// Longest single wait, for intervals too large to add to the clock
const MAX_TICK_WAIT: Duration = Duration::from_secs(24 * 60 * 60);

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

pub struct PositionPoller {
    generation: u64,
    interval: Duration,
    cancelled: Arc<(Mutex<bool>, Condvar)>,
}

impl PositionPoller {
    /// Start ticking every `interval`. `tick` receives the poller's generation
    /// and returns false when its owner is gone, which ends the thread.
    pub fn start<F>(interval: Duration, tick: F) -> Result<Self>
    where
        F: Fn(u64) -> bool + Send + 'static,
    {
        if interval.is_zero() {
            return Err(AudioError::Other("Position poll interval must be > 0".to_string()));
        }

        let generation = NEXT_GENERATION.fetch_add(1, Ordering::Relaxed);
        let cancelled = Arc::new((Mutex::new(false), Condvar::new()));
        let thread_cancelled = cancelled.clone();

        thread::Builder::new()
            .name(format!("duet-position-poller-{}", generation))
            .spawn(move || {
                let (lock, condvar) = &*thread_cancelled;
                loop {
                    let now = Instant::now();
                    let deadline = now
                        .checked_add(interval)
                        .unwrap_or_else(|| now + MAX_TICK_WAIT);
                    let mut stopped = lock.lock();
                    while !*stopped {
                        if condvar.wait_until(&mut stopped, deadline).timed_out() {
                            break;
                        }
                    }
                    if *stopped {
                        break;
                    }
                    drop(stopped);

                    if !tick(generation) {
                        break;
                    }
                }
                log::trace!("Position poller {} exited", generation);
            })
            .map_err(|e| {
                AudioError::InitializationError(format!("Failed to spawn position poller: {}", e))
            })?;

        log::debug!("Position poller {} started ({:?})", generation, interval);
        Ok(Self {
            generation,
            interval,
            cancelled,
        })
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Stop ticking. Does not wait for the thread, which may be blocked on the
    /// session the caller is holding; late ticks are rejected by generation.
    pub fn cancel(&self) {
        let (lock, condvar) = &*self.cancelled;
        let mut stopped = lock.lock();
        if !*stopped {
            *stopped = true;
            condvar.notify_all();
            log::debug!("Position poller {} cancelled", self.generation);
        }
    }
}

impl Drop for PositionPoller {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Validate a frequency given in seconds
pub fn poll_interval(seconds: f64) -> Option<Duration> {
    if seconds > 0.0 {
        Duration::try_from_secs_f64(seconds).ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poller_ticks_with_its_generation() {
        let ticks = Arc::new(Mutex::new(Vec::new()));
        let recorded = ticks.clone();
        let poller = PositionPoller::start(Duration::from_millis(10), move |generation| {
            recorded.lock().push(generation);
            true
        })
        .unwrap();

        thread::sleep(Duration::from_millis(120));
        poller.cancel();

        let ticks = ticks.lock().clone();
        assert!(!ticks.is_empty());
        assert!(ticks.iter().all(|g| *g == poller.generation()));
    }

    #[test]
    fn test_no_ticks_after_cancel() {
        let count = Arc::new(AtomicU64::new(0));
        let counter = count.clone();
        let poller = PositionPoller::start(Duration::from_millis(10), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        })
        .unwrap();

        thread::sleep(Duration::from_millis(50));
        drop(poller);
        // Let a tick that was already past the wait finish
        thread::sleep(Duration::from_millis(20));
        let after_cancel = count.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(60));

        assert_eq!(count.load(Ordering::SeqCst), after_cancel);
    }

    #[test]
    fn test_tick_returning_false_stops_thread() {
        let count = Arc::new(AtomicU64::new(0));
        let counter = count.clone();
        let _poller = PositionPoller::start(Duration::from_millis(5), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            false
        })
        .unwrap();

        thread::sleep(Duration::from_millis(60));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_generations_are_unique() {
        let first = PositionPoller::start(Duration::from_secs(60), |_| true).unwrap();
        let second = PositionPoller::start(Duration::from_secs(60), |_| true).unwrap();
        assert_ne!(first.generation(), second.generation());
    }

    #[test]
    fn test_poll_interval_validation() {
        assert_eq!(poll_interval(0.5), Some(Duration::from_millis(500)));
        assert_eq!(poll_interval(0.0), None);
        assert_eq!(poll_interval(-1.0), None);
        assert_eq!(poll_interval(f64::NAN), None);
        assert_eq!(poll_interval(f64::INFINITY), None);
        assert_eq!(poll_interval(1e30), None);
        assert!(poll_interval(1e15).is_some());
        assert!(PositionPoller::start(Duration::ZERO, |_| true).is_err());
    }

    #[test]
    fn test_interval_beyond_the_clock_does_not_tick() {
        let count = Arc::new(AtomicU64::new(0));
        let counter = count.clone();
        let interval = poll_interval(1e15).unwrap();
        let poller = PositionPoller::start(interval, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        })
        .unwrap();

        thread::sleep(Duration::from_millis(30));
        poller.cancel();
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
