//! Timer service for Tessera.
//!
//! Provides cancellable one-shot timers for a single-threaded, cooperative
//! host loop. The host decides when time is advanced: it calls
//! [`TimerService::process_expired`] (or [`TimerService::process_expired_at`]
//! with its own clock) on each turn of its loop, and every timer whose deadline
//! has passed runs its callback exactly once.
//!
//! Timer IDs are slotmap keys. Stopping a timer removes its slot, so a stale
//! [`TimerId`] can never address a newer timer and a stopped timer never runs.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use slotmap::{new_key_type, SlotMap};

use crate::error::{Result, TimerError};
use crate::logging::targets;

new_key_type! {
    /// A unique identifier for a timer.
    pub struct TimerId;
}

/// Callback run when a one-shot timer fires.
pub type TimerCallback = Box<dyn FnOnce() + Send + 'static>;

/// Internal timer data.
struct TimerData {
    /// When this timer fires.
    deadline: Instant,
    /// The callback, taken when the timer fires.
    callback: TimerCallback,
}

/// An entry in the timer queue (min-heap by fire time).
#[derive(Debug, Clone, Copy)]
struct TimerQueueEntry {
    id: TimerId,
    fire_time: Instant,
}

impl PartialEq for TimerQueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.fire_time == other.fire_time
    }
}

impl Eq for TimerQueueEntry {}

impl PartialOrd for TimerQueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimerQueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap (BinaryHeap is max-heap by default).
        other.fire_time.cmp(&self.fire_time)
    }
}

/// Owns all pending one-shot timers.
pub struct TimerManager {
    /// All pending timers.
    timers: SlotMap<TimerId, TimerData>,
    /// Priority queue of pending timer fires (min-heap by fire time).
    queue: BinaryHeap<TimerQueueEntry>,
}

impl TimerManager {
    /// Create a new timer manager.
    pub fn new() -> Self {
        Self {
            timers: SlotMap::with_key(),
            queue: BinaryHeap::new(),
        }
    }

    /// Start a one-shot timer that fires `duration` from now.
    ///
    /// Returns the timer ID that can be used to cancel the timer.
    pub fn start_one_shot(&mut self, duration: Duration, callback: TimerCallback) -> TimerId {
        let deadline = Instant::now() + duration;
        let id = self.timers.insert(TimerData { deadline, callback });
        self.queue.push(TimerQueueEntry {
            id,
            fire_time: deadline,
        });

        tracing::trace!(target: targets::TIMER, ?id, ?duration, "timer scheduled");
        id
    }

    /// Stop and remove a timer.
    ///
    /// Returns `Ok(())` if the timer was pending, or an error if it already
    /// fired, was already stopped, or never existed.
    pub fn stop(&mut self, id: TimerId) -> Result<()> {
        if self.timers.remove(id).is_some() {
            tracing::trace!(target: targets::TIMER, ?id, "timer stopped");
            Ok(())
        } else {
            Err(TimerError::InvalidTimerId.into())
        }
    }

    /// Check if a timer is still pending.
    pub fn is_active(&self, id: TimerId) -> bool {
        self.timers.contains_key(id)
    }

    /// Get the duration until the next timer fires, if any.
    ///
    /// Returns `None` if there are no pending timers.
    pub fn time_until_next(&mut self) -> Option<Duration> {
        self.discard_stale();
        self.queue
            .peek()
            .map(|entry| entry.fire_time.saturating_duration_since(Instant::now()))
    }

    /// Remove and return the earliest timer whose deadline is at or before `now`.
    pub fn take_next_expired(&mut self, now: Instant) -> Option<(TimerId, TimerCallback)> {
        self.discard_stale();

        let entry = self.queue.peek().copied()?;
        if entry.fire_time > now {
            return None;
        }
        self.queue.pop();

        let data = self.timers.remove(entry.id)?;
        debug_assert!(data.deadline <= now);
        tracing::trace!(target: targets::TIMER, id = ?entry.id, "timer fired");
        Some((entry.id, data.callback))
    }

    /// Get the number of pending timers.
    pub fn active_count(&self) -> usize {
        self.timers.len()
    }

    /// Drop queue entries whose timer was stopped.
    fn discard_stale(&mut self) {
        while let Some(entry) = self.queue.peek() {
            if self.timers.contains_key(entry.id) {
                break;
            }
            self.queue.pop();
        }
    }
}

impl Default for TimerManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TimerManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerManager")
            .field("pending", &self.timers.len())
            .finish()
    }
}

/// A shared, cloneable handle to a [`TimerManager`].
///
/// Every clone addresses the same set of timers. Callbacks always run with the
/// internal lock released, so a callback may start or stop other timers.
#[derive(Clone, Default)]
pub struct TimerService {
    inner: Arc<Mutex<TimerManager>>,
}

impl TimerService {
    /// Create a timer service with no pending timers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `callback` to run once, `duration` from now.
    pub fn start_one_shot<F>(&self, duration: Duration, callback: F) -> TimerId
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner.lock().start_one_shot(duration, Box::new(callback))
    }

    /// Cancel a pending timer. Its callback will never run.
    pub fn stop(&self, id: TimerId) -> Result<()> {
        self.inner.lock().stop(id)
    }

    /// Check if a timer is still pending.
    pub fn is_active(&self, id: TimerId) -> bool {
        self.inner.lock().is_active(id)
    }

    /// Get the duration until the next timer fires, if any.
    pub fn time_until_next(&self) -> Option<Duration> {
        self.inner.lock().time_until_next()
    }

    /// Run every timer that has expired by now.
    ///
    /// Returns the number of callbacks run.
    pub fn process_expired(&self) -> usize {
        self.process_expired_at(Instant::now())
    }

    /// Run every timer whose deadline is at or before `now`, earliest first.
    ///
    /// Timers are taken one at a time, so a callback that stops a later
    /// timer in the same batch prevents it from running.
    #[tracing::instrument(skip(self), target = "tessera_core::timer", level = "trace")]
    pub fn process_expired_at(&self, now: Instant) -> usize {
        let mut fired = 0;
        loop {
            let next = self.inner.lock().take_next_expired(now);
            let Some((_id, callback)) = next else {
                break;
            };
            callback();
            fired += 1;
        }
        fired
    }

    /// Get the number of pending timers.
    pub fn active_count(&self) -> usize {
        self.inner.lock().active_count()
    }
}

impl fmt::Debug for TimerService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerService")
            .field("pending", &self.active_count())
            .finish()
    }
}

static_assertions::assert_impl_all!(TimerService: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    fn counter() -> (Arc<AtomicUsize>, impl FnOnce() + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        (count, move || {
            count_clone.fetch_add(1, AtomicOrdering::SeqCst);
        })
    }

    #[test]
    fn test_one_shot_fires_after_deadline() {
        let timers = TimerService::new();
        let (count, callback) = counter();
        let id = timers.start_one_shot(Duration::from_millis(500), callback);

        assert!(timers.is_active(id));
        assert_eq!(timers.process_expired_at(Instant::now()), 0);
        assert_eq!(count.load(AtomicOrdering::SeqCst), 0);

        let later = Instant::now() + Duration::from_millis(600);
        assert_eq!(timers.process_expired_at(later), 1);
        assert_eq!(count.load(AtomicOrdering::SeqCst), 1);
        assert!(!timers.is_active(id));

        // One-shot: never fires again.
        assert_eq!(timers.process_expired_at(later + Duration::from_secs(10)), 0);
    }

    #[test]
    fn test_stopped_timer_never_fires() {
        let timers = TimerService::new();
        let (count, callback) = counter();
        let id = timers.start_one_shot(Duration::from_millis(10), callback);

        assert!(timers.stop(id).is_ok());
        assert!(timers.stop(id).is_err());
        assert_eq!(timers.active_count(), 0);

        timers.process_expired_at(Instant::now() + Duration::from_secs(1));
        assert_eq!(count.load(AtomicOrdering::SeqCst), 0);
    }

    #[test]
    fn test_timers_fire_in_deadline_order() {
        let timers = TimerService::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for (label, ms) in [("late", 300u64), ("early", 100), ("middle", 200)] {
            let order_clone = order.clone();
            timers.start_one_shot(Duration::from_millis(ms), move || {
                order_clone.lock().push(label);
            });
        }

        timers.process_expired_at(Instant::now() + Duration::from_secs(1));
        assert_eq!(*order.lock(), vec!["early", "middle", "late"]);
    }

    #[test]
    fn test_callback_can_stop_later_timer() {
        let timers = TimerService::new();
        let (count, second) = counter();
        let second_id = timers.start_one_shot(Duration::from_millis(200), second);

        let timers_clone = timers.clone();
        timers.start_one_shot(Duration::from_millis(100), move || {
            let _ = timers_clone.stop(second_id);
        });

        assert_eq!(timers.process_expired_at(Instant::now() + Duration::from_secs(1)), 1);
        assert_eq!(count.load(AtomicOrdering::SeqCst), 0);
    }

    #[test]
    fn test_time_until_next_skips_stopped() {
        let timers = TimerService::new();
        assert!(timers.time_until_next().is_none());

        let first = timers.start_one_shot(Duration::from_millis(50), || {});
        timers.start_one_shot(Duration::from_secs(5), || {});
        timers.stop(first).unwrap();

        let remaining = timers.time_until_next().unwrap();
        assert!(remaining > Duration::from_secs(4));
    }
}
