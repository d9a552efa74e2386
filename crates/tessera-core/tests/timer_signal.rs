//! Integration tests for timers that emit signals when they fire.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tessera_core::{Signal, TimerService};

#[test]
fn test_timer_callback_emits_signal() {
    let timers = TimerService::new();
    let fired = Arc::new(Signal::<u32>::new());
    let received = Arc::new(Mutex::new(Vec::new()));

    let received_clone = received.clone();
    fired.connect(move |&value| received_clone.lock().push(value));

    let fired_clone = fired.clone();
    timers.start_one_shot(Duration::from_millis(500), move || fired_clone.emit(7));

    timers.process_expired_at(Instant::now() + Duration::from_millis(100));
    assert!(received.lock().is_empty());

    timers.process_expired_at(Instant::now() + Duration::from_millis(700));
    assert_eq!(*received.lock(), vec![7]);
}

#[test]
fn test_callback_holding_weak_state_is_noop_after_drop() {
    let timers = TimerService::new();
    let state = Arc::new(Mutex::new(0u32));
    let weak = Arc::downgrade(&state);

    timers.start_one_shot(Duration::from_millis(10), move || {
        if let Some(state) = weak.upgrade() {
            *state.lock() += 1;
        }
    });

    drop(state);
    assert_eq!(timers.process_expired_at(Instant::now() + Duration::from_secs(1)), 1);
}
