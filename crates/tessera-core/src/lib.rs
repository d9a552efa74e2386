//! Core systems for Tessera.
//!
//! This crate provides the runtime primitives every Tessera controller builds on:
//!
//! - **Signal/Slot System**: Synchronous, ordered observer lists
//! - **Timers**: Cancellable one-shot timers driven by the host loop
//! - **Logging**: `tracing` targets and helpers
//!
//! # Signal/Slot Example
//!
//! ```
//! use tessera_core::Signal;
//!
//! let value_changed = Signal::<i32>::new();
//!
//! let conn_id = value_changed.connect(|value| {
//!     println!("Value changed to: {}", value);
//! });
//!
//! value_changed.emit(42);
//! value_changed.disconnect(conn_id);
//! ```
//!
//! # Timer Example
//!
//! ```
//! use std::time::{Duration, Instant};
//! use tessera_core::TimerService;
//!
//! let timers = TimerService::new();
//! let id = timers.start_one_shot(Duration::from_millis(500), || {
//!     println!("fired");
//! });
//!
//! // Cancel before it fires: the callback never runs.
//! timers.stop(id).unwrap();
//! assert_eq!(timers.process_expired_at(Instant::now() + Duration::from_secs(1)), 0);
//! ```

mod error;
pub mod logging;
pub mod signal;
pub mod timer;

pub use error::{CoreError, Result, TimerError};
pub use signal::{ConnectionId, Signal};
pub use timer::{TimerCallback, TimerId, TimerManager, TimerService};
