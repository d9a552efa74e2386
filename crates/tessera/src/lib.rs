//! Tessera - gesture controllers and desktop helpers for touch-first shells.
//!
//! This is the main crate. It builds on the signal and timer primitives of
//! `tessera-core` and provides:
//!
//! - **Event controllers** ([`controller`]): a recognizer contract, attach
//!   and detach bookkeeping, lifecycle signals, and a long-press recognizer
//! - **Widgets** ([`widget`]): the attachment point that delivers input to
//!   controllers
//! - **Occupancy grid** ([`grid`]): per-cell weights for icon placement
//! - **File attributes** ([`attributes`]): metadata stored as extended
//!   attributes
//! - **Settings** ([`settings`]): gesture configuration loaded from TOML
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::{Duration, Instant};
//!
//! use parking_lot::Mutex;
//! use tessera::prelude::*;
//!
//! let timers = TimerService::new();
//! let icon = Widget::new("icon");
//! let long_press = Controller::new(LongPressController::new(), timers.clone());
//! long_press.attach(&icon, ControllerFlags::NONE);
//!
//! let pressed_at = Arc::new(Mutex::new(None));
//! let sink = pressed_at.clone();
//! long_press.recognizer().pressed().connect(move |event| {
//!     *sink.lock() = Some(event.position);
//! });
//!
//! let mouse = DeviceId(1);
//! icon.deliver(&InputEvent::button_press(mouse, MouseButton::Left, Point::new(100.0, 200.0)));
//! timers.process_expired_at(Instant::now() + Duration::from_secs(1));
//!
//! assert_eq!(*pressed_at.lock(), Some(Point::new(100.0, 200.0)));
//! ```

pub mod attributes;
pub mod controller;
mod error;
pub mod grid;
pub mod input;
pub mod prelude;
pub mod settings;
pub mod widget;

pub use error::{AttributeError, AttributeResult, ConfigError, ConfigResult};
pub use tessera_core::{Signal, TimerId, TimerService};
