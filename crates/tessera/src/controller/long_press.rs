//! Long-press recognition.
//!
//! A long press is a primary-button press or touch that stays down, without
//! moving more than [`DEFAULT_MOVEMENT_THRESHOLD`] units on either axis, for
//! `500ms × delay_factor`. The recognizer tracks one input stream at a time:
//! while a gesture is in progress, presses from any other device or touch
//! sequence are ignored.
//!
//! ```text
//!          press               timer fires
//!   None ─────────▶ Collecting ───────────▶ Recognized
//!    ▲                  │                       │
//!    │                  │ moved past threshold  │ release
//!    │                  ▼                       │
//!    ├───────────── NotRecognized               │
//!    │   release or reset                       │
//!    └──────────────────────────────────────────┘
//! ```
//!
//! Cancelling frees the recognizer at once, so another device or touch may
//! start a new press straight away. The `NotRecognized` outcome stays
//! visible until the next press, a reset, or the release of the cancelled
//! stream.

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tessera_core::logging::targets;
use tessera_core::{Signal, TimerId};

use super::{ControllerContext, ControllerId, ControllerState, EventController};
use crate::error::{ConfigError, ConfigResult};
use crate::input::{GestureIdentity, InputEvent, InputEventKind, Point};

/// Base long-press delay in milliseconds, before the delay factor applies.
pub const DEFAULT_LONG_PRESS_DELAY_MS: u64 = 500;

/// Distance on either axis beyond which movement cancels a long press.
pub const DEFAULT_MOVEMENT_THRESHOLD: f32 = 20.0;

/// Default delay multiplier.
pub const DEFAULT_DELAY_FACTOR: f64 = 1.0;

/// Smallest accepted delay multiplier.
pub const MIN_DELAY_FACTOR: f64 = 0.5;

/// Largest accepted delay multiplier.
pub const MAX_DELAY_FACTOR: f64 = 4.0;

/// Configuration for [`LongPressController`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LongPressConfig {
    /// Multiplier applied to the base delay, within
    /// [`MIN_DELAY_FACTOR`]..=[`MAX_DELAY_FACTOR`].
    pub delay_factor: f64,
    /// Movement on either axis that cancels the gesture.
    pub movement_threshold: f32,
}

impl Default for LongPressConfig {
    fn default() -> Self {
        Self {
            delay_factor: DEFAULT_DELAY_FACTOR,
            movement_threshold: DEFAULT_MOVEMENT_THRESHOLD,
        }
    }
}

impl LongPressConfig {
    /// Create a configuration with the given delay factor and the default threshold.
    pub fn with_delay_factor(delay_factor: f64) -> Self {
        Self {
            delay_factor,
            ..Self::default()
        }
    }

    /// Check that every value is in range.
    pub fn validate(&self) -> ConfigResult<()> {
        if !(MIN_DELAY_FACTOR..=MAX_DELAY_FACTOR).contains(&self.delay_factor) {
            return Err(ConfigError::DelayFactorOutOfRange {
                value: self.delay_factor,
                min: MIN_DELAY_FACTOR,
                max: MAX_DELAY_FACTOR,
            });
        }
        if !self.movement_threshold.is_finite() || self.movement_threshold < 0.0 {
            return Err(ConfigError::InvalidMovementThreshold(self.movement_threshold));
        }
        Ok(())
    }

    /// How long a press must be held to be recognized.
    pub fn delay(&self) -> Duration {
        Duration::from_millis(DEFAULT_LONG_PRESS_DELAY_MS).mul_f64(self.delay_factor)
    }
}

/// Payload of [`LongPressController::pressed`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LongPressEvent {
    /// The controller that recognized the press.
    pub controller: ControllerId,
    /// Where the press started, in widget coordinates.
    pub position: Point,
    /// Where the press started, in root coordinates.
    pub root_position: Point,
    /// How long the press had been held when it was recognized.
    pub held_for: Duration,
}

#[derive(Debug, Default)]
struct PressTracking {
    identity: Option<GestureIdentity>,
    position: Point,
    root_position: Point,
    start_time: Option<Instant>,
    pending_timer: Option<TimerId>,
    cancelled: bool,
    triggered: bool,
    /// The stream whose movement cancelled the last gesture.
    cancelled_stream: Option<GestureIdentity>,
}

impl PressTracking {
    /// Forget the current gesture, returning the timer that must be cancelled.
    fn clear(&mut self) -> Option<TimerId> {
        let pending = self.pending_timer.take();
        *self = Self::default();
        pending
    }

    fn tracks(&self, identity: GestureIdentity) -> bool {
        self.identity == Some(identity)
    }
}

/// Recognizes a press held in place.
///
/// Wrap it in a [`Controller`](super::Controller) and attach that to a
/// widget. [`pressed`](Self::pressed) fires once per recognized gesture with
/// the position where the press started.
pub struct LongPressController {
    config: LongPressConfig,
    delay: Duration,
    tracking: Mutex<PressTracking>,
    pressed: Signal<LongPressEvent>,
}

impl Default for LongPressController {
    fn default() -> Self {
        Self::new()
    }
}

impl LongPressController {
    /// Create a recognizer with the default 500ms delay and 20 unit threshold.
    pub fn new() -> Self {
        Self::from_valid_config(LongPressConfig::default())
    }

    /// Create a recognizer from a configuration, rejecting out-of-range values.
    pub fn with_config(config: LongPressConfig) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    /// Create a recognizer with a delay factor in [0.5, 4.0].
    pub fn with_delay_factor(delay_factor: f64) -> ConfigResult<Self> {
        Self::with_config(LongPressConfig::with_delay_factor(delay_factor))
    }

    fn from_valid_config(config: LongPressConfig) -> Self {
        Self {
            delay: config.delay(),
            config,
            tracking: Mutex::new(PressTracking::default()),
            pressed: Signal::new(),
        }
    }

    /// The delay multiplier. Fixed at construction.
    pub fn delay_factor(&self) -> f64 {
        self.config.delay_factor
    }

    /// How long a press must be held to be recognized.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Movement on either axis that cancels the gesture.
    pub fn movement_threshold(&self) -> f32 {
        self.config.movement_threshold
    }

    /// The configuration this recognizer was built from.
    pub fn config(&self) -> &LongPressConfig {
        &self.config
    }

    /// Emitted when a press has been held long enough.
    pub fn pressed(&self) -> &Signal<LongPressEvent> {
        &self.pressed
    }

    /// The input stream currently being tracked.
    pub fn active_identity(&self) -> Option<GestureIdentity> {
        self.tracking.lock().identity
    }

    /// Where the tracked press started, in widget coordinates.
    pub fn anchor(&self) -> Option<Point> {
        let tracking = self.tracking.lock();
        tracking.identity.map(|_| tracking.position)
    }

    /// When the tracked press started.
    pub fn press_started_at(&self) -> Option<Instant> {
        self.tracking.lock().start_time
    }

    fn begin(&self, cx: &ControllerContext<'_>, event: &InputEvent) -> bool {
        let identity = event.identity();
        let mut tracking = self.tracking.lock();
        if let Some(active) = tracking.identity
            && active != identity
        {
            tracing::trace!(
                target: targets::LONG_PRESS,
                controller = %cx.id(),
                ?active,
                ignored = ?identity,
                "press from another input stream ignored"
            );
            return false;
        }

        if let Some(stale) = tracking.clear() {
            cx.cancel(stale);
        }
        tracking.identity = Some(identity);
        tracking.position = event.position;
        tracking.root_position = event.root_position();
        tracking.start_time = Some(Instant::now());
        tracking.pending_timer = Some(cx.schedule(self.delay));

        tracing::debug!(
            target: targets::LONG_PRESS,
            controller = %cx.id(),
            ?identity,
            x = event.position.x,
            y = event.position.y,
            delay = ?self.delay,
            "press started"
        );
        true
    }

    fn moved(&self, cx: &ControllerContext<'_>, event: &InputEvent) {
        let identity = event.identity();
        let mut tracking = self.tracking.lock();
        if !tracking.tracks(identity) {
            return;
        }

        let (dx, dy) = event.position.axis_delta(tracking.position);
        let threshold = self.config.movement_threshold;
        if dx <= threshold && dy <= threshold {
            return;
        }

        if tracking.triggered {
            // Already recognized: moving away abandons the gesture outright.
            tracing::debug!(
                target: targets::LONG_PRESS,
                controller = %cx.id(),
                dx,
                dy,
                "moved after recognition, resetting"
            );
            tracking.clear();
            return;
        }

        if let Some(timer) = tracking.clear() {
            cx.cancel(timer);
        }
        tracking.cancelled = true;
        tracking.cancelled_stream = Some(identity);
        tracing::debug!(
            target: targets::LONG_PRESS,
            controller = %cx.id(),
            dx,
            dy,
            threshold,
            "moved beyond threshold, cancelled"
        );
    }

    fn end(&self, cx: &ControllerContext<'_>, event: &InputEvent) -> bool {
        let identity = event.identity();
        let mut tracking = self.tracking.lock();
        if tracking.cancelled_stream == Some(identity) {
            tracking.clear();
            tracing::trace!(
                target: targets::LONG_PRESS,
                controller = %cx.id(),
                "cancelled press released"
            );
            return false;
        }
        if !tracking.tracks(identity) {
            return false;
        }

        let triggered = tracking.triggered;
        if let Some(timer) = tracking.clear() {
            cx.cancel(timer);
        }
        tracing::debug!(
            target: targets::LONG_PRESS,
            controller = %cx.id(),
            triggered,
            "press ended"
        );
        triggered && event.kind != InputEventKind::TouchCancel
    }
}

impl EventController for LongPressController {
    fn handle_event(&self, cx: &ControllerContext<'_>, event: &InputEvent) -> bool {
        if event.is_press_begin() {
            self.begin(cx, event)
        } else if event.is_release_end() {
            self.end(cx, event)
        } else if event.is_motion() {
            self.moved(cx, event);
            false
        } else {
            false
        }
    }

    fn state(&self) -> ControllerState {
        let tracking = self.tracking.lock();
        if tracking.cancelled {
            ControllerState::NotRecognized
        } else if tracking.identity.is_none() {
            ControllerState::None
        } else if tracking.pending_timer.is_some() {
            ControllerState::Collecting
        } else if tracking.triggered {
            ControllerState::Recognized
        } else {
            ControllerState::None
        }
    }

    fn reset(&self, cx: &ControllerContext<'_>) {
        let pending = self.tracking.lock().clear();
        if let Some(timer) = pending {
            cx.cancel(timer);
        }
    }

    fn timeout(&self, cx: &ControllerContext<'_>, timer: TimerId) {
        let event = {
            let mut tracking = self.tracking.lock();
            if tracking.pending_timer != Some(timer) {
                return;
            }
            tracking.pending_timer = None;
            if tracking.cancelled {
                return;
            }
            tracking.triggered = true;
            LongPressEvent {
                controller: cx.id(),
                position: tracking.position,
                root_position: tracking.root_position,
                held_for: tracking
                    .start_time
                    .map(|start| start.elapsed())
                    .unwrap_or(self.delay),
            }
        };

        tracing::debug!(
            target: targets::LONG_PRESS,
            controller = %cx.id(),
            x = event.position.x,
            y = event.position.y,
            "long press recognized"
        );
        self.pressed.emit(event);
    }
}

impl std::fmt::Debug for LongPressController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LongPressController")
            .field("config", &self.config)
            .field("tracking", &*self.tracking.lock())
            .finish()
    }
}

static_assertions::assert_impl_all!(LongPressController: Send, Sync);
static_assertions::assert_impl_all!(super::Controller<LongPressController>: Send, Sync, Clone);
