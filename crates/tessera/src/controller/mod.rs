//! Event controllers: gesture recognizers attached to widgets.
//!
//! A recognizer implements [`EventController`]: it sees every input event
//! its widget receives, keeps its own state machine, and reports a derived
//! [`ControllerState`]. The framework wraps a recognizer in a [`Controller`]
//! handle, which owns everything the recognizer should not have to think
//! about:
//!
//! - the weak attachment to at most one [`Widget`], plus the attach flags
//! - the timers the recognizer scheduled, which are stopped on detach and
//!   on drop, so a late timer can never reach a destroyed controller
//! - the `began`, `updated` and `ended` lifecycle signals, fired by comparing
//!   the derived state before and after each event, reset, or timer
//!
//! # Example
//!
//! ```
//! use std::time::{Duration, Instant};
//! use tessera::controller::{Controller, ControllerFlags, ControllerState, LongPressController};
//! use tessera::input::{DeviceId, InputEvent, MouseButton, Point};
//! use tessera::widget::Widget;
//! use tessera_core::TimerService;
//!
//! let timers = TimerService::new();
//! let widget = Widget::new("icon");
//! let controller = Controller::new(LongPressController::new(), timers.clone());
//! assert!(controller.attach(&widget, ControllerFlags::NONE));
//!
//! let press = InputEvent::button_press(DeviceId(1), MouseButton::Left, Point::new(100.0, 200.0));
//! assert!(widget.deliver(&press));
//! assert_eq!(controller.state(), ControllerState::Collecting);
//!
//! timers.process_expired_at(Instant::now() + Duration::from_secs(1));
//! assert_eq!(controller.state(), ControllerState::Recognized);
//! ```

pub mod long_press;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tessera_core::logging::targets;
use tessera_core::{Signal, TimerId, TimerService};

use crate::input::InputEvent;
use crate::widget::{WeakWidget, Widget, WidgetId};

pub use long_press::{
    LongPressConfig, LongPressController, LongPressEvent, DEFAULT_DELAY_FACTOR,
    DEFAULT_LONG_PRESS_DELAY_MS, DEFAULT_MOVEMENT_THRESHOLD, MAX_DELAY_FACTOR, MIN_DELAY_FACTOR,
};

/// The recognition state of a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ControllerState {
    /// No gesture in progress.
    #[default]
    None,
    /// Input is being observed; the outcome is not known yet.
    Collecting,
    /// The gesture was confirmed.
    Recognized,
    /// The gesture was ruled out.
    NotRecognized,
}

impl ControllerState {
    /// Returns true for every state other than [`ControllerState::None`].
    pub fn is_active(self) -> bool {
        !matches!(self, ControllerState::None)
    }
}

/// Options passed to [`Controller::attach`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ControllerFlags(u8);

impl ControllerFlags {
    /// No options.
    pub const NONE: Self = Self(0);
    /// Deliver primary-button pointer events as touch events.
    pub const EMULATE_TOUCH: Self = Self(1 << 0);

    /// Returns true if this set contains every flag in `other`.
    pub fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Returns true if no flag is set.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns true if pointer events should be rewritten as touch events.
    pub fn emulates_touch(self) -> bool {
        self.contains(Self::EMULATE_TOUCH)
    }
}

impl std::ops::BitOr for ControllerFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitAnd for ControllerFlags {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self(self.0 & rhs.0)
    }
}

impl std::ops::BitOrAssign for ControllerFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// A process-unique controller identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ControllerId(u64);

impl ControllerId {
    fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw numeric value.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ControllerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "controller#{}", self.0)
    }
}

/// The contract every gesture recognizer implements.
///
/// Recognizers use interior mutability: the framework calls them through
/// shared references, from the thread that delivers input.
pub trait EventController: Send + Sync + 'static {
    /// Observe one input event. Returns true if the event was consumed.
    ///
    /// Irrelevant events are ignored and return false; this never fails.
    fn handle_event(&self, cx: &ControllerContext<'_>, event: &InputEvent) -> bool;

    /// The current recognition state, derived from the recognizer's fields.
    fn state(&self) -> ControllerState;

    /// Abandon any gesture in progress and return to [`ControllerState::None`].
    ///
    /// Must be idempotent.
    fn reset(&self, cx: &ControllerContext<'_>);

    /// A timer scheduled through [`ControllerContext::schedule`] fired.
    fn timeout(&self, cx: &ControllerContext<'_>, timer: TimerId) {
        let _ = (cx, timer);
    }
}

/// Framework services available to a recognizer while it runs.
pub struct ControllerContext<'a> {
    base: &'a ControllerBase,
    target: Weak<dyn TimerTarget>,
}

impl ControllerContext<'_> {
    /// The id of the controller being driven.
    pub fn id(&self) -> ControllerId {
        self.base.id
    }

    /// The flags the controller was attached with.
    pub fn flags(&self) -> ControllerFlags {
        self.base.flags()
    }

    /// Schedule a one-shot timer owned by this controller.
    ///
    /// When it fires, [`EventController::timeout`] is called with the
    /// returned id. The timer holds only a weak reference to the controller
    /// and is stopped when the controller is detached or dropped.
    pub fn schedule(&self, delay: Duration) -> TimerId {
        let assigned: Arc<OnceLock<TimerId>> = Arc::new(OnceLock::new());
        let target = self.target.clone();
        let timer_slot = assigned.clone();

        let id = self.base.timers.start_one_shot(delay, move || {
            let Some(target) = target.upgrade() else {
                return;
            };
            if let Some(&timer) = timer_slot.get() {
                target.fire(timer);
            }
        });
        let _ = assigned.set(id);
        self.base.owned_timers.lock().push(id);

        tracing::trace!(
            target: targets::CONTROLLER,
            controller = %self.base.id,
            ?delay,
            "scheduled timer"
        );
        id
    }

    /// Stop a timer this controller owns.
    ///
    /// Returns false if the timer is not owned by this controller or has
    /// already fired.
    pub fn cancel(&self, timer: TimerId) -> bool {
        self.base.cancel_timer(timer)
    }
}

/// Bookkeeping shared by every controller regardless of recognizer.
pub struct ControllerBase {
    id: ControllerId,
    timers: TimerService,
    attachment: Mutex<Attachment>,
    last_state: Mutex<ControllerState>,
    owned_timers: Mutex<Vec<TimerId>>,
    began: Signal<ControllerId>,
    updated: Signal<ControllerId>,
    ended: Signal<ControllerId>,
}

#[derive(Default)]
struct Attachment {
    widget: Option<WeakWidget>,
    flags: ControllerFlags,
}

impl ControllerBase {
    fn new(timers: TimerService) -> Self {
        Self {
            id: ControllerId::next(),
            timers,
            attachment: Mutex::new(Attachment::default()),
            last_state: Mutex::new(ControllerState::None),
            owned_timers: Mutex::new(Vec::new()),
            began: Signal::new(),
            updated: Signal::new(),
            ended: Signal::new(),
        }
    }

    /// The controller id.
    pub fn id(&self) -> ControllerId {
        self.id
    }

    /// The timer service this controller schedules on.
    pub fn timers(&self) -> &TimerService {
        &self.timers
    }

    /// The attached widget, if it is still alive.
    pub fn widget(&self) -> Option<Widget> {
        self.attachment
            .lock()
            .widget
            .as_ref()
            .and_then(WeakWidget::upgrade)
    }

    /// The flags given at attach time, or [`ControllerFlags::NONE`] when detached.
    pub fn flags(&self) -> ControllerFlags {
        self.attachment.lock().flags
    }

    /// Number of timers this controller currently owns.
    pub fn pending_timers(&self) -> usize {
        self.owned_timers.lock().len()
    }

    /// Emitted when the state leaves [`ControllerState::None`].
    pub fn began(&self) -> &Signal<ControllerId> {
        &self.began
    }

    /// Emitted when the state changes between two active states.
    pub fn updated(&self) -> &Signal<ControllerId> {
        &self.updated
    }

    /// Emitted when the state returns to [`ControllerState::None`].
    pub fn ended(&self) -> &Signal<ControllerId> {
        &self.ended
    }

    fn attached_to(&self) -> Option<WidgetId> {
        self.attachment.lock().widget.as_ref().map(WeakWidget::id)
    }

    fn release_timer(&self, timer: TimerId) -> bool {
        let mut owned = self.owned_timers.lock();
        match owned.iter().position(|&id| id == timer) {
            Some(index) => {
                owned.swap_remove(index);
                true
            }
            None => false,
        }
    }

    fn cancel_timer(&self, timer: TimerId) -> bool {
        if !self.release_timer(timer) {
            return false;
        }
        self.timers.stop(timer).is_ok()
    }

    fn cancel_all_timers(&self) {
        let timers = std::mem::take(&mut *self.owned_timers.lock());
        for timer in timers {
            let _ = self.timers.stop(timer);
        }
    }

    /// Record a newly derived state and fire the matching lifecycle signal.
    fn sync_state(&self, state: ControllerState) {
        let previous = std::mem::replace(&mut *self.last_state.lock(), state);
        let signal = match (previous.is_active(), state.is_active()) {
            (false, true) => &self.began,
            (true, true) if previous != state => &self.updated,
            (true, false) => &self.ended,
            _ => return,
        };
        tracing::debug!(
            target: targets::CONTROLLER,
            controller = %self.id,
            from = ?previous,
            to = ?state,
            "state transition"
        );
        signal.emit(self.id);
    }
}

/// Receives timer callbacks for a controller.
trait TimerTarget: Send + Sync {
    fn fire(&self, timer: TimerId);
}

/// The widget-facing side of a controller.
pub(crate) trait AttachedController: Send + Sync {
    fn controller_id(&self) -> ControllerId;
    fn flags(&self) -> ControllerFlags;
    fn dispatch(&self, event: &InputEvent) -> bool;
    fn widget_destroyed(&self, widget: WidgetId);
}

struct ControllerShared<R: EventController> {
    base: ControllerBase,
    recognizer: R,
    this: Weak<ControllerShared<R>>,
}

impl<R: EventController> ControllerShared<R> {
    fn context(&self) -> ControllerContext<'_> {
        let target: Weak<dyn TimerTarget> = self.this.clone();
        ControllerContext {
            base: &self.base,
            target,
        }
    }

    #[tracing::instrument(
        skip_all,
        target = "tessera::controller",
        level = "trace",
        fields(controller = %self.base.id, kind = ?event.kind)
    )]
    fn process_event(&self, event: &InputEvent) -> bool {
        let cx = self.context();
        let handled = self.recognizer.handle_event(&cx, event);
        self.base.sync_state(self.recognizer.state());
        handled
    }

    fn reset(&self) {
        let cx = self.context();
        self.recognizer.reset(&cx);
        self.base.sync_state(self.recognizer.state());
    }
}

impl<R: EventController> TimerTarget for ControllerShared<R> {
    fn fire(&self, timer: TimerId) {
        if !self.base.release_timer(timer) {
            return;
        }
        tracing::trace!(target: targets::CONTROLLER, controller = %self.base.id, "timer fired");
        let cx = self.context();
        self.recognizer.timeout(&cx, timer);
        self.base.sync_state(self.recognizer.state());
    }
}

impl<R: EventController> AttachedController for ControllerShared<R> {
    fn controller_id(&self) -> ControllerId {
        self.base.id
    }

    fn flags(&self) -> ControllerFlags {
        self.base.flags()
    }

    fn dispatch(&self, event: &InputEvent) -> bool {
        self.process_event(event)
    }

    fn widget_destroyed(&self, widget: WidgetId) {
        {
            let mut attachment = self.base.attachment.lock();
            if attachment.widget.as_ref().map(WeakWidget::id) != Some(widget) {
                return;
            }
            attachment.widget = None;
            attachment.flags = ControllerFlags::NONE;
        }
        tracing::debug!(
            target: targets::CONTROLLER,
            controller = %self.base.id,
            %widget,
            "widget destroyed, detaching"
        );
        self.reset();
        self.base.cancel_all_timers();
    }
}

impl<R: EventController> Drop for ControllerShared<R> {
    fn drop(&mut self) {
        self.base.cancel_all_timers();
        let widget = self
            .base
            .attachment
            .get_mut()
            .widget
            .take()
            .and_then(|weak| weak.upgrade());
        if let Some(widget) = widget {
            widget.unregister_controller(self.base.id);
        }
    }
}

/// A handle to a recognizer driven by the controller framework.
///
/// Cloning the handle shares the controller. The controller is destroyed
/// when the last handle is dropped; its timers are stopped and it leaves the
/// widget it was attached to.
pub struct Controller<R: EventController> {
    shared: Arc<ControllerShared<R>>,
}

impl<R: EventController> Controller<R> {
    /// Wrap a recognizer, scheduling its timers on `timers`.
    pub fn new(recognizer: R, timers: TimerService) -> Self {
        let shared = Arc::new_cyclic(|this| ControllerShared {
            base: ControllerBase::new(timers),
            recognizer,
            this: this.clone(),
        });
        Self { shared }
    }

    /// The controller id.
    pub fn id(&self) -> ControllerId {
        self.shared.base.id
    }

    /// The wrapped recognizer.
    pub fn recognizer(&self) -> &R {
        &self.shared.recognizer
    }

    /// The framework bookkeeping for this controller.
    pub fn base(&self) -> &ControllerBase {
        &self.shared.base
    }

    /// Attach to `widget` and start receiving its input.
    ///
    /// Returns false, leaving the current attachment untouched, if the
    /// controller is already attached to a widget.
    pub fn attach(&self, widget: &Widget, flags: ControllerFlags) -> bool {
        {
            let mut attachment = self.shared.base.attachment.lock();
            if let Some(current) = &attachment.widget {
                tracing::warn!(
                    target: targets::CONTROLLER,
                    controller = %self.id(),
                    attached = %current.id(),
                    requested = %widget.id(),
                    "controller is already attached"
                );
                return false;
            }
            attachment.widget = Some(widget.downgrade());
            attachment.flags = flags;
        }

        let handle: Weak<dyn AttachedController> = Arc::downgrade(&self.shared) as _;
        widget.register_controller(self.id(), handle);
        tracing::debug!(
            target: targets::CONTROLLER,
            controller = %self.id(),
            widget = %widget.id(),
            ?flags,
            "attached"
        );
        true
    }

    /// Detach from `widget`.
    ///
    /// Stops event delivery, resets the recognizer (cancelling its timers)
    /// and forgets the widget. Returns false, changing nothing, if the
    /// controller is not attached to exactly this widget.
    pub fn detach(&self, widget: &Widget) -> bool {
        let attached = self.shared.base.attached_to();
        if attached != Some(widget.id()) {
            tracing::warn!(
                target: targets::CONTROLLER,
                controller = %self.id(),
                attached = ?attached,
                requested = %widget.id(),
                "detach from a widget the controller is not attached to"
            );
            return false;
        }

        widget.unregister_controller(self.id());
        self.shared.reset();
        self.shared.base.cancel_all_timers();
        {
            let mut attachment = self.shared.base.attachment.lock();
            attachment.widget = None;
            attachment.flags = ControllerFlags::NONE;
        }
        tracing::debug!(
            target: targets::CONTROLLER,
            controller = %self.id(),
            widget = %widget.id(),
            "detached"
        );
        true
    }

    /// The attached widget, if any and still alive.
    pub fn widget(&self) -> Option<Widget> {
        self.shared.base.widget()
    }

    /// The flags given at attach time.
    pub fn flags(&self) -> ControllerFlags {
        self.shared.base.flags()
    }

    /// The recognizer's current state.
    pub fn state(&self) -> ControllerState {
        self.shared.recognizer.state()
    }

    /// Abandon any gesture in progress. Calling this repeatedly is harmless.
    pub fn reset(&self) {
        self.shared.reset();
    }

    /// Feed one event to the recognizer and fire lifecycle signals.
    ///
    /// [`Widget::deliver`] calls this for every attached controller; calling
    /// it directly bypasses the widget's event rewriting.
    pub fn process_event(&self, event: &InputEvent) -> bool {
        self.shared.process_event(event)
    }

    /// Emitted when the state leaves [`ControllerState::None`].
    pub fn began(&self) -> &Signal<ControllerId> {
        self.shared.base.began()
    }

    /// Emitted when the state changes between two active states.
    pub fn updated(&self) -> &Signal<ControllerId> {
        self.shared.base.updated()
    }

    /// Emitted when the state returns to [`ControllerState::None`].
    pub fn ended(&self) -> &Signal<ControllerId> {
        self.shared.base.ended()
    }
}

impl<R: EventController> Clone for Controller<R> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<R: EventController> fmt::Debug for Controller<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("id", &self.id())
            .field("state", &self.state())
            .field("flags", &self.flags())
            .field("widget", &self.shared.base.attached_to())
            .finish()
    }
}
