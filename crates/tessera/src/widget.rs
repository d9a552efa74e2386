//! The attachment point for event controllers.
//!
//! A [`Widget`] holds weak references to the controllers attached to it and
//! forwards every input event to each of them in attachment order. It does
//! not own its controllers: a controller whose last handle is dropped is
//! skipped and pruned on the next delivery. When the last `Widget` handle is
//! dropped, every controller still attached is told so and detaches itself.
//!
//! Before delivery, the widget fills in the root-coordinate position of
//! events that lack one by adding its root origin, and rewrites pointer
//! events as touch events for controllers attached with
//! [`ControllerFlags::EMULATE_TOUCH`](crate::controller::ControllerFlags::EMULATE_TOUCH).

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tessera_core::logging::targets;

use crate::controller::{AttachedController, ControllerId};
use crate::input::{InputEvent, Point};

/// A process-unique widget identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WidgetId(u64);

impl WidgetId {
    fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw numeric value.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "widget#{}", self.0)
    }
}

struct Registration {
    id: ControllerId,
    controller: Weak<dyn AttachedController>,
}

struct WidgetInner {
    id: WidgetId,
    name: String,
    root_origin: Mutex<Point>,
    controllers: Mutex<Vec<Registration>>,
}

/// A UI element that controllers attach to.
///
/// Cloning a `Widget` yields another handle to the same element.
#[derive(Clone)]
pub struct Widget {
    inner: Arc<WidgetInner>,
}

impl Widget {
    /// Create a widget with no controllers and a root origin of (0, 0).
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(WidgetInner {
                id: WidgetId::next(),
                name: name.into(),
                root_origin: Mutex::new(Point::ORIGIN),
                controllers: Mutex::new(Vec::new()),
            }),
        }
    }

    /// The widget id.
    pub fn id(&self) -> WidgetId {
        self.inner.id
    }

    /// The widget's name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// A handle that does not keep the widget alive.
    pub fn downgrade(&self) -> WeakWidget {
        WeakWidget {
            id: self.inner.id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Set the widget's origin in root coordinates.
    ///
    /// Events delivered without a root position get `position + origin`.
    pub fn set_root_origin(&self, origin: Point) {
        *self.inner.root_origin.lock() = origin;
    }

    /// The widget's origin in root coordinates.
    pub fn root_origin(&self) -> Point {
        *self.inner.root_origin.lock()
    }

    /// Number of live controllers attached to this widget.
    pub fn controller_count(&self) -> usize {
        self.inner
            .controllers
            .lock()
            .iter()
            .filter(|registration| registration.controller.strong_count() > 0)
            .count()
    }

    /// Ids of the live attached controllers, in attachment order.
    pub fn controller_ids(&self) -> Vec<ControllerId> {
        self.inner
            .controllers
            .lock()
            .iter()
            .filter(|registration| registration.controller.strong_count() > 0)
            .map(|registration| registration.id)
            .collect()
    }

    /// Deliver an input event to every attached controller.
    ///
    /// Controllers are called in attachment order and all of them see the
    /// event, whatever earlier ones returned. Returns true if any controller
    /// handled it.
    pub fn deliver(&self, event: &InputEvent) -> bool {
        let controllers: Vec<Weak<dyn AttachedController>> = self
            .inner
            .controllers
            .lock()
            .iter()
            .map(|registration| registration.controller.clone())
            .collect();

        let event = self.to_root(event);
        let mut handled = false;
        let mut stale = false;
        for controller in controllers {
            let Some(controller) = controller.upgrade() else {
                stale = true;
                continue;
            };
            let delivered = if controller.flags().emulates_touch() {
                event.as_emulated_touch()
            } else {
                event
            };
            handled |= controller.dispatch(&delivered);
        }

        if stale {
            self.prune();
        }
        tracing::trace!(
            target: targets::WIDGET,
            widget = %self.inner.id,
            kind = ?event.kind,
            handled,
            "delivered event"
        );
        handled
    }

    pub(crate) fn register_controller(&self, id: ControllerId, controller: Weak<dyn AttachedController>) {
        self.inner
            .controllers
            .lock()
            .push(Registration { id, controller });
    }

    pub(crate) fn unregister_controller(&self, id: ControllerId) {
        self.inner
            .controllers
            .lock()
            .retain(|registration| registration.id != id);
    }

    fn to_root(&self, event: &InputEvent) -> InputEvent {
        let mut event = *event;
        if event.root_position.is_none() {
            event.root_position = Some(event.position + self.root_origin());
        }
        event
    }

    fn prune(&self) {
        let mut controllers = self.inner.controllers.lock();
        let before = controllers.len();
        controllers.retain(|registration| registration.controller.strong_count() > 0);
        tracing::trace!(
            target: targets::WIDGET,
            widget = %self.inner.id,
            pruned = before - controllers.len(),
            "pruned dropped controllers"
        );
    }
}

impl PartialEq for Widget {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Widget {}

impl fmt::Debug for Widget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Widget")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("controllers", &self.inner.controllers.lock().len())
            .finish()
    }
}

impl Drop for WidgetInner {
    fn drop(&mut self) {
        let controllers = std::mem::take(self.controllers.get_mut());
        if controllers.is_empty() {
            return;
        }
        tracing::debug!(
            target: targets::WIDGET,
            widget = %self.id,
            name = %self.name,
            controllers = controllers.len(),
            "widget destroyed with controllers attached"
        );
        for registration in controllers {
            if let Some(controller) = registration.controller.upgrade() {
                controller.widget_destroyed(self.id);
            }
        }
    }
}

/// A non-owning widget handle.
#[derive(Clone)]
pub struct WeakWidget {
    id: WidgetId,
    inner: Weak<WidgetInner>,
}

impl WeakWidget {
    /// The id of the referenced widget, valid even after it is destroyed.
    pub fn id(&self) -> WidgetId {
        self.id
    }

    /// Get a strong handle if the widget is still alive.
    pub fn upgrade(&self) -> Option<Widget> {
        self.inner.upgrade().map(|inner| Widget { inner })
    }
}

impl fmt::Debug for WeakWidget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakWidget")
            .field("id", &self.id)
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

static_assertions::assert_impl_all!(Widget: Send, Sync);
static_assertions::assert_impl_all!(WeakWidget: Send, Sync);
