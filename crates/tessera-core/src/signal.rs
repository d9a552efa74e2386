//! Signals: ordered, synchronous observer lists.
//!
//! Controllers announce lifecycle changes and recognized gestures through
//! signals. Delivery is synchronous: every slot runs on the emitting thread,
//! in the order it was connected, before [`Signal::emit`] returns.
//!
//! # Example
//!
//! ```
//! use tessera_core::Signal;
//!
//! // Anchor coordinates of a recognized press.
//! let pressed = Signal::<(f32, f32)>::new();
//!
//! let id = pressed.connect(|&(x, y)| {
//!     println!("long press at {x}, {y}");
//! });
//!
//! pressed.emit((100.0, 200.0));
//! assert!(pressed.disconnect(id));
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use slotmap::{SlotMap, new_key_type};

use crate::logging::targets;

new_key_type! {
    /// Identifies one connected slot; pass it to [`Signal::disconnect`].
    pub struct ConnectionId;
}

type Slot<Args> = Arc<dyn Fn(&Args) + Send + Sync>;

struct Connection<Args> {
    /// Position in connection order.
    order: u64,
    slot: Slot<Args>,
}

struct Connections<Args> {
    slots: SlotMap<ConnectionId, Connection<Args>>,
    next_order: u64,
}

/// An observer list carrying values of type `Args`.
///
/// Use `()` for signals without a payload and a tuple or struct for several
/// values.
///
/// # Re-entrancy
///
/// The connection table is snapshotted before slots run, so a slot may
/// connect, disconnect, or emit on the same signal without deadlocking.
/// Connections made during an emission take effect from the next emission.
pub struct Signal<Args> {
    connections: Mutex<Connections<Args>>,
    /// While set, `emit` does nothing.
    blocked: AtomicBool,
}

impl<Args: 'static> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args: 'static> Signal<Args> {
    /// An empty signal.
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(Connections {
                slots: SlotMap::with_key(),
                next_order: 0,
            }),
            blocked: AtomicBool::new(false),
        }
    }

    /// Add a slot. It runs after every slot connected before it.
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        let mut connections = self.connections.lock();
        let order = connections.next_order;
        connections.next_order += 1;
        connections.slots.insert(Connection {
            order,
            slot: Arc::new(slot),
        })
    }

    /// Remove a slot. Returns false if it was already gone.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.connections.lock().slots.remove(id).is_some()
    }

    /// Remove every slot.
    pub fn disconnect_all(&self) {
        self.connections.lock().slots.clear();
    }

    /// Number of connected slots.
    pub fn connection_count(&self) -> usize {
        self.connections.lock().slots.len()
    }

    /// Suppress or resume emission.
    pub fn set_blocked(&self, blocked: bool) {
        self.blocked.store(blocked, Ordering::SeqCst);
    }

    /// Returns true while emission is suppressed.
    pub fn is_blocked(&self) -> bool {
        self.blocked.load(Ordering::SeqCst)
    }

    /// Call every slot with `args`, in connection order.
    #[tracing::instrument(skip_all, target = "tessera_core::signal", level = "trace")]
    pub fn emit(&self, args: Args) {
        if self.is_blocked() {
            tracing::trace!(target: targets::SIGNAL, "blocked, dropping emission");
            return;
        }

        // Slot keys are reused after disconnects, so sort by connection sequence.
        let slots: Vec<Slot<Args>> = {
            let table = self.connections.lock();
            let mut entries: Vec<&Connection<Args>> = table.slots.values().collect();
            entries.sort_by_key(|conn| conn.order);
            entries.into_iter().map(|conn| conn.slot.clone()).collect()
        };
        tracing::trace!(target: targets::SIGNAL, slots = slots.len(), "emitting");

        for slot in slots {
            slot(&args);
        }
    }
}

impl<Args> fmt::Debug for Signal<Args> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("slots", &self.connections.lock().slots.len())
            .field("blocked", &self.blocked.load(Ordering::SeqCst))
            .finish()
    }
}

static_assertions::assert_impl_all!(Signal<u64>: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder<T: Clone + Send + 'static>() -> (Arc<Mutex<Vec<T>>>, impl Fn(&T) + Send + Sync) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        (seen, move |value: &T| sink.lock().push(value.clone()))
    }

    #[test]
    fn test_emit_reaches_slot() {
        let ended = Signal::<u64>::new();
        let (seen, slot) = recorder::<u64>();
        ended.connect(slot);

        ended.emit(7);
        ended.emit(8);

        assert_eq!(*seen.lock(), vec![7, 8]);
    }

    #[test]
    fn test_disconnected_slot_stops_receiving() {
        let began = Signal::<u64>::new();
        let (seen, slot) = recorder::<u64>();
        let id = began.connect(slot);

        began.emit(1);
        assert!(began.disconnect(id));
        assert!(!began.disconnect(id));
        began.emit(2);

        assert_eq!(*seen.lock(), vec![1]);
    }

    #[test]
    fn test_blocked_signal_drops_emissions() {
        let updated = Signal::<u64>::new();
        let (seen, slot) = recorder::<u64>();
        updated.connect(slot);

        updated.set_blocked(true);
        assert!(updated.is_blocked());
        updated.emit(1);
        updated.set_blocked(false);
        updated.emit(2);

        assert_eq!(*seen.lock(), vec![2]);
    }

    #[test]
    fn test_slots_run_in_connection_order() {
        let signal = Signal::<()>::new();
        let calls = Arc::new(Mutex::new(Vec::new()));

        let ids: Vec<ConnectionId> = (0..3)
            .map(|n| {
                let calls = calls.clone();
                signal.connect(move |_| calls.lock().push(n))
            })
            .collect();

        // The freed key is reused, but the new slot still runs last.
        signal.disconnect(ids[0]);
        let late = calls.clone();
        signal.connect(move |_| late.lock().push(3));

        signal.emit(());
        assert_eq!(*calls.lock(), vec![1, 2, 3]);
    }

    #[test]
    fn test_disconnect_all_empties_table() {
        let signal = Signal::<()>::new();
        for _ in 0..4 {
            signal.connect(|_| {});
        }
        assert_eq!(signal.connection_count(), 4);

        signal.disconnect_all();
        assert_eq!(signal.connection_count(), 0);
    }

    #[test]
    fn test_slot_may_emit_again() {
        let signal = Arc::new(Signal::<u32>::new());
        let depth = Arc::new(Mutex::new(Vec::new()));

        let inner = signal.clone();
        let log = depth.clone();
        signal.connect(move |&level| {
            log.lock().push(level);
            if level < 2 {
                inner.emit(level + 1);
            }
        });

        signal.emit(0);
        assert_eq!(*depth.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn test_slot_may_disconnect_itself() {
        let signal = Arc::new(Signal::<()>::new());
        let id_cell: Arc<Mutex<Option<ConnectionId>>> = Arc::new(Mutex::new(None));
        let count = Arc::new(Mutex::new(0));

        let handle = signal.clone();
        let cell = id_cell.clone();
        let hits = count.clone();
        let id = signal.connect(move |_| {
            *hits.lock() += 1;
            if let Some(id) = *cell.lock() {
                handle.disconnect(id);
            }
        });
        *id_cell.lock() = Some(id);

        signal.emit(());
        signal.emit(());
        assert_eq!(*count.lock(), 1);
    }

    #[test]
    fn test_struct_payload() {
        #[derive(Clone, Debug, PartialEq)]
        struct Press {
            x: f32,
            y: f32,
        }

        let pressed = Signal::<Press>::new();
        let (seen, slot) = recorder::<Press>();
        pressed.connect(slot);

        pressed.emit(Press { x: 100.0, y: 200.0 });

        assert_eq!(*seen.lock(), vec![Press { x: 100.0, y: 200.0 }]);
    }
}
