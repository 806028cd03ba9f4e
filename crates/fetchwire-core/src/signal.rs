//! Observer signals with keyed connections.
//!
//! A [`Signal`] holds a set of connected slots (closures) and invokes each of
//! them when emitted. Connections are identified by [`ConnectionId`] keys so
//! individual slots can be disconnected later.
//!
//! Slots are always invoked directly on the emitting thread. Cross-thread
//! delivery is the embedding runtime's concern: the request controller runs
//! on a cooperative async scheduler, so queued dispatch is not needed here.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use slotmap::{SlotMap, new_key_type};

new_key_type! {
    /// A unique identifier for a signal-slot connection.
    ///
    /// Returned by [`Signal::connect`] and consumed by [`Signal::disconnect`].
    /// The ID remains valid until the connection is removed or the signal is
    /// dropped.
    pub struct ConnectionId;
}

struct Connection<Args> {
    slot: Arc<dyn Fn(&Args) + Send + Sync>,
}

/// A type-safe signal that can have multiple connected slots.
///
/// When a signal is emitted, every connected slot is invoked with a reference
/// to the provided arguments, in connection order.
///
/// # Thread Safety
///
/// `Signal<Args>` is `Send + Sync`. Emission snapshots the slot list before
/// invoking anything, so a slot may connect or disconnect other slots (or
/// itself) without deadlocking.
///
/// # Example
///
/// ```
/// use fetchwire_core::Signal;
///
/// let signal = Signal::<String>::new();
/// let id = signal.connect(|s| println!("got: {s}"));
/// signal.emit("hello".to_string());
/// signal.disconnect(id);
/// ```
pub struct Signal<Args> {
    connections: Mutex<SlotMap<ConnectionId, Connection<Args>>>,
    blocked: AtomicBool,
}

impl<Args> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args> Signal<Args> {
    /// Create a new signal with no connections.
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(SlotMap::with_key()),
            blocked: AtomicBool::new(false),
        }
    }

    /// Connect a slot to this signal.
    ///
    /// Returns a [`ConnectionId`] that can be used to disconnect the slot.
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        self.connections.lock().insert(Connection {
            slot: Arc::new(slot),
        })
    }

    /// Disconnect a specific slot by its connection ID.
    ///
    /// Returns `true` if the connection was found and removed.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.connections.lock().remove(id).is_some()
    }

    /// Disconnect all slots from this signal.
    pub fn disconnect_all(&self) {
        self.connections.lock().clear();
    }

    /// Get the number of connected slots.
    pub fn connection_count(&self) -> usize {
        self.connections.lock().len()
    }

    /// Block or unblock signal emission.
    ///
    /// While blocked, calls to `emit()` do nothing. Useful during batch
    /// updates to prevent cascading notifications.
    pub fn set_blocked(&self, blocked: bool) {
        self.blocked.store(blocked, Ordering::SeqCst);
    }

    /// Check if signal emission is currently blocked.
    pub fn is_blocked(&self) -> bool {
        self.blocked.load(Ordering::SeqCst)
    }

    /// Emit the signal, invoking all connected slots in connection order.
    ///
    /// Does nothing if the signal is blocked.
    pub fn emit(&self, args: Args) {
        if self.is_blocked() {
            tracing::trace!(target: "fetchwire_core::signal", "signal blocked, skipping emit");
            return;
        }

        // Snapshot under the lock, invoke outside it.
        let slots: Vec<_> = self
            .connections
            .lock()
            .values()
            .map(|conn| conn.slot.clone())
            .collect();

        tracing::trace!(
            target: "fetchwire_core::signal",
            connection_count = slots.len(),
            "emitting signal"
        );

        for slot in slots {
            slot(&args);
        }
    }
}

impl<Args> std::fmt::Debug for Signal<Args> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("connection_count", &self.connection_count())
            .field("blocked", &self.is_blocked())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_emit() {
        let signal = Signal::<i32>::new();
        let received = Arc::new(Mutex::new(Vec::new()));

        let received_clone = received.clone();
        signal.connect(move |&value| {
            received_clone.lock().push(value);
        });

        signal.emit(7);
        signal.emit(11);

        assert_eq!(*received.lock(), vec![7, 11]);
    }

    #[test]
    fn test_disconnect_stops_delivery() {
        let signal = Signal::<i32>::new();
        let received = Arc::new(Mutex::new(Vec::new()));

        let received_clone = received.clone();
        let id = signal.connect(move |&value| {
            received_clone.lock().push(value);
        });

        signal.emit(1);
        assert!(signal.disconnect(id));
        assert!(!signal.disconnect(id));
        signal.emit(2);

        assert_eq!(*received.lock(), vec![1]);
    }

    #[test]
    fn test_blocked_emission() {
        let signal = Signal::<()>::new();
        let count = Arc::new(Mutex::new(0));

        let count_clone = count.clone();
        signal.connect(move |()| {
            *count_clone.lock() += 1;
        });

        signal.emit(());
        signal.set_blocked(true);
        signal.emit(());
        signal.set_blocked(false);
        signal.emit(());

        assert_eq!(*count.lock(), 2);
    }

    #[test]
    fn test_slot_may_disconnect_during_emit() {
        let signal = Arc::new(Signal::<()>::new());
        let other = Arc::new(Mutex::new(None::<ConnectionId>));

        let signal_clone = signal.clone();
        let other_clone = other.clone();
        signal.connect(move |()| {
            if let Some(id) = other_clone.lock().take() {
                signal_clone.disconnect(id);
            }
        });
        let id = signal.connect(|()| {});
        *other.lock() = Some(id);

        // Must not deadlock; the snapshot still delivers to both slots.
        signal.emit(());
        assert_eq!(signal.connection_count(), 1);
    }

    #[test]
    fn test_disconnect_all() {
        let signal = Signal::<i32>::new();
        signal.connect(|_| {});
        signal.connect(|_| {});
        assert_eq!(signal.connection_count(), 2);

        signal.disconnect_all();
        assert_eq!(signal.connection_count(), 0);
    }
}
