//! Reactive state cells.

use std::fmt;

use parking_lot::RwLock;

use crate::signal::{ConnectionId, Signal};

/// A value paired with a change signal.
///
/// `StateCell<T>` wraps a value behind interior mutability and notifies
/// subscribers when the value actually changes. Writes are idempotent:
/// setting a value equal to the current one neither stores nor notifies,
/// so dependents are never recomputed redundantly.
///
/// # Example
///
/// ```
/// use fetchwire_core::StateCell;
///
/// let cell = StateCell::new(0);
/// assert!(cell.set(1));
/// assert!(!cell.set(1));
/// assert_eq!(cell.get(), 1);
/// ```
pub struct StateCell<T> {
    value: RwLock<T>,
    changed: Signal<T>,
}

impl<T: Clone + PartialEq> StateCell<T> {
    /// Create a new cell with an initial value.
    pub fn new(value: T) -> Self {
        Self {
            value: RwLock::new(value),
            changed: Signal::new(),
        }
    }

    /// Get the current value.
    ///
    /// This clones the value. For large types, prefer [`StateCell::with`].
    pub fn get(&self) -> T {
        self.value.read().clone()
    }

    /// Access the value through a closure without cloning.
    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        f(&self.value.read())
    }

    /// Set the value, returning `true` if it changed.
    ///
    /// If the new value equals the current one, nothing is stored and no
    /// notification fires. Otherwise the value is stored, the write lock is
    /// released, and the `changed` signal is emitted with the new value.
    pub fn set(&self, value: T) -> bool {
        {
            let mut current = self.value.write();
            if *current == value {
                return false;
            }
            *current = value.clone();
        }
        self.changed.emit(value);
        true
    }

    /// Set the value without change notification.
    ///
    /// Useful during initialization where notifications should be deferred.
    pub fn set_silent(&self, value: T) {
        *self.value.write() = value;
    }

    /// Set the value, returning the old value if it changed.
    pub fn replace(&self, value: T) -> Option<T> {
        let old = {
            let mut current = self.value.write();
            if *current == value {
                return None;
            }
            std::mem::replace(&mut *current, value.clone())
        };
        self.changed.emit(value);
        Some(old)
    }

    /// Connect a slot invoked with the new value after each actual change.
    pub fn on_change<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.changed.connect(slot)
    }

    /// The underlying change signal.
    pub fn changed(&self) -> &Signal<T> {
        &self.changed
    }

    /// A read-only view of this cell.
    pub fn view(&self) -> CellView<'_, T> {
        CellView { inner: self }
    }
}

impl<T: Clone + PartialEq + Default> Default for StateCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + PartialEq + fmt::Debug> fmt::Debug for StateCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateCell")
            .field("value", &self.get())
            .finish()
    }
}

/// A read-only view of a [`StateCell`].
///
/// Provides read and subscribe access without the ability to write. Useful
/// for exposing cells publicly while keeping the setter private.
pub struct CellView<'a, T> {
    inner: &'a StateCell<T>,
}

impl<'a, T: Clone + PartialEq> CellView<'a, T> {
    /// Get the current value.
    pub fn get(&self) -> T {
        self.inner.get()
    }

    /// Access the value through a closure.
    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        self.inner.with(f)
    }

    /// Connect a slot invoked after each actual change.
    pub fn on_change<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.inner.on_change(slot)
    }

    /// The underlying change signal.
    pub fn changed(&self) -> &'a Signal<T> {
        &self.inner.changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_set_detects_change() {
        let cell = StateCell::new(10);

        assert!(!cell.set(10));
        assert!(cell.set(20));
        assert_eq!(cell.get(), 20);
    }

    #[test]
    fn test_change_signal_fires_only_on_actual_change() {
        let cell = StateCell::new(false);
        let emissions = Arc::new(Mutex::new(Vec::new()));

        let emissions_clone = emissions.clone();
        cell.on_change(move |&v| {
            emissions_clone.lock().push(v);
        });

        cell.set(true);
        cell.set(true);
        cell.set(false);
        cell.set(false);

        assert_eq!(*emissions.lock(), vec![true, false]);
    }

    #[test]
    fn test_set_silent() {
        let cell = StateCell::new(1);
        let fired = Arc::new(Mutex::new(false));

        let fired_clone = fired.clone();
        cell.on_change(move |_| {
            *fired_clone.lock() = true;
        });

        cell.set_silent(2);
        assert_eq!(cell.get(), 2);
        assert!(!*fired.lock());
    }

    #[test]
    fn test_replace() {
        let cell = StateCell::new("hello".to_string());

        assert!(cell.replace("hello".to_string()).is_none());
        assert_eq!(cell.replace("world".to_string()), Some("hello".to_string()));
        assert_eq!(cell.get(), "world");
    }

    #[test]
    fn test_with_closure() {
        let cell = StateCell::new(vec![1, 2, 3]);
        let sum: i32 = cell.with(|v| v.iter().sum());
        assert_eq!(sum, 6);
    }

    #[test]
    fn test_view_is_read_only_access() {
        let cell = StateCell::new(42);
        let view = cell.view();

        assert_eq!(view.get(), 42);
        cell.set(100);
        assert_eq!(view.get(), 100);
    }
}
