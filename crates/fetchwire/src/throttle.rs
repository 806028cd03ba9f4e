//! Per-call throttle gate.
//!
//! A [`ThrottleGate`] suppresses repeated invocations within a cooldown
//! window. Each controller owns its own gate by default, so unrelated
//! controllers can never collide. Controllers that should share suppression
//! state obtain their gates from one [`ThrottleRegistry`] under an explicit
//! key.
//!
//! The window is tracked as an expiry instant checked on the next call
//! rather than a background timer; a suppressed call never extends or
//! resets an open window.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

type Slot = Arc<Mutex<Option<Instant>>>;

/// A keyed cooldown gate for request invocations.
///
/// The gate never errors; it only reports whether an invocation must be
/// suppressed.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use fetchwire::ThrottleGate;
///
/// let gate = ThrottleGate::new();
/// let window = Some(Duration::from_millis(200));
///
/// assert!(!gate.should_suppress(window)); // opens the window
/// assert!(gate.should_suppress(window));  // still inside it
/// assert!(!gate.should_suppress(None));   // no window configured, never throttled
/// ```
#[derive(Clone, Debug)]
pub struct ThrottleGate {
    slot: Slot,
}

impl Default for ThrottleGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ThrottleGate {
    /// Create a private gate with no open window.
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
        }
    }

    /// Report whether an invocation right now must be suppressed.
    ///
    /// With no window (`None` or zero duration) this always returns `false`.
    /// Otherwise the first call opens a window lasting `window` and returns
    /// `false`; calls made while the window is open return `true` without
    /// extending it.
    pub fn should_suppress(&self, window: Option<Duration>) -> bool {
        let Some(window) = window else {
            return false;
        };
        if window.is_zero() {
            return false;
        }

        let mut slot = self.slot.lock();
        let now = Instant::now();
        match *slot {
            Some(expiry) if now < expiry => true,
            _ => {
                *slot = Some(now + window);
                false
            }
        }
    }

    /// Close any open window immediately.
    pub fn reset(&self) {
        *self.slot.lock() = None;
    }
}

/// A registry handing out gates that share suppression state by key.
///
/// Two gates obtained from the same registry under the same key share one
/// window; gates from different keys (or different registries) are
/// independent.
#[derive(Default)]
pub struct ThrottleRegistry {
    slots: Mutex<HashMap<String, Slot>>,
}

impl ThrottleRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the gate for `key`, creating its slot on first use.
    pub fn gate(&self, key: impl Into<String>) -> ThrottleGate {
        let slot = self
            .slots
            .lock()
            .entry(key.into())
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .clone();
        ThrottleGate { slot }
    }
}

impl std::fmt::Debug for ThrottleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThrottleRegistry")
            .field("keys", &self.slots.lock().len())
            .finish()
    }
}
