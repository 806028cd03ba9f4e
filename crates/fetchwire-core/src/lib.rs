//! Reactive primitives for fetchwire.
//!
//! This crate provides the two building blocks the request controller's
//! lifecycle state is made of:
//!
//! - [`Signal`] - a type-safe observer list with keyed connections
//! - [`StateCell`] - a value paired with a change signal, with idempotent writes
//!
//! # Example
//!
//! ```
//! use fetchwire_core::StateCell;
//!
//! let loading = StateCell::new(false);
//! loading.on_change(|v| println!("loading: {v}"));
//!
//! assert!(loading.set(true));   // stored, signal fired
//! assert!(!loading.set(true));  // no-op, nothing fired
//! ```

mod cell;
mod signal;

pub use cell::{CellView, StateCell};
pub use signal::{ConnectionId, Signal};
