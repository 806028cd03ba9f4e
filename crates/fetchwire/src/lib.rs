//! Declarative HTTP request-lifecycle controller.
//!
//! fetchwire wraps one declarative HTTP call in a [`FetchController`] that
//! performs the call, tracks in-flight/loading status, transforms success
//! and failure bodies through caller-supplied mappers, dispatches
//! side-effect callbacks keyed by response status code, and exposes a
//! re-invocation entry point that can override any original parameter per
//! call, subject to a per-call throttle gate.
//!
//! # Building a controller
//!
//! ```ignore
//! use fetchwire::{FetchController, HttpMethod, RequestDescriptor, StatusAction};
//! use serde_json::Value;
//!
//! let controller = FetchController::<Value, Value>::builder(|query| async move {
//!     Ok(RequestDescriptor::new(HttpMethod::Get, "https://api.example.com/users")
//!         .token("secret-token")
//!         .on_success(StatusAction::new(200, || async { println!("listed") })))
//! })
//! .map_success(|body| async move { body })
//! .map_error(|err| async move { err.into_value() })
//! .run_on_build(true)
//! .build()?;
//! ```
//!
//! # Lifecycle state
//!
//! The controller exposes three reactive cells (`loading`, `data`, and
//! `error`) as read-only views. A successful settlement sets `data` and
//! clears `error`; a failure sets `error` and clears `data`; `loading` is
//! reset last in either case, and redundant writes are skipped so
//! dependents never recompute without an actual change:
//!
//! ```ignore
//! controller.loading().on_change(|&busy| println!("busy: {busy}"));
//! controller.data().on_change(|data| println!("data: {data:?}"));
//! ```
//!
//! # Re-invocation and throttling
//!
//! [`FetchController::reinvoke`] repeats the call with any subset of the
//! original parameters overridden. A configured throttle window suppresses
//! repeat invocations inside the cooldown; suppressed calls are complete
//! no-ops. Controllers that should share one cooldown obtain their gates
//! from a [`ThrottleRegistry`] under an explicit key.
//!
//! # Encoding modes
//!
//! Structured mode carries the payload as a JSON body; multipart mode
//! builds a `multipart/form-data` body whose sequence fields may mix file
//! attachments (elements with a `uri`) and serialized sub-objects. See
//! [`EncodingMode`].
//!
//! # What fetchwire does not do
//!
//! No caching, no deduplication beyond the throttle gate, no cancellation,
//! no retry. Callers build those on top of the mappers, status actions, and
//! change signals.

mod body;
mod controller;
mod descriptor;
mod error;
mod throttle;
mod transport;

pub use body::{EncodedBody, EncodingMode};
pub use controller::{
    ErrorMapper, ErrorPayload, FetchController, FetchControllerBuilder, FetchOverrides,
    SuccessMapper,
};
pub use descriptor::{ContextSource, DescriptorFn, HttpMethod, RequestDescriptor, StatusAction};
pub use error::{FetchError, Result};
pub use throttle::{ThrottleGate, ThrottleRegistry};
pub use transport::{Outcome, Transport, TransportBuilder, TransportConfig};

pub use fetchwire_core::{CellView, ConnectionId, Signal, StateCell};
