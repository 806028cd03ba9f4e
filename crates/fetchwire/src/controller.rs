//! The request-lifecycle controller.
//!
//! [`FetchController`] owns one declarative HTTP call: it resolves a
//! [`RequestDescriptor`] per invocation, encodes the payload, executes the
//! exchange, routes the outcome through success/error mappers, dispatches
//! status-matched side effects, and tracks the whole lifecycle in three
//! reactive state cells (`loading`, `data`, `error`).
//!
//! # Example
//!
//! ```ignore
//! use fetchwire::{FetchController, FetchOverrides, HttpMethod, RequestDescriptor};
//! use serde_json::Value;
//!
//! let controller = FetchController::<Value, Value>::builder(|_query| async move {
//!     Ok(RequestDescriptor::new(HttpMethod::Get, "https://api.example.com/users"))
//! })
//! .map_success(|body| async move { body })
//! .map_error(|err| async move { err.into_value() })
//! .run_on_build(true)
//! .build()?;
//!
//! controller.data().on_change(|users| println!("users: {users:?}"));
//!
//! // Later, repeat the call with a different query.
//! controller
//!     .reinvoke(FetchOverrides::new().query(serde_json::json!({"page": 2})))
//!     .await;
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use fetchwire_core::{CellView, StateCell};
use futures_util::future::BoxFuture;
use serde_json::Value;

use crate::body::{EncodingMode, default_headers, encode_body};
use crate::descriptor::{ContextSource, DescriptorFn, RequestDescriptor, StatusAction, merge_query};
use crate::error::{FetchError, Result};
use crate::throttle::ThrottleGate;
use crate::transport::{Outcome, Transport};

/// Maps a deserialized success body to the value exposed as `data`.
pub type SuccessMapper<T> = Arc<dyn Fn(Value) -> BoxFuture<'static, T> + Send + Sync>;

/// Maps a failure (response body or transport error) to the value exposed
/// as `error`.
pub type ErrorMapper<E> = Arc<dyn Fn(ErrorPayload) -> BoxFuture<'static, E> + Send + Sync>;

/// What the error mapper receives.
#[derive(Debug)]
pub enum ErrorPayload {
    /// A well-formed response whose status failed the ok predicate; carries
    /// the deserialized body.
    Body(Value),
    /// The exchange itself failed; carries the raw error, since no
    /// deserialized body exists.
    Transport(FetchError),
}

impl ErrorPayload {
    /// Collapse the payload into a JSON value: response bodies pass through
    /// unchanged, transport errors render as their message string.
    pub fn into_value(self) -> Value {
        match self {
            Self::Body(body) => body,
            Self::Transport(err) => Value::String(err.to_string()),
        }
    }
}

/// Per-invocation overrides for [`FetchController::reinvoke`].
///
/// Every omitted field defaults to the value the controller was configured
/// with.
pub struct FetchOverrides<T, E> {
    /// Loading flag set while the call is in flight.
    pub loading: Option<bool>,
    /// Payload replacing the configured default for this call.
    pub payload: Option<Value>,
    /// Query replacing the configured default for this call.
    pub query: Option<Value>,
    /// Success mapper replacing the configured default for this call.
    pub success_mapper: Option<SuccessMapper<T>>,
    /// Error mapper replacing the configured default for this call.
    pub error_mapper: Option<ErrorMapper<E>>,
}

impl<T, E> Default for FetchOverrides<T, E> {
    fn default() -> Self {
        Self {
            loading: None,
            payload: None,
            query: None,
            success_mapper: None,
            error_mapper: None,
        }
    }
}

impl<T, E> FetchOverrides<T, E> {
    /// Create an empty overrides bundle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the loading flag set while the call is in flight.
    pub fn loading(mut self, loading: bool) -> Self {
        self.loading = Some(loading);
        self
    }

    /// Override the payload for this call.
    pub fn payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Override the query for this call.
    pub fn query(mut self, query: Value) -> Self {
        self.query = Some(query);
        self
    }

    /// Override the success mapper for this call.
    pub fn map_success<F, Fut>(mut self, mapper: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        self.success_mapper = Some(Arc::new(move |body| Box::pin(mapper(body))));
        self
    }

    /// Override the error mapper for this call.
    pub fn map_error<F, Fut>(mut self, mapper: F) -> Self
    where
        F: Fn(ErrorPayload) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = E> + Send + 'static,
    {
        self.error_mapper = Some(Arc::new(move |err| Box::pin(mapper(err))));
        self
    }
}

impl<T, E> std::fmt::Debug for FetchOverrides<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchOverrides")
            .field("loading", &self.loading)
            .field("payload", &self.payload)
            .field("query", &self.query)
            .field("has_success_mapper", &self.success_mapper.is_some())
            .field("has_error_mapper", &self.error_mapper.is_some())
            .finish()
    }
}

struct ControllerInner<T, E> {
    transport: Transport,
    descriptor_fn: DescriptorFn,
    mode: EncodingMode,
    default_query: Option<Value>,
    default_payload: Option<Value>,
    success_mapper: SuccessMapper<T>,
    error_mapper: ErrorMapper<E>,
    context: Option<ContextSource>,
    initial_loading: bool,
    throttle: ThrottleGate,
    throttle_window: Option<Duration>,
    /// Monotonic call counter; settlements publish state only when no newer
    /// call has started since they began.
    generation: AtomicU64,
    loading: StateCell<bool>,
    data: StateCell<Option<T>>,
    error: StateCell<Option<E>>,
}

/// A reusable request-lifecycle controller for one declarative HTTP call.
///
/// Cheaply cloneable; clones share state cells, throttle gate, and
/// transport. Construct with [`FetchController::builder`].
pub struct FetchController<T, E> {
    inner: Arc<ControllerInner<T, E>>,
}

impl<T, E> Clone for FetchController<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T, E> FetchController<T, E>
where
    T: Clone + PartialEq + Send + Sync + 'static,
    E: Clone + PartialEq + Send + Sync + 'static,
{
    /// Create a builder around the descriptor-producing callback.
    ///
    /// The callback is invoked once per call with the merged query object
    /// and returns the declarative shape of that call.
    pub fn builder<F, Fut>(descriptor: F) -> FetchControllerBuilder<T, E>
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<RequestDescriptor>> + Send + 'static,
    {
        FetchControllerBuilder::new(Arc::new(move |query| Box::pin(descriptor(query))))
    }

    /// Read-only view of the loading flag.
    pub fn loading(&self) -> CellView<'_, bool> {
        self.inner.loading.view()
    }

    /// Read-only view of the last successful transformed result.
    pub fn data(&self) -> CellView<'_, Option<T>> {
        self.inner.data.view()
    }

    /// Read-only view of the last transformed error.
    pub fn error(&self) -> CellView<'_, Option<E>> {
        self.inner.error.view()
    }

    /// Repeat the call, overriding any subset of the configured parameters.
    ///
    /// First consults the throttle gate: a suppressed invocation is a
    /// complete no-op (no state writes, no network call). Otherwise the
    /// loading flag is set to the override (else the configured
    /// initial-loading flag) and the full resolve, encode, invoke,
    /// transform pipeline runs with the overrides applied.
    pub async fn reinvoke(&self, overrides: FetchOverrides<T, E>) {
        if self
            .inner
            .throttle
            .should_suppress(self.inner.throttle_window)
        {
            tracing::debug!(
                target: "fetchwire::controller",
                "invocation suppressed by throttle gate"
            );
            return;
        }

        let loading = overrides.loading.unwrap_or(self.inner.initial_loading);
        self.inner.loading.set(loading);
        self.run(overrides).await;
    }

    /// Drive one full call. The loading reset is the last step regardless
    /// of branch; a stale call (a newer one started meanwhile) publishes
    /// nothing.
    pub(crate) async fn run(&self, overrides: FetchOverrides<T, E>) {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.drive(generation, overrides).await;
        if self.current(generation) {
            self.inner.loading.set(false);
        }
    }

    async fn drive(&self, generation: u64, overrides: FetchOverrides<T, E>) {
        let FetchOverrides {
            payload,
            query,
            success_mapper,
            error_mapper,
            ..
        } = overrides;
        let success_mapper = success_mapper.unwrap_or_else(|| self.inner.success_mapper.clone());
        let error_mapper = error_mapper.unwrap_or_else(|| self.inner.error_mapper.clone());

        // Resolve the descriptor from the merged query plus context snapshot.
        let context = self.inner.context.as_ref().and_then(|source| source());
        let merged = merge_query(
            query.as_ref().or(self.inner.default_query.as_ref()),
            context,
        );
        let descriptor = match (self.inner.descriptor_fn)(merged).await {
            Ok(descriptor) => descriptor,
            Err(err) => {
                return self
                    .settle_error(generation, ErrorPayload::Transport(err), None, &error_mapper)
                    .await;
            }
        };
        tracing::trace!(
            target: "fetchwire::controller",
            method = %descriptor.method,
            url = %descriptor.full_url,
            "descriptor resolved"
        );

        // Header selection: descriptor overrides replace the mode defaults
        // wholesale; a token mutates whichever map was selected.
        let mut headers = descriptor
            .custom_headers
            .clone()
            .unwrap_or_else(|| default_headers(self.inner.mode));
        if let Some(token) = &descriptor.token {
            headers.insert("Authorization".to_string(), token.clone());
        }

        let payload = payload.as_ref().or(self.inner.default_payload.as_ref());
        let body = match encode_body(self.inner.mode, descriptor.method, payload).await {
            Ok(body) => body,
            Err(err) => {
                return self
                    .settle_error(generation, ErrorPayload::Transport(err), None, &error_mapper)
                    .await;
            }
        };

        let outcome = self
            .inner
            .transport
            .execute(descriptor.method, &descriptor.full_url, &headers, body)
            .await;

        match outcome {
            Outcome::Response {
                status,
                ok: true,
                body,
            } => {
                let value = success_mapper(body).await;
                for action in &descriptor.on_success {
                    if action.code == status {
                        action.run().await;
                    }
                }
                if self.current(generation) {
                    self.inner.data.set(Some(value));
                    self.inner.error.set(None);
                } else {
                    tracing::debug!(
                        target: "fetchwire::controller",
                        status,
                        "discarding stale success settlement"
                    );
                }
            }
            Outcome::Response {
                status,
                ok: false,
                body,
            } => {
                self.settle_error(
                    generation,
                    ErrorPayload::Body(body),
                    Some((status, &descriptor.on_error)),
                    &error_mapper,
                )
                .await;
            }
            Outcome::Failed(err) => {
                self.settle_error(generation, ErrorPayload::Transport(err), None, &error_mapper)
                    .await;
            }
        }
    }

    /// Map the failure, run any status-matched error actions, then publish
    /// `error` and clear `data`. Transport-level failures carry no status,
    /// so no actions can match them.
    async fn settle_error(
        &self,
        generation: u64,
        payload: ErrorPayload,
        status_actions: Option<(u16, &[StatusAction])>,
        mapper: &ErrorMapper<E>,
    ) {
        let value = mapper(payload).await;
        if let Some((status, actions)) = status_actions {
            for action in actions {
                if action.code == status {
                    action.run().await;
                }
            }
        }
        if self.current(generation) {
            self.inner.error.set(Some(value));
            self.inner.data.set(None);
        } else {
            tracing::debug!(
                target: "fetchwire::controller",
                "discarding stale error settlement"
            );
        }
    }

    fn current(&self, generation: u64) -> bool {
        self.inner.generation.load(Ordering::SeqCst) == generation
    }
}

impl<T, E> std::fmt::Debug for FetchController<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchController")
            .field("mode", &self.inner.mode)
            .field("initial_loading", &self.inner.initial_loading)
            .field("throttle_window", &self.inner.throttle_window)
            .field("has_context", &self.inner.context.is_some())
            .finish()
    }
}

/// Builder for a [`FetchController`].
pub struct FetchControllerBuilder<T, E> {
    descriptor_fn: DescriptorFn,
    mode: EncodingMode,
    query: Option<Value>,
    payload: Option<Value>,
    success_mapper: Option<SuccessMapper<T>>,
    error_mapper: Option<ErrorMapper<E>>,
    context: Option<ContextSource>,
    initial_loading: bool,
    run_on_build: bool,
    throttle_window: Option<Duration>,
    throttle_gate: Option<ThrottleGate>,
    transport: Option<Transport>,
}

impl<T, E> FetchControllerBuilder<T, E>
where
    T: Clone + PartialEq + Send + Sync + 'static,
    E: Clone + PartialEq + Send + Sync + 'static,
{
    fn new(descriptor_fn: DescriptorFn) -> Self {
        Self {
            descriptor_fn,
            mode: EncodingMode::Structured,
            query: None,
            payload: None,
            success_mapper: None,
            error_mapper: None,
            context: None,
            initial_loading: false,
            run_on_build: false,
            throttle_window: None,
            throttle_gate: None,
            transport: None,
        }
    }

    /// Set the body encoding mode (structured JSON by default).
    pub fn mode(mut self, mode: EncodingMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the default query passed to the descriptor callback.
    pub fn query(mut self, query: Value) -> Self {
        self.query = Some(query);
        self
    }

    /// Set the default outgoing payload.
    pub fn payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Set the default success mapper (required).
    pub fn map_success<F, Fut>(mut self, mapper: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        self.success_mapper = Some(Arc::new(move |body| Box::pin(mapper(body))));
        self
    }

    /// Set the default error mapper (required).
    pub fn map_error<F, Fut>(mut self, mapper: F) -> Self
    where
        F: Fn(ErrorPayload) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = E> + Send + 'static,
    {
        self.error_mapper = Some(Arc::new(move |err| Box::pin(mapper(err))));
        self
    }

    /// Install a context source whose snapshot is merged into every query
    /// under `"contextData"`.
    pub fn context_source<F>(mut self, source: F) -> Self
    where
        F: Fn() -> Option<Value> + Send + Sync + 'static,
    {
        self.context = Some(Arc::new(source));
        self
    }

    /// Set the loading flag's initial value, also used as the default
    /// loading override on re-invocation.
    pub fn initial_loading(mut self, loading: bool) -> Self {
        self.initial_loading = loading;
        self
    }

    /// Run the call once as soon as the controller is built, with no
    /// overrides and no throttle consultation. Requires an ambient tokio
    /// runtime.
    pub fn run_on_build(mut self, run: bool) -> Self {
        self.run_on_build = run;
        self
    }

    /// Set the cooldown window consulted on every re-invocation.
    pub fn throttle_window(mut self, window: Duration) -> Self {
        self.throttle_window = Some(window);
        self
    }

    /// Install a shared throttle gate (from a
    /// [`ThrottleRegistry`](crate::ThrottleRegistry)) instead of the
    /// controller's private one.
    pub fn throttle_gate(mut self, gate: ThrottleGate) -> Self {
        self.throttle_gate = Some(gate);
        self
    }

    /// Use a custom transport instead of one with default configuration.
    pub fn transport(mut self, transport: Transport) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Build the controller.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Config`] when either mapper is missing, and
    /// propagates transport construction failures.
    pub fn build(self) -> Result<FetchController<T, E>> {
        let success_mapper = self
            .success_mapper
            .ok_or_else(|| FetchError::Config("success mapper is required".to_string()))?;
        let error_mapper = self
            .error_mapper
            .ok_or_else(|| FetchError::Config("error mapper is required".to_string()))?;
        let transport = match self.transport {
            Some(transport) => transport,
            None => Transport::builder().build()?,
        };

        let controller = FetchController {
            inner: Arc::new(ControllerInner {
                transport,
                descriptor_fn: self.descriptor_fn,
                mode: self.mode,
                default_query: self.query,
                default_payload: self.payload,
                success_mapper,
                error_mapper,
                context: self.context,
                initial_loading: self.initial_loading,
                throttle: self.throttle_gate.unwrap_or_default(),
                throttle_window: self.throttle_window,
                generation: AtomicU64::new(0),
                loading: StateCell::new(self.initial_loading),
                data: StateCell::new(None),
                error: StateCell::new(None),
            }),
        };

        if self.run_on_build {
            let spawned = controller.clone();
            tokio::spawn(async move {
                spawned.run(FetchOverrides::default()).await;
            });
        }

        Ok(controller)
    }
}

impl<T, E> std::fmt::Debug for FetchControllerBuilder<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchControllerBuilder")
            .field("mode", &self.mode)
            .field("initial_loading", &self.initial_loading)
            .field("run_on_build", &self.run_on_build)
            .field("throttle_window", &self.throttle_window)
            .finish()
    }
}
