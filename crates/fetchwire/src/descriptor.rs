//! Per-call request descriptors.
//!
//! A [`RequestDescriptor`] is the declarative shape of one HTTP call:
//! method, URL, optional header overrides, optional auth token, and two
//! ordered status-action tables. Descriptors are produced fresh for every
//! invocation by the controller's descriptor callback and live for exactly
//! one call.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde_json::{Map, Value};

use crate::error::Result;

/// HTTP request methods.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// HTTP GET method.
    Get,
    /// HTTP POST method.
    Post,
    /// HTTP PUT method.
    Put,
    /// HTTP DELETE method.
    Delete,
    /// HTTP PATCH method.
    Patch,
    /// HTTP HEAD method.
    Head,
    /// HTTP OPTIONS method.
    Options,
}

impl HttpMethod {
    /// Convert to reqwest method.
    pub(crate) fn to_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Delete => reqwest::Method::DELETE,
            Self::Patch => reqwest::Method::PATCH,
            Self::Head => reqwest::Method::HEAD,
            Self::Options => reqwest::Method::OPTIONS,
        }
    }

    /// Whether requests with this method carry a body.
    ///
    /// GET and DELETE requests are sent without a body regardless of any
    /// configured payload.
    pub fn has_body(self) -> bool {
        !matches!(self, Self::Get | Self::Delete)
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Put => write!(f, "PUT"),
            Self::Delete => write!(f, "DELETE"),
            Self::Patch => write!(f, "PATCH"),
            Self::Head => write!(f, "HEAD"),
            Self::Options => write!(f, "OPTIONS"),
        }
    }
}

type ActionFn = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// One entry of a status-action table: a side effect to run when the
/// response carries a matching status code.
///
/// Matching entries run sequentially in table order, each awaited before
/// the next.
#[derive(Clone)]
pub struct StatusAction {
    /// The HTTP status code this action responds to.
    pub code: u16,
    action: ActionFn,
}

impl StatusAction {
    /// Create an action for the given status code.
    pub fn new<F, Fut>(code: u16, action: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            code,
            action: Arc::new(move || Box::pin(action())),
        }
    }

    /// Run the side effect.
    pub(crate) async fn run(&self) {
        (self.action)().await;
    }
}

impl std::fmt::Debug for StatusAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusAction")
            .field("code", &self.code)
            .finish()
    }
}

/// The declarative shape of one HTTP call.
///
/// # Example
///
/// ```
/// use fetchwire::{HttpMethod, RequestDescriptor, StatusAction};
///
/// let descriptor = RequestDescriptor::new(HttpMethod::Post, "https://api.example.com/users")
///     .token("secret")
///     .on_success(StatusAction::new(201, || async { println!("created") }));
/// ```
#[derive(Clone, Debug)]
pub struct RequestDescriptor {
    /// The HTTP method.
    pub method: HttpMethod,
    /// The absolute request URL.
    pub full_url: String,
    /// Header map replacing the mode's defaults when present.
    pub custom_headers: Option<HashMap<String, String>>,
    /// Raw `Authorization` header value injected when present.
    pub token: Option<String>,
    /// Actions dispatched against the status of an ok response, in order.
    pub on_success: Vec<StatusAction>,
    /// Actions dispatched against the status of a non-ok response, in order.
    pub on_error: Vec<StatusAction>,
}

impl RequestDescriptor {
    /// Create a descriptor with the given method and URL.
    pub fn new(method: HttpMethod, full_url: impl Into<String>) -> Self {
        Self {
            method,
            full_url: full_url.into(),
            custom_headers: None,
            token: None,
            on_success: Vec::new(),
            on_error: Vec::new(),
        }
    }

    /// Add a custom header, replacing the mode's default header map.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_headers
            .get_or_insert_with(HashMap::new)
            .insert(name.into(), value.into());
        self
    }

    /// Replace the header map wholesale.
    pub fn headers(mut self, headers: HashMap<String, String>) -> Self {
        self.custom_headers = Some(headers);
        self
    }

    /// Set the raw `Authorization` header value.
    ///
    /// The value is sent verbatim; include a `Bearer ` prefix yourself if
    /// the server expects one.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Append an entry to the success status-action table.
    pub fn on_success(mut self, action: StatusAction) -> Self {
        self.on_success.push(action);
        self
    }

    /// Append an entry to the error status-action table.
    pub fn on_error(mut self, action: StatusAction) -> Self {
        self.on_error.push(action);
        self
    }
}

/// The descriptor-producing callback: invoked once per call with the merged
/// query object.
pub type DescriptorFn =
    Arc<dyn Fn(Value) -> BoxFuture<'static, Result<RequestDescriptor>> + Send + Sync>;

/// Read accessor for the ambient context snapshot merged into each query.
pub type ContextSource = Arc<dyn Fn() -> Option<Value> + Send + Sync>;

/// Produce the query passed to the descriptor callback.
///
/// The caller's query is never mutated: an object query is shallow-copied
/// and the context snapshot (when present) inserted under `"contextData"`;
/// with no query, an object carrying only the context key is produced. A
/// non-object query passes through unchanged, since there is nowhere to
/// attach the key.
pub(crate) fn merge_query(query: Option<&Value>, context: Option<Value>) -> Value {
    let mut map = match query {
        Some(Value::Object(map)) => map.clone(),
        Some(other) => return other.clone(),
        None => Map::new(),
    };
    if let Some(snapshot) = context {
        map.insert("contextData".to_string(), snapshot);
    }
    Value::Object(map)
}
