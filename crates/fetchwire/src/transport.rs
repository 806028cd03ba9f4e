//! HTTP transport.
//!
//! [`Transport`] wraps a shared `reqwest::Client` and turns one resolved
//! call (method, URL, headers, encoded body) into an [`Outcome`]. It never
//! panics and never propagates errors past its boundary: every failure mode
//! is folded into [`Outcome::Failed`] so the controller can route the raw
//! error value through the error mapper.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::body::EncodedBody;
use crate::descriptor::HttpMethod;
use crate::error::{FetchError, Result};

/// Configuration for the transport.
#[derive(Clone, Debug)]
pub struct TransportConfig {
    /// Request timeout.
    pub timeout: Option<Duration>,
    /// Connect timeout.
    pub connect_timeout: Option<Duration>,
    /// User agent sent with every request.
    pub user_agent: Option<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(30)),
            connect_timeout: Some(Duration::from_secs(10)),
            user_agent: Some(format!("fetchwire/{} (Rust)", env!("CARGO_PKG_VERSION"))),
        }
    }
}

/// Builder for a [`Transport`] with custom configuration.
#[derive(Debug, Default)]
pub struct TransportBuilder {
    config: TransportConfig,
}

impl TransportBuilder {
    /// Create a builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Disable the request timeout.
    pub fn no_timeout(mut self) -> Self {
        self.config.timeout = None;
        self
    }

    /// Set the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = Some(timeout);
        self
    }

    /// Set the user agent string.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = Some(user_agent.into());
        self
    }

    /// Build the transport.
    pub fn build(self) -> Result<Transport> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = self.config.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(connect_timeout) = self.config.connect_timeout {
            builder = builder.connect_timeout(connect_timeout);
        }
        if let Some(ref ua) = self.config.user_agent {
            builder = builder.user_agent(ua);
        }
        let client = builder.build()?;
        Ok(Transport {
            inner: Arc::new(TransportInner {
                client,
                config: self.config,
            }),
        })
    }
}

struct TransportInner {
    client: reqwest::Client,
    config: TransportConfig,
}

/// The classified result of one transport exchange.
#[derive(Debug)]
pub enum Outcome {
    /// The server answered and the body deserialized.
    Response {
        /// HTTP status code.
        status: u16,
        /// The transport's own success predicate (status in [200, 300)).
        /// This, not the body, decides the success/failure branch.
        ok: bool,
        /// The deserialized JSON body.
        body: Value,
    },
    /// The exchange failed before a usable response existed: network error,
    /// invalid URL or header, or a malformed (non-JSON) body.
    Failed(FetchError),
}

/// A thin HTTP invoker over a shared connection pool.
///
/// Cheaply cloneable; clones share the underlying client and configuration.
#[derive(Clone)]
pub struct Transport {
    inner: Arc<TransportInner>,
}

impl Default for Transport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport {
    /// Create a transport with default configuration.
    pub fn new() -> Self {
        TransportBuilder::new()
            .build()
            .expect("failed to create HTTP transport with default configuration")
    }

    /// Create a builder for configuring a new transport.
    pub fn builder() -> TransportBuilder {
        TransportBuilder::new()
    }

    /// Get the transport's configuration.
    pub fn config(&self) -> &TransportConfig {
        &self.inner.config
    }

    /// Issue one call and classify its outcome.
    pub async fn execute(
        &self,
        method: HttpMethod,
        url: &str,
        headers: &HashMap<String, String>,
        body: EncodedBody,
    ) -> Outcome {
        match self.try_execute(method, url, headers, body).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::debug!(target: "fetchwire::transport", %method, url, error = %err, "request failed");
                Outcome::Failed(err)
            }
        }
    }

    async fn try_execute(
        &self,
        method: HttpMethod,
        url: &str,
        headers: &HashMap<String, String>,
        body: EncodedBody,
    ) -> Result<Outcome> {
        let url = url::Url::parse(url)?;

        let mut builder = self.inner.client.request(method.to_reqwest(), url);
        for (name, value) in headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        match body {
            EncodedBody::None => {}
            EncodedBody::Json(value) => {
                builder = builder.json(&value);
            }
            EncodedBody::Multipart(form) => {
                builder = builder.multipart(form);
            }
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let ok = response.status().is_success();
        tracing::trace!(target: "fetchwire::transport", %method, status, ok, "response received");

        let body: Value = response.json().await?;
        Ok(Outcome::Response { status, ok, body })
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("config", &self.inner.config)
            .finish()
    }
}
