//! Hyper-based HTTP transport.
//!
//! This module provides [`HyperTransport`], the default [`Transport`]
//! implementation using hyper_util's legacy client.

use std::error::Error as _;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use futures::future::BoxFuture;
use http_body_util::{BodyExt, Full};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::{Client, connect::HttpConnector};
use hyper_util::rt::{TokioExecutor, TokioTimer};
use rpc_centre_core::RpcError;
use rustls::ClientConfig;
use tower_service::Service;

use super::connector::{build_https_connector, default_tls_config};
use super::{RawResponse, Transport};
use crate::builder::ClientBuildError;

/// Type alias for the hyper client with HTTPS connector.
type HyperClient = Client<HttpsConnector<HttpConnector>, Full<Bytes>>;

/// HTTP transport using hyper_util's legacy client.
///
/// Provides HTTP/1.1 and HTTP/2 with TLS, connection pooling, and automatic
/// protocol negotiation via ALPN.
///
/// # Example
///
/// ```ignore
/// use rpc_centre_client::{RpcClient, transport::HyperTransport};
///
/// let transport = HyperTransport::builder()
///     .pool_max_idle_per_host(8)
///     .build()?;
///
/// let client = RpcClient::builder(config)
///     .with_transport(transport)
///     .build()?;
/// ```
#[derive(Clone)]
pub struct HyperTransport {
    client: HyperClient,
}

impl std::fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransport").finish_non_exhaustive()
    }
}

impl HyperTransport {
    /// Create a new transport builder.
    pub fn builder() -> HyperTransportBuilder {
        HyperTransportBuilder::new()
    }

    /// Create a new transport with default settings.
    pub fn new() -> Result<Self, ClientBuildError> {
        Self::builder().build()
    }

    /// Send a request and collect the full response body.
    pub async fn request(&self, request: http::Request<Bytes>) -> Result<RawResponse, RpcError> {
        execute(self.client.clone(), request).await
    }
}

async fn execute(client: HyperClient, request: http::Request<Bytes>) -> Result<RawResponse, RpcError> {
    let response = client
        .request(request.map(Full::new))
        .await
        .map_err(|e| {
            if e.is_connect() {
                RpcError::Timeout(format!("connect failed: {}", describe(&e)))
            } else {
                RpcError::Unknown(format!("request failed: {}", describe(&e)))
            }
        })?;

    let (parts, body) = response.into_parts();
    let body = body
        .collect()
        .await
        .map_err(|e| RpcError::Unknown(format!("failed to read response body: {}", e)))?
        .to_bytes();

    Ok(RawResponse {
        status: parts.status,
        headers: parts.headers,
        body,
    })
}

/// Error message including its innermost source, which carries the
/// actual cause (e.g. "Connection refused") for hyper_util errors.
fn describe(err: &hyper_util::client::legacy::Error) -> String {
    let mut source = err.source();
    let mut innermost = None;
    while let Some(cause) = source {
        innermost = Some(cause);
        source = cause.source();
    }
    match innermost {
        Some(cause) => format!("{}: {}", err, cause),
        None => err.to_string(),
    }
}

impl Transport for HyperTransport {
    fn send(&self, request: http::Request<Bytes>) -> BoxFuture<'_, Result<RawResponse, RpcError>> {
        Box::pin(self.request(request))
    }
}

/// Builder for [`HyperTransport`].
///
/// # Example
///
/// ```ignore
/// use rpc_centre_client::transport::HyperTransportBuilder;
/// use std::time::Duration;
///
/// let transport = HyperTransportBuilder::new()
///     .pool_idle_timeout(Duration::from_secs(90))
///     .build()?;
/// ```
pub struct HyperTransportBuilder {
    /// Custom TLS configuration.
    tls_config: Option<ClientConfig>,
    /// Force HTTP/2 only (h2c).
    http2_only: bool,
    /// Connection pool idle timeout.
    pool_idle_timeout: Option<Duration>,
    /// Maximum idle connections per host.
    pool_max_idle_per_host: usize,
}

impl Default for HyperTransportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HyperTransportBuilder {
    pub fn new() -> Self {
        Self {
            tls_config: None,
            http2_only: false,
            pool_idle_timeout: Some(Duration::from_secs(90)),
            pool_max_idle_per_host: 32,
        }
    }

    /// Set a custom TLS configuration (custom roots, client certificates).
    pub fn tls_config(mut self, config: ClientConfig) -> Self {
        self.tls_config = Some(config);
        self
    }

    /// Use HTTP/2 without the HTTP/1.1 upgrade handshake.
    pub fn http2_only(mut self, enabled: bool) -> Self {
        self.http2_only = enabled;
        self
    }

    /// Set the connection pool idle timeout.
    ///
    /// Default: 90 seconds.
    pub fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = Some(timeout);
        self
    }

    /// Set the maximum number of idle connections per host.
    ///
    /// Default: 32.
    pub fn pool_max_idle_per_host(mut self, max: usize) -> Self {
        self.pool_max_idle_per_host = max;
        self
    }

    /// Build the transport.
    ///
    /// # Errors
    ///
    /// Returns [`ClientBuildError::Tls`] if no TLS configuration was given
    /// and no crypto provider is available.
    pub fn build(self) -> Result<HyperTransport, ClientBuildError> {
        let tls_config = match self.tls_config {
            Some(config) => config,
            None => default_tls_config().ok_or_else(|| {
                ClientBuildError::Tls(
                    "no crypto provider: enable `tls-ring` or `tls-aws-lc`, \
                     or install one via CryptoProvider::install_default()"
                        .to_string(),
                )
            })?,
        };

        let mut builder = Client::builder(TokioExecutor::new());

        // Required for pool_idle_timeout to work
        builder.pool_timer(TokioTimer::new());

        if let Some(timeout) = self.pool_idle_timeout {
            builder.pool_idle_timeout(timeout);
        }
        builder.pool_max_idle_per_host(self.pool_max_idle_per_host);

        if self.http2_only {
            builder.http2_only(true);
        }

        let client = builder.build(build_https_connector(tls_config));

        Ok(HyperTransport { client })
    }
}

impl std::fmt::Debug for HyperTransportBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransportBuilder")
            .field("tls_config", &self.tls_config.is_some())
            .field("http2_only", &self.http2_only)
            .field("pool_idle_timeout", &self.pool_idle_timeout)
            .field("pool_max_idle_per_host", &self.pool_max_idle_per_host)
            .finish()
    }
}

// Implement tower::Service for HyperTransport
impl Service<http::Request<Bytes>> for HyperTransport {
    type Response = RawResponse;
    type Error = RpcError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // hyper_util legacy::Client is always ready
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<Bytes>) -> Self::Future {
        Box::pin(execute(self.client.clone(), req))
    }
}
