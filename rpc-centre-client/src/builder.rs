//! Client builder for the rpc-centre client.
//!
//! Provides a fluent API for configuring and building an [`RpcClient`].

use std::sync::Arc;
use std::time::Duration;

use http::{HeaderMap, HeaderName, HeaderValue};

use crate::client::RpcClient;
use crate::config::{ClientPolicy, ConfigProvider};
use crate::resolver::{EndpointCache, EndpointResolver};
use crate::transport::{HyperTransport, HyperTransportBuilder, Transport};

/// Anything the builder can turn into a [`Transport`].
///
/// Implemented for [`HyperTransportBuilder`] (built lazily in
/// [`ClientBuilder::build`]) and for every ready-made [`Transport`].
pub trait IntoTransport {
    type Transport: Transport;

    fn into_transport(self) -> Result<Self::Transport, ClientBuildError>;
}

impl IntoTransport for HyperTransportBuilder {
    type Transport = HyperTransport;

    fn into_transport(self) -> Result<HyperTransport, ClientBuildError> {
        self.build()
    }
}

impl<T: Transport> IntoTransport for T {
    type Transport = T;

    fn into_transport(self) -> Result<T, ClientBuildError> {
        Ok(self)
    }
}

/// Builder for creating an [`RpcClient`].
///
/// # Example
///
/// ```ignore
/// use rpc_centre_client::{ClientPolicy, EndpointConfig, RpcClient};
/// use std::time::Duration;
///
/// let client = RpcClient::builder(EndpointConfig::new("rpc.internal").port(8080))
///     .policy(ClientPolicy::rpc())
///     .timeout(Duration::from_secs(3))
///     .build()?;
/// ```
pub struct ClientBuilder<T = HyperTransportBuilder> {
    /// Where services live.
    provider: Arc<dyn ConfigProvider>,
    /// Transport, or a recipe for one.
    transport: T,
    /// Behavior switches.
    policy: ClientPolicy,
    /// Headers added to every request before the protocol headers.
    default_headers: HeaderMap,
    /// Deadline for one round trip.
    timeout: Option<Duration>,
    /// Cache shared with other clients, if any.
    cache: Option<Arc<EndpointCache>>,
}

impl<T> std::fmt::Debug for ClientBuilder<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("policy", &self.policy)
            .field("default_headers", &self.default_headers)
            .field("timeout", &self.timeout)
            .field("shared_cache", &self.cache.is_some())
            .finish_non_exhaustive()
    }
}

impl ClientBuilder {
    /// Create a builder reading endpoints from `provider`.
    pub fn new<P: ConfigProvider + 'static>(provider: P) -> Self {
        Self::with_provider(Arc::new(provider))
    }

    /// Create a builder from an already shared provider.
    pub fn with_provider(provider: Arc<dyn ConfigProvider>) -> Self {
        Self {
            provider,
            transport: HyperTransportBuilder::new(),
            policy: ClientPolicy::default(),
            default_headers: HeaderMap::new(),
            timeout: None,
            cache: None,
        }
    }

    /// Configure the default hyper transport (pooling, TLS).
    pub fn transport_options<F>(mut self, configure: F) -> Self
    where
        F: FnOnce(HyperTransportBuilder) -> HyperTransportBuilder,
    {
        self.transport = configure(self.transport);
        self
    }
}

impl<T> ClientBuilder<T> {
    /// Use a different transport.
    ///
    /// Accepts a ready [`Transport`] or a [`HyperTransportBuilder`].
    pub fn with_transport<U: IntoTransport>(self, transport: U) -> ClientBuilder<U> {
        ClientBuilder {
            provider: self.provider,
            transport,
            policy: self.policy,
            default_headers: self.default_headers,
            timeout: self.timeout,
            cache: self.cache,
        }
    }

    pub fn policy(mut self, policy: ClientPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set a deadline for each round trip.
    ///
    /// A call that does not complete in time fails with
    /// [`RpcError::Timeout`](crate::RpcError::Timeout). The request may
    /// still have reached the service.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Add a header to every request.
    ///
    /// `Content-Type` is always replaced by `application/json`, and the
    /// default policy drops `Accept`/`Accept-Encoding` again.
    pub fn default_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.default_headers.append(name, value);
        self
    }

    /// Share an endpoint cache with other clients.
    ///
    /// Without one, each built client owns a fresh cache.
    pub fn endpoint_cache(mut self, cache: Arc<EndpointCache>) -> Self {
        self.cache = Some(cache);
        self
    }
}

impl<T: IntoTransport> ClientBuilder<T> {
    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport cannot be created.
    pub fn build(self) -> Result<RpcClient<T::Transport>, ClientBuildError> {
        let transport = self.transport.into_transport()?;
        let cache = self.cache.unwrap_or_default();
        let resolver = EndpointResolver::new(self.provider, cache);

        Ok(RpcClient::new(
            transport,
            resolver,
            self.policy,
            self.default_headers,
            self.timeout,
        ))
    }
}

/// Error building an [`RpcClient`].
#[derive(Debug, thiserror::Error)]
pub enum ClientBuildError {
    /// Failed to set up TLS.
    #[error("failed to configure TLS: {0}")]
    Tls(String),
}
