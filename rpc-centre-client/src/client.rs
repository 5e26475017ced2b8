//! The rpc-centre client.

use std::sync::Arc;
use std::time::Duration;

use http::HeaderMap;
use rpc_centre_core::{ParameterSet, Payload, RequestEnvelope, RpcError};
use serde::de::DeserializeOwned;

use crate::builder::ClientBuilder;
use crate::call::{RemoteMethod, RpcCall, ServiceIdentity};
use crate::config::{ClientPolicy, ConfigProvider};
use crate::request;
use crate::resolver::{Endpoint, EndpointResolver};
use crate::response::ResponseValidator;
use crate::transport::{HyperTransport, RawResponse, Transport};

/// Client for services speaking the rpc-centre envelope protocol.
///
/// Cloning is cheap: clones share the transport, the policy and the
/// endpoint cache.
///
/// Use [`ClientBuilder`] or [`RpcClient::builder`] to create an instance.
///
/// # Example
///
/// ```ignore
/// use rpc_centre_client::{RpcCentreConfig, RpcClient, ServiceIdentity};
///
/// let client = RpcClient::builder(RpcCentreConfig::from_path("rpc-centre.toml")?).build()?;
///
/// let user = client
///     .call(ServiceIdentity::new("user", "get"))
///     .with_parameter("id", 7)
///     .result()
///     .await?;
/// ```
pub struct RpcClient<T: Transport = HyperTransport> {
    inner: Arc<ClientInner<T>>,
}

struct ClientInner<T> {
    /// HTTP transport.
    transport: T,
    /// Service name to endpoint, cached.
    resolver: EndpointResolver,
    /// Behavior switches.
    policy: ClientPolicy,
    /// Headers added to every request.
    default_headers: HeaderMap,
    /// Deadline for one round trip.
    timeout: Option<Duration>,
}

impl<T: Transport> Clone for RpcClient<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl RpcClient {
    /// Create a [`ClientBuilder`] reading endpoints from `provider`.
    pub fn builder<P: ConfigProvider + 'static>(provider: P) -> ClientBuilder {
        ClientBuilder::new(provider)
    }
}

impl<T: Transport> RpcClient<T> {
    /// Called by [`ClientBuilder::build`]. Prefer using the builder API.
    pub(crate) fn new(
        transport: T,
        resolver: EndpointResolver,
        policy: ClientPolicy,
        default_headers: HeaderMap,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                transport,
                resolver,
                policy,
                default_headers,
                timeout,
            }),
        }
    }

    /// Start a call to `identity`.
    pub fn call(&self, identity: ServiceIdentity) -> RpcCall<T> {
        RpcCall::new(self.clone(), identity)
    }

    /// Start a call to the method described by `M`.
    pub fn call_method<M: RemoteMethod>(&self) -> RpcCall<T> {
        self.call(M::identity())
    }

    /// Call `identity` once with `parameters` and return the payload.
    pub async fn invoke(
        &self,
        identity: ServiceIdentity,
        parameters: Option<ParameterSet>,
    ) -> Result<Option<Payload>, RpcError> {
        let mut call = self.call(identity);
        if let Some(parameters) = parameters {
            call.set_parameters(parameters);
        }
        call.result().await
    }

    /// Like [`invoke`](Self::invoke), decoding the payload into `R`.
    pub async fn invoke_as<R: DeserializeOwned>(
        &self,
        identity: ServiceIdentity,
        parameters: Option<ParameterSet>,
    ) -> Result<R, RpcError> {
        let mut call = self.call(identity);
        if let Some(parameters) = parameters {
            call.set_parameters(parameters);
        }
        call.result_as().await
    }

    /// Resolve the endpoint of `service` through the client's cache.
    pub fn resolve(&self, service: &str) -> Result<Arc<Endpoint>, RpcError> {
        self.inner.resolver.resolve(service)
    }

    pub fn policy(&self) -> &ClientPolicy {
        &self.inner.policy
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.inner.timeout
    }

    pub fn transport(&self) -> &T {
        &self.inner.transport
    }

    /// Resolve, encode and send one envelope.
    pub(crate) async fn dispatch(
        &self,
        identity: &ServiceIdentity,
        parameters: Option<&ParameterSet>,
    ) -> Result<RawResponse, RpcError> {
        let endpoint = self.resolve(identity.service())?;
        let body = RequestEnvelope::new(identity.method(), identity.version(), parameters).encode()?;

        #[cfg(feature = "tracing")]
        tracing::debug!(endpoint = %endpoint, bytes = body.len(), "sending envelope");

        let send = request::dispatch(
            &self.inner.transport,
            &endpoint,
            body,
            &self.inner.default_headers,
            &self.inner.policy,
        );

        match self.inner.timeout {
            Some(limit) => tokio::time::timeout(limit, send).await.map_err(|_| {
                RpcError::Timeout(format!("client timeout of {}ms exceeded", limit.as_millis()))
            })?,
            None => send.await,
        }
    }

    /// Classify a response of `service` under the client's policy.
    pub(crate) async fn validate(
        &self,
        service: &str,
        response: RawResponse,
    ) -> Result<Option<Payload>, RpcError> {
        ResponseValidator::new(service, &self.inner.policy)
            .validate(response)
            .await
    }
}

impl<T: Transport> std::fmt::Debug for RpcClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("resolver", &self.inner.resolver)
            .field("policy", &self.inner.policy)
            .field("timeout", &self.inner.timeout)
            .finish_non_exhaustive()
    }
}
