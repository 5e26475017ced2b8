//! Single remote calls.
//!
//! An [`RpcCall`] collects parameters, sends its envelope at most once and
//! remembers the outcome. Asking for the result again re-delivers that
//! outcome instead of calling the service a second time.

use std::fmt;

use rpc_centre_core::{DEFAULT_VERSION, ParameterSet, Payload, RpcError};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

#[cfg(feature = "tracing")]
use tracing::Instrument;

use crate::client::RpcClient;
use crate::transport::{HyperTransport, RawResponse, Transport};

/// Service name, method name and protocol version of a remote method.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ServiceIdentity {
    service: String,
    method: String,
    version: u32,
}

impl ServiceIdentity {
    /// Identity with the default version.
    pub fn new<S: Into<String>, M: Into<String>>(service: S, method: M) -> Self {
        Self {
            service: service.into(),
            method: method.into(),
            version: DEFAULT_VERSION,
        }
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn version(&self) -> u32 {
        self.version
    }
}

impl fmt::Display for ServiceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}@v{}", self.service, self.method, self.version)
    }
}

/// A remote method known at compile time.
///
/// # Example
///
/// ```ignore
/// use rpc_centre_client::RemoteMethod;
///
/// struct GetUser;
///
/// impl RemoteMethod for GetUser {
///     const SERVICE: &'static str = "user";
///     const METHOD: &'static str = "get";
/// }
///
/// let user = client.call_method::<GetUser>().with_parameter("id", 7).result().await?;
/// ```
pub trait RemoteMethod {
    const SERVICE: &'static str;
    const METHOD: &'static str;
    const VERSION: u32 = DEFAULT_VERSION;

    fn identity() -> ServiceIdentity {
        ServiceIdentity::new(Self::SERVICE, Self::METHOD).with_version(Self::VERSION)
    }
}

enum CallState {
    /// Nothing sent yet; parameters may still change.
    Pending,
    /// Dispatch or validation started but did not finish.
    InFlight,
    /// Transport returned; the response is not classified yet.
    Sent(Result<RawResponse, RpcError>),
    /// Final outcome.
    Done(Result<Option<Payload>, RpcError>),
}

/// One call to a remote method.
///
/// Created by [`RpcClient::call`] or [`RpcClient::call_method`].
///
/// # Example
///
/// ```ignore
/// let mut call = client
///     .call(ServiceIdentity::new("user", "get"))
///     .with_parameter("id", 7);
///
/// let payload = call.result().await?;
/// // Same outcome, no second request.
/// let again = call.result().await?;
/// ```
pub struct RpcCall<T: Transport = HyperTransport> {
    client: RpcClient<T>,
    identity: ServiceIdentity,
    parameters: Option<ParameterSet>,
    state: CallState,
    #[cfg(feature = "tracing")]
    span: tracing::Span,
}

impl<T: Transport> RpcCall<T> {
    pub(crate) fn new(client: RpcClient<T>, identity: ServiceIdentity) -> Self {
        #[cfg(feature = "tracing")]
        let span = tracing::info_span!(
            "rpc.call",
            rpc.service = %identity.service(),
            rpc.method = %identity.method(),
            rpc.version = identity.version(),
            otel.kind = "client",
        );

        Self {
            client,
            identity,
            parameters: None,
            state: CallState::Pending,
            #[cfg(feature = "tracing")]
            span,
        }
    }

    pub fn identity(&self) -> &ServiceIdentity {
        &self.identity
    }

    /// Override the protocol version sent in `v`.
    pub fn version(mut self, version: u32) -> Self {
        self.identity.version = version;
        self
    }

    /// Replace all parameters.
    pub fn set_parameters(&mut self, parameters: ParameterSet) -> &mut Self {
        self.parameters = Some(parameters);
        self
    }

    /// Replace all parameters with the fields of `value`.
    ///
    /// # Errors
    ///
    /// Returns an api error if `value` does not serialize to a JSON object.
    pub fn set_parameters_from<S: Serialize + ?Sized>(&mut self, value: &S) -> Result<&mut Self, RpcError> {
        self.parameters = Some(ParameterSet::from_serialize(value)?);
        Ok(self)
    }

    /// Set one parameter, creating the parameter set if needed.
    pub fn with_parameter<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.parameters
            .get_or_insert_with(ParameterSet::new)
            .insert(key, value);
        self
    }

    /// Remove one parameter. Removing an absent key does nothing.
    pub fn without_parameter(mut self, key: &str) -> Self {
        if let Some(parameters) = self.parameters.as_mut() {
            parameters.remove(key);
        }
        self
    }

    pub fn parameters(&self) -> Option<&ParameterSet> {
        self.parameters.as_ref()
    }

    /// Returns true once dispatch has been attempted.
    ///
    /// Parameter changes made afterwards never reach the service.
    pub fn is_sent(&self) -> bool {
        !matches!(self.state, CallState::Pending)
    }

    /// Send the envelope if it has not been sent yet.
    ///
    /// Returns the transport outcome; the response itself is classified by
    /// [`result`](Self::result).
    pub async fn send(&mut self) -> Result<(), RpcError> {
        #[cfg(feature = "tracing")]
        let span = self.span.clone();

        let dispatch = self.dispatch_once();
        #[cfg(feature = "tracing")]
        let dispatch = dispatch.instrument(span);
        dispatch.await;

        match &self.state {
            CallState::Sent(Ok(_)) | CallState::Done(Ok(_)) => Ok(()),
            CallState::Sent(Err(e)) | CallState::Done(Err(e)) => Err(e.clone()),
            CallState::Pending | CallState::InFlight => Err(interrupted()),
        }
    }

    /// The payload of the call, sending it first if needed.
    ///
    /// `Ok(None)` means the service succeeded without returning `data`.
    pub async fn result(&mut self) -> Result<Option<Payload>, RpcError> {
        #[cfg(feature = "tracing")]
        let span = self.span.clone();

        let outcome = self.outcome();
        #[cfg(feature = "tracing")]
        let outcome = outcome.instrument(span);
        outcome.await
    }

    /// The payload decoded into `R`.
    ///
    /// A successful call without `data` decodes from JSON `null`, so
    /// `Option<_>` targets receive `None`.
    ///
    /// # Errors
    ///
    /// Any error of [`result`](Self::result), or an invalid-format error if the
    /// payload does not match `R`.
    pub async fn result_as<R: DeserializeOwned>(&mut self) -> Result<R, RpcError> {
        let value = match self.result().await? {
            Some(payload) => Value::Object(payload),
            None => Value::Null,
        };
        serde_json::from_value(value)
            .map_err(|e| RpcError::InvalidFormat(format!("failed to decode payload: {}", e)))
    }

    async fn dispatch_once(&mut self) {
        if !matches!(self.state, CallState::Pending) {
            return;
        }

        self.state = CallState::InFlight;
        let sent = self
            .client
            .dispatch(&self.identity, self.parameters.as_ref())
            .await;
        self.state = CallState::Sent(sent);
    }

    async fn outcome(&mut self) -> Result<Option<Payload>, RpcError> {
        self.dispatch_once().await;

        let outcome = match std::mem::replace(&mut self.state, CallState::InFlight) {
            CallState::Sent(Ok(response)) => {
                self.client
                    .validate(self.identity.service(), response)
                    .await
            }
            CallState::Sent(Err(e)) => Err(e),
            CallState::Done(outcome) => outcome,
            CallState::Pending | CallState::InFlight => Err(interrupted()),
        };

        #[cfg(feature = "tracing")]
        if let Err(e) = &outcome {
            tracing::debug!(error.kind = %e.kind(), error = %e, "call failed");
        }

        self.state = CallState::Done(outcome.clone());
        outcome
    }
}

/// Outcome of a call whose earlier attempt was dropped mid-flight: the
/// request may or may not have reached the service.
fn interrupted() -> RpcError {
    RpcError::Unknown("call was interrupted before completing; result unknown".to_string())
}

impl<T: Transport> fmt::Debug for RpcCall<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.state {
            CallState::Pending => "pending",
            CallState::InFlight => "in_flight",
            CallState::Sent(_) => "sent",
            CallState::Done(_) => "done",
        };
        f.debug_struct("RpcCall")
            .field("identity", &self.identity)
            .field("parameters", &self.parameters)
            .field("state", &state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EndpointConfig;
    use bytes::Bytes;
    use futures::future::BoxFuture;
    use http::StatusCode;
    use rpc_centre_core::ErrorKind;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    /// Records request bodies and answers with a fixed response.
    struct Recording {
        bodies: Mutex<Vec<Value>>,
        status: StatusCode,
        reply: &'static str,
    }

    impl Recording {
        fn replying(reply: &'static str) -> Arc<Self> {
            Arc::new(Self {
                bodies: Mutex::new(Vec::new()),
                status: StatusCode::OK,
                reply,
            })
        }

        fn bodies(&self) -> Vec<Value> {
            self.bodies.lock().unwrap().clone()
        }
    }

    impl Transport for Recording {
        fn send(&self, request: http::Request<Bytes>) -> BoxFuture<'_, Result<RawResponse, RpcError>> {
            let body: Value = serde_json::from_slice(request.body()).unwrap();
            self.bodies.lock().unwrap().push(body);
            Box::pin(async move { Ok(RawResponse::new(self.status, self.reply)) })
        }
    }

    fn client(transport: Arc<Recording>) -> RpcClient<Arc<Recording>> {
        RpcClient::builder(EndpointConfig::new("127.0.0.1").port(9))
            .with_transport(transport)
            .build()
            .unwrap()
    }

    struct GetUser;

    impl RemoteMethod for GetUser {
        const SERVICE: &'static str = "user";
        const METHOD: &'static str = "get";
    }

    struct ListOrders;

    impl RemoteMethod for ListOrders {
        const SERVICE: &'static str = "order";
        const METHOD: &'static str = "list";
        const VERSION: u32 = 2;
    }

    #[test]
    fn test_remote_method_identity() {
        assert_eq!(GetUser::identity(), ServiceIdentity::new("user", "get"));
        assert_eq!(ListOrders::identity().version(), 2);
        assert_eq!(ListOrders::identity().to_string(), "order.list@v2");
    }

    #[test]
    fn test_parameter_mutation() {
        let transport = Recording::replying("{}");
        let call = client(transport)
            .call_method::<GetUser>()
            .without_parameter("missing")
            .with_parameter("id", 7)
            .with_parameter("name", "ann")
            .without_parameter("name");

        let parameters = call.parameters().unwrap();
        assert_eq!(parameters.len(), 1);
        assert_eq!(parameters.get("id"), Some(&json!(7)));
        assert!(!call.is_sent());
    }

    #[test]
    fn test_set_parameters_from_requires_object() {
        #[derive(Serialize)]
        struct Query {
            id: u32,
        }

        let transport = Recording::replying("{}");
        let mut call = client(transport).call_method::<GetUser>();
        call.set_parameters_from(&Query { id: 3 }).unwrap();
        assert_eq!(call.parameters().unwrap().get("id"), Some(&json!(3)));

        let err = call.set_parameters_from(&[1, 2, 3]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ApiError);
    }

    #[tokio::test]
    async fn test_result_sends_once_and_redelivers() {
        let transport = Recording::replying(r#"{"code":200,"enmsg":"ok","data":{"x":1}}"#);
        let mut call = client(transport.clone())
            .call_method::<GetUser>()
            .with_parameter("a", 1);

        let first = call.result().await.unwrap();
        let second = call.result().await.unwrap();
        call.send().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(transport.bodies(), vec![json!({"m": "get", "v": 1, "p": {"a": 1}})]);
        assert!(call.is_sent());
    }

    #[tokio::test]
    async fn test_error_is_redelivered_without_resend() {
        let transport = Recording::replying(r#"{"code":500,"enmsg":"fail","cnmsg":"失败"}"#);
        let mut call = client(transport.clone()).call_method::<GetUser>();

        let first = call.result().await.unwrap_err();
        let second = call.result().await.unwrap_err();

        assert_eq!(first, second);
        assert_eq!(first.kind(), ErrorKind::ApiError);
        assert_eq!(transport.bodies().len(), 1);
    }

    #[tokio::test]
    async fn test_parameters_changed_after_send_are_not_sent() {
        let transport = Recording::replying(r#"{"code":200,"enmsg":"ok"}"#);
        let mut call = client(transport.clone())
            .call_method::<ListOrders>()
            .with_parameter("page", 1);

        call.send().await.unwrap();
        let mut call = call.with_parameter("page", 2);
        call.set_parameters(ParameterSet::new());
        assert!(call.result().await.unwrap().is_none());

        assert_eq!(
            transport.bodies(),
            vec![json!({"m": "list", "v": 2, "p": {"page": 1}})]
        );
    }

    #[tokio::test]
    async fn test_no_parameters_sends_null() {
        let transport = Recording::replying(r#"{"code":200,"enmsg":"ok"}"#);
        let mut call = client(transport.clone())
            .call(ServiceIdentity::new("user", "ping"))
            .version(3);
        call.result().await.unwrap();

        assert_eq!(transport.bodies(), vec![json!({"m": "ping", "v": 3, "p": null})]);
    }

    #[tokio::test]
    async fn test_result_as() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct User {
            id: u32,
            name: String,
        }

        let transport =
            Recording::replying(r#"{"code":200,"enmsg":"ok","data":{"id":7,"name":"ann"}}"#);
        let mut call = client(transport).call_method::<GetUser>();
        let user: User = call.result_as().await.unwrap();
        assert_eq!(
            user,
            User {
                id: 7,
                name: "ann".into()
            }
        );

        let err = call.result_as::<Vec<u32>>().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFormat);
    }

    #[tokio::test]
    async fn test_result_as_option_without_data() {
        let transport = Recording::replying(r#"{"code":200,"enmsg":"ok"}"#);
        let mut call = client(transport).call_method::<GetUser>();
        let data: Option<Payload> = call.result_as().await.unwrap();
        assert!(data.is_none());
    }

    #[tokio::test]
    async fn test_dropped_call_is_not_resent() {
        struct Hanging;

        impl Transport for Hanging {
            fn send(&self, _request: http::Request<Bytes>) -> BoxFuture<'_, Result<RawResponse, RpcError>> {
                Box::pin(futures::future::pending())
            }
        }

        let client = RpcClient::builder(EndpointConfig::new("127.0.0.1"))
            .with_transport(Hanging)
            .build()
            .unwrap();
        let mut call = client.call_method::<GetUser>();

        let attempt = tokio::time::timeout(std::time::Duration::from_millis(10), call.result()).await;
        assert!(attempt.is_err());
        assert!(call.is_sent());

        let err = call.result().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unknown);
    }
}
