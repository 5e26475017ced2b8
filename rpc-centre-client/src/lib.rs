//! Client for services speaking the rpc-centre JSON envelope protocol.
//!
//! A call is one `POST` to `<scheme>://<host>[:<port>]/<service>` whose body
//! is the envelope `{"m": method, "v": version, "p": parameters}`. The service
//! answers `{"code", "enmsg", "cnmsg", "data"}`; only `code == 200` together
//! with `enmsg == "ok"` is a success.
//!
//! ## Example
//!
//! ```ignore
//! use rpc_centre_client::{RpcCentreConfig, RpcClient, ServiceIdentity};
//!
//! let config = RpcCentreConfig::from_toml_str(r#"
//!     [rpc-centre]
//!     host = "rpc.internal"
//!     port = 8080
//! "#)?;
//! let client = RpcClient::builder(config).build()?;
//!
//! let mut call = client
//!     .call(ServiceIdentity::new("user", "get"))
//!     .with_parameter("id", 7);
//!
//! match call.result().await {
//!     Ok(Some(user)) => println!("user: {:?}", user),
//!     Ok(None) => println!("no data"),
//!     Err(e) if e.is_retryable() => eprintln!("try another instance: {}", e),
//!     Err(e) => eprintln!("failed: {}", e),
//! }
//! ```
//!
//! ## Errors
//!
//! Every failed call yields exactly one [`RpcError`]:
//!
//! | Kind | Raised when |
//! |------|-------------|
//! | `Timeout` | The connection could not be made, or the client deadline passed |
//! | `Unknown` | The request may have been delivered but no full response arrived |
//! | `ServerClosed` | HTTP 503: the instance is withdrawn |
//! | `InvalidFormat` | Body is not JSON, lacks required fields, or `data` is not an object |
//! | `ApiError` | The envelope reports a failure (`[code] enmsg cnmsg`) |
//! | `Config` | No host is configured for the service |
//!
//! The client never retries. [`RpcError::is_retryable`] tells a caller
//! whether another instance may succeed (`ServerClosed` and `Timeout`).
//!
//! ## Policies
//!
//! [`ClientPolicy::rpc`] (the default) strips `Accept`/`Accept-Encoding` and
//! parses the body whatever the HTTP status, except 503.
//! [`ClientPolicy::http`] keeps headers and rejects any status but 200.
//! 503 handling is chosen explicitly with [`UnavailabilityPolicy`].
//!
//! ## Feature Flags
//!
//! | Feature | Description | Dependencies |
//! |---------|-------------|--------------|
//! | `tls` (default) | `tls-ring` + `tls-native-roots` | |
//! | `tls-ring` / `tls-aws-lc` | Crypto provider | `rustls` |
//! | `tls-native-roots` / `tls-webpki-roots` | Root certificates | `rustls-native-certs` / `webpki-roots` |
//! | `tracing` (default) | Spans for calls, events for cache lookups | `tracing` |
//!
//! When `tracing` is enabled, each call runs in an `rpc.call` span with
//! `rpc.service`, `rpc.method`, `rpc.version` and `otel.kind = "client"`.

mod builder;
mod call;
mod client;
pub mod config;
pub mod request;
pub mod resolver;
pub mod response;
pub mod transport;

pub use builder::{ClientBuildError, ClientBuilder, IntoTransport};
pub use call::{RemoteMethod, RpcCall, ServiceIdentity};
pub use client::RpcClient;

// Re-export from config module
pub use config::{
    ClientPolicy, ConfigProvider, DiscoveryCheck, EndpointConfig, ExceptionMapper,
    RpcCentreConfig, UnavailabilityPolicy,
};

// Re-export from resolver module
pub use resolver::{Endpoint, EndpointCache, EndpointResolver};

// Re-export from response module
pub use response::ResponseValidator;

// Re-export transport types at the top level for convenience
pub use transport::{HyperTransport, HyperTransportBuilder, RawResponse, TlsClientConfig, Transport};

// Re-export core types that users need
pub use rpc_centre_core::{
    DEFAULT_VERSION, ErrorKind, ParameterSet, Payload, RequestEnvelope, ResponseEnvelope,
    RpcError,
};
