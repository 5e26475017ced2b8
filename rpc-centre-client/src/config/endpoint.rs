//! Endpoint configuration sources.
//!
//! The client never decides where a service lives. It asks a
//! [`ConfigProvider`] for the `host`, `scheme` and `port` of a service name
//! and builds the request target from that.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use rpc_centre_core::RpcError;

/// Network settings for one service or a group of services.
///
/// `host` is required at resolution time. `scheme` and `port` fall back to
/// the transport defaults when absent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub scheme: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
}

impl EndpointConfig {
    /// Create a config pointing at `host` with default scheme and port.
    pub fn new<S: Into<String>>(host: S) -> Self {
        Self {
            host: Some(host.into()),
            scheme: None,
            port: None,
        }
    }

    /// Set the scheme (e.g. `"http"` or `"https"`).
    pub fn scheme<S: Into<String>>(mut self, scheme: S) -> Self {
        self.scheme = Some(scheme.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Fill every field unset in `self` from `fallback`.
    pub fn or(self, fallback: &EndpointConfig) -> Self {
        Self {
            host: self.host.or_else(|| fallback.host.clone()),
            scheme: self.scheme.or_else(|| fallback.scheme.clone()),
            port: self.port.or(fallback.port),
        }
    }
}

/// Source of endpoint settings, keyed by service name.
///
/// Implementations are consulted at most once per service name per
/// [`EndpointCache`](crate::EndpointCache); they must not rely on being
/// called per request.
pub trait ConfigProvider: Send + Sync {
    /// Return the settings for `service`.
    ///
    /// Returning a config without a host is allowed; the resolver turns it
    /// into [`RpcError::Config`].
    fn endpoint_config(&self, service: &str) -> Result<EndpointConfig, RpcError>;
}

/// Every service shares the same settings.
impl ConfigProvider for EndpointConfig {
    fn endpoint_config(&self, _service: &str) -> Result<EndpointConfig, RpcError> {
        Ok(self.clone())
    }
}

/// The `rpc-centre` configuration file.
///
/// ```toml
/// [rpc-centre]
/// host = "rpc.internal"
/// scheme = "http"
/// port = 8080
///
/// # Optional per-service overrides; unset fields come from [rpc-centre].
/// [services.billing]
/// host = "billing.internal"
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcCentreConfig {
    #[serde(rename = "rpc-centre", default)]
    pub group: EndpointConfig,
    #[serde(default)]
    pub services: HashMap<String, EndpointConfig>,
}

impl RpcCentreConfig {
    /// Parse the configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, RpcError> {
        toml::from_str(contents)
            .map_err(|e| RpcError::Config(format!("invalid rpc-centre config: {}", e)))
    }

    /// Read and parse the configuration file at `path`.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, RpcError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            RpcError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }
}

impl ConfigProvider for RpcCentreConfig {
    fn endpoint_config(&self, service: &str) -> Result<EndpointConfig, RpcError> {
        Ok(match self.services.get(service) {
            Some(overrides) => overrides.clone().or(&self.group),
            None => self.group.clone(),
        })
    }
}
