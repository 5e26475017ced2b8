//! Service name to request target resolution.
//!
//! [`EndpointResolver`] asks its [`ConfigProvider`] for a service's settings
//! the first time the service is called and keeps the resulting
//! [`Endpoint`] in an [`EndpointCache`] for as long as the cache lives.
//! Entries are never refreshed or evicted: addresses are assumed stable.

use std::collections::HashMap;
use std::sync::Arc;

use http::Uri;
use parking_lot::RwLock;
use rpc_centre_core::RpcError;

use crate::config::{ConfigProvider, EndpointConfig};

/// Scheme used when the configuration does not name one.
pub const DEFAULT_SCHEME: &str = "http";

/// Resolved request target of a service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    host: String,
    scheme: Option<String>,
    port: Option<u16>,
    path: String,
}

impl Endpoint {
    /// Build the endpoint of `service` from its configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Config`] if `host` is missing or empty.
    pub fn from_config(service: &str, config: EndpointConfig) -> Result<Self, RpcError> {
        let host = match config.host {
            Some(host) if !host.trim().is_empty() => host,
            _ => {
                return Err(RpcError::Config(format!(
                    "missing host for service {:?}",
                    service
                )));
            }
        };

        Ok(Self {
            host,
            scheme: config.scheme,
            port: config.port,
            path: format!("/{}", service),
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Request path: `/` followed by the service name.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Absolute URI of the endpoint. An absent scheme becomes
    /// [`DEFAULT_SCHEME`]; an absent port is left to the scheme default.
    pub fn uri(&self) -> Result<Uri, RpcError> {
        let authority = match self.port {
            Some(port) => format!("{}:{}", self.host, port),
            None => self.host.clone(),
        };
        Uri::builder()
            .scheme(self.scheme.as_deref().unwrap_or(DEFAULT_SCHEME))
            .authority(authority)
            .path_and_query(self.path.as_str())
            .build()
            .map_err(|e| RpcError::Config(format!("invalid endpoint {}: {}", self, e)))
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(scheme) = &self.scheme {
            write!(f, "{}://", scheme)?;
        }
        write!(f, "{}", self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{}", port)?;
        }
        write!(f, "{}", self.path)
    }
}

/// Insert-once map from service name to [`Endpoint`].
///
/// Share one cache between clients (via `Arc`) to resolve each service once
/// per process.
#[derive(Debug, Default)]
pub struct EndpointCache {
    entries: RwLock<HashMap<String, Arc<Endpoint>>>,
}

impl EndpointCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, service: &str) -> Option<Arc<Endpoint>> {
        self.entries.read().get(service).cloned()
    }

    /// Return the cached endpoint for `service`, computing and storing it
    /// with `init` if absent.
    ///
    /// The check and the insert happen under one write lock, so `init` runs
    /// at most once per service even under concurrent first use. A failed
    /// `init` stores nothing, and a panicking `init` leaves the cache usable.
    pub fn get_or_try_insert_with<F>(&self, service: &str, init: F) -> Result<Arc<Endpoint>, RpcError>
    where
        F: FnOnce() -> Result<Endpoint, RpcError>,
    {
        if let Some(endpoint) = self.get(service) {
            return Ok(endpoint);
        }

        let mut entries = self.entries.write();
        if let Some(endpoint) = entries.get(service) {
            return Ok(endpoint.clone());
        }

        let endpoint = Arc::new(init()?);
        entries.insert(service.to_string(), endpoint.clone());
        Ok(endpoint)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry. Only meant for tests and controlled reconfiguration.
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

/// Resolves service names to endpoints through a cache.
#[derive(Clone)]
pub struct EndpointResolver {
    provider: Arc<dyn ConfigProvider>,
    cache: Arc<EndpointCache>,
}

impl EndpointResolver {
    pub fn new(provider: Arc<dyn ConfigProvider>, cache: Arc<EndpointCache>) -> Self {
        Self { provider, cache }
    }

    /// Resolve `service`, consulting the provider only on first use.
    pub fn resolve(&self, service: &str) -> Result<Arc<Endpoint>, RpcError> {
        if let Some(endpoint) = self.cache.get(service) {
            #[cfg(feature = "tracing")]
            tracing::trace!(rpc.service = %service, "endpoint cache hit");
            return Ok(endpoint);
        }

        self.cache.get_or_try_insert_with(service, || {
            let config = self.provider.endpoint_config(service)?;
            let endpoint = Endpoint::from_config(service, config)?;
            #[cfg(feature = "tracing")]
            tracing::debug!(rpc.service = %service, endpoint = %endpoint, "resolved endpoint");
            Ok(endpoint)
        })
    }

    pub fn cache(&self) -> &Arc<EndpointCache> {
        &self.cache
    }
}

impl std::fmt::Debug for EndpointResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointResolver")
            .field("cached", &self.cache.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpc_centre_core::ErrorKind;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts how often it is asked for settings.
    #[derive(Default)]
    struct CountingProvider {
        calls: AtomicUsize,
    }

    impl ConfigProvider for CountingProvider {
        fn endpoint_config(&self, _service: &str) -> Result<EndpointConfig, RpcError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(EndpointConfig::new("rpc.internal").scheme("https").port(8443))
        }
    }

    fn resolver_with(provider: Arc<CountingProvider>) -> EndpointResolver {
        EndpointResolver::new(provider, Arc::new(EndpointCache::new()))
    }

    #[test]
    fn test_endpoint_from_config() {
        let endpoint =
            Endpoint::from_config("user", EndpointConfig::new("rpc.internal").port(81)).unwrap();
        assert_eq!(endpoint.host(), "rpc.internal");
        assert_eq!(endpoint.scheme(), None);
        assert_eq!(endpoint.port(), Some(81));
        assert_eq!(endpoint.path(), "/user");
        assert_eq!(endpoint.uri().unwrap().to_string(), "http://rpc.internal:81/user");
    }

    #[test]
    fn test_endpoint_uri_without_port() {
        let endpoint =
            Endpoint::from_config("order", EndpointConfig::new("rpc.internal").scheme("https"))
                .unwrap();
        assert_eq!(endpoint.uri().unwrap().to_string(), "https://rpc.internal/order");
        assert_eq!(endpoint.to_string(), "https://rpc.internal/order");
    }

    #[test]
    fn test_missing_host_is_config_error() {
        let err = Endpoint::from_config("user", EndpointConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);

        let err = Endpoint::from_config("user", EndpointConfig::new("  ")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_resolve_twice_hits_provider_once() {
        let provider = Arc::new(CountingProvider::default());
        let resolver = resolver_with(provider.clone());

        let first = resolver.resolve("user").unwrap();
        let second = resolver.resolve("user").unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(*first, *second);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

        resolver.resolve("order").unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
        assert_eq!(resolver.cache().len(), 2);
    }

    #[test]
    fn test_failed_resolution_is_not_cached() {
        let resolver = EndpointResolver::new(
            Arc::new(EndpointConfig::default()),
            Arc::new(EndpointCache::new()),
        );
        assert!(resolver.resolve("user").is_err());
        assert!(resolver.cache().is_empty());
    }

    #[test]
    fn test_shared_cache_across_resolvers() {
        let provider = Arc::new(CountingProvider::default());
        let cache = Arc::new(EndpointCache::new());
        let a = EndpointResolver::new(provider.clone(), cache.clone());
        let b = EndpointResolver::new(provider.clone(), cache.clone());

        a.resolve("user").unwrap();
        b.resolve("user").unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

        cache.clear();
        b.resolve("user").unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_concurrent_first_use_resolves_once() {
        let provider = Arc::new(CountingProvider::default());
        let resolver = resolver_with(provider.clone());

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| resolver.resolve("user").unwrap());
            }
        });

        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_init_skipped_when_cached() {
        let cache = EndpointCache::new();
        let first = cache
            .get_or_try_insert_with("user", || {
                Endpoint::from_config("user", EndpointConfig::new("rpc.internal"))
            })
            .unwrap();

        let second = cache
            .get_or_try_insert_with("user", || Err(RpcError::Config("not called".into())))
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_panicking_init_leaves_cache_usable() {
        let cache = EndpointCache::new();

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            cache.get_or_try_insert_with("user", || panic!("provider blew up"))
        }));
        assert!(outcome.is_err());
        assert!(cache.is_empty());

        let endpoint = cache
            .get_or_try_insert_with("user", || {
                Endpoint::from_config("user", EndpointConfig::new("rpc.internal"))
            })
            .unwrap();
        assert_eq!(endpoint.host(), "rpc.internal");
        assert_eq!(cache.get("user"), Some(endpoint));
    }
}
