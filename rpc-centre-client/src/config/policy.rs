//! Per-client behavior switches.
//!
//! A single [`RpcClient`](crate::RpcClient) type covers every deployment
//! flavour of the protocol; the differences live in [`ClientPolicy`].

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use rpc_centre_core::ErrorKind;

/// External liveness lookup consulted on HTTP 503.
pub trait DiscoveryCheck: Send + Sync {
    /// Returns true if discovery confirms that the instance serving `service`
    /// is gone.
    fn is_server_gone<'a>(&'a self, service: &'a str) -> BoxFuture<'a, bool>;
}

/// Application-specific classification of failed envelopes.
pub trait ExceptionMapper: Send + Sync {
    /// Choose the error kind for a response whose envelope is not the success
    /// sentinel.
    fn classify(&self, code: i64, enmsg: &str, cnmsg: &str) -> ErrorKind;
}

impl<F> ExceptionMapper for F
where
    F: Fn(i64, &str, &str) -> ErrorKind + Send + Sync,
{
    fn classify(&self, code: i64, enmsg: &str, cnmsg: &str) -> ErrorKind {
        self(code, enmsg, cnmsg)
    }
}

/// How an HTTP 503 response is classified.
#[derive(Clone, Default)]
pub enum UnavailabilityPolicy {
    /// Always raise `ServerClosed`.
    #[default]
    Unconditional,
    /// Raise `ServerClosed` only if the discovery check confirms the server is
    /// gone; otherwise raise an api error describing the inconsistency.
    DiscoveryChecked(Arc<dyn DiscoveryCheck>),
}

impl UnavailabilityPolicy {
    pub fn discovery_checked<D: DiscoveryCheck + 'static>(check: D) -> Self {
        UnavailabilityPolicy::DiscoveryChecked(Arc::new(check))
    }
}

impl fmt::Debug for UnavailabilityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnavailabilityPolicy::Unconditional => write!(f, "Unconditional"),
            UnavailabilityPolicy::DiscoveryChecked(_) => write!(f, "DiscoveryChecked(..)"),
        }
    }
}

/// Behavior switches of a client.
///
/// # Example
///
/// ```ignore
/// use rpc_centre_client::{ClientPolicy, UnavailabilityPolicy};
///
/// let policy = ClientPolicy::rpc()
///     .unavailability(UnavailabilityPolicy::discovery_checked(my_registry));
/// ```
#[derive(Clone)]
pub struct ClientPolicy {
    /// Remove `Accept` and `Accept-Encoding` from outgoing requests.
    pub(crate) strip_negotiation_headers: bool,
    /// Classification of HTTP 503.
    pub(crate) unavailability: UnavailabilityPolicy,
    /// Optional classifier for failed envelopes.
    pub(crate) exception_mapper: Option<Arc<dyn ExceptionMapper>>,
    /// Reject any status other than 200 (and 503) before reading the body.
    pub(crate) strict_http_status: bool,
}

impl Default for ClientPolicy {
    fn default() -> Self {
        Self::rpc()
    }
}

impl ClientPolicy {
    /// Envelope-oriented services: negotiation headers stripped, body parsed
    /// regardless of a non-503 status.
    pub fn rpc() -> Self {
        Self {
            strip_negotiation_headers: true,
            unavailability: UnavailabilityPolicy::Unconditional,
            exception_mapper: None,
            strict_http_status: false,
        }
    }

    /// Plain HTTP services addressed by method verb: any status other than
    /// 200 is an api error, headers are left untouched.
    pub fn http() -> Self {
        Self {
            strip_negotiation_headers: false,
            unavailability: UnavailabilityPolicy::Unconditional,
            exception_mapper: None,
            strict_http_status: true,
        }
    }

    pub fn strip_negotiation_headers(mut self, enabled: bool) -> Self {
        self.strip_negotiation_headers = enabled;
        self
    }

    pub fn unavailability(mut self, policy: UnavailabilityPolicy) -> Self {
        self.unavailability = policy;
        self
    }

    /// Delegate classification of failed envelopes to `mapper`.
    pub fn exception_mapper<M: ExceptionMapper + 'static>(mut self, mapper: M) -> Self {
        self.exception_mapper = Some(Arc::new(mapper));
        self
    }

    pub fn strict_http_status(mut self, enabled: bool) -> Self {
        self.strict_http_status = enabled;
        self
    }

    pub fn strips_negotiation_headers(&self) -> bool {
        self.strip_negotiation_headers
    }

    pub fn is_strict_http_status(&self) -> bool {
        self.strict_http_status
    }

    pub fn unavailability_policy(&self) -> &UnavailabilityPolicy {
        &self.unavailability
    }

    pub fn has_exception_mapper(&self) -> bool {
        self.exception_mapper.is_some()
    }
}

impl fmt::Debug for ClientPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientPolicy")
            .field("strip_negotiation_headers", &self.strip_negotiation_headers)
            .field("unavailability", &self.unavailability)
            .field("exception_mapper", &self.exception_mapper.is_some())
            .field("strict_http_status", &self.strict_http_status)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysGone;

    impl DiscoveryCheck for AlwaysGone {
        fn is_server_gone<'a>(&'a self, _service: &'a str) -> BoxFuture<'a, bool> {
            Box::pin(async { true })
        }
    }

    #[test]
    fn test_rpc_defaults() {
        let policy = ClientPolicy::default();
        assert!(policy.strips_negotiation_headers());
        assert!(!policy.is_strict_http_status());
        assert!(!policy.has_exception_mapper());
        assert!(matches!(
            policy.unavailability_policy(),
            UnavailabilityPolicy::Unconditional
        ));
    }

    #[test]
    fn test_http_preset() {
        let policy = ClientPolicy::http();
        assert!(!policy.strips_negotiation_headers());
        assert!(policy.is_strict_http_status());
    }

    #[test]
    fn test_builder_switches() {
        let policy = ClientPolicy::rpc()
            .strip_negotiation_headers(false)
            .strict_http_status(true)
            .unavailability(UnavailabilityPolicy::discovery_checked(AlwaysGone))
            .exception_mapper(|_code: i64, _en: &str, _cn: &str| ErrorKind::Unknown);

        assert!(!policy.strips_negotiation_headers());
        assert!(policy.is_strict_http_status());
        assert!(policy.has_exception_mapper());
        assert!(format!("{:?}", policy).contains("DiscoveryChecked"));
    }

    #[test]
    fn test_closure_mapper() {
        let mapper = |code: i64, _en: &str, _cn: &str| {
            if code == 408 {
                ErrorKind::Timeout
            } else {
                ErrorKind::ApiError
            }
        };
        assert_eq!(mapper.classify(408, "timeout", "超时"), ErrorKind::Timeout);
        assert_eq!(mapper.classify(500, "fail", "失败"), ErrorKind::ApiError);
    }
}
