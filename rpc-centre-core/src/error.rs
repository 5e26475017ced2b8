//! Error kinds and the error type for rpc-centre calls.
//!
//! This module provides:
//! - [`ErrorKind`]: The classification attached to every failure
//! - [`RpcError`]: The error returned by a call

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Classification of a failed call.
///
/// The kind is a lookup key, not an identity: two errors of the same kind may
/// carry different messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The transport could not complete the round trip (connect failure or deadline).
    Timeout,
    /// The request may or may not have been processed remotely.
    Unknown,
    /// The response parsed correctly but the envelope reports a failure.
    ApiError,
    /// HTTP 503: the target instance has been withdrawn.
    ServerClosed,
    /// The response body is not a well-formed envelope.
    InvalidFormat,
    /// Required endpoint configuration is missing or unreadable.
    Config,
}

impl ErrorKind {
    /// Get the string representation of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Timeout => "timeout",
            ErrorKind::Unknown => "unknown",
            ErrorKind::ApiError => "api_error",
            ErrorKind::ServerClosed => "server_closed",
            ErrorKind::InvalidFormat => "invalid_format",
            ErrorKind::Config => "config",
        }
    }

    /// Returns whether a caller may retry a call that failed with this kind.
    ///
    /// Only [`ServerClosed`](ErrorKind::ServerClosed) and
    /// [`Timeout`](ErrorKind::Timeout) qualify. A call that failed with
    /// [`Unknown`](ErrorKind::Unknown) may already have been executed.
    ///
    /// # Example
    ///
    /// ```
    /// use rpc_centre_core::ErrorKind;
    ///
    /// assert!(ErrorKind::ServerClosed.is_retryable());
    /// assert!(!ErrorKind::ApiError.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::ServerClosed | ErrorKind::Timeout)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an [`ErrorKind`] from a string fails.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown error kind: {0}")]
pub struct ParseErrorKindError(String);

impl FromStr for ErrorKind {
    type Err = ParseErrorKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "timeout" => Ok(ErrorKind::Timeout),
            "unknown" => Ok(ErrorKind::Unknown),
            "api_error" | "error" => Ok(ErrorKind::ApiError),
            "server_closed" => Ok(ErrorKind::ServerClosed),
            "invalid_format" => Ok(ErrorKind::InvalidFormat),
            "config" => Ok(ErrorKind::Config),
            other => Err(ParseErrorKindError(other.to_string())),
        }
    }
}

/// Failure of an rpc-centre call.
///
/// Exactly one variant per [`ErrorKind`]. A call either yields its payload
/// or exactly one of these.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum RpcError {
    /// Connection refused, reset, or the client deadline elapsed.
    #[error("timeout: {0}")]
    Timeout(String),

    /// The request was sent but its outcome could not be observed.
    #[error("unknown result: {0}")]
    Unknown(String),

    /// Application-level failure reported by the envelope, or a request that
    /// could not be encoded.
    #[error("api error: {message}")]
    Api {
        /// The envelope `code`, when the failure came from a response.
        code: Option<i64>,
        message: String,
    },

    /// The server answered HTTP 503 for the named service.
    #[error("server closed: {0}")]
    ServerClosed(String),

    /// The response body was not a valid envelope.
    #[error("{0}")]
    InvalidFormat(String),

    /// Endpoint configuration could not be obtained.
    #[error("configuration error: {0}")]
    Config(String),
}

impl RpcError {
    /// Create an api error that did not come from a response envelope.
    pub fn api<S: Into<String>>(message: S) -> Self {
        RpcError::Api {
            code: None,
            message: message.into(),
        }
    }

    /// Create an api error from a failed response envelope.
    ///
    /// The message has the form `[code] enmsg cnmsg`.
    pub fn from_envelope(code: i64, enmsg: &str, cnmsg: &str) -> Self {
        RpcError::Api {
            code: Some(code),
            message: format!("[{}] {} {}", code, enmsg, cnmsg),
        }
    }

    /// Create an error of the given kind.
    ///
    /// Used when a collaborator decides the classification and the caller only
    /// has a message to attach.
    pub fn from_kind<S: Into<String>>(kind: ErrorKind, message: S) -> Self {
        let message = message.into();
        match kind {
            ErrorKind::Timeout => RpcError::Timeout(message),
            ErrorKind::Unknown => RpcError::Unknown(message),
            ErrorKind::ApiError => RpcError::api(message),
            ErrorKind::ServerClosed => RpcError::ServerClosed(message),
            ErrorKind::InvalidFormat => RpcError::InvalidFormat(message),
            ErrorKind::Config => RpcError::Config(message),
        }
    }

    /// Get the classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RpcError::Timeout(_) => ErrorKind::Timeout,
            RpcError::Unknown(_) => ErrorKind::Unknown,
            RpcError::Api { .. } => ErrorKind::ApiError,
            RpcError::ServerClosed(_) => ErrorKind::ServerClosed,
            RpcError::InvalidFormat(_) => ErrorKind::InvalidFormat,
            RpcError::Config(_) => ErrorKind::Config,
        }
    }

    /// Get the error message without the kind prefix.
    pub fn message(&self) -> &str {
        match self {
            RpcError::Api { message, .. } => message,
            RpcError::Timeout(msg)
            | RpcError::Unknown(msg)
            | RpcError::ServerClosed(msg)
            | RpcError::InvalidFormat(msg)
            | RpcError::Config(msg) => msg,
        }
    }

    /// Get the envelope code for api errors raised from a response.
    pub fn code(&self) -> Option<i64> {
        match self {
            RpcError::Api { code, .. } => *code,
            _ => None,
        }
    }

    /// Returns whether the caller may retry the call, possibly against
    /// another instance.
    ///
    /// This is a convenience wrapper for [`ErrorKind::is_retryable()`].
    ///
    /// # Example
    ///
    /// ```
    /// use rpc_centre_core::RpcError;
    ///
    /// assert!(RpcError::ServerClosed("user".into()).is_retryable());
    /// assert!(!RpcError::from_envelope(500, "fail", "失败").is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_envelope_message() {
        let err = RpcError::from_envelope(500, "fail", "失败");
        assert_eq!(err.kind(), ErrorKind::ApiError);
        assert_eq!(err.code(), Some(500));
        assert_eq!(err.message(), "[500] fail 失败");
        assert!(err.to_string().contains("失败"));
    }

    #[test]
    fn test_from_kind_covers_every_kind() {
        for kind in [
            ErrorKind::Timeout,
            ErrorKind::Unknown,
            ErrorKind::ApiError,
            ErrorKind::ServerClosed,
            ErrorKind::InvalidFormat,
            ErrorKind::Config,
        ] {
            let err = RpcError::from_kind(kind, "boom");
            assert_eq!(err.kind(), kind);
            assert_eq!(err.message(), "boom");
        }
    }

    #[test]
    fn test_is_retryable() {
        assert!(RpcError::Timeout("connection refused".into()).is_retryable());
        assert!(RpcError::ServerClosed("order".into()).is_retryable());

        assert!(!RpcError::Unknown("body truncated".into()).is_retryable());
        assert!(!RpcError::api("bad").is_retryable());
        assert!(!RpcError::InvalidFormat("Json decode fail".into()).is_retryable());
        assert!(!RpcError::Config("missing host".into()).is_retryable());
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("timeout".parse::<ErrorKind>(), Ok(ErrorKind::Timeout));
        assert_eq!("error".parse::<ErrorKind>(), Ok(ErrorKind::ApiError));
        assert_eq!(
            "server_closed".parse::<ErrorKind>(),
            Ok(ErrorKind::ServerClosed)
        );
        assert!("nope".parse::<ErrorKind>().is_err());
    }

    #[test]
    fn test_kind_display_round_trips() {
        let kind = ErrorKind::InvalidFormat;
        assert_eq!(kind.to_string().parse::<ErrorKind>(), Ok(kind));
    }
}
