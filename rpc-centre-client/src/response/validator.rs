//! Raw response classification.
//!
//! The checks run in a fixed order and stop at the first failure:
//!
//! 1. HTTP 503: the instance is withdrawn (see [`UnavailabilityPolicy`])
//! 2. Any other non-200 status, only under a strict-status policy
//! 3. Body must be JSON carrying `code`, `enmsg` and `cnmsg`
//! 4. `data`, when present, must be an object
//! 5. Anything but `code == 200 && enmsg == "ok"` is a failure, classified by
//!    the policy's [`ExceptionMapper`](crate::ExceptionMapper) if one is set
//!
//! A response passing every check yields its `data`, or `None`.

use http::StatusCode;
use rpc_centre_core::{ErrorKind, Payload, ResponseEnvelope, RpcError};

use crate::config::{ClientPolicy, UnavailabilityPolicy};
use crate::transport::RawResponse;

/// Validates responses of one service under one policy.
#[derive(Clone, Copy, Debug)]
pub struct ResponseValidator<'a> {
    service: &'a str,
    policy: &'a ClientPolicy,
}

impl<'a> ResponseValidator<'a> {
    pub fn new(service: &'a str, policy: &'a ClientPolicy) -> Self {
        Self { service, policy }
    }

    /// Turn `response` into the call's payload.
    pub async fn validate(&self, response: RawResponse) -> Result<Option<Payload>, RpcError> {
        if response.status == StatusCode::SERVICE_UNAVAILABLE {
            return Err(self.unavailable().await);
        }

        if self.policy.is_strict_http_status() && response.status != StatusCode::OK {
            return Err(RpcError::api(format!(
                "Http status code: {}",
                response.status.as_u16()
            )));
        }

        let envelope = ResponseEnvelope::decode(&response.body)?;
        if !envelope.is_success() {
            return Err(self.failure(&envelope));
        }

        Ok(envelope.into_data())
    }

    async fn unavailable(&self) -> RpcError {
        match &self.policy.unavailability {
            UnavailabilityPolicy::Unconditional => {
                #[cfg(feature = "tracing")]
                tracing::warn!(rpc.service = %self.service, "service unavailable, server closed");
                RpcError::ServerClosed(self.service.to_string())
            }
            UnavailabilityPolicy::DiscoveryChecked(check) => {
                if check.is_server_gone(self.service).await {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(
                        rpc.service = %self.service,
                        "service unavailable, discovery confirms server closed"
                    );
                    RpcError::ServerClosed(self.service.to_string())
                } else {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(
                        rpc.service = %self.service,
                        "service unavailable but discovery still lists the server"
                    );
                    RpcError::api(format!(
                        "Http status code: 503, but discovery still lists service {}",
                        self.service
                    ))
                }
            }
        }
    }

    fn failure(&self, envelope: &ResponseEnvelope) -> RpcError {
        let fallback = envelope.to_error();
        let Some(mapper) = &self.policy.exception_mapper else {
            return fallback;
        };

        match mapper.classify(envelope.code(), envelope.enmsg(), envelope.cnmsg()) {
            ErrorKind::ApiError => fallback,
            kind => RpcError::from_kind(kind, fallback.message()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DiscoveryCheck;
    use futures::future::BoxFuture;
    use serde_json::json;

    struct Discovery {
        gone: bool,
    }

    impl DiscoveryCheck for Discovery {
        fn is_server_gone<'a>(&'a self, _service: &'a str) -> BoxFuture<'a, bool> {
            let gone = self.gone;
            Box::pin(async move { gone })
        }
    }

    fn ok(body: &str) -> RawResponse {
        RawResponse::new(StatusCode::OK, body.to_string())
    }

    async fn validate(policy: &ClientPolicy, response: RawResponse) -> Result<Option<Payload>, RpcError> {
        ResponseValidator::new("user", policy).validate(response).await
    }

    #[tokio::test]
    async fn test_success_with_data() {
        let payload = validate(
            &ClientPolicy::rpc(),
            ok(r#"{"code":200,"enmsg":"ok","data":{"x":1}}"#),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(serde_json::Value::Object(payload), json!({"x": 1}));
    }

    #[tokio::test]
    async fn test_success_without_data() {
        let payload = validate(&ClientPolicy::rpc(), ok(r#"{"code":200,"enmsg":"ok"}"#))
            .await
            .unwrap();
        assert!(payload.is_none());
    }

    #[tokio::test]
    async fn test_failed_envelope_is_api_error() {
        let err = validate(
            &ClientPolicy::rpc(),
            ok(r#"{"code":500,"enmsg":"fail","cnmsg":"失败"}"#),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ApiError);
        assert_eq!(err.code(), Some(500));
        for part in ["500", "fail", "失败"] {
            assert!(err.message().contains(part));
        }
    }

    #[tokio::test]
    async fn test_not_json_is_invalid_format() {
        let err = validate(&ClientPolicy::rpc(), ok("<html>oops</html>"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFormat);
        assert_eq!(err.message(), "Json decode fail");
    }

    #[tokio::test]
    async fn test_array_data_is_invalid_format() {
        let err = validate(
            &ClientPolicy::rpc(),
            ok(r#"{"code":200,"enmsg":"ok","cnmsg":"","data":[1,2]}"#),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFormat);
    }

    #[tokio::test]
    async fn test_rpc_policy_parses_body_on_non_200() {
        let response = RawResponse::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"code":200,"enmsg":"ok","data":{"x":1}}"#,
        );
        assert!(validate(&ClientPolicy::rpc(), response).await.is_ok());
    }

    #[tokio::test]
    async fn test_strict_policy_rejects_non_200() {
        let response = RawResponse::new(
            StatusCode::NOT_FOUND,
            r#"{"code":200,"enmsg":"ok"}"#,
        );
        let err = validate(&ClientPolicy::http(), response).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ApiError);
        assert_eq!(err.message(), "Http status code: 404");
    }

    #[tokio::test]
    async fn test_503_unconditional_is_server_closed() {
        let response = RawResponse::new(StatusCode::SERVICE_UNAVAILABLE, "");
        let err = validate(&ClientPolicy::rpc(), response).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ServerClosed);
        assert_eq!(err.message(), "user");
    }

    #[tokio::test]
    async fn test_503_ignores_strict_status() {
        let response = RawResponse::new(StatusCode::SERVICE_UNAVAILABLE, "");
        let err = validate(&ClientPolicy::http(), response).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ServerClosed);
    }

    #[tokio::test]
    async fn test_503_discovery_confirms_gone() {
        let policy = ClientPolicy::rpc()
            .unavailability(UnavailabilityPolicy::discovery_checked(Discovery { gone: true }));
        let response = RawResponse::new(StatusCode::SERVICE_UNAVAILABLE, "");
        let err = validate(&policy, response).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ServerClosed);
    }

    #[tokio::test]
    async fn test_503_discovery_disagrees() {
        let policy = ClientPolicy::rpc()
            .unavailability(UnavailabilityPolicy::discovery_checked(Discovery { gone: false }));
        let response = RawResponse::new(StatusCode::SERVICE_UNAVAILABLE, "");
        let err = validate(&policy, response).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ApiError);
        assert!(err.message().contains("503"));
        assert!(err.message().contains("user"));
    }

    #[tokio::test]
    async fn test_exception_mapper_selects_kind() {
        let policy = ClientPolicy::rpc().exception_mapper(|code: i64, _en: &str, _cn: &str| {
            if code == 504 {
                ErrorKind::Timeout
            } else {
                ErrorKind::ApiError
            }
        });

        let err = validate(&policy, ok(r#"{"code":504,"enmsg":"gateway","cnmsg":"网关"}"#))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(err.message(), "[504] gateway 网关");

        let err = validate(&policy, ok(r#"{"code":500,"enmsg":"fail","cnmsg":"失败"}"#))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ApiError);
        assert_eq!(err.code(), Some(500));
    }

    #[tokio::test]
    async fn test_exception_mapper_not_consulted_on_success() {
        let policy = ClientPolicy::rpc()
            .exception_mapper(|_code: i64, _en: &str, _cn: &str| -> ErrorKind { unreachable!() });
        assert!(validate(&policy, ok(r#"{"code":200,"enmsg":"ok"}"#)).await.is_ok());
    }
}
