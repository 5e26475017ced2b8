//! Outgoing request construction and dispatch.
//!
//! Every call is a `POST` of the JSON envelope to the service endpoint with
//! `Content-Type: application/json`. Under the default policy the
//! `Accept` and `Accept-Encoding` headers are removed so the service answers
//! with plain, unencoded JSON.

use bytes::Bytes;
use http::header::{ACCEPT, ACCEPT_ENCODING, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, Method, Request};
use rpc_centre_core::RpcError;

use crate::config::ClientPolicy;
use crate::resolver::Endpoint;
use crate::transport::{RawResponse, Transport};

/// Build the HTTP request carrying `body` to `endpoint`.
///
/// `default_headers` are copied first; `Content-Type` always ends up as
/// `application/json` and, when the policy strips negotiation headers, no
/// `Accept`/`Accept-Encoding` survives.
pub fn build_request(
    endpoint: &Endpoint,
    body: Bytes,
    default_headers: &HeaderMap,
    policy: &ClientPolicy,
) -> Result<Request<Bytes>, RpcError> {
    let mut request = Request::builder()
        .method(Method::POST)
        .uri(endpoint.uri()?)
        .body(body)
        .map_err(|e| RpcError::api(format!("failed to build request: {}", e)))?;

    let headers = request.headers_mut();
    for (name, value) in default_headers {
        headers.append(name, value.clone());
    }
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    if policy.strips_negotiation_headers() {
        headers.remove(ACCEPT);
        headers.remove(ACCEPT_ENCODING);
    }

    Ok(request)
}

/// Build the request and hand it to `transport`.
///
/// Transport failures are returned as they are: a refused connection is a
/// [`RpcError::Timeout`], never an empty response.
pub async fn dispatch<T: Transport + ?Sized>(
    transport: &T,
    endpoint: &Endpoint,
    body: Bytes,
    default_headers: &HeaderMap,
    policy: &ClientPolicy,
) -> Result<RawResponse, RpcError> {
    let request = build_request(endpoint, body, default_headers, policy)?;
    transport.send(request).await
}
