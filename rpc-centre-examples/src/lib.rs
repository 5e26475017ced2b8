//! Shared pieces of the rpc-centre demos: a mock envelope service and
//! logging setup.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use serde_json::{Value, json};

/// Returns the server address from the PORT env var, defaulting to 3000.
///
/// # Example
///
/// ```ignore
/// let addr = rpc_centre_examples::server_addr()?;
/// let listener = tokio::net::TcpListener::bind(addr).await?;
/// ```
pub fn server_addr() -> anyhow::Result<SocketAddr> {
    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".into());
    Ok(format!("127.0.0.1:{port}").parse()?)
}

/// Install a `tracing` subscriber filtered by `RUST_LOG`
/// (default: `info,rpc_centre_client=debug`).
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,rpc_centre_client=debug"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Methods understood by [`mock_router`] and what they answer.
pub const METHODS: &[(&str, &str)] = &[
    ("echo", "success, data echoes the request"),
    ("empty", "success without data"),
    ("fail", "envelope failure code 500"),
    ("garbage", "body that is not JSON"),
    ("array", "data that is an array"),
    ("unavailable", "HTTP 503"),
    ("slow", "success after 2 seconds"),
];

#[derive(Clone, Default)]
struct MockState {
    requests: Arc<AtomicUsize>,
}

/// Router serving `POST /{service}` with the envelope protocol.
pub fn mock_router() -> Router {
    Router::new()
        .route("/{service}", post(handle))
        .with_state(MockState::default())
}

fn envelope(body: Value) -> Response {
    (StatusCode::OK, axum::Json(body)).into_response()
}

async fn handle(
    State(state): State<MockState>,
    Path(service): Path<String>,
    axum::Json(request): axum::Json<Value>,
) -> Response {
    let seen = state.requests.fetch_add(1, Ordering::SeqCst);
    let method = request["m"].as_str().unwrap_or_default();
    tracing::info!(%service, %method, seen, "envelope received");

    match method {
        "echo" => envelope(json!({
            "code": 200,
            "enmsg": "ok",
            "cnmsg": "成功",
            "data": {"service": service, "parameters": request["p"]},
        })),
        "empty" => envelope(json!({"code": 200, "enmsg": "ok"})),
        "fail" => envelope(json!({"code": 500, "enmsg": "fail", "cnmsg": "失败"})),
        "garbage" => (StatusCode::OK, "<html>maintenance</html>").into_response(),
        "array" => envelope(json!({"code": 200, "enmsg": "ok", "cnmsg": "", "data": [1, 2, 3]})),
        "unavailable" => StatusCode::SERVICE_UNAVAILABLE.into_response(),
        "slow" => {
            tokio::time::sleep(Duration::from_secs(2)).await;
            envelope(json!({"code": 200, "enmsg": "ok"}))
        }
        other => envelope(json!({
            "code": 404,
            "enmsg": format!("unknown method {other}"),
            "cnmsg": "未知方法",
        })),
    }
}
