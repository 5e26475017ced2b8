//! Mock rpc-centre service.
//!
//! Answers `POST /{service}` envelopes with every outcome the client knows
//! how to classify.
//!
//! Run with: cargo run --bin mock-server
//! Then:     cargo run --bin demo-client

use rpc_centre_examples::{METHODS, init_tracing, mock_router, server_addr};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let addr = server_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    println!("=== Mock rpc-centre service ===");
    println!("Listening on http://{}", addr);
    println!();
    println!("Methods (any service name):");
    for (method, answer) in METHODS {
        println!("  - {method}: {answer}");
    }
    println!();
    println!("Test with:");
    println!("  curl -X POST http://{}/user \\", addr);
    println!("    -H 'Content-Type: application/json' \\");
    println!("    -d '{{\"m\": \"echo\", \"v\": 1, \"p\": {{\"id\": 7}}}}'");

    axum::serve(listener, mock_router()).await?;
    Ok(())
}
