//! rpc-centre client demo.
//!
//! Calls the mock service once per method and prints how each outcome is
//! classified.
//!
//! Usage:
//!   # First, start the mock server in another terminal:
//!   cargo run --bin mock-server
//!
//!   # Then run the demo (defaults to 127.0.0.1:3000):
//!   cargo run --bin demo-client
//!
//!   # Or point it at a config file:
//!   cargo run --bin demo-client -- rpc-centre.toml

use std::env;
use std::time::Duration;

use futures::future::BoxFuture;
use rpc_centre_client::{
    ClientPolicy, DiscoveryCheck, EndpointConfig, RemoteMethod, RpcCentreConfig, RpcClient,
    ServiceIdentity, UnavailabilityPolicy,
};
use serde::Deserialize;

/// Echo method of the user service, known at compile time.
struct EchoUser;

impl RemoteMethod for EchoUser {
    const SERVICE: &'static str = "user";
    const METHOD: &'static str = "echo";
}

#[derive(Debug, Deserialize)]
struct Echo {
    service: String,
    parameters: serde_json::Value,
}

/// Discovery stand-in that always reports the instance as still registered.
struct StillRegistered;

impl DiscoveryCheck for StillRegistered {
    fn is_server_gone<'a>(&'a self, service: &'a str) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            tracing::info!(%service, "discovery lookup: instance still registered");
            false
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rpc_centre_examples::init_tracing();

    let config = match env::args().nth(1) {
        Some(path) => RpcCentreConfig::from_path(path)?,
        None => {
            let addr = rpc_centre_examples::server_addr()?;
            RpcCentreConfig {
                group: EndpointConfig::new(addr.ip().to_string()).port(addr.port()),
                ..Default::default()
            }
        }
    };

    println!("=== rpc-centre client demo ===");
    println!();

    let client = RpcClient::builder(config.clone())
        .timeout(Duration::from_secs(1))
        .build()?;

    println!("Typed call:");
    {
        let echo: Echo = client
            .call_method::<EchoUser>()
            .with_parameter("id", 7)
            .with_parameter("verbose", true)
            .without_parameter("verbose")
            .result_as()
            .await?;
        println!("  OK: {} echoed {}", echo.service, echo.parameters);
    }

    println!("Outcome per method:");
    for method in ["echo", "empty", "fail", "garbage", "array", "unavailable", "slow"] {
        let outcome = client
            .invoke(ServiceIdentity::new("order", method), None)
            .await;
        match outcome {
            Ok(Some(data)) => println!("  {method}: ok, data = {}", serde_json::Value::Object(data)),
            Ok(None) => println!("  {method}: ok, no data"),
            Err(e) => println!("  {method}: {} ({})", e.kind(), e),
        }
    }

    println!("Result is delivered once and remembered:");
    {
        let mut call = client.call(ServiceIdentity::new("order", "fail"));
        let first = call.result().await.err();
        let second = call.result().await.err();
        println!(
            "  same error twice without resending: {}",
            first.is_some() && first == second
        );
    }

    println!("503 checked against discovery:");
    {
        let checked = RpcClient::builder(config.clone())
            .policy(
                ClientPolicy::rpc()
                    .unavailability(UnavailabilityPolicy::discovery_checked(StillRegistered)),
            )
            .build()?;
        match checked
            .invoke(ServiceIdentity::new("order", "unavailable"), None)
            .await
        {
            Ok(_) => println!("  unexpected success"),
            Err(e) => println!("  {}: {}", e.kind(), e),
        }
    }

    println!();
    println!("Done.");
    Ok(())
}
