//! Configuration modules for the rpc-centre client.
//!
//! - [`EndpointConfig`] / [`RpcCentreConfig`]: Where services live
//! - [`ClientPolicy`]: Header stripping, 503 handling, error mapping

mod endpoint;
mod policy;

pub use endpoint::{ConfigProvider, EndpointConfig, RpcCentreConfig};
pub use policy::{ClientPolicy, DiscoveryCheck, ExceptionMapper, UnavailabilityPolicy};
