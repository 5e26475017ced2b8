//! Request-side modules for the rpc-centre client.
//!
//! - [`build_request`]: Turns an encoded envelope into the outgoing HTTP request
//! - [`dispatch`]: Sends it over a [`Transport`](crate::transport::Transport)

mod dispatcher;

pub use dispatcher::{build_request, dispatch};
