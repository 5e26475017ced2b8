//! Response-side modules for the rpc-centre client.
//!
//! - [`ResponseValidator`]: Classifies a raw HTTP response into a payload or
//!   exactly one [`RpcError`](crate::RpcError)

mod validator;

pub use validator::ResponseValidator;
