//! Core protocol types for the rpc-centre JSON envelope protocol.
//!
//! This crate provides the wire types used by `rpc-centre-client`. It does
//! no I/O: everything here is pure encoding, decoding and classification.
//!
//! ## Modules
//!
//! - `envelope`: Request and response envelopes (`{m, v, p}` and
//!   `{code, enmsg, cnmsg, data}`)
//! - `error`: Error kinds and the [`RpcError`] taxonomy
//! - `parameters`: The [`ParameterSet`] carried in the `p` field

mod envelope;
mod error;
mod parameters;

pub use envelope::*;
pub use error::*;
pub use parameters::*;
