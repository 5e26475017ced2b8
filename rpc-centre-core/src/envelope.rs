//! rpc-centre request and response envelopes.
//!
//! Every call is a single HTTP POST whose body is a request envelope:
//!
//! ```text
//! {"m": "<method>", "v": <version>, "p": <object|null>}
//! ```
//!
//! and whose response body is a response envelope:
//!
//! ```text
//! {"code": <int>, "enmsg": "<string>", "cnmsg": "<string>", "data": <object?>}
//! ```

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::RpcError;
use crate::parameters::{ParameterSet, json_type_name};

/// The `data` object of a successful response.
pub type Payload = Map<String, Value>;

/// Protocol version sent when a call does not override it.
pub const DEFAULT_VERSION: u32 = 1;

/// Envelope `code` of a successful response.
pub const SUCCESS_CODE: i64 = 200;

/// Envelope `enmsg` of a successful response.
pub const SUCCESS_MESSAGE: &str = "ok";

/// Message of the error raised when the body is not JSON.
pub const JSON_DECODE_FAIL: &str = "Json decode fail";

/// Message of the error raised when the body is JSON but not an envelope.
pub const INVALID_RESPONSE_FORMAT: &str = "Invalid response format";

/// Request body of a call.
///
/// Field order is fixed: `m`, `v`, `p`. `p` is always present and is `null`
/// when the call carries no parameters.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RequestEnvelope<'a> {
    #[serde(rename = "m")]
    method: &'a str,
    #[serde(rename = "v")]
    version: u32,
    #[serde(rename = "p")]
    parameters: Option<&'a ParameterSet>,
}

impl<'a> RequestEnvelope<'a> {
    pub fn new(method: &'a str, version: u32, parameters: Option<&'a ParameterSet>) -> Self {
        Self {
            method,
            version,
            parameters,
        }
    }

    pub fn method(&self) -> &str {
        self.method
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn parameters(&self) -> Option<&ParameterSet> {
        self.parameters
    }

    /// Serialize the envelope to the request body.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Api`] if a parameter value cannot be encoded.
    pub fn encode(&self) -> Result<Bytes, RpcError> {
        serde_json::to_vec(self)
            .map(Bytes::from)
            .map_err(|e| RpcError::api(format!("request encoding failed: {}", e)))
    }
}

/// Response envelope as it appears on the wire, before validation.
#[derive(Deserialize)]
struct WireResponse {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    enmsg: Option<String>,
    #[serde(default)]
    cnmsg: Option<String>,
    #[serde(default)]
    data: Option<Value>,
}

/// A structurally valid response envelope.
///
/// Holding one does not mean the call succeeded; see
/// [`is_success`](Self::is_success).
#[derive(Clone, Debug, PartialEq)]
pub struct ResponseEnvelope {
    code: i64,
    enmsg: String,
    cnmsg: String,
    data: Option<Payload>,
}

impl ResponseEnvelope {
    /// Create an envelope directly, mainly for servers and tests.
    pub fn new<E: Into<String>, C: Into<String>>(
        code: i64,
        enmsg: E,
        cnmsg: C,
        data: Option<Payload>,
    ) -> Self {
        Self {
            code,
            enmsg: enmsg.into(),
            cnmsg: cnmsg.into(),
            data,
        }
    }

    /// Parse and structurally validate a response body.
    ///
    /// - A body that is not JSON fails with `Json decode fail`.
    /// - A body that is not an object, or lacks a non-null `code` or `enmsg`,
    ///   fails with `Invalid response format`. `cnmsg` is required as well,
    ///   except on the success sentinel where an absent `cnmsg` reads as empty.
    /// - A present, non-null `data` must be a JSON object.
    ///
    /// All failures are [`RpcError::InvalidFormat`].
    pub fn decode(body: &[u8]) -> Result<Self, RpcError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|_| RpcError::InvalidFormat(JSON_DECODE_FAIL.to_string()))?;

        if !value.is_object() {
            return Err(invalid_format());
        }
        let wire: WireResponse = serde_json::from_value(value).map_err(|_| invalid_format())?;

        let (Some(code), Some(enmsg)) = (wire.code, wire.enmsg) else {
            return Err(invalid_format());
        };
        let cnmsg = match wire.cnmsg {
            Some(cnmsg) => cnmsg,
            None if is_success(code, &enmsg) => String::new(),
            None => return Err(invalid_format()),
        };

        let data = match wire.data {
            None => None,
            Some(Value::Object(map)) => Some(map),
            Some(other) => {
                return Err(RpcError::InvalidFormat(format!(
                    "{}: data must be an object, got {}",
                    INVALID_RESPONSE_FORMAT,
                    json_type_name(&other)
                )));
            }
        };

        Ok(Self {
            code,
            enmsg,
            cnmsg,
            data,
        })
    }

    /// Serialize the envelope, mainly for servers and tests.
    pub fn encode(&self) -> Bytes {
        let mut body = Map::new();
        body.insert("code".into(), self.code.into());
        body.insert("enmsg".into(), self.enmsg.clone().into());
        body.insert("cnmsg".into(), self.cnmsg.clone().into());
        if let Some(data) = &self.data {
            body.insert("data".into(), Value::Object(data.clone()));
        }
        Bytes::from(Value::Object(body).to_string())
    }

    pub fn code(&self) -> i64 {
        self.code
    }

    pub fn enmsg(&self) -> &str {
        &self.enmsg
    }

    pub fn cnmsg(&self) -> &str {
        &self.cnmsg
    }

    pub fn data(&self) -> Option<&Payload> {
        self.data.as_ref()
    }

    /// Returns true iff `code == 200` and `enmsg == "ok"`, compared exactly.
    pub fn is_success(&self) -> bool {
        is_success(self.code, &self.enmsg)
    }

    /// Consume the envelope and return its payload.
    pub fn into_data(self) -> Option<Payload> {
        self.data
    }

    /// The api error describing this envelope: `[code] enmsg cnmsg`.
    pub fn to_error(&self) -> RpcError {
        RpcError::from_envelope(self.code, &self.enmsg, &self.cnmsg)
    }
}

fn is_success(code: i64, enmsg: &str) -> bool {
    code == SUCCESS_CODE && enmsg == SUCCESS_MESSAGE
}

fn invalid_format() -> RpcError {
    RpcError::InvalidFormat(INVALID_RESPONSE_FORMAT.to_string())
}
