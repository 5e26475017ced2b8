//! Call parameters carried in the `p` field of a request envelope.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::RpcError;

/// String-keyed parameters of a call.
///
/// Always serializes to a JSON object. Key order is irrelevant to the
/// protocol.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet(Map<String, Value>);

impl ParameterSet {
    /// Create an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a parameter set from any value that serializes to a JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Api`] if serialization fails or the value is not an
    /// object (arrays, scalars and null are rejected).
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self, RpcError> {
        let value = serde_json::to_value(value)
            .map_err(|e| RpcError::api(format!("parameter encoding failed: {}", e)))?;
        Self::try_from(value)
    }

    /// Insert or replace a parameter.
    pub fn insert<K: Into<String>, V: Into<Value>>(&mut self, key: K, value: V) {
        self.0.insert(key.into(), value.into());
    }

    /// Remove a parameter, returning it if it was present.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the underlying JSON object.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consume the set and return the underlying JSON object.
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for ParameterSet {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for ParameterSet {
    type Error = RpcError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(RpcError::api(format!(
                "parameters must be a JSON object, got {}",
                json_type_name(&other)
            ))),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Name of a JSON value's type, for diagnostics.
pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    #[derive(Serialize)]
    struct Lookup {
        id: u32,
        name: &'static str,
    }

    #[test]
    fn test_from_serialize_struct() {
        let params = ParameterSet::from_serialize(&Lookup { id: 7, name: "x" }).unwrap();
        assert_eq!(params.get("id"), Some(&json!(7)));
        assert_eq!(params.get("name"), Some(&json!("x")));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_from_serialize_rejects_non_object() {
        let err = ParameterSet::from_serialize(&vec![1, 2, 3]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ApiError);
        assert!(err.message().contains("array"));

        let err = ParameterSet::from_serialize(&42).unwrap_err();
        assert!(err.message().contains("number"));
    }

    #[test]
    fn test_insert_and_remove() {
        let mut params = ParameterSet::new();
        assert!(params.is_empty());

        params.insert("a", 1);
        params.insert("a", 2);
        assert_eq!(params.get("a"), Some(&json!(2)));

        assert_eq!(params.remove("a"), Some(json!(2)));
        assert_eq!(params.remove("a"), None);
        assert!(!params.contains_key("a"));
    }

    #[test]
    fn test_serializes_as_plain_object() {
        let params: ParameterSet = [("a", 1)].into_iter().collect();
        assert_eq!(serde_json::to_string(&params).unwrap(), r#"{"a":1}"#);
    }
}
