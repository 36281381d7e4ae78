//! Wire types for the backend interface: newline-delimited JSON, one
//! request line answered by one response line.

use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Opaque correlation handle issued by the backend for a submission.
/// Carries no semantics beyond identity; propagate it verbatim.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single named operation: on the wire this is a one-entry object mapping
/// the operation name to its parameters, e.g. `{"patchManifest": {...}}`.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationRequest {
    name: String,
    params: Map<String, Value>,
}

impl OperationRequest {
    pub fn new(name: impl Into<String>, params: Map<String, Value>) -> Self {
        OperationRequest {
            name: name.into(),
            params,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &Map<String, Value> {
        &self.params
    }
}

impl Serialize for OperationRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.name, &self.params)?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for OperationRequest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let object = Map::<String, Value>::deserialize(deserializer)?;
        let mut entries = object.into_iter();
        match (entries.next(), entries.next()) {
            (Some((name, Value::Object(params))), None) => {
                Ok(OperationRequest { name, params })
            }
            (Some(_), None) => Err(D::Error::custom(
                "operation parameters must be an object",
            )),
            _ => Err(D::Error::custom(
                "an operation must be an object with exactly one entry",
            )),
        }
    }
}

/// A request line sent to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Request {
    SubmitOperationsRequest(SubmitOperationsRequest),
}

/// A response line received from the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Response {
    SubmitOperationsResponse(SubmitOperationsResponse),
    ErrorResponse(ErrorResponse),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitOperationsRequest {
    /// Which provider implementation executes the operations.
    #[serde(rename = "cloudProvider")]
    pub cloud_provider: String,
    pub operations: Vec<OperationRequest>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitOperationsResponse {
    pub id: TaskId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
