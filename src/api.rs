//! Envelopes of the bridge REST API.
//!
//! Mutating calls answer with a list of entries, each either
//! `{"success": ...}` or `{"error": {"type", "address", "description"}}`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::Error;

type Result<T> = std::result::Result<T, Error>;

/// One entry of a bridge answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum ApiResult<T> {
    Success(T),
    Error(ApiError),
}

/// Error entry reported by the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(rename = "type")]
    pub code: u16,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub description: String,
}

impl From<ApiError> for Error {
    fn from(err: ApiError) -> Self {
        Error::Api {
            code: err.code,
            address: err.address,
            description: err.description,
        }
    }
}

/// Success payload of the registration call.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Registered {
    pub username: String,
}

/// Decode a list of result entries.
pub(crate) fn results<T: DeserializeOwned>(value: Value) -> Result<Vec<ApiResult<T>>> {
    serde_json::from_value(value).map_err(Error::json_load)
}

/// Fail if a read answered with error entries instead of the resource.
///
/// Reads of a missing resource come back as `[{"error": ...}]` rather than
/// an HTTP error status.
pub(crate) fn check_read(value: Value) -> Result<Value> {
    if let Value::Array(entries) = &value
        && let Some(first) = entries.first()
        && let Some(err) = first.get("error")
    {
        let err: ApiError = serde_json::from_value(err.clone()).map_err(Error::json_load)?;
        return Err(err.into());
    }
    Ok(value)
}

/// First error entry of a write answer, if any.
pub(crate) fn first_error(value: &Value) -> Result<Option<ApiError>> {
    let Value::Array(entries) = value else {
        return Ok(None);
    };
    entries
        .iter()
        .find_map(|entry| entry.get("error"))
        .map(|err| serde_json::from_value(err.clone()).map_err(Error::json_load))
        .transpose()
}

/// Fold the success entries of a state write into one record.
///
/// Each success maps a resource path to its new value; only the trailing
/// path segment is kept, so `/lights/3/state/bri` contributes `bri`. Any
/// error entry fails the whole write.
pub(crate) fn fold_success(value: Value) -> Result<Map<String, Value>> {
    let mut folded = Map::new();
    for entry in results::<Map<String, Value>>(value)? {
        match entry {
            ApiResult::Success(changes) => {
                for (path, value) in changes {
                    let attribute = path.rsplit('/').next().unwrap_or(&path).to_string();
                    folded.insert(attribute, value);
                }
            }
            ApiResult::Error(err) => return Err(err.into()),
        }
    }
    Ok(folded)
}
