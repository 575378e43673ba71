//! Light records as reported by the bridge.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::Error;

/// A light as returned by `GET lights` or `GET lights/<id>`, plus its id.
///
/// The bridge never includes the id in the record itself; it is taken from
/// the resource key. Every other attribute is kept as is in
/// [`LightRecord::attributes`], explicit `null`s included, so serializing a
/// record yields the bridge payload with `id` as the only extra key.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct LightRecord {
    #[serde(default)]
    pub id: u32,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl LightRecord {
    /// Parse a raw bridge record and attach `id`.
    pub fn from_raw(id: u32, raw: Value) -> Result<Self, Error> {
        let mut record: LightRecord = serde_json::from_value(raw).map_err(Error::json_load)?;
        record.id = id;
        Ok(record)
    }

    pub fn name(&self) -> Option<&str> {
        self.attributes.get("name").and_then(Value::as_str)
    }

    /// Typed view of the `state` object, if the record has one.
    pub fn state(&self) -> Option<LightState> {
        self.attributes
            .get("state")
            .and_then(|state| serde_json::from_value(state.clone()).ok())
    }

    pub fn is_on(&self) -> Option<bool> {
        self.state().and_then(|s| s.on)
    }

    pub fn brightness(&self) -> Option<u8> {
        self.state().and_then(|s| s.bri)
    }
}

/// The `state` object of a light.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct LightState {
    #[serde(default)]
    pub on: Option<bool>,
    #[serde(default)]
    pub bri: Option<u8>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}
