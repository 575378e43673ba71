//! Result of a state write.

use serde::Serialize;
use serde_json::{Map, Value};

/// Attributes a state write changed, keyed by attribute name, with the id of
/// the light they belong to.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct StateUpdate {
    pub id: u32,
    #[serde(flatten)]
    pub values: Map<String, Value>,
}

impl StateUpdate {
    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.values.get(attribute)
    }

    pub fn on(&self) -> Option<bool> {
        self.get("on").and_then(Value::as_bool)
    }

    pub fn bri(&self) -> Option<u8> {
        self.get("bri")
            .and_then(Value::as_u64)
            .and_then(|b| u8::try_from(b).ok())
    }
}
