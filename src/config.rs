//! Bridge configuration fetched once after connecting.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Configuration reported by `GET /api/<username>/config`.
///
/// Only the commonly useful fields are typed; everything else the bridge
/// reports is kept in [`BridgeConfig::extra`].
#[serde_with::skip_serializing_none]
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct BridgeConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub bridgeid: Option<String>,
    #[serde(default)]
    pub mac: Option<String>,
    #[serde(default)]
    pub ipaddress: Option<String>,
    #[serde(default)]
    pub modelid: Option<String>,
    #[serde(default)]
    pub apiversion: Option<String>,
    #[serde(default)]
    pub swversion: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
