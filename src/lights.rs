//! The light collection of a bridge.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::errors::Error;
use crate::hue::Hue;
use crate::light::Light;
use crate::types::{LightRecord, LightRef};

type Result<T> = std::result::Result<T, Error>;

/// Every light on the bridge, keyed by id as reported by the bridge.
pub type LightMap = BTreeMap<String, LightRecord>;

/// Entry point for light operations, obtained from [`Hue::lights`].
#[derive(Debug, Clone)]
pub struct Lights {
    hue: Hue,
}

impl Lights {
    pub(crate) fn new(hue: Hue) -> Self {
        Lights { hue }
    }

    /// Fetch every light, with its id attached.
    pub async fn all(&self) -> Result<LightMap> {
        let raw = self.hue.read("lights").await?;
        let Value::Object(entries) = raw else {
            return Err(Error::UnexpectedResponse(format!(
                "expected an object of lights, got {raw}"
            )));
        };

        entries
            .into_iter()
            .map(|(key, light)| {
                let id = key
                    .parse::<u32>()
                    .map_err(|_| Error::UnexpectedResponse(format!("invalid light id {key:?}")))?;
                Ok((key, LightRecord::from_raw(id, light)?))
            })
            .collect()
    }

    /// Names of every light, ordered by id.
    pub async fn names(&self) -> Result<Vec<String>> {
        let mut records: Vec<LightRecord> = self.all().await?.into_values().collect();
        records.sort_by_key(|r| r.id);
        Ok(records.into_iter().filter_map(|r| r.name().map(str::to_string)).collect())
    }

    /// A handle to one light, by id or by name.
    ///
    /// No request is made here. An id is used as is; a name is looked up
    /// among all lights each time the handle is used.
    pub fn get(&self, light: impl Into<LightRef>) -> Light {
        Light::new(self.hue.clone(), light.into())
    }

    /// Last light named `name`, if any.
    pub(crate) async fn find_by_name(&self, name: &str) -> Result<Option<LightRecord>> {
        Ok(self
            .all()
            .await?
            .into_values()
            .filter(|r| r.name() == Some(name))
            .max_by_key(|r| r.id))
    }
}
