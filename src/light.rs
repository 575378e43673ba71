//! Individual light control.

use log::debug;
use serde_json::json;

use crate::api;
use crate::errors::Error;
use crate::hue::Hue;
use crate::types::{Brightness, LightRecord, LightRef, StateChange, StateUpdate};

type Result<T> = std::result::Result<T, Error>;

/// A handle to a single light on the bridge.
///
/// Obtained from [`crate::Lights::get`]. Every operation resolves to `None`
/// when the light was addressed by a name no light carries.
///
/// Addressed by id, writes go straight to the light's resource; the record is
/// only fetched by the reads that need it. Addressed by name, every operation
/// first fetches the light list to find the id.
///
/// # Example
///
/// ```ignore
/// use hue_command_rs::{ConnectOptions, connect};
///
/// let hue = connect(ConnectOptions::default().address("192.168.1.2").username("abc"));
/// let hallway = hue.lights().get("Hallway 1");
/// if hallway.is_on().await? == Some(false) {
///     hallway.on().await?;
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Light {
    hue: Hue,
    target: LightRef,
}

impl Light {
    pub(crate) fn new(hue: Hue, target: LightRef) -> Self {
        Light { hue, target }
    }

    /// How this light is addressed.
    pub fn target(&self) -> &LightRef {
        &self.target
    }

    /// Fetch the current record.
    pub async fn value(&self) -> Result<Option<LightRecord>> {
        match &self.target {
            LightRef::Id(id) => {
                let raw = self.hue.read(&format!("lights/{id}")).await?;
                LightRecord::from_raw(*id, raw).map(Some)
            }
            LightRef::Name(name) => self.hue.lights().find_by_name(name).await,
        }
    }

    pub async fn name(&self) -> Result<Option<String>> {
        Ok(self.value().await?.and_then(|r| r.name().map(str::to_string)))
    }

    /// Rename the light. Resolves to the new name, since the bridge does not
    /// echo it back.
    pub async fn rename(&self, name: &str) -> Result<Option<String>> {
        let Some(id) = self.id().await? else {
            return Ok(None);
        };

        let response = self
            .hue
            .write(&format!("lights/{id}"), json!({ "name": name }))
            .await?;
        if let Some(err) = api::first_error(&response)? {
            return Err(err.into());
        }
        Ok(Some(name.to_string()))
    }

    pub async fn brightness(&self) -> Result<Option<u8>> {
        Ok(self.value().await?.and_then(|r| r.brightness()))
    }

    /// Set the brightness; resolves to the brightness the bridge applied.
    pub async fn set_brightness(&self, brightness: Brightness) -> Result<Option<u8>> {
        let update = self.state(StateChange::new().brightness(brightness)).await?;
        Ok(update.and_then(|u| u.bri()))
    }

    pub async fn is_on(&self) -> Result<Option<bool>> {
        Ok(self.value().await?.and_then(|r| r.is_on()))
    }

    pub async fn on(&self) -> Result<Option<bool>> {
        self.toggle(true).await
    }

    pub async fn off(&self) -> Result<Option<bool>> {
        self.toggle(false).await
    }

    /// Switch the light on or off; resolves to the power state applied.
    pub async fn toggle(&self, on: bool) -> Result<Option<bool>> {
        let update = self.state(StateChange::new().on(on)).await?;
        Ok(update.and_then(|u| u.on()))
    }

    /// Apply `change` in a single write.
    ///
    /// The session's default transition time is added unless it is
    /// [`crate::TransitionTime::BridgeDefault`] or `change` sets its own. The
    /// write either applies entirely or fails.
    pub async fn state(&self, change: StateChange) -> Result<Option<StateUpdate>> {
        if change.is_empty() {
            return Err(Error::NoAttribute);
        }

        let mut change = change;
        if !change.has_transition_time()
            && let Some(ds) = self.hue.transition_time().deciseconds()
        {
            change = change.transition_time(ds);
        }

        let Some(id) = self.id().await? else {
            debug!("no light matches {}", self.target);
            return Ok(None);
        };

        let body = serde_json::to_value(&change).map_err(Error::json_dump)?;
        let response = self.hue.write(&format!("lights/{id}/state"), body).await?;
        let values = api::fold_success(response)?;
        Ok(Some(StateUpdate { id, values }))
    }

    /// The id to write to; only a name needs a lookup.
    async fn id(&self) -> Result<Option<u32>> {
        match &self.target {
            LightRef::Id(id) => Ok(Some(*id)),
            LightRef::Name(name) => Ok(self
                .hue
                .lights()
                .find_by_name(name)
                .await?
                .map(|r| r.id)),
        }
    }
}
