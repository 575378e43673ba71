//! State changes written to a light.

use serde::{Deserialize, Serialize};

use super::{Alert, Brightness, Effect};

/// Attributes to change on a light in a single write.
///
/// # Example
///
/// ```
/// use hue_command_rs::{Brightness, StateChange};
///
/// let change = StateChange::new()
///     .on(true)
///     .brightness(Brightness::create(100).unwrap());
/// assert!(!change.is_empty());
/// assert_eq!(
///     serde_json::to_value(&change).unwrap(),
///     serde_json::json!({"on": true, "bri": 100})
/// );
/// ```
#[serde_with::skip_serializing_none]
#[derive(Default, Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StateChange {
    pub(crate) on: Option<bool>,
    pub(crate) bri: Option<u8>,
    pub(crate) hue: Option<u16>,
    pub(crate) sat: Option<u8>,
    pub(crate) ct: Option<u16>,
    pub(crate) xy: Option<[f64; 2]>,
    pub(crate) alert: Option<Alert>,
    pub(crate) effect: Option<Effect>,
    pub(crate) transitiontime: Option<u16>,
}

impl StateChange {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether no attribute is set.
    pub fn is_empty(&self) -> bool {
        self.on.is_none()
            && self.bri.is_none()
            && self.hue.is_none()
            && self.sat.is_none()
            && self.ct.is_none()
            && self.xy.is_none()
            && self.alert.is_none()
            && self.effect.is_none()
            && self.transitiontime.is_none()
    }

    pub fn on(mut self, on: bool) -> Self {
        self.on = Some(on);
        self
    }

    pub fn brightness(mut self, brightness: Brightness) -> Self {
        self.bri = Some(brightness.value());
        self
    }

    /// Hue on the color wheel, 0-65535.
    pub fn hue(mut self, hue: u16) -> Self {
        self.hue = Some(hue);
        self
    }

    /// Saturation, 0 (white) to 254 (most saturated).
    pub fn saturation(mut self, sat: u8) -> Self {
        self.sat = Some(sat.min(254));
        self
    }

    /// Color temperature in mireds.
    pub fn color_temperature(mut self, mireds: u16) -> Self {
        self.ct = Some(mireds);
        self
    }

    /// CIE color space coordinates, each within 0-1.
    pub fn xy(mut self, x: f64, y: f64) -> Self {
        self.xy = Some([x.clamp(0.0, 1.0), y.clamp(0.0, 1.0)]);
        self
    }

    pub fn alert(mut self, alert: Alert) -> Self {
        self.alert = Some(alert);
        self
    }

    pub fn effect(mut self, effect: Effect) -> Self {
        self.effect = Some(effect);
        self
    }

    /// Transition for this write only, in multiples of 100ms.
    pub fn transition_time(mut self, deciseconds: u16) -> Self {
        self.transitiontime = Some(deciseconds);
        self
    }

    pub(crate) fn has_transition_time(&self) -> bool {
        self.transitiontime.is_some()
    }
}
