//! Value types for addressing lights and describing their state.

mod brightness;
mod effect;
mod light_ref;
mod record;
mod state_change;
mod state_update;

pub use brightness::Brightness;
pub use effect::{Alert, Effect};
pub use light_ref::LightRef;
pub use record::{LightRecord, LightState};
pub use state_change::StateChange;
pub use state_update::StateUpdate;
