//! # hue_command_rs
//!
//! An async Rust client for Philips Hue bridges.
//!
//! The crate finds a bridge on the local network, registers an application
//! user with it and exposes the bridge's lights through a small handle API.
//! Connecting is lazy: nothing goes over the wire until the first light
//! operation, and the resulting connection is shared by every later call.
//!
//! ## Quick Start
//!
//! ```ignore
//! use hue_command_rs::{Brightness, ConnectOptions, connect};
//!
//! async fn dim_bookcase() -> Result<(), hue_command_rs::Error> {
//!     // Discovers the bridge and registers; press the link button first.
//!     let hue = connect(ConnectOptions::default());
//!
//!     let bookcase = hue.lights().get("Bookcase");
//!     bookcase.on().await?;
//!     bookcase.set_brightness(Brightness::clamped(50)).await?;
//!
//!     for name in hue.lights().names().await? {
//!         println!("{name}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Lazy connection**: [`connect`] returns at once; discovery, registration
//!   and a connectivity probe run on first use, exactly once
//! - **Registration retry**: a fixed-delay loop waits for the link button,
//!   tuned through [`RetryPolicy`]
//! - **Lights by id or name**: [`Lights::get`] accepts either, see [`LightRef`]
//! - **Atomic state writes**: [`Light::state`] sends one [`StateChange`]
//! - **Session**: defaults, persisted values and runtime patches merged in
//!   [`SessionState`], optionally backed by a [`FileStore`]
//! - **Pluggable transport**: every request goes through a [`Transport`]
//!
//! ## Feature Flags
//!
//! - `http` (default): [`HttpTransport`], backed by `reqwest`
//! - `runtime-tokio` (default): Use the tokio async runtime for retry pauses
//! - `runtime-async-std`: Use the async-std runtime
//! - `runtime-smol`: Use the smol runtime
//!
//! Without `http`, pass your own transport to
//! [`ConnectOptions::with_transport`].

mod api;
mod config;
mod connect;
mod discovery;
mod errors;
mod hue;
mod light;
mod lights;
mod replay;
pub mod runtime;
mod state;
#[cfg(test)]
mod testing;
mod transport;
mod types;

// Re-export public API
pub use api::ApiError;
pub use config::BridgeConfig;
pub use connect::{
    APP_NAME, ConnectOptions, Connection, ConnectionHandle, Delay, Phase, connect,
};
pub use discovery::{DiscoveredBridge, NUPNP_URL, discover_bridges};
pub use errors::{Error, Method};
pub use hue::Hue;
pub use light::Light;
pub use lights::{LightMap, Lights};
pub use replay::Replay;
pub use state::{
    FileStore, RetryPolicy, Session, SessionKey, SessionState, SessionStore, TransitionTime,
};
#[cfg(feature = "http")]
pub use transport::HttpTransport;
pub use transport::{Request, Transport};
pub use types::{
    Alert, Brightness, Effect, LightRecord, LightRef, LightState, StateChange, StateUpdate,
};
