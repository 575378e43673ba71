//! Entry point handed out by [`crate::connect`].

use std::fmt;
use std::sync::Arc;

use log::debug;
use serde_json::Value;

use crate::api;
use crate::connect::{Connection, ConnectionHandle};
use crate::errors::Error;
use crate::lights::Lights;
use crate::state::{Session, SessionState, TransitionTime};
use crate::transport::Transport;

type Result<T> = std::result::Result<T, Error>;

/// A (possibly not yet established) connection to a Hue bridge.
///
/// Cheap to clone; clones share the connection attempt and the session.
#[derive(Clone)]
pub struct Hue {
    transport: Arc<dyn Transport>,
    state: Arc<SessionState>,
    connection: ConnectionHandle,
}

impl Hue {
    pub(crate) fn new(
        transport: Arc<dyn Transport>,
        state: Arc<SessionState>,
        connection: ConnectionHandle,
    ) -> Self {
        Hue {
            transport,
            state,
            connection,
        }
    }

    pub fn lights(&self) -> Lights {
        Lights::new(self.clone())
    }

    /// Wait for the bridge connection, establishing it on first use.
    pub async fn connection(&self) -> Result<Connection> {
        self.connection.get().await
    }

    pub fn handle(&self) -> &ConnectionHandle {
        &self.connection
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Default transition applied to state writes.
    pub fn transition_time(&self) -> TransitionTime {
        self.state
            .get()
            .transition_time
            .unwrap_or(TransitionTime::NONE)
    }

    pub fn set_transition_time(&self, transition: impl Into<TransitionTime>) {
        self.state
            .apply_patch(Session::default().with_transition_time(transition.into()));
    }

    /// Read `path` under the user's API root.
    pub(crate) async fn read(&self, path: &str) -> Result<Value> {
        let connection = self.connection().await?;
        let url = connection.url(path);
        debug!("reading {url}");
        self.transport.get(&url).await.and_then(api::check_read)
    }

    /// Write `body` to `path` under the user's API root.
    pub(crate) async fn write(&self, path: &str, body: Value) -> Result<Value> {
        let connection = self.connection().await?;
        let url = connection.url(path);
        debug!("writing {url}: {body}");
        self.transport.put(&url, body).await
    }
}

impl fmt::Debug for Hue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hue")
            .field("phase", &self.connection.phase())
            .field("state", &self.state)
            .finish()
    }
}
