//! Session state shared by a connection and its lights.
//!
//! The state is a snapshot of options (credential, bridge address, retry
//! policy, default transition time) that only ever grows: patches are merged
//! over the previous snapshot and a field, once set, can be overwritten but
//! never removed.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::{Mutex, RwLock};
use std::time::Duration;

use futures::channel::mpsc;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::{DurationMilliSeconds, serde_as};
use strum_macros::{AsRefStr, Display, EnumString};

/// How registration is retried while the bridge waits for its link button.
#[serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Additional attempts after the first one.
    pub total: u32,
    /// Fixed pause between attempts.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub timeout: Duration,
}

impl RetryPolicy {
    pub const fn new(total: u32, timeout: Duration) -> Self {
        RetryPolicy { total, timeout }
    }

    /// Fail on the first error.
    pub const fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(30, Duration::from_millis(1000))
    }
}

/// Default animation duration applied to state writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionTime {
    /// Leave `transitiontime` out of writes and let the bridge pick.
    BridgeDefault,
    /// Duration in multiples of 100ms.
    Deciseconds(u16),
}

impl TransitionTime {
    /// Instant transitions.
    pub const NONE: TransitionTime = TransitionTime::Deciseconds(0);

    /// Value to send with a write, if any.
    pub fn deciseconds(&self) -> Option<u16> {
        match self {
            TransitionTime::BridgeDefault => None,
            TransitionTime::Deciseconds(ds) => Some(*ds),
        }
    }
}

impl From<Duration> for TransitionTime {
    fn from(duration: Duration) -> Self {
        let ds = (duration.as_millis() / 100).min(u16::MAX as u128) as u16;
        TransitionTime::Deciseconds(ds)
    }
}

/// A snapshot of session options, or a patch to merge into one.
///
/// # Example
///
/// ```
/// use hue_command_rs::Session;
///
/// let mut session = Session::default().with_username("abc");
/// session.merge(&Session::default().with_address("10.0.0.2"));
/// assert_eq!(session.username.as_deref(), Some("abc"));
/// assert_eq!(session.address.as_deref(), Some("10.0.0.2"));
/// ```
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub username: Option<String>,
    pub address: Option<String>,
    pub retry_policy: Option<RetryPolicy>,
    pub transition_time: Option<TransitionTime>,
}

impl Session {
    /// Built-in defaults at the bottom of every merge.
    pub fn defaults() -> Self {
        Session {
            username: None,
            address: None,
            retry_policy: Some(RetryPolicy::default()),
            transition_time: Some(TransitionTime::NONE),
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    pub fn with_transition_time(mut self, transition: TransitionTime) -> Self {
        self.transition_time = Some(transition);
        self
    }

    /// Shallow merge: fields set in `patch` overwrite ours, unset ones are kept.
    pub fn merge(&mut self, patch: &Session) {
        if patch.username.is_some() {
            self.username.clone_from(&patch.username);
        }
        if patch.address.is_some() {
            self.address.clone_from(&patch.address);
        }
        if patch.retry_policy.is_some() {
            self.retry_policy = patch.retry_policy;
        }
        if patch.transition_time.is_some() {
            self.transition_time = patch.transition_time;
        }
    }

    /// Returns `self` with `patch` merged over it.
    pub fn merged(mut self, patch: &Session) -> Self {
        self.merge(patch);
        self
    }

    /// A single option as JSON, `None` when unset.
    pub fn get(&self, key: SessionKey) -> Option<Value> {
        match key {
            SessionKey::Username => self.username.as_ref().map(|u| Value::from(u.as_str())),
            SessionKey::Address => self.address.as_ref().map(|a| Value::from(a.as_str())),
            SessionKey::RetryPolicy => self
                .retry_policy
                .as_ref()
                .and_then(|p| serde_json::to_value(p).ok()),
            SessionKey::TransitionTime => self
                .transition_time
                .as_ref()
                .and_then(|t| serde_json::to_value(t).ok()),
        }
    }
}

/// Names of the session options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "camelCase")]
pub enum SessionKey {
    Username,
    Address,
    RetryPolicy,
    TransitionTime,
}

/// Best-effort persistence for session snapshots.
///
/// Implementations report failures, but [`SessionState`] never lets them
/// escape: an unavailable store simply behaves like an empty one.
pub trait SessionStore: Send + Sync {
    fn load(&self) -> io::Result<Option<Session>>;

    fn save(&self, session: &Session) -> io::Result<()>;

    fn clear(&self) -> io::Result<()>;
}

/// Stores the snapshot as a JSON document on disk.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStore { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl SessionStore for FileStore {
    fn load(&self) -> io::Result<Option<Session>> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    fn save(&self, session: &Session) -> io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_vec_pretty(session)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(&self.path, raw)
    }

    fn clear(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

/// The mergeable session record behind a connection.
///
/// [`SessionState::get`] folds, from lowest to highest precedence, the
/// built-in defaults, the persisted snapshot read at startup, and every patch
/// applied so far.
///
/// # Example
///
/// ```
/// use hue_command_rs::{Session, SessionState};
///
/// let state = SessionState::new(None);
/// state.apply_patch(Session::default().with_username("abc"));
/// state.apply_patch(Session::default().with_address("10.0.0.2"));
///
/// let snapshot = state.get();
/// assert_eq!(snapshot.username.as_deref(), Some("abc"));
/// assert_eq!(snapshot.address.as_deref(), Some("10.0.0.2"));
/// ```
pub struct SessionState {
    defaults: Session,
    persisted: Session,
    accumulated: RwLock<Session>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<Session>>>,
    store: Option<Box<dyn SessionStore>>,
}

impl SessionState {
    pub fn new(store: Option<Box<dyn SessionStore>>) -> Self {
        let persisted = match store.as_ref().map(|s| s.load()) {
            Some(Ok(Some(session))) => session,
            Some(Err(e)) => {
                debug!("ignoring unreadable session store: {e}");
                Session::default()
            }
            _ => Session::default(),
        };

        SessionState {
            defaults: Session::defaults(),
            persisted,
            accumulated: RwLock::new(Session::default()),
            subscribers: Mutex::new(Vec::new()),
            store,
        }
    }

    /// The full merged snapshot.
    pub fn get(&self) -> Session {
        let accumulated = match self.accumulated.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        self.defaults
            .clone()
            .merged(&self.persisted)
            .merged(&accumulated)
    }

    /// A single option of the merged snapshot.
    pub fn get_key(&self, key: SessionKey) -> Option<Value> {
        self.get().get(key)
    }

    /// Merge `patch` into the session and forward it to every subscriber.
    pub fn apply_patch(&self, patch: Session) {
        // Holding the subscriber lock across the merge keeps delivery order
        // identical to merge order.
        let mut subscribers = match self.subscribers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match self.accumulated.write() {
            Ok(mut guard) => guard.merge(&patch),
            Err(poisoned) => poisoned.into_inner().merge(&patch),
        }
        subscribers.retain(|tx| tx.unbounded_send(patch.clone()).is_ok());
    }

    /// Stream of the patches applied from now on.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<Session> {
        let (tx, rx) = mpsc::unbounded();
        match self.subscribers.lock() {
            Ok(mut guard) => guard.push(tx),
            Err(poisoned) => poisoned.into_inner().push(tx),
        }
        rx
    }

    /// Persist the merged snapshot. Failures are ignored.
    pub fn save(&self) {
        if let Some(store) = &self.store
            && let Err(e) = store.save(&self.get())
        {
            debug!("failed to persist session: {e}");
        }
    }

    /// Remove the persisted snapshot. Failures are ignored.
    pub fn clear(&self) {
        if let Some(store) = &self.store
            && let Err(e) = store.clear()
        {
            debug!("failed to clear persisted session: {e}");
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(None)
    }
}

impl std::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionState")
            .field("session", &self.get())
            .field("persistent", &self.store.is_some())
            .finish()
    }
}
