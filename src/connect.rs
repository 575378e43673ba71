//! Connection bootstrap: bridge discovery, user registration and the shared
//! connection value every light operation waits on.
//!
//! A connection attempt walks through [`Phase::ResolvingAddress`] and
//! [`Phase::ResolvingCredential`] before reaching [`Phase::Ready`]; any
//! failure ends it in [`Phase::Failed`]. The attempt runs at most once per
//! [`ConnectionHandle`] and its outcome is replayed to every caller.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use log::{debug, info, warn};
use serde_json::json;
use strum_macros::Display;

use crate::api::{self, ApiResult, Registered};
use crate::config::BridgeConfig;
use crate::discovery::{self, NUPNP_URL};
use crate::errors::Error;
use crate::hue::Hue;
use crate::replay::Replay;
use crate::runtime::{self, BoxFuture};
use crate::state::{RetryPolicy, Session, SessionState, SessionStore};
use crate::transport::Transport;

type Result<T> = std::result::Result<T, Error>;

/// Application name announced to the bridge when registering.
pub const APP_NAME: &str = "as-hue-command";

const BUTTON_NOT_PRESSED: u16 = 101;

/// Pause used between registration attempts.
pub type Delay = Arc<dyn Fn(Duration) -> BoxFuture<'static, ()> + Send + Sync>;

fn runtime_delay() -> Delay {
    Arc::new(|duration| Box::pin(runtime::sleep(duration)))
}

/// Options for [`connect`].
///
/// # Example
///
/// ```ignore
/// use std::time::Duration;
/// use hue_command_rs::{ConnectOptions, RetryPolicy, connect};
///
/// let hue = connect(
///     ConnectOptions::default()
///         .address("192.168.1.2")
///         .retries(RetryPolicy::new(10, Duration::from_secs(2))),
/// );
/// ```
pub struct ConnectOptions {
    username: Option<String>,
    address: Option<String>,
    retries: Option<RetryPolicy>,
    discovery_url: String,
    probe: bool,
    delay: Delay,
    store: Option<Box<dyn SessionStore>>,
    transport: Arc<dyn Transport>,
}

impl ConnectOptions {
    /// Options sending every request through `transport`.
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        ConnectOptions {
            username: None,
            address: None,
            retries: None,
            discovery_url: NUPNP_URL.to_string(),
            probe: true,
            delay: runtime_delay(),
            store: None,
            transport,
        }
    }

    /// Credential issued by an earlier registration; skips registration.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Bridge address (`host` or `host:port`); skips discovery.
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn retries(mut self, retries: RetryPolicy) -> Self {
        self.retries = Some(retries);
        self
    }

    pub fn discovery_url(mut self, url: impl Into<String>) -> Self {
        self.discovery_url = url.into();
        self
    }

    /// Fetch the bridge configuration once connected (on by default).
    pub fn probe(mut self, probe: bool) -> Self {
        self.probe = probe;
        self
    }

    /// Replace the runtime timer used between registration attempts.
    pub fn delay(mut self, delay: Delay) -> Self {
        self.delay = delay;
        self
    }

    /// Persist the session snapshot through `store`.
    pub fn store(mut self, store: Box<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }
}

#[cfg(feature = "http")]
impl Default for ConnectOptions {
    fn default() -> Self {
        Self::with_transport(Arc::new(crate::transport::HttpTransport::default()))
    }
}

/// Connect to a bridge.
///
/// Returns immediately: nothing touches the network until the first
/// operation needs the connection. Discovery runs only when no address is
/// known and registration only when no username is known, either from the
/// options or from the persisted session.
pub fn connect(options: ConnectOptions) -> Hue {
    let ConnectOptions {
        username,
        address,
        retries,
        discovery_url,
        probe,
        delay,
        store,
        transport,
    } = options;

    let state = Arc::new(SessionState::new(store));
    if let Some(retries) = retries {
        state.apply_patch(Session::default().with_retry_policy(retries));
    }

    let known = state.get();
    let bootstrap = Bootstrap {
        transport: Arc::clone(&transport),
        state: Arc::clone(&state),
        username: username.or(known.username),
        address: address.or(known.address),
        discovery_url,
        probe,
        delay,
    };

    Hue::new(transport, state, ConnectionHandle::new(bootstrap))
}

/// Where a connection attempt currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Phase {
    /// Nobody asked for the connection yet.
    Idle,
    ResolvingAddress,
    ResolvingCredential,
    Ready,
    Failed,
}

/// A ready-to-use session with the bridge.
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    username: String,
    address: String,
    config: Option<BridgeConfig>,
}

impl Connection {
    pub fn new(username: impl Into<String>, address: impl Into<String>) -> Self {
        Connection {
            username: username.into(),
            address: address.into(),
            config: None,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Bridge configuration, when the connectivity probe ran.
    pub fn config(&self) -> Option<&BridgeConfig> {
        self.config.as_ref()
    }

    /// URL of `path` under this user's API root.
    ///
    /// ```
    /// use hue_command_rs::Connection;
    ///
    /// let connection = Connection::new("abc", "192.168.0.3");
    /// assert_eq!(connection.url("lights/1"), "http://192.168.0.3/api/abc/lights/1");
    /// ```
    pub fn url(&self, path: &str) -> String {
        format!("{}/api/{}/{}", base_url(&self.address), self.username, path)
    }
}

/// Shared, replayed outcome of one connection attempt.
///
/// Cloning the handle shares the attempt: however many callers await
/// [`ConnectionHandle::get`], and whenever they do, discovery and
/// registration run at most once and a failure is final.
#[derive(Clone, Debug)]
pub struct ConnectionHandle {
    replay: Replay<Connection>,
    phase: Arc<RwLock<Phase>>,
}

impl ConnectionHandle {
    fn new(bootstrap: Bootstrap) -> Self {
        let phase = Arc::new(RwLock::new(Phase::Idle));
        let tracker = Arc::clone(&phase);
        ConnectionHandle {
            replay: Replay::new(bootstrap.run(tracker)),
            phase,
        }
    }

    /// A handle that is already connected.
    pub fn ready(connection: Connection) -> Self {
        ConnectionHandle {
            replay: Replay::ready(connection),
            phase: Arc::new(RwLock::new(Phase::Ready)),
        }
    }

    /// Wait for the connection, starting the attempt on first use.
    pub async fn get(&self) -> Result<Connection> {
        self.replay.get().await
    }

    pub fn phase(&self) -> Phase {
        self.phase.read().map(|p| *p).unwrap_or(Phase::Failed)
    }
}

struct Bootstrap {
    transport: Arc<dyn Transport>,
    state: Arc<SessionState>,
    username: Option<String>,
    address: Option<String>,
    discovery_url: String,
    probe: bool,
    delay: Delay,
}

impl Bootstrap {
    async fn run(self, phase: Arc<RwLock<Phase>>) -> Result<Connection> {
        let enter = |next: Phase| {
            debug!("connection phase: {next}");
            if let Ok(mut current) = phase.write() {
                *current = next;
            }
        };

        match self.establish(&enter).await {
            Ok(connection) => {
                self.state.apply_patch(
                    Session::default()
                        .with_username(connection.username())
                        .with_address(connection.address()),
                );
                info!("connected to bridge at {}", connection.address());
                enter(Phase::Ready);
                Ok(connection)
            }
            Err(e) => {
                enter(Phase::Failed);
                Err(e)
            }
        }
    }

    async fn establish(&self, enter: &impl Fn(Phase)) -> Result<Connection> {
        enter(Phase::ResolvingAddress);
        let address = match &self.address {
            Some(address) => address.clone(),
            None => {
                discovery::first_bridge_address(self.transport.as_ref(), &self.discovery_url)
                    .await?
            }
        };

        enter(Phase::ResolvingCredential);
        let username = match &self.username {
            Some(username) => username.clone(),
            None => {
                let policy = self.state.get().retry_policy.unwrap_or_default();
                self.register(&address, policy).await?
            }
        };

        let mut connection = Connection::new(username, address);
        if self.probe {
            connection.config = Some(self.probe_config(&connection).await?);
        }
        Ok(connection)
    }

    /// Register a new user, retrying with a fixed pause while the bridge
    /// refuses.
    async fn register(&self, address: &str, policy: RetryPolicy) -> Result<String> {
        let mut attempt: u32 = 0;
        loop {
            match self.register_once(address).await {
                Ok(username) => return Ok(username),
                Err(err) if attempt < policy.total => {
                    attempt += 1;
                    warn!(
                        "Bridge button must be pressed for {APP_NAME} to create a user ({err}). Retrying in {}ms.",
                        policy.timeout.as_millis()
                    );
                    (self.delay)(policy.timeout).await;
                }
                Err(err) => {
                    return Err(Error::RegistrationExhausted {
                        attempts: attempt + 1,
                        last: Box::new(err),
                    });
                }
            }
        }
    }

    async fn register_once(&self, address: &str) -> Result<String> {
        let url = format!("{}/api", base_url(address));
        let body = json!({ "devicetype": format!("{APP_NAME}#{}", std::env::consts::OS) });
        let response = self.transport.post(&url, body).await?;

        match api::results::<Registered>(response)?.into_iter().next() {
            Some(ApiResult::Success(registered)) => Ok(registered.username),
            Some(ApiResult::Error(err)) => Err(Error::RegistrationRejected {
                code: Some(err.code),
                message: registration_message(err.code).to_string(),
            }),
            None => Err(Error::UnexpectedResponse(
                "empty answer to registration".to_string(),
            )),
        }
    }

    async fn probe_config(&self, connection: &Connection) -> Result<BridgeConfig> {
        let unreachable = |e: Error| {
            debug!("connectivity probe failed: {e}");
            Error::unreachable(connection.address())
        };
        let response = self
            .transport
            .get(&connection.url("config"))
            .await
            .and_then(api::check_read)
            .map_err(unreachable)?;
        serde_json::from_value(response)
            .map_err(Error::json_load)
            .map_err(unreachable)
    }
}

fn registration_message(code: u16) -> &'static str {
    if code == BUTTON_NOT_PRESSED {
        "Failed to create a new user for as-hue-command. \
         The Philis Hue Bridge button must be pressed before calling connect()."
    } else {
        "An error occurred trying to create a new user for as-hue-command on the bridge. \
         Sorry, not documented yet. :("
    }
}

/// Scheme and authority for an address; addresses are opaque endpoints and
/// may already carry a scheme.
fn base_url(address: &str) -> String {
    let address = address.trim_end_matches('/');
    if address.starts_with("http://") || address.starts_with("https://") {
        address.to_string()
    } else {
        format!("http://{address}")
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::{FutureExt, StreamExt};
    use serde_json::{Value, json};

    use super::*;
    use crate::errors::Method;
    use crate::testing::{MockTransport, recording_delay};

    const IP: &str = "192.168.0.15";
    const BUTTON_MESSAGE: &str = "Failed to create a new user for as-hue-command. The Philis Hue Bridge button must be pressed before calling connect().";

    fn button_not_pressed() -> Value {
        json!([{"error": {"type": 101, "address": "", "description": "link button not pressed"}}])
    }

    fn register_url() -> String {
        format!("http://{IP}/api")
    }

    fn options(transport: &MockTransport) -> ConnectOptions {
        ConnectOptions::with_transport(Arc::new(transport.clone()))
    }

    #[tokio::test]
    async fn test_explicit_address_and_username_skip_bootstrap() {
        let transport = MockTransport::new();
        transport.on_get(
            "http://192.168.0.10/api/as-hue-command/config",
            json!({"name": "Philips hue"}),
        );

        let hue = connect(
            options(&transport)
                .address("192.168.0.10")
                .username("as-hue-command"),
        );
        let connection = hue.connection().await.unwrap();

        assert_eq!(connection.address(), "192.168.0.10");
        assert_eq!(
            connection.config().unwrap().name.as_deref(),
            Some("Philips hue")
        );
        assert_eq!(transport.count_get(NUPNP_URL), 0);
        assert!(transport.requests().iter().all(|r| r.method != Method::Post));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_discovery_runs_once_for_every_caller() {
        let transport = MockTransport::new();
        transport.on_get(
            NUPNP_URL,
            json!([{"id": "001788fffe09fe16", "internalipaddress": "192.168.0.3"}]),
        );

        let hue = connect(options(&transport).username("as-hue-command").probe(false));
        let (a, b, c) = futures::join!(hue.connection(), hue.connection(), hue.connection());
        assert_eq!(a.unwrap().address(), "192.168.0.3");
        assert_eq!(b.unwrap(), c.unwrap());

        hue.connection().await.unwrap();
        assert_eq!(transport.count_get(NUPNP_URL), 1);
    }

    #[tokio::test]
    async fn test_registration_creates_user() {
        let transport = MockTransport::new();
        transport.on_post(
            &register_url(),
            json!([{"success": {"username": "83b7780291a6ceffbe0bd049104df"}}]),
        );

        let hue = connect(options(&transport).address(IP).probe(false));
        let connection = hue.connection().await.unwrap();

        assert_eq!(connection.username(), "83b7780291a6ceffbe0bd049104df");
        let post = &transport.requests()[0];
        let devicetype = post.body.as_ref().unwrap()["devicetype"].as_str().unwrap();
        assert!(devicetype.starts_with("as-hue-command#"));
    }

    #[tokio::test]
    async fn test_registration_runs_once_for_every_caller() {
        let transport = MockTransport::new();
        transport.on_post(&register_url(), button_not_pressed());
        transport.on_post(&register_url(), json!([{"success": {"username": "abc"}}]));
        let (delay, pauses) = recording_delay();

        let hue = connect(
            options(&transport)
                .address(IP)
                .retries(RetryPolicy::new(5, Duration::from_millis(10)))
                .delay(delay)
                .probe(false),
        );
        let other = hue.clone();
        let (a, b, c) = futures::join!(hue.connection(), hue.connection(), other.connection());

        assert_eq!(a.unwrap().username(), "abc");
        assert_eq!(b.unwrap(), c.unwrap());
        assert_eq!(transport.count_post(&register_url()), 2);
        assert_eq!(pauses.lock().unwrap().len(), 1);

        hue.connection().await.unwrap();
        assert_eq!(transport.count_post(&register_url()), 2);
    }

    #[tokio::test]
    async fn test_registration_retries_every_timeout_for_total_times() {
        let transport = MockTransport::new();
        transport.on_post(&register_url(), button_not_pressed());
        let (delay, pauses) = recording_delay();
        let retries = RetryPolicy::new(5, Duration::from_millis(250));

        let hue = connect(
            options(&transport)
                .address(IP)
                .retries(retries)
                .delay(delay),
        );
        let err = hue.connection().await.unwrap_err();

        assert_eq!(transport.count_post(&register_url()), 6);
        assert_eq!(*pauses.lock().unwrap(), vec![Duration::from_millis(250); 5]);
        assert_eq!(err.to_string(), BUTTON_MESSAGE);
        assert!(matches!(err, Error::RegistrationExhausted { attempts: 6, .. }));
    }

    #[tokio::test]
    async fn test_no_retries_fails_on_first_error() {
        let transport = MockTransport::new();
        transport.on_post(&register_url(), button_not_pressed());
        let (delay, pauses) = recording_delay();

        let hue = connect(
            options(&transport)
                .address(IP)
                .retries(RetryPolicy::none())
                .delay(delay),
        );
        let err = hue.connection().await.unwrap_err();

        assert_eq!(transport.count_post(&register_url()), 1);
        assert!(pauses.lock().unwrap().is_empty());
        assert_eq!(err.to_string(), BUTTON_MESSAGE);
        assert_eq!(err.bridge_code(), Some(101));
    }

    #[tokio::test]
    async fn test_undocumented_error_message() {
        let transport = MockTransport::new();
        transport.on_post(
            &register_url(),
            json!([{"error": {"type": 7, "address": "/devicetype", "description": "invalid value"}}]),
        );
        let (delay, _) = recording_delay();

        let hue = connect(
            options(&transport)
                .address(IP)
                .retries(RetryPolicy::none())
                .delay(delay),
        );
        let err = hue.connection().await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "An error occurred trying to create a new user for as-hue-command on the bridge. Sorry, not documented yet. :("
        );
    }

    #[tokio::test]
    async fn test_registration_succeeds_once_button_is_pressed() {
        let transport = MockTransport::new();
        transport.on_post(&register_url(), button_not_pressed());
        transport.on_post(&register_url(), button_not_pressed());
        transport.on_post(&register_url(), json!([{"success": {"username": "abc"}}]));
        let (delay, pauses) = recording_delay();

        let hue = connect(
            options(&transport)
                .address(IP)
                .retries(RetryPolicy::new(5, Duration::from_millis(10)))
                .delay(delay)
                .probe(false),
        );

        assert_eq!(hue.connection().await.unwrap().username(), "abc");
        assert_eq!(transport.count_post(&register_url()), 3);
        assert_eq!(pauses.lock().unwrap().len(), 2);
        assert_eq!(hue.handle().phase(), Phase::Ready);
    }

    #[tokio::test]
    async fn test_failure_is_sticky() {
        let transport = MockTransport::new();
        transport.on_post(&register_url(), button_not_pressed());
        let (delay, _) = recording_delay();

        let hue = connect(
            options(&transport)
                .address(IP)
                .retries(RetryPolicy::new(1, Duration::ZERO))
                .delay(delay),
        );
        let first = hue.connection().await.unwrap_err();
        let second = hue.connection().await.unwrap_err();

        assert_eq!(first, second);
        assert_eq!(transport.count_post(&register_url()), 2);
        assert_eq!(hue.handle().phase(), Phase::Failed);
    }

    #[tokio::test]
    async fn test_discovery_failure_is_not_retried() {
        let transport = MockTransport::new();
        let (delay, pauses) = recording_delay();

        let hue = connect(options(&transport).delay(delay));
        let err = hue.connection().await.unwrap_err();

        assert!(matches!(err, Error::Discovery(_)));
        assert_eq!(transport.count_get(NUPNP_URL), 1);
        assert!(pauses.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_probe_failure_is_remapped() {
        let transport = MockTransport::new();
        let config_url = "http://192.168.0.15/api/abc/config";
        transport.respond(
            Method::Get,
            config_url,
            Err(Error::transport(Method::Get, config_url, "connection refused")),
        );

        let hue = connect(options(&transport).address(IP).username("abc"));
        let err = hue.connection().await.unwrap_err();
        assert_eq!(err.to_string(), "unable to connect to 192.168.0.15");
    }

    #[tokio::test]
    async fn test_session_is_updated_once() {
        let transport = MockTransport::new();
        let hue = connect(options(&transport).address(IP).username("abc").probe(false));
        let mut patches = hue.state().subscribe();

        hue.connection().await.unwrap();
        hue.connection().await.unwrap();

        let snapshot = hue.state().get();
        assert_eq!(snapshot.username.as_deref(), Some("abc"));
        assert_eq!(snapshot.address.as_deref(), Some(IP));

        assert_eq!(
            patches.next().await,
            Some(Session::default().with_username("abc").with_address(IP))
        );
        assert!(patches.next().now_or_never().is_none());
    }

    #[tokio::test]
    async fn test_nothing_happens_before_first_use() {
        let transport = MockTransport::new();
        let hue = connect(options(&transport));
        assert_eq!(hue.handle().phase(), Phase::Idle);
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn test_base_url_keeps_scheme() {
        assert_eq!(base_url("192.168.0.3:80"), "http://192.168.0.3:80");
        assert_eq!(base_url("https://bridge.local/"), "https://bridge.local");
    }

    #[tokio::test]
    async fn test_ready_handle_is_already_connected() {
        let connection = Connection::new("abc", IP);
        let handle = ConnectionHandle::ready(connection.clone());

        assert_eq!(handle.phase(), Phase::Ready);
        assert_eq!(handle.clone().get().await.unwrap(), connection);
    }
}
