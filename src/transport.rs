//! HTTP transport used to reach the bridge and the discovery service.
//!
//! The library never talks to the network directly: every request goes through
//! a [`Transport`]. The default [`HttpTransport`] (feature `http`) is backed by
//! `reqwest`; tests and other runtimes can plug in their own implementation.

use serde_json::Value;

use crate::errors::{Error, Method};
use crate::runtime::BoxFuture;

type Result<T> = std::result::Result<T, Error>;

/// A single request to the bridge REST surface.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub body: Option<Value>,
}

impl Request {
    pub fn get(url: impl Into<String>) -> Self {
        Request {
            method: Method::Get,
            url: url.into(),
            body: None,
        }
    }

    pub fn put(url: impl Into<String>, body: Value) -> Self {
        Request {
            method: Method::Put,
            url: url.into(),
            body: Some(body),
        }
    }

    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Request {
            method: Method::Post,
            url: url.into(),
            body: Some(body),
        }
    }
}

/// Issues requests and yields the decoded JSON answer.
///
/// Every call performs a fresh round trip. Sharing one answer among many
/// consumers is done on top of the transport with [`crate::Replay`].
pub trait Transport: Send + Sync {
    fn request(&self, request: Request) -> BoxFuture<'_, Result<Value>>;

    fn get(&self, url: &str) -> BoxFuture<'_, Result<Value>> {
        self.request(Request::get(url))
    }

    fn put(&self, url: &str, body: Value) -> BoxFuture<'_, Result<Value>> {
        self.request(Request::put(url, body))
    }

    fn post(&self, url: &str, body: Value) -> BoxFuture<'_, Result<Value>> {
        self.request(Request::post(url, body))
    }
}

#[cfg(feature = "http")]
pub use self::http::HttpTransport;

#[cfg(feature = "http")]
mod http {
    use std::time::Duration;

    use log::{debug, warn};
    use serde_json::Value;

    use super::{Request, Result, Transport};
    use crate::errors::{Error, Method};
    use crate::runtime::BoxFuture;

    /// [`Transport`] backed by a `reqwest::Client`.
    #[derive(Debug, Clone)]
    pub struct HttpTransport {
        http: reqwest::Client,
    }

    impl HttpTransport {
        pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

        /// Build a transport whose requests give up after `timeout`.
        pub fn with_timeout(timeout: Duration) -> Result<Self> {
            let http = reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| Error::transport(Method::Get, "", e))?;
            Ok(HttpTransport { http })
        }

        /// Wrap a pre-built client.
        pub fn with_client(http: reqwest::Client) -> Self {
            HttpTransport { http }
        }

        async fn send(&self, request: Request) -> Result<Value> {
            let Request { method, url, body } = request;
            debug!("{method} {url}");

            let builder = match method {
                Method::Get => self.http.get(&url),
                Method::Put => self.http.put(&url),
                Method::Post => self.http.post(&url),
            };
            let builder = match &body {
                Some(body) => builder.json(body),
                None => builder,
            };

            let resp = builder
                .send()
                .await
                .map_err(|e| Error::transport(method, &url, e))?;
            let status = resp.status();
            if !status.is_success() {
                return Err(Error::transport(method, &url, format!("HTTP {status}")));
            }
            resp.json::<Value>()
                .await
                .map_err(|e| Error::transport(method, &url, e))
        }
    }

    impl Default for HttpTransport {
        fn default() -> Self {
            or_untimed(Self::with_timeout(Self::DEFAULT_TIMEOUT))
        }
    }

    /// The built transport, or a plain client when building failed.
    fn or_untimed(built: Result<HttpTransport>) -> HttpTransport {
        built.unwrap_or_else(|e| {
            warn!("falling back to a client without timeout: {e}");
            HttpTransport::with_client(reqwest::Client::new())
        })
    }

    impl Transport for HttpTransport {
        fn request(&self, request: Request) -> BoxFuture<'_, Result<Value>> {
            Box::pin(self.send(request))
        }
    }

}
