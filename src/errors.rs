use std::fmt;
use std::sync::Arc;

/// All error types that can occur when talking to a Hue bridge.
///
/// Errors are `Clone` so that the outcome of a shared connection can be
/// handed to every caller awaiting it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// An HTTP round trip failed before the bridge produced a JSON answer.
    #[error("{method} {url} failed: {reason}")]
    Transport {
        method: Method,
        url: String,
        reason: String,
    },

    /// Failed to serialize data to JSON.
    #[error("failed to dump json: {0}")]
    JsonDump(Arc<serde_json::Error>),

    /// Failed to deserialize JSON data.
    #[error("failed to load json: {0}")]
    JsonLoad(Arc<serde_json::Error>),

    /// The bridge address could not be resolved through discovery.
    #[error("bridge discovery failed: {0}")]
    Discovery(String),

    /// The bridge answered the registration request with an error entry.
    #[error("{message}")]
    RegistrationRejected { code: Option<u16>, message: String },

    /// Every registration attempt failed; carries the last failure.
    #[error("{last}")]
    RegistrationExhausted { attempts: u32, last: Box<Error> },

    /// The post-registration configuration probe failed.
    #[error("unable to connect to {address}")]
    Unreachable { address: String },

    /// The bridge answered a light request with an error entry.
    #[error("bridge error {code} at {address}: {description}")]
    Api {
        code: u16,
        address: String,
        description: String,
    },

    /// Attempted to write a [`crate::StateChange`] with no attributes set.
    #[error("invalid state change; no attributes set")]
    NoAttribute,

    /// The bridge answered with a payload of an unexpected shape.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl Error {
    /// Create a new transport error
    pub fn transport(method: Method, url: &str, reason: impl ToString) -> Self {
        Error::Transport {
            method,
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn json_load(err: serde_json::Error) -> Self {
        Error::JsonLoad(Arc::new(err))
    }

    pub(crate) fn json_dump(err: serde_json::Error) -> Self {
        Error::JsonDump(Arc::new(err))
    }

    /// Create a new unreachable error
    pub fn unreachable(address: &str) -> Self {
        Error::Unreachable {
            address: address.to_string(),
        }
    }

    /// Error code reported by the bridge, if this error came from one.
    pub fn bridge_code(&self) -> Option<u16> {
        match self {
            Error::RegistrationRejected { code, .. } => *code,
            Error::RegistrationExhausted { last, .. } => last.bridge_code(),
            Error::Api { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// HTTP verbs used against the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Put,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Post => "POST",
        };
        f.write_str(verb)
    }
}

/// Hacky implementation of PartialEq for testing
#[cfg(test)]
impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}
