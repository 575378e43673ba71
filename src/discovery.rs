//! Bridge discovery through the N-UPnP lookup service.

use serde::{Deserialize, Serialize};

use crate::errors::Error;
use crate::transport::Transport;

type Result<T> = std::result::Result<T, Error>;

/// Lookup service listing the bridges registered from this network.
pub const NUPNP_URL: &str = "https://www.meethue.com/api/nupnp";

/// A Hue bridge reported by the discovery service.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredBridge {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "internalipaddress")]
    pub internal_ip_address: String,
    #[serde(default)]
    pub port: Option<u16>,
}

impl DiscoveredBridge {
    /// Address to reach the bridge at, `host` or `host:port`.
    ///
    /// # Examples
    ///
    /// ```
    /// use hue_command_rs::DiscoveredBridge;
    ///
    /// let bridge = DiscoveredBridge {
    ///     id: "001788fffe09fe16".into(),
    ///     internal_ip_address: "192.168.0.3".into(),
    ///     port: None,
    /// };
    /// assert_eq!(bridge.address(), "192.168.0.3");
    /// ```
    pub fn address(&self) -> String {
        match self.port {
            Some(port) => format!("{}:{}", self.internal_ip_address, port),
            None => self.internal_ip_address.clone(),
        }
    }
}

/// List every bridge the discovery service at `url` knows about.
///
/// # Examples
///
/// ```ignore
/// use hue_command_rs::{HttpTransport, NUPNP_URL, discover_bridges};
///
/// let bridges = discover_bridges(&HttpTransport::default(), NUPNP_URL).await?;
/// for bridge in bridges {
///     println!("{} at {}", bridge.id, bridge.address());
/// }
/// ```
pub async fn discover_bridges(
    transport: &dyn Transport,
    url: &str,
) -> Result<Vec<DiscoveredBridge>> {
    let response = transport
        .get(url)
        .await
        .map_err(|e| Error::Discovery(e.to_string()))?;
    serde_json::from_value(response)
        .map_err(|e| Error::Discovery(format!("malformed answer: {e}")))
}

/// Address of the first bridge reported by the discovery service.
pub(crate) async fn first_bridge_address(transport: &dyn Transport, url: &str) -> Result<String> {
    discover_bridges(transport, url)
        .await?
        .first()
        .map(DiscoveredBridge::address)
        .ok_or_else(|| Error::Discovery(format!("no bridge listed by {url}")))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::testing::MockTransport;

    #[tokio::test]
    async fn test_first_bridge_is_used() {
        let transport = MockTransport::new();
        transport.on_get(
            NUPNP_URL,
            json!([
                {"id": "001788fffe09fe16", "internalipaddress": "192.168.0.3"},
                {"id": "001788fffe09fe17", "internalipaddress": "192.168.0.4"}
            ]),
        );

        let address = first_bridge_address(&transport, NUPNP_URL).await.unwrap();
        assert_eq!(address, "192.168.0.3");
        assert_eq!(transport.count_get(NUPNP_URL), 1);
    }

    #[tokio::test]
    async fn test_port_is_kept() {
        let transport = MockTransport::new();
        transport.on_get(
            NUPNP_URL,
            json!([{"id": "a", "internalipaddress": "10.0.0.5", "port": 8080}]),
        );

        let bridges = discover_bridges(&transport, NUPNP_URL).await.unwrap();
        assert_eq!(bridges[0].address(), "10.0.0.5:8080");
    }

    #[tokio::test]
    async fn test_empty_list_fails() {
        let transport = MockTransport::new();
        transport.on_get(NUPNP_URL, json!([]));

        let err = first_bridge_address(&transport, NUPNP_URL).await.unwrap_err();
        assert!(matches!(err, Error::Discovery(_)));
    }

    #[tokio::test]
    async fn test_transport_failure_is_a_discovery_failure() {
        let transport = MockTransport::new();

        let err = discover_bridges(&transport, NUPNP_URL).await.unwrap_err();
        assert!(matches!(err, Error::Discovery(_)));
    }
}
