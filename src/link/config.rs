use serde::{Deserialize, Serialize};

/// Broker connection settings for the simulator link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Broker address as `host:port`
    pub url: String,

    /// Client id presented to the broker
    pub client_id: String,

    /// Prefix shared by all panel topics
    pub topic_prefix: String,

    /// MQTT keep-alive in seconds
    pub keep_alive_secs: u64,

    /// Delay before re-polling the broker after a session error
    pub reconnect_delay_ms: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            url: "localhost:1883".to_string(),
            client_id: "simpanel".to_string(),
            topic_prefix: "simpanel".to_string(),
            keep_alive_secs: 5,
            reconnect_delay_ms: 2000,
        }
    }
}

impl LinkConfig {
    /// Split the url into host and port, falling back to the MQTT default
    /// port when the url carries none.
    pub fn host_and_port(&self) -> (String, u16) {
        let mut parts = self.url.splitn(2, ':');
        let host = parts.next().unwrap_or("localhost").to_string();
        let port = parts
            .next()
            .and_then(|p| p.parse().ok())
            .unwrap_or(1883);
        (host, port)
    }

    /// Full topic for a suffix from the link vocabulary.
    pub fn topic(&self, suffix: &str) -> String {
        format!("{}/{}", self.topic_prefix, suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_splits_into_host_and_port() {
        let config = LinkConfig {
            url: "broker.local:2883".to_string(),
            ..LinkConfig::default()
        };
        assert_eq!(config.host_and_port(), ("broker.local".to_string(), 2883));
    }

    #[test]
    fn missing_port_falls_back_to_default() {
        let config = LinkConfig {
            url: "broker.local".to_string(),
            ..LinkConfig::default()
        };
        assert_eq!(config.host_and_port(), ("broker.local".to_string(), 1883));
    }

    #[test]
    fn topics_share_the_prefix() {
        let config = LinkConfig::default();
        assert_eq!(config.topic("state"), "simpanel/state");
        assert_eq!(config.topic("command"), "simpanel/command");
    }
}
