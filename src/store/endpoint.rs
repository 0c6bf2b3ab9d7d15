//! Endpoint — addressing and connection state for reaching a System.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        ConnectionStatus::Disconnected
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoint {
    pub hostname: String,
    pub port: u16,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub credentials: Option<String>,
    #[serde(default)]
    pub status: ConnectionStatus,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub last_connected: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub last_error: Option<String>,
}

impl Endpoint {
    pub fn new(hostname: impl Into<String>, port: u16) -> Self {
        Self {
            hostname: hostname.into(),
            port,
            credentials: None,
            status: ConnectionStatus::Disconnected,
            last_connected: None,
            last_error: None,
        }
    }

    pub fn mark_connected(&mut self) {
        self.status = ConnectionStatus::Connected;
        self.last_connected = Some(chrono::Utc::now());
        self.last_error = None;
    }

    pub fn mark_error(&mut self, message: impl Into<String>) {
        self.status = ConnectionStatus::Error;
        self.last_error = Some(message.into());
    }

    pub fn mark_disconnected(&mut self) {
        self.status = ConnectionStatus::Disconnected;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_disconnected() {
        let e = Endpoint::new("db1.example.com", 22);
        assert_eq!(e.status, ConnectionStatus::Disconnected);
    }

    #[test]
    fn mark_connected_clears_last_error() {
        let mut e = Endpoint::new("db1", 22);
        e.mark_error("boom");
        e.mark_connected();
        assert_eq!(e.status, ConnectionStatus::Connected);
        assert!(e.last_error.is_none());
    }
}
