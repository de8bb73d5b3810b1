//! Connection status and send outcome types

use std::fmt;

use serde::Serialize;

/// Observable state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// An open attempt is in flight
    Connecting,
    /// The transport is open and frames can be sent
    Connected,
    /// No transport; a reconnect may be pending
    Disconnected,
    /// A transport error was reported; `Disconnected` follows
    Error,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Error => "error",
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionStatus::Connected)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of [`SalesAgentClient::send`](super::SalesAgentClient::send)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Handed to the open transport as a single frame
    Sent,
    /// Session was not open; the payload was discarded and a connect was started
    Dropped,
}

impl SendOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, SendOutcome::Sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&ConnectionStatus::Disconnected).unwrap();
        assert_eq!(json, "\"disconnected\"");
        assert_eq!(ConnectionStatus::Connecting.to_string(), "connecting");
    }

    #[test]
    fn test_only_connected_is_connected() {
        assert!(ConnectionStatus::Connected.is_connected());
        assert!(!ConnectionStatus::Connecting.is_connected());
        assert!(!ConnectionStatus::Error.is_connected());
    }
}
