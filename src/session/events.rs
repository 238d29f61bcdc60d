//! Session Events
//!
//! Typed lifecycle events raised by a tenant's messaging client.

use serde::{Deserialize, Serialize};

/// Events that a messaging client raises during its lifetime
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientEvent {
    /// A pairing code (QR payload) was issued and awaits scanning
    PairingCodeIssued { code: String },

    /// The account is linked and able to send
    Linked,

    /// Credentials were accepted (informational)
    Authenticated,

    /// The engine rejected the stored credentials
    AuthFailure { reason: String },

    /// The engine lost its connection
    Disconnected { reason: String },
}

impl ClientEvent {
    /// Short event name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::PairingCodeIssued { .. } => "pairing-code",
            Self::Linked => "linked",
            Self::Authenticated => "authenticated",
            Self::AuthFailure { .. } => "auth-failure",
            Self::Disconnected { .. } => "disconnected",
        }
    }
}

/// Why a session record was dropped from the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemovalReason {
    AuthFailure(String),
    Disconnected(String),
    StartFailed(String),
    StreamClosed,
    Shutdown,
}

impl std::fmt::Display for RemovalReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AuthFailure(msg) => write!(f, "auth failure: {}", msg),
            Self::Disconnected(reason) => write!(f, "disconnected: {}", reason),
            Self::StartFailed(msg) => write!(f, "start failed: {}", msg),
            Self::StreamClosed => write!(f, "event stream closed"),
            Self::Shutdown => write!(f, "shutdown"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        let event = ClientEvent::PairingCodeIssued {
            code: "CODE123".to_string(),
        };
        assert_eq!(event.name(), "pairing-code");
        assert_eq!(ClientEvent::Linked.name(), "linked");
    }

    #[test]
    fn test_removal_reason_display() {
        let reason = RemovalReason::Disconnected("NAVIGATION".to_string());
        assert_eq!(reason.to_string(), "disconnected: NAVIGATION");
    }
}
