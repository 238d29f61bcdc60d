//! Session State Management
//!
//! Tracks the linkage state of individual tenant sessions and the
//! read-only status views derived from it.

use serde::{Deserialize, Serialize};

/// Linkage state of a tenant session
///
/// The pairing code lives inside `AwaitingLink`, so it cannot be observed
/// in any other state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Client is starting, no pairing code yet
    #[default]
    Pending,
    /// Pairing code issued, not yet scanned
    AwaitingLink { pairing_code: String },
    /// Linked and able to send
    Ready,
}

impl SessionState {
    /// Pairing code, present only while awaiting link
    pub fn pairing_code(&self) -> Option<&str> {
        match self {
            Self::AwaitingLink { pairing_code } => Some(pairing_code),
            _ => None,
        }
    }

    /// Check if the session can send messages
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::AwaitingLink { .. } => write!(f, "awaiting-link"),
            Self::Ready => write!(f, "ready"),
        }
    }
}

/// Externally visible status of a tenant, polled by the dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusView {
    pub exists: bool,
    pub is_ready: bool,
    pub qr_code: Option<String>,
}

impl StatusView {
    /// Status of a tenant with no record
    pub fn absent() -> Self {
        Self {
            exists: false,
            is_ready: false,
            qr_code: None,
        }
    }
}

impl From<&SessionState> for StatusView {
    fn from(state: &SessionState) -> Self {
        Self {
            exists: true,
            is_ready: state.is_ready(),
            qr_code: state.pairing_code().map(str::to_string),
        }
    }
}

/// Serializable session info for listings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub tenant_id: String,
    pub state: String,
    pub instance: u64,
    pub created_at: String,
    pub last_activity: String,
}
