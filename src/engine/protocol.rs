//! Driver Wire Protocol
//!
//! Newline-delimited JSON exchanged with the engine driver process.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::session::events::ClientEvent;

/// Commands written to the driver's stdin
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DriverCommand {
    #[serde(rename_all = "camelCase")]
    Start {
        client_id: String,
        data_path: PathBuf,
        #[serde(skip_serializing_if = "Option::is_none")]
        executable_path: Option<PathBuf>,
        headless: String,
        browser_args: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    Send {
        request_id: u64,
        to: String,
        body: String,
    },
    Shutdown,
}

/// Messages read from the driver's stdout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DriverMessage {
    Qr {
        code: String,
    },
    Ready,
    Authenticated,
    AuthFailure {
        #[serde(default)]
        message: String,
    },
    Disconnected {
        #[serde(default)]
        reason: String,
    },
    #[serde(rename_all = "camelCase")]
    SendResult {
        request_id: u64,
        ok: bool,
        #[serde(default)]
        error: Option<String>,
    },
}

impl DriverMessage {
    /// Lifecycle event carried by this message, if any
    pub fn into_event(self) -> Option<ClientEvent> {
        match self {
            Self::Qr { code } => Some(ClientEvent::PairingCodeIssued { code }),
            Self::Ready => Some(ClientEvent::Linked),
            Self::Authenticated => Some(ClientEvent::Authenticated),
            Self::AuthFailure { message } => Some(ClientEvent::AuthFailure { reason: message }),
            Self::Disconnected { reason } => Some(ClientEvent::Disconnected { reason }),
            Self::SendResult { .. } => None,
        }
    }
}

/// Encode a command as a single protocol line
pub fn encode_line(command: &DriverCommand) -> serde_json::Result<String> {
    let mut line = serde_json::to_string(command)?;
    line.push('\n');
    Ok(line)
}
