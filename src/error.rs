//! Gateway Error Types
//!
//! Error taxonomy shared by the session manager, dispatch service and engine driver.

use thiserror::Error;

/// Gateway errors
#[derive(Error, Debug)]
pub enum GatewayError {
    // Caller errors
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("WhatsApp for {0} is not ready or linked")]
    NotReady(String),

    // Dispatch errors
    #[error("Transport error: {0}")]
    Transport(String),

    // Registry errors
    #[error("Session already registered: {0}")]
    AlreadyRegistered(String),

    #[error("Session closed for {0}")]
    SessionClosed(String),

    // Engine errors
    #[error("Engine error: {0}")]
    Engine(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::Engine(format!("Malformed driver message: {}", err))
    }
}

impl From<GatewayError> for String {
    fn from(err: GatewayError) -> String {
        err.to_string()
    }
}

/// Result type alias for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;
