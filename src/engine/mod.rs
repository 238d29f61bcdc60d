//! Messaging Engine Abstraction
//!
//! The session manager never talks to WhatsApp directly. It drives a
//! [`MessagingClient`] built by a [`ClientFactory`], and consumes the
//! lifecycle events the client pushes into its event channel.

pub mod driver;
pub mod protocol;

#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::sync::mpsc;

use crate::error::GatewayResult;
use crate::session::events::ClientEvent;

pub use driver::{DriverConfig, DriverFactory};

/// Headless browser flags required in containerised deployments
pub const DEFAULT_BROWSER_ARGS: [&str; 4] = [
    "--no-sandbox",
    "--disable-setuid-sandbox",
    "--disable-dev-shm-usage",
    "--disable-gpu",
];

/// Per-tenant launch options handed to the engine
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Identifier the engine uses to name its credential store
    pub client_id: String,
    /// Root directory for all credential stores
    pub data_path: PathBuf,
    /// Browser binary override
    pub executable_path: Option<PathBuf>,
    /// Headless mode passed through to the browser launcher
    pub headless: String,
    pub browser_args: Vec<String>,
}

impl LaunchOptions {
    pub fn new(client_id: impl Into<String>, data_path: impl Into<PathBuf>) -> Self {
        Self {
            client_id: client_id.into(),
            data_path: data_path.into(),
            executable_path: None,
            headless: "shell".to_string(),
            browser_args: DEFAULT_BROWSER_ARGS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_executable(mut self, path: Option<PathBuf>) -> Self {
        self.executable_path = path;
        self
    }
}

/// One messaging-account client instance
#[async_trait]
pub trait MessagingClient: Send + Sync {
    /// Start the client; events arrive on the channel returned by the factory
    async fn start(&self) -> GatewayResult<()>;

    /// Send `body` to a canonical destination address
    async fn send(&self, destination: &str, body: &str) -> GatewayResult<()>;

    /// Stop the client and release its resources
    async fn shutdown(&self) -> GatewayResult<()>;
}

/// Builds clients; construction must not start anything
pub trait ClientFactory: Send + Sync {
    fn create(
        &self,
        options: LaunchOptions,
    ) -> GatewayResult<(Box<dyn MessagingClient>, mpsc::Receiver<ClientEvent>)>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_options_defaults() {
        let options = LaunchOptions::new("school_001", "/data/.wwebjs_auth");
        assert_eq!(options.headless, "shell");
        assert_eq!(options.browser_args.len(), 4);
        assert!(options.browser_args.contains(&"--no-sandbox".to_string()));
        assert!(options.executable_path.is_none());

        let options = options.with_executable(Some(PathBuf::from("/usr/bin/chromium")));
        assert_eq!(options.executable_path, Some(PathBuf::from("/usr/bin/chromium")));
    }
}
