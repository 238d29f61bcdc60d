//! Gateway Configuration
//!
//! Command-line flags, each with an environment variable fallback.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::dispatch::{AlertTemplate, Pacing};
use crate::engine::DriverConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::session::ManagerConfig;

#[derive(Debug, Clone, Parser)]
#[command(name = "wa-gateway", version, about = "Multi-tenant WhatsApp gateway for fee alerts")]
pub struct GatewayConfig {
    /// Address to bind the HTTP API to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 3001)]
    pub port: u16,

    /// Directory holding one credential store per school
    #[arg(long, env = "WA_AUTH_ROOT", default_value = "/data/.wwebjs_auth")]
    pub auth_root: PathBuf,

    /// Engine driver executable
    #[arg(long, env = "WA_DRIVER_COMMAND", default_value = "node")]
    pub driver_command: String,

    /// Arguments passed to the driver executable
    #[arg(
        long = "driver-arg",
        env = "WA_DRIVER_ARGS",
        value_delimiter = ',',
        default_value = "wa-driver.js"
    )]
    pub driver_args: Vec<String>,

    /// Browser binary used by the engine
    #[arg(long, env = "PUPPETEER_EXECUTABLE_PATH")]
    pub browser_executable: Option<PathBuf>,

    #[arg(long, env = "WA_PACING_MIN_MS", default_value_t = 3000)]
    pub pacing_min_ms: u64,

    #[arg(long, env = "WA_PACING_MAX_MS", default_value_t = 8000)]
    pub pacing_max_ms: u64,

    /// Upper bound on a single transport call; unbounded when unset
    #[arg(long, env = "WA_DISPATCH_TIMEOUT_SECS")]
    pub dispatch_timeout_secs: Option<u64>,

    /// Name shown in the alert signature
    #[arg(long, env = "WA_BRAND", default_value = "Zafeen Lyceum")]
    pub brand: String,

    #[arg(long, env = "WA_CURRENCY", default_value = "PKR")]
    pub currency: String,
}

impl GatewayConfig {
    pub fn validate(&self) -> GatewayResult<()> {
        if self.pacing_min_ms > self.pacing_max_ms {
            return Err(GatewayError::InvalidArgument(format!(
                "pacing window is reversed: {}ms > {}ms",
                self.pacing_min_ms, self.pacing_max_ms
            )));
        }
        if self.driver_command.trim().is_empty() {
            return Err(GatewayError::InvalidArgument(
                "driver command must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> GatewayResult<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| GatewayError::InvalidArgument(format!("Invalid bind address: {}", e)))
    }

    pub fn driver_config(&self) -> DriverConfig {
        DriverConfig::new(self.driver_command.clone(), self.driver_args.clone())
    }

    pub fn manager_config(&self) -> ManagerConfig {
        ManagerConfig {
            auth_root: self.auth_root.clone(),
            executable_path: self.browser_executable.clone(),
            pacing: Pacing::from_millis(self.pacing_min_ms, self.pacing_max_ms),
            template: AlertTemplate::new(self.brand.clone(), self.currency.clone()),
            dispatch_timeout: self.dispatch_timeout_secs.map(Duration::from_secs),
        }
    }
}
