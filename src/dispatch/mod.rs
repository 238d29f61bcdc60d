//! Alert Dispatch
//!
//! Sends templated fee alerts through a tenant's linked client, with a
//! randomised human-like pause before each send.

pub mod pacing;
pub mod template;

use log::{debug, error, info};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{GatewayError, GatewayResult};
use crate::session::SessionRegistry;

pub use pacing::Pacing;
pub use template::{AlertTemplate, FeeAlert};

/// WhatsApp user address suffix
pub const USER_ADDRESS_SUFFIX: &str = "@c.us";

/// Canonical transport address for a phone number; canonical input passes through
pub fn canonical_destination(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.ends_with(USER_ADDRESS_SUFFIX) {
        trimmed.to_string()
    } else {
        format!("{}{}", trimmed, USER_ADDRESS_SUFFIX)
    }
}

/// Sends alerts for any registered tenant
pub struct Dispatcher {
    registry: Arc<SessionRegistry>,
    pacing: Pacing,
    template: AlertTemplate,
    /// Bound on the transport call only; `None` waits indefinitely
    timeout: Option<Duration>,
}

impl Dispatcher {
    pub fn new(registry: Arc<SessionRegistry>, pacing: Pacing, template: AlertTemplate) -> Self {
        Self {
            registry,
            pacing,
            template,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn pacing(&self) -> Pacing {
        self.pacing
    }

    /// Send one fee alert.
    ///
    /// Fails with `NotReady` before any delay when the tenant is not linked.
    /// Transport failures are returned as `Transport` and leave the session
    /// untouched.
    pub async fn send(
        &self,
        tenant_id: &str,
        destination: &str,
        alert: &FeeAlert,
    ) -> GatewayResult<()> {
        if self.registry.ready_client(tenant_id).is_none() {
            return Err(GatewayError::NotReady(tenant_id.to_string()));
        }

        let to = canonical_destination(destination);
        let body = self.template.render(alert);

        let delay = self.pacing.next_delay();
        debug!("[{}] Pacing send to {} by {:?}", tenant_id, to, delay);
        tokio::time::sleep(delay).await;

        // The session may have been removed while we were waiting
        let client = self
            .registry
            .ready_client(tenant_id)
            .ok_or_else(|| GatewayError::NotReady(tenant_id.to_string()))?;

        let result = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, client.send(&to, &body)).await {
                Ok(result) => result,
                Err(_) => Err(GatewayError::Transport(format!(
                    "Send timed out after {:?}",
                    limit
                ))),
            },
            None => client.send(&to, &body).await,
        };

        match result {
            Ok(()) => {
                info!(
                    "[{}] Fee alert sent for {}",
                    tenant_id, alert.recipient_name
                );
                Ok(())
            }
            Err(e) => {
                error!(
                    "[{}] Failed sending to {}: {}",
                    tenant_id, alert.recipient_name, e
                );
                Err(match e {
                    GatewayError::Transport(detail) => GatewayError::Transport(detail),
                    other => GatewayError::Transport(other.to_string()),
                })
            }
        }
    }
}
