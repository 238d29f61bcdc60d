//! Session Manager
//!
//! Entry point for the API layer: initializes tenant sessions, reports their
//! status and forwards alert sends to the dispatcher. The manager is an
//! ordinary value; callers share it behind an `Arc`.

use log::{debug, error, info};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use super::lifecycle;
use super::locks::LockReclaimer;
use super::registry::{Registration, SessionRecord, SessionRegistry};
use super::state::{SessionState, SessionSummary, StatusView};
use crate::dispatch::{AlertTemplate, Dispatcher, FeeAlert, Pacing};
use crate::engine::{ClientFactory, LaunchOptions, MessagingClient};
use crate::error::{GatewayError, GatewayResult};

/// Settings the manager needs beyond its engine
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Root of the per-tenant credential directories
    pub auth_root: PathBuf,
    pub executable_path: Option<PathBuf>,
    pub pacing: Pacing,
    pub template: AlertTemplate,
    pub dispatch_timeout: Option<Duration>,
}

impl ManagerConfig {
    pub fn new(auth_root: impl Into<PathBuf>) -> Self {
        Self {
            auth_root: auth_root.into(),
            executable_path: None,
            pacing: Pacing::default(),
            template: AlertTemplate::default(),
            dispatch_timeout: None,
        }
    }
}

/// Caller's view of an initialized session
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tenant_id: String,
    instance: u64,
    created: bool,
    updates: watch::Receiver<SessionState>,
}

impl SessionHandle {
    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// Client instance backing this session
    pub fn instance(&self) -> u64 {
        self.instance
    }

    /// Whether this call created the session
    pub fn is_new(&self) -> bool {
        self.created
    }

    pub fn state(&self) -> SessionState {
        self.updates.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.updates.clone()
    }

    /// Wait until the session is linked; fails if it is removed first
    pub async fn wait_ready(mut self) -> GatewayResult<()> {
        self.updates
            .wait_for(SessionState::is_ready)
            .await
            .map(|_| ())
            .map_err(|_| GatewayError::SessionClosed(self.tenant_id.clone()))
    }
}

/// Session Manager - one WhatsApp session per tenant
pub struct SessionManager {
    registry: Arc<SessionRegistry>,
    reclaimer: LockReclaimer,
    factory: Arc<dyn ClientFactory>,
    executable_path: Option<PathBuf>,
    dispatcher: Dispatcher,
}

impl SessionManager {
    pub fn new(factory: Arc<dyn ClientFactory>, config: ManagerConfig) -> Self {
        let registry = Arc::new(SessionRegistry::new());
        let dispatcher = Dispatcher::new(registry.clone(), config.pacing, config.template)
            .with_timeout(config.dispatch_timeout);

        Self {
            registry,
            reclaimer: LockReclaimer::new(config.auth_root),
            factory,
            executable_path: config.executable_path,
            dispatcher,
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Initialize the session for `tenant_id`, or return the existing one.
    ///
    /// Returns as soon as the client has been spawned; pairing and linking
    /// progress through the handle's watch channel. Must be called from
    /// within a Tokio runtime.
    pub fn initialize(&self, tenant_id: &str) -> GatewayResult<SessionHandle> {
        validate_tenant_id(tenant_id)?;

        let registration = self.registry.get_or_try_insert_with(tenant_id, |instance| {
            info!("[{}] Initializing WhatsApp session", tenant_id);
            self.reclaimer.reclaim(tenant_id);

            let options = LaunchOptions::new(tenant_id, self.reclaimer.auth_root())
                .with_executable(self.executable_path.clone());
            let (client, events) = self.factory.create(options)?;
            let client: Arc<dyn MessagingClient> = Arc::from(client);
            let record = SessionRecord::new(tenant_id, instance, client.clone());
            Ok((record, (client, events)))
        })?;

        match registration {
            Registration::Existing { instance, updates } => {
                debug!("[{}] Session already initialized", tenant_id);
                Ok(SessionHandle {
                    tenant_id: tenant_id.to_string(),
                    instance,
                    created: false,
                    updates,
                })
            }
            Registration::Created {
                instance,
                updates,
                extra: (client, events),
            } => {
                lifecycle::spawn_event_loop(
                    self.registry.clone(),
                    tenant_id.to_string(),
                    instance,
                    events,
                );
                lifecycle::spawn_start(
                    self.registry.clone(),
                    tenant_id.to_string(),
                    instance,
                    client,
                );
                Ok(SessionHandle {
                    tenant_id: tenant_id.to_string(),
                    instance,
                    created: true,
                    updates,
                })
            }
        }
    }

    /// Current externally visible status
    pub fn status(&self, tenant_id: &str) -> StatusView {
        self.registry.status(tenant_id)
    }

    /// Send a fee alert through the tenant's linked session
    pub async fn send(
        &self,
        tenant_id: &str,
        destination: &str,
        alert: &FeeAlert,
    ) -> GatewayResult<()> {
        self.dispatcher.send(tenant_id, destination, alert).await
    }

    pub fn list(&self) -> Vec<SessionSummary> {
        self.registry.list()
    }

    pub fn session_count(&self) -> usize {
        self.registry.len()
    }

    /// Shutdown all sessions - for cleanup on process exit
    pub async fn shutdown_all(&self) {
        info!("Shutting down all sessions...");

        for record in self.registry.drain() {
            let tenant_id = record.tenant_id().to_string();
            if let Err(e) = record.into_client().shutdown().await {
                error!("[{}] Error shutting down client: {}", tenant_id, e);
            }
        }

        info!("All sessions shut down");
    }
}

/// Tenant ids name a directory, so they must be a single non-empty path segment
fn validate_tenant_id(tenant_id: &str) -> GatewayResult<()> {
    if tenant_id.trim().is_empty() {
        return Err(GatewayError::InvalidArgument(
            "School ID is required for initialization.".to_string(),
        ));
    }
    if tenant_id.trim() != tenant_id {
        return Err(GatewayError::InvalidArgument(format!(
            "School ID {:?} must not have leading or trailing whitespace",
            tenant_id
        )));
    }
    if tenant_id.contains(['/', '\\']) || tenant_id.contains("..") {
        return Err(GatewayError::InvalidArgument(format!(
            "School ID {:?} must not contain path separators",
            tenant_id
        )));
    }
    Ok(())
}
