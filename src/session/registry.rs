//! Session Registry
//!
//! Concurrent tenant -> session record map backed by DashMap. Structural
//! changes (insert/remove) and per-record field updates all go through the
//! map's shard locks, so a status read never observes a half-applied
//! transition.

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

use super::state::{SessionState, SessionSummary, StatusView};
use crate::engine::MessagingClient;
use crate::error::{GatewayError, GatewayResult};

/// Everything the gateway knows about one tenant's live session
pub struct SessionRecord {
    tenant_id: String,
    /// Distinguishes successive clients for the same tenant
    instance: u64,
    state: SessionState,
    client: Arc<dyn MessagingClient>,
    state_tx: watch::Sender<SessionState>,
    created_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
}

impl SessionRecord {
    pub fn new(
        tenant_id: impl Into<String>,
        instance: u64,
        client: Arc<dyn MessagingClient>,
    ) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Pending);
        let now = Utc::now();

        Self {
            tenant_id: tenant_id.into(),
            instance,
            state: SessionState::Pending,
            client,
            state_tx,
            created_at: now,
            last_activity: now,
        }
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn instance(&self) -> u64 {
        self.instance
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Update state and notify watchers
    pub fn set_state(&mut self, state: SessionState) {
        self.state = state.clone();
        self.last_activity = Utc::now();
        self.state_tx.send_replace(state);
    }

    /// Watch state changes; the channel closes when the record is dropped
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Client handle, only handed out once the session can send
    pub fn ready_client(&self) -> Option<Arc<dyn MessagingClient>> {
        self.state.is_ready().then(|| self.client.clone())
    }

    pub fn status(&self) -> StatusView {
        StatusView::from(&self.state)
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            tenant_id: self.tenant_id.clone(),
            state: self.state.to_string(),
            instance: self.instance,
            created_at: self.created_at.to_rfc3339(),
            last_activity: self.last_activity.to_rfc3339(),
        }
    }

    /// Consume the record, closing its watchers and yielding the client
    pub fn into_client(self) -> Arc<dyn MessagingClient> {
        self.client
    }
}

/// Result of [`SessionRegistry::get_or_try_insert_with`]
pub enum Registration<T> {
    Existing {
        instance: u64,
        updates: watch::Receiver<SessionState>,
    },
    Created {
        instance: u64,
        updates: watch::Receiver<SessionState>,
        extra: T,
    },
}

/// Tenant session registry
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, SessionRecord>,
    next_instance: AtomicU64,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(&self, tenant_id: &str) -> bool {
        self.sessions.contains_key(tenant_id)
    }

    /// Borrow a record; do not hold the guard across an await point
    pub fn get(
        &self,
        tenant_id: &str,
    ) -> Option<dashmap::mapref::one::Ref<'_, String, SessionRecord>> {
        self.sessions.get(tenant_id)
    }

    /// Insert a record, refusing to replace an existing one
    pub fn insert(&self, tenant_id: &str, record: SessionRecord) -> GatewayResult<()> {
        match self.sessions.entry(tenant_id.to_string()) {
            Entry::Occupied(_) => Err(GatewayError::AlreadyRegistered(tenant_id.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }

    /// Return the existing record's watch, or build and insert a new record.
    ///
    /// `create` receives a fresh instance number and runs under the entry lock,
    /// so two racing callers can never both build a client for one tenant.
    pub fn get_or_try_insert_with<T, F>(
        &self,
        tenant_id: &str,
        create: F,
    ) -> GatewayResult<Registration<T>>
    where
        F: FnOnce(u64) -> GatewayResult<(SessionRecord, T)>,
    {
        match self.sessions.entry(tenant_id.to_string()) {
            Entry::Occupied(entry) => {
                let record = entry.get();
                Ok(Registration::Existing {
                    instance: record.instance,
                    updates: record.subscribe(),
                })
            }
            Entry::Vacant(slot) => {
                let instance = self.next_instance.fetch_add(1, Ordering::Relaxed) + 1;
                let (record, extra) = create(instance)?;
                let updates = record.subscribe();
                slot.insert(record);
                Ok(Registration::Created {
                    instance,
                    updates,
                    extra,
                })
            }
        }
    }

    /// Apply `f` to the record if it still belongs to `instance`
    pub fn update<R>(
        &self,
        tenant_id: &str,
        instance: u64,
        f: impl FnOnce(&mut SessionRecord) -> R,
    ) -> Option<R> {
        let mut record = self.sessions.get_mut(tenant_id)?;
        if record.instance != instance {
            return None;
        }
        Some(f(record.value_mut()))
    }

    pub fn remove(&self, tenant_id: &str) -> Option<SessionRecord> {
        self.sessions.remove(tenant_id).map(|(_, record)| record)
    }

    /// Remove the record only if it still belongs to `instance`
    pub fn remove_instance(&self, tenant_id: &str, instance: u64) -> Option<SessionRecord> {
        self.sessions
            .remove_if(tenant_id, |_, record| record.instance == instance)
            .map(|(_, record)| record)
    }

    pub fn status(&self, tenant_id: &str) -> StatusView {
        self.sessions
            .get(tenant_id)
            .map(|record| record.status())
            .unwrap_or_else(StatusView::absent)
    }

    pub fn ready_client(&self, tenant_id: &str) -> Option<Arc<dyn MessagingClient>> {
        self.sessions
            .get(tenant_id)
            .and_then(|record| record.ready_client())
    }

    pub fn list(&self) -> Vec<SessionSummary> {
        let mut sessions: Vec<SessionSummary> =
            self.sessions.iter().map(|record| record.summary()).collect();
        sessions.sort_by(|a, b| a.tenant_id.cmp(&b.tenant_id));
        sessions
    }

    /// Remove every record
    pub fn drain(&self) -> Vec<SessionRecord> {
        let tenant_ids: Vec<String> = self.sessions.iter().map(|r| r.key().clone()).collect();
        tenant_ids
            .iter()
            .filter_map(|tenant_id| self.remove(tenant_id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
