//! Session Lifecycle
//!
//! State transitions for one tenant session, driven only by events raised by
//! that session's client. Each client instance gets its own event loop.

use log::{debug, error, info, warn};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::events::{ClientEvent, RemovalReason};
use super::registry::{SessionRecord, SessionRegistry};
use super::state::SessionState;
use crate::engine::MessagingClient;

/// What an event does to a session record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Set(SessionState),
    Keep,
    Remove(RemovalReason),
}

/// Pure state transition for one event
pub fn transition(current: &SessionState, event: ClientEvent) -> Transition {
    match event {
        ClientEvent::PairingCodeIssued { code } => Transition::Set(SessionState::AwaitingLink {
            pairing_code: code,
        }),
        ClientEvent::Linked if current.is_ready() => Transition::Keep,
        ClientEvent::Linked => Transition::Set(SessionState::Ready),
        ClientEvent::Authenticated => Transition::Keep,
        ClientEvent::AuthFailure { reason } => Transition::Remove(RemovalReason::AuthFailure(reason)),
        ClientEvent::Disconnected { reason } => {
            Transition::Remove(RemovalReason::Disconnected(reason))
        }
    }
}

fn log_event(tenant_id: &str, event: &ClientEvent) {
    match event {
        ClientEvent::PairingCodeIssued { .. } => {
            info!("[{}] New QR issued. Awaiting scan...", tenant_id)
        }
        ClientEvent::Linked => info!("[{}] is now ONLINE", tenant_id),
        ClientEvent::Authenticated => info!("[{}] authenticated", tenant_id),
        ClientEvent::AuthFailure { reason } => {
            error!("[{}] Auth failure: {}", tenant_id, reason)
        }
        ClientEvent::Disconnected { reason } => {
            info!("[{}] disconnected: {}", tenant_id, reason)
        }
    }
}

/// Drop a removed record and shut its client down in the background
pub fn release(record: SessionRecord, reason: &RemovalReason) {
    let tenant_id = record.tenant_id().to_string();
    match reason {
        RemovalReason::AuthFailure(_) | RemovalReason::StartFailed(_) => {
            error!("[{}] Session removed ({})", tenant_id, reason)
        }
        _ => info!("[{}] Session removed ({})", tenant_id, reason),
    }

    let client = record.into_client();
    tokio::spawn(async move {
        if let Err(e) = client.shutdown().await {
            warn!("[{}] Client shutdown failed: {}", tenant_id, e);
        }
    });
}

/// Consume `events` for one client instance until it is removed
pub fn spawn_event_loop(
    registry: Arc<SessionRegistry>,
    tenant_id: String,
    instance: u64,
    mut events: mpsc::Receiver<ClientEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            log_event(&tenant_id, &event);

            let outcome = registry.update(&tenant_id, instance, |record| {
                match transition(record.state(), event) {
                    Transition::Set(state) => {
                        record.set_state(state);
                        None
                    }
                    Transition::Keep => None,
                    Transition::Remove(reason) => Some(reason),
                }
            });

            match outcome {
                Some(None) => {}
                Some(Some(reason)) => {
                    if let Some(record) = registry.remove_instance(&tenant_id, instance) {
                        release(record, &reason);
                    }
                    return;
                }
                None => {
                    debug!(
                        "[{}] Instance {} no longer registered, stopping event loop",
                        tenant_id, instance
                    );
                    return;
                }
            }
        }

        if let Some(record) = registry.remove_instance(&tenant_id, instance) {
            release(record, &RemovalReason::StreamClosed);
        }
    })
}

/// Start the client without blocking the caller; a failed start removes the record
pub fn spawn_start(
    registry: Arc<SessionRegistry>,
    tenant_id: String,
    instance: u64,
    client: Arc<dyn MessagingClient>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = client.start().await {
            drop(client);
            if let Some(record) = registry.remove_instance(&tenant_id, instance) {
                release(record, &RemovalReason::StartFailed(e.to_string()));
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(value: &str) -> ClientEvent {
        ClientEvent::PairingCodeIssued {
            code: value.to_string(),
        }
    }

    #[test]
    fn test_pairing_code_moves_to_awaiting_link() {
        assert_eq!(
            transition(&SessionState::Pending, code("CODE123")),
            Transition::Set(SessionState::AwaitingLink {
                pairing_code: "CODE123".to_string()
            })
        );
    }

    #[test]
    fn test_refreshed_code_replaces_previous() {
        let current = SessionState::AwaitingLink {
            pairing_code: "OLD".to_string(),
        };
        assert_eq!(
            transition(&current, code("NEW")),
            Transition::Set(SessionState::AwaitingLink {
                pairing_code: "NEW".to_string()
            })
        );
    }

    #[test]
    fn test_linked_clears_code() {
        let current = SessionState::AwaitingLink {
            pairing_code: "CODE123".to_string(),
        };
        assert_eq!(
            transition(&current, ClientEvent::Linked),
            Transition::Set(SessionState::Ready)
        );
        // Silent re-authentication skips the pairing step
        assert_eq!(
            transition(&SessionState::Pending, ClientEvent::Linked),
            Transition::Set(SessionState::Ready)
        );
        assert_eq!(
            transition(&SessionState::Ready, ClientEvent::Linked),
            Transition::Keep
        );
    }

    #[test]
    fn test_authenticated_is_informational() {
        for state in [SessionState::Pending, SessionState::Ready] {
            assert_eq!(
                transition(&state, ClientEvent::Authenticated),
                Transition::Keep
            );
        }
    }

    #[test]
    fn test_terminal_events_remove() {
        assert_eq!(
            transition(
                &SessionState::Ready,
                ClientEvent::AuthFailure {
                    reason: "bad session".to_string()
                }
            ),
            Transition::Remove(RemovalReason::AuthFailure("bad session".to_string()))
        );
        assert_eq!(
            transition(
                &SessionState::Pending,
                ClientEvent::Disconnected {
                    reason: "LOGOUT".to_string()
                }
            ),
            Transition::Remove(RemovalReason::Disconnected("LOGOUT".to_string()))
        );
    }
}
