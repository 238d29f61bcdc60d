//! Session Management Module
//!
//! One WhatsApp session per tenant (school):
//! - Concurrent registry of session records (DashMap)
//! - Event-driven lifecycle, one event loop per client instance
//! - Stale profile lock reclamation before every (re)start

pub mod events;
pub mod lifecycle;
pub mod locks;
pub mod manager;
pub mod registry;
pub mod state;

pub use events::{ClientEvent, RemovalReason};
pub use locks::LockReclaimer;
pub use manager::{ManagerConfig, SessionHandle, SessionManager};
pub use registry::{SessionRecord, SessionRegistry};
pub use state::{SessionState, SessionSummary, StatusView};
