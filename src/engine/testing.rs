//! In-memory engine double used by unit tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;

use super::{ClientFactory, LaunchOptions, MessagingClient};
use crate::error::{GatewayError, GatewayResult};
use crate::session::events::ClientEvent;

/// A send observed by a fake client
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub client_id: String,
    pub destination: String,
    pub body: String,
    pub at: Instant,
}

/// Shared observation point for every client a [`FakeFactory`] builds
#[derive(Default)]
pub struct FakeEngine {
    pub created: AtomicUsize,
    pub started: AtomicUsize,
    pub shutdowns: AtomicUsize,
    pub sent: Mutex<Vec<SentMessage>>,
    pub fail_sends: AtomicBool,
    pub fail_start: AtomicBool,
    senders: Mutex<Vec<(String, mpsc::Sender<ClientEvent>)>>,
}

impl FakeEngine {
    /// Push an event through the most recent client built for `client_id`
    pub async fn emit(&self, client_id: &str, event: ClientEvent) {
        let tx = self
            .senders
            .lock()
            .iter()
            .rev()
            .find(|(id, _)| id == client_id)
            .map(|(_, tx)| tx.clone())
            .expect("no client for tenant");
        tx.send(event).await.expect("event loop gone");
    }

    /// Drop every event sender built for `client_id`, closing its event stream
    pub fn close(&self, client_id: &str) {
        self.senders.lock().retain(|(id, _)| id != client_id);
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().clone()
    }
}

struct FakeClient {
    client_id: String,
    engine: Arc<FakeEngine>,
}

#[async_trait]
impl MessagingClient for FakeClient {
    async fn start(&self) -> GatewayResult<()> {
        self.engine.started.fetch_add(1, Ordering::SeqCst);
        if self.engine.fail_start.load(Ordering::SeqCst) {
            return Err(GatewayError::Engine("browser failed to launch".to_string()));
        }
        Ok(())
    }

    async fn send(&self, destination: &str, body: &str) -> GatewayResult<()> {
        if self.engine.fail_sends.load(Ordering::SeqCst) {
            return Err(GatewayError::Transport("Evaluation failed".to_string()));
        }
        self.engine.sent.lock().push(SentMessage {
            client_id: self.client_id.clone(),
            destination: destination.to_string(),
            body: body.to_string(),
            at: Instant::now(),
        });
        Ok(())
    }

    async fn shutdown(&self) -> GatewayResult<()> {
        self.engine.shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct FakeFactory {
    pub engine: Arc<FakeEngine>,
}

impl FakeFactory {
    pub fn new() -> (Self, Arc<FakeEngine>) {
        let engine = Arc::new(FakeEngine::default());
        (
            Self {
                engine: engine.clone(),
            },
            engine,
        )
    }
}

impl ClientFactory for FakeFactory {
    fn create(
        &self,
        options: LaunchOptions,
    ) -> GatewayResult<(Box<dyn MessagingClient>, mpsc::Receiver<ClientEvent>)> {
        let (tx, rx) = mpsc::channel(16);
        self.engine.created.fetch_add(1, Ordering::SeqCst);
        self.engine
            .senders
            .lock()
            .push((options.client_id.clone(), tx));
        let client = FakeClient {
            client_id: options.client_id,
            engine: self.engine.clone(),
        };
        Ok((Box::new(client), rx))
    }
}
