//! Engine Driver Process
//!
//! Runs one driver process per tenant and speaks the line protocol from
//! [`super::protocol`] over its stdin/stdout.

use async_trait::async_trait;
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::sync::{mpsc, oneshot};

use super::protocol::{encode_line, DriverCommand, DriverMessage};
use super::{ClientFactory, LaunchOptions, MessagingClient};
use crate::error::{GatewayError, GatewayResult};
use crate::session::events::ClientEvent;

const EVENT_BUFFER: usize = 64;

type PendingSends = Arc<Mutex<HashMap<u64, oneshot::Sender<GatewayResult<()>>>>>;

/// How to launch the driver process
#[derive(Debug, Clone)]
pub struct DriverConfig {
    pub command: String,
    pub args: Vec<String>,
    /// Grace period before a driver is force killed
    pub shutdown_timeout: Duration,
}

impl DriverConfig {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

/// Managed driver process with its reader tasks
struct ManagedProcess {
    tenant_id: String,
    child: Child,
    pid: u32,
    stdout_handle: Option<tokio::task::JoinHandle<()>>,
    stderr_handle: Option<tokio::task::JoinHandle<()>>,
}

impl ManagedProcess {
    fn new(tenant_id: impl Into<String>, child: Child) -> Self {
        let pid = child.id().unwrap_or(0);
        Self {
            tenant_id: tenant_id.into(),
            child,
            pid,
            stdout_handle: None,
            stderr_handle: None,
        }
    }

    fn with_stdout_handle(mut self, handle: tokio::task::JoinHandle<()>) -> Self {
        self.stdout_handle = Some(handle);
        self
    }

    fn with_stderr_handle(mut self, handle: tokio::task::JoinHandle<()>) -> Self {
        self.stderr_handle = Some(handle);
        self
    }

    /// Wait for the driver to exit on its own, then force kill
    async fn shutdown(&mut self, timeout: Duration) -> Result<(), std::io::Error> {
        match tokio::time::timeout(timeout, self.child.wait()).await {
            Ok(Ok(status)) => {
                debug!(
                    "[{}] Driver {} exited with {}",
                    self.tenant_id, self.pid, status
                );
            }
            _ => {
                warn!("[{}] Force killing driver {}", self.tenant_id, self.pid);
                self.child.kill().await?;
            }
        }

        if let Some(handle) = self.stdout_handle.take() {
            handle.abort();
        }
        if let Some(handle) = self.stderr_handle.take() {
            handle.abort();
        }

        Ok(())
    }
}

/// Removes a send's reply slot when the send finishes or is cancelled
struct PendingEntry {
    pending: PendingSends,
    request_id: u64,
}

impl Drop for PendingEntry {
    fn drop(&mut self) {
        self.pending.lock().remove(&self.request_id);
    }
}

/// Messaging client backed by an external driver process
pub struct DriverClient {
    config: DriverConfig,
    options: LaunchOptions,
    events: mpsc::Sender<ClientEvent>,
    process: tokio::sync::Mutex<Option<ManagedProcess>>,
    stdin: tokio::sync::Mutex<Option<ChildStdin>>,
    pending: PendingSends,
    next_request: AtomicU64,
    closing: Arc<AtomicBool>,
    exited: Arc<AtomicBool>,
}

impl DriverClient {
    pub fn new(
        config: DriverConfig,
        options: LaunchOptions,
        events: mpsc::Sender<ClientEvent>,
    ) -> Self {
        Self {
            config,
            options,
            events,
            process: tokio::sync::Mutex::new(None),
            stdin: tokio::sync::Mutex::new(None),
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_request: AtomicU64::new(1),
            closing: Arc::new(AtomicBool::new(false)),
            exited: Arc::new(AtomicBool::new(false)),
        }
    }

    fn tenant_id(&self) -> &str {
        &self.options.client_id
    }

    async fn write(&self, command: &DriverCommand) -> GatewayResult<()> {
        let line = encode_line(command)?;
        let mut stdin = self.stdin.lock().await;
        let pipe = stdin
            .as_mut()
            .ok_or_else(|| GatewayError::Engine("Driver is not running".to_string()))?;
        pipe.write_all(line.as_bytes()).await?;
        pipe.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl MessagingClient for DriverClient {
    async fn start(&self) -> GatewayResult<()> {
        {
            let mut process = self.process.lock().await;
            if process.is_some() {
                return Err(GatewayError::Engine(format!(
                    "Driver already started for {}",
                    self.tenant_id()
                )));
            }

            let mut child = Command::new(&self.config.command)
                .args(&self.config.args)
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .spawn()
                .map_err(|e| {
                    GatewayError::Engine(format!(
                        "Failed to spawn driver {}: {}",
                        self.config.command, e
                    ))
                })?;

            let stdin = child.stdin.take();
            let stdout = child.stdout.take();
            let stderr = child.stderr.take();
            let (Some(stdin), Some(stdout), Some(stderr)) = (stdin, stdout, stderr) else {
                return Err(GatewayError::Engine(
                    "Driver pipes unavailable".to_string(),
                ));
            };

            let stdout_handle = tokio::spawn(read_stdout(
                self.tenant_id().to_string(),
                stdout,
                self.events.clone(),
                self.pending.clone(),
                self.closing.clone(),
                self.exited.clone(),
            ));
            let stderr_handle = tokio::spawn(read_stderr(self.tenant_id().to_string(), stderr));

            let managed = ManagedProcess::new(self.tenant_id(), child)
                .with_stdout_handle(stdout_handle)
                .with_stderr_handle(stderr_handle);
            info!(
                "[{}] Driver started with pid {}",
                self.tenant_id(),
                managed.pid
            );

            *self.stdin.lock().await = Some(stdin);
            *process = Some(managed);
        }

        self.write(&DriverCommand::Start {
            client_id: self.options.client_id.clone(),
            data_path: self.options.data_path.clone(),
            executable_path: self.options.executable_path.clone(),
            headless: self.options.headless.clone(),
            browser_args: self.options.browser_args.clone(),
        })
        .await
    }

    async fn send(&self, destination: &str, body: &str) -> GatewayResult<()> {
        let request_id = self.next_request.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(request_id, tx);
        let _entry = PendingEntry {
            pending: self.pending.clone(),
            request_id,
        };
        // The reader drains pending sends once; anything queued after that would never resolve
        if self.exited.load(Ordering::SeqCst) {
            return Err(GatewayError::Transport("Driver exited".to_string()));
        }

        let command = DriverCommand::Send {
            request_id,
            to: destination.to_string(),
            body: body.to_string(),
        };
        if let Err(e) = self.write(&command).await {
            return Err(GatewayError::Transport(e.to_string()));
        }

        match rx.await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Transport(
                "Driver closed before replying".to_string(),
            )),
        }
    }

    async fn shutdown(&self) -> GatewayResult<()> {
        self.closing.store(true, Ordering::SeqCst);

        if let Err(e) = self.write(&DriverCommand::Shutdown).await {
            debug!("[{}] Could not request driver shutdown: {}", self.tenant_id(), e);
        }
        // Closing stdin lets a well-behaved driver see EOF
        self.stdin.lock().await.take();

        let process = self.process.lock().await.take();
        if let Some(mut process) = process {
            process.shutdown(self.config.shutdown_timeout).await?;
        }
        Ok(())
    }
}

async fn read_stdout(
    tenant_id: String,
    stdout: ChildStdout,
    events: mpsc::Sender<ClientEvent>,
    pending: PendingSends,
    closing: Arc<AtomicBool>,
    exited: Arc<AtomicBool>,
) {
    let mut lines = BufReader::new(stdout).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!("[{}] Driver stdout read failed: {}", tenant_id, e);
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match serde_json::from_str::<DriverMessage>(line) {
            Ok(DriverMessage::SendResult {
                request_id,
                ok,
                error,
            }) => {
                let waiter = pending.lock().remove(&request_id);
                match waiter {
                    Some(tx) => {
                        let result = if ok {
                            Ok(())
                        } else {
                            Err(GatewayError::Transport(
                                error.unwrap_or_else(|| "Send failed".to_string()),
                            ))
                        };
                        let _ = tx.send(result);
                    }
                    None => debug!(
                        "[{}] Reply for unknown request {}",
                        tenant_id, request_id
                    ),
                }
            }
            Ok(message) => {
                if let Some(event) = message.into_event() {
                    if events.send(event).await.is_err() {
                        debug!("[{}] Event receiver dropped", tenant_id);
                        break;
                    }
                }
            }
            Err(e) => warn!("[{}] Ignoring malformed driver line: {}", tenant_id, e),
        }
    }

    exited.store(true, Ordering::SeqCst);
    let waiters: Vec<_> = pending.lock().drain().map(|(_, tx)| tx).collect();
    for tx in waiters {
        let _ = tx.send(Err(GatewayError::Transport("Driver exited".to_string())));
    }

    if !closing.load(Ordering::SeqCst) {
        error!("[{}] Driver exited unexpectedly", tenant_id);
        let _ = events
            .send(ClientEvent::Disconnected {
                reason: "driver exited".to_string(),
            })
            .await;
    }
}

async fn read_stderr(tenant_id: String, stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!("[{}] driver: {}", tenant_id, line);
    }
}

/// Builds one [`DriverClient`] per tenant
pub struct DriverFactory {
    config: DriverConfig,
}

impl DriverFactory {
    pub fn new(config: DriverConfig) -> Self {
        Self { config }
    }
}

impl ClientFactory for DriverFactory {
    fn create(
        &self,
        options: LaunchOptions,
    ) -> GatewayResult<(Box<dyn MessagingClient>, mpsc::Receiver<ClientEvent>)> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let client = DriverClient::new(self.config.clone(), options, tx);
        Ok((Box::new(client), rx))
    }
}
