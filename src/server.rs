//! Server wiring: shared state, listener, and session admission
//!
//! The listener accepts connections, counts them, registers a provisional
//! registry entry, and submits one session task per connection to the
//! worker pool. A full queue rejects the connection with a busy notice
//! instead of leaking it. Teardown (counter decrement, registry removal)
//! runs exactly once per session, whatever exit path the session took.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::admin::AdminSlot;
use crate::audit::Audit;
use crate::auth::{Authenticator, StaticCredentials};
use crate::block::BlockList;
use crate::config::ServerConfig;
use crate::error::AppError;
use crate::monitor::monitor_loop;
use crate::pool::WorkerPool;
use crate::registry::ConnectionRegistry;
use crate::session::Session;
use crate::types::SessionId;

/// Notice sent when the task queue is full
pub const SERVER_BUSY_NOTICE: &str = "Server busy. Try again later.";

/// Process-wide shared state, initialized once at server start
pub struct ServerState {
    /// Active connections and their authenticated usernames
    pub registry: ConnectionRegistry,
    /// Usernames forbidden from authenticating
    pub blocklist: BlockList,
    /// Single-occupant admin reservation
    pub admin_slot: Arc<AdminSlot>,
    /// Credential validator
    pub authenticator: Box<dyn Authenticator>,
    /// Append-only activity and change logs
    pub audit: Audit,
    /// Live connection counter
    pub connections: Arc<AtomicUsize>,
    /// Directory sessions start in; logs are written here too
    pub base_dir: PathBuf,
}

impl ServerState {
    /// Build state with the built-in credential table
    pub fn new(base_dir: PathBuf) -> Self {
        Self::with_authenticator(base_dir, Box::new(StaticCredentials))
    }

    /// Build state with a custom authenticator
    pub fn with_authenticator(base_dir: PathBuf, authenticator: Box<dyn Authenticator>) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            blocklist: BlockList::new(),
            admin_slot: Arc::new(AdminSlot::new()),
            authenticator,
            audit: Audit::new(&base_dir),
            connections: Arc::new(AtomicUsize::new(0)),
            base_dir,
        }
    }
}

/// One queued unit of work: a freshly accepted connection
pub struct SessionTask {
    id: SessionId,
    stream: TcpStream,
    evict_rx: mpsc::Receiver<String>,
}

/// The metadata server
pub struct Server {
    config: ServerConfig,
    state: Arc<ServerState>,
}

impl Server {
    /// Create a server over the given configuration and state
    pub fn new(config: ServerConfig, state: ServerState) -> Self {
        Self {
            config,
            state: Arc::new(state),
        }
    }

    /// Shared state handle (used by tests to inspect registries)
    pub fn state(&self) -> Arc<ServerState> {
        Arc::clone(&self.state)
    }

    /// Bind the configured address and serve until `shutdown` fires
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> Result<(), AppError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve connections from an already-bound listener
    ///
    /// Separated from `run` so tests can bind an ephemeral port first.
    pub async fn serve(
        self,
        listener: TcpListener,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), AppError> {
        let addr = listener.local_addr()?;
        info!("Metadata server listening on {}", addr);

        let pool_state = Arc::clone(&self.state);
        let pool = WorkerPool::new(
            self.config.worker_count,
            self.config.queue_capacity,
            move |task: SessionTask| run_session(Arc::clone(&pool_state), task),
        );

        let monitor = tokio::spawn(monitor_loop(
            self.config.monitor_interval,
            Arc::clone(&self.state.connections),
            shutdown.clone(),
        ));

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            debug!("New connection from {}", peer);
                            self.admit(&pool, stream).await;
                        }
                        Err(e) => {
                            error!("Failed to accept connection: {}", e);
                        }
                    }
                }
                _ = shutdown.changed() => {
                    info!("Shutdown requested, draining sessions");
                    break;
                }
            }
        }

        pool.shutdown().await;
        let _ = monitor.await;
        info!("Server stopped");
        Ok(())
    }

    /// Admit one accepted connection into the pool
    ///
    /// On a full queue the connection is told the server is busy and closed
    /// gracefully; counter and provisional registry entry are rolled back.
    async fn admit(&self, pool: &WorkerPool<SessionTask>, stream: TcpStream) {
        let id = SessionId::new();
        self.state.connections.fetch_add(1, Ordering::SeqCst);
        let evict_rx = self.state.registry.register(id);

        let task = SessionTask {
            id,
            stream,
            evict_rx,
        };
        if let Err(rejected) = pool.submit(task) {
            let mut task = rejected.into_task();
            warn!("Task queue full, rejecting session {}", task.id);
            let _ = task
                .stream
                .write_all(format!("{}\n", SERVER_BUSY_NOTICE).as_bytes())
                .await;
            let _ = task.stream.shutdown().await;
            self.state.registry.unregister(task.id);
            self.state.connections.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

/// Execute one session task and tear it down exactly once
async fn run_session(state: Arc<ServerState>, task: SessionTask) {
    let id = task.id;
    let mut session = Session::new(id, task.stream, task.evict_rx, Arc::clone(&state));

    match session.run().await {
        Ok(()) => debug!("Session {} closed", id),
        Err(AppError::Evicted) => debug!("Session {} force-closed by block", id),
        Err(e) => debug!("Session {} ended with error: {}", id, e),
    }

    // Teardown: the socket closes when the session drops; the registry
    // removal is idempotent in case an eviction already removed the entry.
    state.registry.unregister(id);
    state.connections.fetch_sub(1, Ordering::SeqCst);
}
