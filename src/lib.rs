//! Multi-Client File/Metadata Management Server Library
//!
//! A TCP server where clients authenticate and drive a role-specific
//! plain-text command protocol for browsing, editing, deleting, converting
//! and querying files.
//!
//! # Features
//! - Bounded worker pool executing one session per task (FIFO admission,
//!   non-blocking submit that rejects when full)
//! - Role-based command sets: admin, simple, remote
//! - Single-admin exclusivity via a drop-released slot guard
//! - Live user blocking with forced eviction of connected sessions
//! - XML→JSON conversion, JSON path queries, interactive line editing
//! - Append-only activity, change, and per-file logs
//!
//! # Architecture
//! The listener accepts connections and submits one `SessionTask` per
//! connection to the `WorkerPool`. Each worker runs sessions to completion;
//! shared state (connection registry, block list, admin slot) lives behind
//! individually locked types with atomic operations only; no lock is ever
//! held across socket I/O.
//!
//! # Example
//! ```ignore
//! use tokio::sync::watch;
//! use metadata_server::{Server, ServerConfig, ServerState};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ServerConfig::from_env();
//!     let state = ServerState::new(std::env::current_dir().unwrap());
//!     let (_shutdown_tx, shutdown_rx) = watch::channel(false);
//!     Server::new(config, state).run(shutdown_rx).await.unwrap();
//! }
//! ```

pub mod admin;
pub mod audit;
pub mod auth;
pub mod block;
pub mod config;
pub mod convert;
pub mod editor;
pub mod error;
pub mod fsops;
pub mod jsonpath;
pub mod monitor;
pub mod pool;
pub mod registry;
pub mod server;
pub mod session;
pub mod types;
pub mod xml;

// Re-export main types for convenience
pub use admin::{AdminGuard, AdminSlot};
pub use auth::{Authenticator, StaticCredentials};
pub use block::BlockList;
pub use config::ServerConfig;
pub use error::{AppError, SubmitError};
pub use pool::WorkerPool;
pub use registry::ConnectionRegistry;
pub use server::{Server, ServerState};
pub use session::Session;
pub use types::{Role, SessionId};
