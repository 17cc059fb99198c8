//! Error types for the metadata server
//!
//! Defines application-level errors and task submission errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Application-level errors
///
/// Covers both fatal errors (session termination) and
/// operation errors (reported to the client as text).
#[derive(Debug, Error)]
pub enum AppError {
    /// IO error (socket or file)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed XML input
    #[error("XML parse error: {0}")]
    Xml(String),

    /// The session was force-closed by an administrative block
    #[error("Session evicted")]
    Evicted,
}

/// Task submission errors
///
/// Returned by `WorkerPool::submit`; the queue never blocks the caller.
/// The rejected task is handed back so the caller can still reach it,
/// e.g. to close a connection with a notice instead of leaking it.
///
/// Implemented by hand (like tokio's channel errors) so the payload type
/// needs no `Debug` bound.
pub enum SubmitError<T> {
    /// The task queue is at capacity
    QueueFull(T),

    /// The pool has been shut down
    PoolClosed(T),
}

impl<T> SubmitError<T> {
    /// Recover the rejected task
    pub fn into_task(self) -> T {
        match self {
            SubmitError::QueueFull(task) | SubmitError::PoolClosed(task) => task,
        }
    }
}

impl<T> std::fmt::Debug for SubmitError<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmitError::QueueFull(_) => f.write_str("QueueFull(..)"),
            SubmitError::PoolClosed(_) => f.write_str("PoolClosed(..)"),
        }
    }
}

impl<T> std::fmt::Display for SubmitError<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmitError::QueueFull(_) => f.write_str("Task queue full"),
            SubmitError::PoolClosed(_) => f.write_str("Pool shut down"),
        }
    }
}

impl<T> std::error::Error for SubmitError<T> {}
