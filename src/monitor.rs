//! Background liveness monitor
//!
//! Periodically reports the live connection count. Purely observational:
//! holds no locks, mutates no shared state, and stops cooperatively when
//! the shutdown signal fires.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::info;

/// Run the monitor loop until `shutdown` fires
pub async fn monitor_loop(
    interval: Duration,
    connections: Arc<AtomicUsize>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    // The first tick completes immediately; skip it so the first report
    // comes one full interval after startup.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                info!(
                    "Monitoring server... {} active connection(s)",
                    connections.load(Ordering::SeqCst)
                );
            }
            _ = shutdown.changed() => {
                info!("Monitor stopping");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_monitor_stops_on_shutdown() {
        let (tx, rx) = watch::channel(false);
        let connections = Arc::new(AtomicUsize::new(0));
        let handle = tokio::spawn(monitor_loop(
            Duration::from_secs(60),
            connections,
            rx,
        ));

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("monitor did not stop")
            .unwrap();
    }
}
