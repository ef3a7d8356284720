//! Server shutdown.
//!
//! A single `CancellationToken` reaches the accept loop and every socket
//! task. Sockets answer it with a going-away close frame, and the serve task
//! finishes once the last of them has hung up.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Owner of the server-wide shutdown signal.
#[derive(Default)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
}

impl ShutdownCoordinator {
    /// Coordinator with the signal not yet raised.
    pub fn new() -> Self {
        Self::default()
    }

    /// Token for the serve task or one socket task.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Stop accepting and tell every socket to close. Idempotent.
    pub fn shutdown(&self) {
        if !self.token.is_cancelled() {
            info!("shutdown requested, closing sockets");
        }
        self.token.cancel();
    }

    /// Raise the signal and wait up to `grace` for `serve` to finish.
    ///
    /// A serve task still running after `grace` (a peer that never completes
    /// the close handshake) is aborted. Returns whether it finished in time.
    pub async fn graceful_shutdown(&self, serve: JoinHandle<()>, grace: Duration) -> bool {
        self.shutdown();
        let abort = serve.abort_handle();
        match tokio::time::timeout(grace, serve).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                warn!(error = %e, "serve task failed during shutdown");
                true
            }
            Err(_) => {
                warn!(grace_ms = grace.as_millis() as u64, "sockets still open after grace period, aborting");
                abort.abort();
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::{mpsc, oneshot};

    /// Stand-in for a socket loop: waits for the signal, then reports the
    /// close code it would send.
    fn socket_task(token: CancellationToken, closed: mpsc::Sender<u16>) -> JoinHandle<()> {
        tokio::spawn(async move {
            token.cancelled().await;
            let _ = closed.send(1001).await;
        })
    }

    #[tokio::test]
    async fn every_socket_sees_the_signal() {
        let coord = ShutdownCoordinator::new();
        let (tx, mut rx) = mpsc::channel(8);
        let sockets: Vec<_> = (0..3).map(|_| socket_task(coord.token(), tx.clone())).collect();
        drop(tx);

        coord.shutdown();
        coord.shutdown();
        let mut codes = Vec::new();
        while let Some(code) = rx.recv().await {
            codes.push(code);
        }
        assert_eq!(codes, vec![1001, 1001, 1001]);
        for socket in sockets {
            socket.await.unwrap();
        }
    }

    #[tokio::test]
    async fn waits_for_sockets_to_close() {
        let coord = ShutdownCoordinator::new();
        let token = coord.token();
        let (tx, mut rx) = mpsc::channel(1);
        // serve task ends once its socket has flushed the close frame
        let serve = tokio::spawn(async move {
            let socket = socket_task(token, tx);
            tokio::time::sleep(Duration::from_millis(20)).await;
            socket.await.unwrap();
        });
        assert!(coord.graceful_shutdown(serve, Duration::from_secs(5)).await);
        assert_eq!(rx.recv().await, Some(1001));
    }

    #[tokio::test]
    async fn stuck_serve_task_is_aborted() {
        let coord = ShutdownCoordinator::new();
        let (held, released) = oneshot::channel::<()>();
        let serve = tokio::spawn(async move {
            let _held = held;
            tokio::time::sleep(Duration::from_secs(300)).await;
        });
        assert!(!coord.graceful_shutdown(serve, Duration::from_millis(50)).await);
        assert!(coord.token().is_cancelled());
        // the aborted task dropped its sender
        assert!(released.await.is_err());
    }
}
