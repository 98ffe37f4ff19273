//! Caller side of the connector.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use spring_kernel_core::Command;

use super::types::{RelayError, Reply, Task};

/// Submits commands to the engine through the connector worker.
#[derive(Debug, Clone)]
pub struct ConnectorHandle {
    tasks: mpsc::Sender<Task>,
    request_timeout: Duration,
    next_seq: Arc<AtomicU64>,
}

impl ConnectorHandle {
    pub(super) fn new(tasks: mpsc::Sender<Task>, request_timeout: Duration) -> Self {
        Self {
            tasks,
            request_timeout,
            next_seq: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Send a command to the engine and wait for its result.
    ///
    /// Concurrent callers are served one at a time in arrival order. The
    /// whole wait, including waiting for the slot, is bounded by the request
    /// timeout. On `RelayError::Timeout` the outcome is unknown: the engine
    /// may still execute the command, and its late result is discarded.
    pub async fn submit(&self, command: Command) -> Result<Reply, RelayError> {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let started = Instant::now();
        info!(seq, kind = command.kind(), "Asked to execute command");

        let (reply_tx, reply_rx) = oneshot::channel();
        let task = Task {
            seq,
            command,
            reply: reply_tx,
        };

        let wait = async {
            self.tasks.send(task).await.map_err(|_| RelayError::Closed)?;
            debug!(seq, "Waiting on results");
            reply_rx.await.map_err(|_| RelayError::Closed)
        };

        let elapsed_ms = || u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        match timeout(self.request_timeout, wait).await {
            Ok(Ok(reply)) => {
                info!(seq, outcome = reply.label(), elapsed_ms = elapsed_ms(), "Got results");
                Ok(reply)
            }
            Ok(Err(e)) => {
                warn!(seq, error = %e, "Command not delivered");
                Err(e)
            }
            Err(_) => {
                warn!(
                    seq,
                    elapsed_ms = elapsed_ms(),
                    "Timed out waiting for engine; command may still run"
                );
                Err(RelayError::Timeout(self.request_timeout))
            }
        }
    }

    pub const fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}
