//! Connector: the TCP server the Spring engine connects to.
//!
//! One worker task owns the listener and the current engine connection.
//! Callers hand commands over through a capacity-1 channel; each command
//! carries its own reply slot, so at most one command is in flight and a
//! late reply can only ever reach the caller that sent the command.

mod handle;
mod types;
mod wire;
mod worker;

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub use handle::ConnectorHandle;
pub use types::{ConnectorConfig, PeerFault, RelayError, Reply};

/// A running connector. Dropping it stops the worker.
pub struct Connector {
    handle: ConnectorHandle,
    local_addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
    worker: JoinHandle<()>,
}

impl Connector {
    /// Bind the listener and start the worker.
    pub async fn spawn(config: ConnectorConfig) -> Result<Self, RelayError> {
        let bind_err = |source| RelayError::Bind {
            addr: config.listen_addr.clone(),
            source,
        };
        let listener = TcpListener::bind(&config.listen_addr)
            .await
            .map_err(bind_err)?;
        let local_addr = listener.local_addr().map_err(bind_err)?;

        info!(
            addr = %local_addr,
            timeout_secs = config.request_timeout.as_secs_f64(),
            "Starting connector server"
        );

        let (task_tx, task_rx) = mpsc::channel(1);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let worker = tokio::spawn(worker::run(
            listener,
            task_rx,
            shutdown_rx,
            config.max_message_bytes,
        ));

        Ok(Self {
            handle: ConnectorHandle::new(task_tx, config.request_timeout),
            local_addr,
            shutdown_tx,
            worker,
        })
    }

    /// A handle for submitting commands. Cheap to clone.
    pub fn handle(&self) -> ConnectorHandle {
        self.handle.clone()
    }

    /// Address the listener is bound to.
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting, close the current connection and wait for the worker.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.worker.await {
            warn!(error = %e, "Connector worker ended abnormally");
        }
        info!("Connector stopped");
    }
}
