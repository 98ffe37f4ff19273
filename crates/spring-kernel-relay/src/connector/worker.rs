//! Connector worker: accept loop and per-connection exchange loop.

use std::net::SocketAddr;

use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use spring_kernel_core::Command;
use spring_kernel_core::protocol::is_falsy;

use super::types::{PeerFault, Reply, Task};
use super::wire;

/// Why the per-connection loop returned.
#[derive(Debug)]
enum ConnectionEnd {
    /// The connection is unusable; go back to accepting.
    Reset(String),
    Shutdown,
    /// Every handle is gone, nothing can be submitted anymore.
    TasksClosed,
}

/// Drive the listener until shutdown. Only one engine connection is served
/// at a time; when it ends the worker immediately accepts the next one.
pub(super) async fn run(
    listener: TcpListener,
    mut tasks: mpsc::Receiver<Task>,
    mut shutdown: watch::Receiver<bool>,
    max_message_bytes: usize,
) {
    loop {
        let (stream, peer) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(pair) => pair,
                Err(e) => {
                    warn!(error = %e, "Failed to accept engine connection");
                    continue;
                }
            },
            _ = shutdown.changed() => {
                info!("Connector worker shutting down");
                return;
            }
        };

        info!(peer = %peer, "Engine connected");
        if let Err(e) = stream.set_nodelay(true) {
            debug!(peer = %peer, error = %e, "Failed to set TCP_NODELAY");
        }

        match serve_connection(stream, peer, &mut tasks, &mut shutdown, max_message_bytes).await {
            ConnectionEnd::Reset(reason) => {
                info!(peer = %peer, reason = %reason, "Connection closed");
            }
            ConnectionEnd::Shutdown => {
                info!(peer = %peer, "Connector worker shutting down");
                return;
            }
            ConnectionEnd::TasksClosed => {
                info!("All connector handles dropped, stopping worker");
                return;
            }
        }
    }
}

async fn serve_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    tasks: &mut mpsc::Receiver<Task>,
    shutdown: &mut watch::Receiver<bool>,
    max_message_bytes: usize,
) -> ConnectionEnd {
    let mut idle_buf = [0u8; 1024];

    loop {
        debug!(peer = %peer, "Waiting on code");
        // While idle, keep an eye on the socket so a vanished engine is
        // noticed before the next command is handed to it.
        let task = tokio::select! {
            task = tasks.recv() => match task {
                Some(task) => task,
                None => return ConnectionEnd::TasksClosed,
            },
            read = stream.read(&mut idle_buf) => match read {
                Ok(0) => return ConnectionEnd::Reset("engine closed the connection".into()),
                Ok(n) => {
                    warn!(peer = %peer, bytes = n, "Discarding unsolicited data from engine");
                    continue;
                }
                Err(e) => return ConnectionEnd::Reset(format!("read error while idle: {e}")),
            },
            _ = shutdown.changed() => return ConnectionEnd::Shutdown,
        };

        if task.reply.is_closed() {
            info!(seq = task.seq, "Caller gave up before forwarding, dropping command");
            continue;
        }

        info!(seq = task.seq, kind = task.command.kind(), "Send code for execution");
        let reply = tokio::select! {
            reply = exchange(&mut stream, &task.command, max_message_bytes) => reply,
            _ = shutdown.changed() => {
                let _ = task
                    .reply
                    .send(Reply::Failed(PeerFault::Transport("connector shut down".into())));
                return ConnectionEnd::Shutdown;
            }
        };

        let reset = match &reply {
            Reply::Payload(_) => None,
            Reply::Empty => {
                error!(seq = task.seq, "Engine returned an empty result");
                Some("empty result".to_string())
            }
            Reply::Failed(fault) => {
                error!(seq = task.seq, error = %fault, "Exchange with engine failed");
                Some(fault.to_string())
            }
        };

        if task.reply.send(reply).is_err() {
            warn!(
                seq = task.seq,
                "Caller stopped waiting before the result arrived, discarding it"
            );
        }

        if let Some(reason) = reset {
            return ConnectionEnd::Reset(reason);
        }
    }
}

/// Forward one command and read its response.
async fn exchange(stream: &mut TcpStream, command: &Command, max_message_bytes: usize) -> Reply {
    if let Err(e) = wire::write_command(stream, command).await {
        return Reply::Failed(PeerFault::Transport(e.to_string()));
    }

    match wire::read_response(stream, max_message_bytes).await {
        Ok(value) if is_falsy(&value) => Reply::Empty,
        Ok(value) => {
            debug!("Received data");
            Reply::Payload(value)
        }
        Err(fault) => Reply::Failed(fault),
    }
}
