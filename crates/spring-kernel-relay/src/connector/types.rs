//! Connector types.

use std::time::Duration;

use serde_json::{Map, Value};
use tokio::sync::oneshot;

use spring_kernel_core::{Command, Config};

/// Configuration for the connector server.
#[derive(Debug, Clone)]
pub struct ConnectorConfig {
    /// `host:port` to listen on for the engine.
    pub listen_addr: String,
    /// Bound on a single `submit`, from enqueue to result.
    pub request_timeout: Duration,
    /// Largest response accepted from the engine.
    pub max_message_bytes: usize,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl ConnectorConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            listen_addr: config.listen_addr(),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            max_message_bytes: config.max_message_bytes,
        }
    }

    /// Listen on `addr` with default limits.
    pub fn listen(addr: impl Into<String>) -> Self {
        Self {
            listen_addr: addr.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_max_message_bytes(mut self, max: usize) -> Self {
        self.max_message_bytes = max;
        self
    }
}

/// Why an exchange with the engine produced no usable result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PeerFault {
    #[error("Malformed response from engine: {0}")]
    Malformed(String),

    #[error("Engine disconnected")]
    Disconnected,

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Outcome of one command, as delivered to its caller.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// The engine's result, verbatim.
    Payload(Value),
    /// The engine answered with an empty or falsy value.
    Empty,
    /// The exchange broke; the connection has been reset.
    Failed(PeerFault),
}

impl Reply {
    /// The payload, or an empty mapping when there is none.
    pub fn into_value(self) -> Value {
        match self {
            Self::Payload(value) => value,
            Self::Empty | Self::Failed(_) => Value::Object(Map::new()),
        }
    }

    pub const fn payload(&self) -> Option<&Value> {
        match self {
            Self::Payload(value) => Some(value),
            Self::Empty | Self::Failed(_) => None,
        }
    }

    /// Short label for logs.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Payload(_) => "payload",
            Self::Empty => "empty",
            Self::Failed(PeerFault::Malformed(_)) => "malformed",
            Self::Failed(PeerFault::Disconnected) => "disconnected",
            Self::Failed(PeerFault::Transport(_)) => "transport",
        }
    }
}

/// Errors visible to `submit` callers.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// No result within the bound. The engine may still run the command.
    #[error("No result from engine within {0:?}")]
    Timeout(Duration),

    #[error("Connector worker is not running")]
    Closed,

    #[error("Failed to listen on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// A command waiting for the worker, with the slot its reply goes into.
#[derive(Debug)]
pub(crate) struct Task {
    pub seq: u64,
    pub command: Command,
    pub reply: oneshot::Sender<Reply>,
}
