//! Fake Spring engine for driving the connector over loopback TCP.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use spring_kernel_core::Command;
use spring_kernel_core::protocol::parse_command_value;
use spring_kernel_relay::{Connector, ConnectorConfig};

/// Start a connector on an ephemeral loopback port.
pub async fn start_connector(request_timeout: Duration) -> Connector {
    Connector::spawn(ConnectorConfig::listen("127.0.0.1:0").with_request_timeout(request_timeout))
        .await
        .unwrap()
}

/// Plays the engine side of the connection and records what it receives.
pub struct FakeEngine {
    stream: TcpStream,
    pub received: Vec<Command>,
}

impl FakeEngine {
    pub async fn connect(addr: SocketAddr) -> Self {
        Self {
            stream: TcpStream::connect(addr).await.unwrap(),
            received: Vec::new(),
        }
    }

    /// Read the next command sent by the relay.
    pub async fn next_command(&mut self) -> Command {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = self.stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "relay closed the connection");
            buf.extend_from_slice(&chunk[..n]);
            match serde_json::from_slice::<Value>(&buf) {
                Ok(value) => {
                    let command = parse_command_value(&value).unwrap();
                    self.received.push(command.clone());
                    return command;
                }
                Err(e) if e.is_eof() => {}
                Err(e) => panic!("relay sent invalid JSON: {e}"),
            }
        }
    }

    /// `None` when no command arrives within `wait`.
    pub async fn try_next_command(&mut self, wait: Duration) -> Option<Command> {
        tokio::time::timeout(wait, self.next_command()).await.ok()
    }

    pub async fn respond(&mut self, value: &Value) {
        self.send_raw(value.to_string().as_bytes()).await;
    }

    pub async fn send_raw(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).await.unwrap();
        self.stream.flush().await.unwrap();
    }

    /// Abort the connection with a TCP reset instead of an orderly close.
    #[allow(deprecated)] // zero linger is what turns the close into a RST
    pub fn reset(self) {
        self.stream.set_linger(Some(Duration::ZERO)).unwrap();
        drop(self.stream);
    }

    /// True once the relay has closed its end of the connection.
    pub async fn is_closed_by_relay(&mut self) -> bool {
        let mut byte = [0u8; 1];
        matches!(
            tokio::time::timeout(Duration::from_secs(2), self.stream.read(&mut byte)).await,
            Ok(Ok(0) | Err(_))
        )
    }
}
