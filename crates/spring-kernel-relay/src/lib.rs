//! spring-kernel Relay Library
//!
//! Core functionality for the relay between a notebook front-end and a
//! running Spring engine:
//! - Connector: single-connection TCP server with one command in flight
//! - Session: turns notebook cells into commands and results into output
//! - Console: stdin lines grouped into cells for the binary

pub mod connector;
pub mod console;
pub mod session;

pub use connector::{Connector, ConnectorConfig, ConnectorHandle, PeerFault, RelayError, Reply};
pub use session::{CellOutput, CellStatus, KernelSession};
