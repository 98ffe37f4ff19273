//! Kernel session: turns notebook cells into engine commands.
//!
//! Keeps the sticky Lua state between cells and converts engine results
//! (or their absence) into output lines for the front-end.

use std::path::PathBuf;

use tracing::{info, warn};

use spring_kernel_core::magic::{self, Cell, LuaState};
use spring_kernel_core::protocol::{parse_output_lines, parse_show_result};
use spring_kernel_core::{Command, OutputLine};

use crate::connector::{ConnectorHandle, RelayError, Reply};

/// Whether a cell succeeded, as reported back to the notebook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellStatus {
    Ok,
    Error,
}

/// Everything a cell produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellOutput {
    pub status: CellStatus,
    pub lines: Vec<OutputLine>,
    /// Screenshot written by the engine for `%show`.
    pub image: Option<PathBuf>,
}

impl CellOutput {
    fn ok(lines: Vec<OutputLine>) -> Self {
        Self {
            status: CellStatus::Ok,
            lines,
            image: None,
        }
    }

    fn error(line: OutputLine) -> Self {
        Self {
            status: CellStatus::Error,
            lines: vec![line],
            image: None,
        }
    }
}

/// One notebook's view of the engine.
///
/// Cells are run one at a time through a shared [`ConnectorHandle`]. A state
/// magic (`%luaui`, `%sluarules`, ...) switches the Lua state for that cell
/// and every later cell until another state magic is seen. Local magics such
/// as `%help` are answered without contacting the engine.
pub struct KernelSession {
    connector: ConnectorHandle,
    state: LuaState,
}

impl KernelSession {
    pub const fn new(connector: ConnectorHandle, default_state: LuaState) -> Self {
        Self {
            connector,
            state: default_state,
        }
    }

    /// Lua state the next cell without a state magic runs in.
    pub const fn state(&self) -> LuaState {
        self.state
    }

    /// Run one notebook cell.
    pub async fn execute_cell(&mut self, code: &str) -> CellOutput {
        match magic::parse_cell(code) {
            Cell::Help => CellOutput::ok(vec![OutputLine::new(magic::general_help(), "help")]),
            Cell::ListMagics => CellOutput::ok(vec![OutputLine::new(magic::magic_help(), "help")]),
            Cell::UnknownMagic(name) => {
                CellOutput::error(OutputLine::new(format!("No such magic: %{name}"), "error"))
            }
            Cell::Show => self.show().await,
            Cell::Code { state, code } => {
                if let Some(state) = state {
                    self.state = state;
                }
                self.execute(code).await
            }
        }
    }

    async fn execute(&self, code: String) -> CellOutput {
        info!(state = %self.state, "Got Lua to execute");
        let command = Command::execute(code, self.state.as_str());

        let reply = match self.connector.submit(command).await {
            Ok(reply) => reply,
            Err(e) => return submit_failed(&e),
        };

        let mut lines = vec![OutputLine::new(self.state.display_name(), "state-info")];
        match reply {
            Reply::Payload(value) => match parse_output_lines(&value) {
                Ok(output) => lines.extend(output),
                Err(e) => {
                    warn!(error = %e, "Unexpected execute result from engine");
                    lines.push(OutputLine::new(
                        format!("Unexpected result from engine: {value}"),
                        "error",
                    ));
                }
            },
            Reply::Empty => {}
            Reply::Failed(fault) => {
                lines.push(OutputLine::new(
                    format!("No result from engine ({fault}); the code may or may not have run"),
                    "warning",
                ));
                return CellOutput {
                    status: CellStatus::Error,
                    lines,
                    image: None,
                };
            }
        }
        CellOutput::ok(lines)
    }

    async fn show(&self) -> CellOutput {
        info!("Asking to show screen");
        let reply = match self.connector.submit(Command::Show).await {
            Ok(reply) => reply,
            Err(e) => return submit_failed(&e),
        };

        let Some(value) = reply.payload() else {
            return CellOutput::error(OutputLine::new("Engine returned no screenshot", "warning"));
        };
        match parse_show_result(value) {
            Ok(show) => CellOutput {
                status: CellStatus::Ok,
                lines: Vec::new(),
                image: Some(show.img_path),
            },
            Err(e) => {
                warn!(error = %e, "Unexpected show result from engine");
                CellOutput::error(OutputLine::new(e.to_string(), "error"))
            }
        }
    }
}

fn submit_failed(e: &RelayError) -> CellOutput {
    match e {
        RelayError::Timeout(_) => CellOutput::error(OutputLine::new("Timeout executing task", "warning")),
        other => CellOutput::error(OutputLine::new(other.to_string(), "error")),
    }
}
