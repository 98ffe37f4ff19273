//! Line-oriented console front-end.
//!
//! Input is read on a dedicated OS thread rather than through
//! `tokio::io::stdin`, whose blocking read runs on the runtime's blocking
//! pool and keeps the runtime from shutting down while a terminal is open.
//! The reader thread is detached; a read parked on it is abandoned when the
//! process exits.

use std::io::{self, BufRead};
use std::thread;

use tokio::sync::mpsc;
use tracing::debug;

use crate::session::{CellOutput, KernelSession};

const LINE_BUFFER: usize = 64;

/// Read lines from `reader` on a detached thread.
///
/// The thread stops at end of input, after forwarding a read error, or once
/// the receiver is dropped.
pub fn spawn_line_reader<R>(reader: R) -> io::Result<mpsc::Receiver<io::Result<String>>>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(LINE_BUFFER);
    thread::Builder::new()
        .name("console-input".into())
        .spawn(move || {
            for line in reader.lines() {
                let failed = line.is_err();
                if tx.blocking_send(line).is_err() || failed {
                    break;
                }
            }
            debug!("Console input closed");
        })?;
    Ok(rx)
}

/// Groups console lines into cells. A blank line ends a cell.
#[derive(Debug, Default)]
pub struct CellBuffer {
    cell: String,
}

impl CellBuffer {
    /// Add a line; returns the finished cell when `line` is blank.
    pub fn push_line(&mut self, line: &str) -> Option<String> {
        if line.trim().is_empty() {
            return self.finish();
        }
        self.cell.push_str(line);
        self.cell.push('\n');
        None
    }

    /// Take whatever has been collected, if it is not blank.
    pub fn finish(&mut self) -> Option<String> {
        let cell = std::mem::take(&mut self.cell);
        (!cell.trim().is_empty()).then_some(cell)
    }
}

/// Run every cell arriving on `lines` and hand each result to `emit`.
///
/// Returns at end of input, after running the trailing cell.
pub async fn run_cells<F>(
    session: &mut KernelSession,
    lines: &mut mpsc::Receiver<io::Result<String>>,
    mut emit: F,
) -> io::Result<()>
where
    F: FnMut(&CellOutput),
{
    let mut cells = CellBuffer::default();
    while let Some(line) = lines.recv().await {
        if let Some(cell) = cells.push_line(&line?) {
            emit(&session.execute_cell(&cell).await);
        }
    }
    if let Some(cell) = cells.finish() {
        emit(&session.execute_cell(&cell).await);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::{Connector, ConnectorConfig};
    use crate::session::CellStatus;
    use spring_kernel_core::LuaState;
    use std::time::{Duration, Instant};

    #[test]
    fn blank_lines_separate_cells() {
        let mut cells = CellBuffer::default();
        assert_eq!(cells.push_line("local x = 1"), None);
        assert_eq!(cells.push_line("return x"), None);
        assert_eq!(
            cells.push_line("   ").as_deref(),
            Some("local x = 1\nreturn x\n")
        );
        assert_eq!(cells.push_line(""), None);
        assert_eq!(cells.push_line("%show"), None);
        assert_eq!(cells.finish().as_deref(), Some("%show\n"));
        assert_eq!(cells.finish(), None);
    }

    #[tokio::test]
    async fn cells_run_until_input_ends() {
        let connector = Connector::spawn(ConnectorConfig::listen("127.0.0.1:0"))
            .await
            .unwrap();
        let mut session = KernelSession::new(connector.handle(), LuaState::LuaUi);

        let (tx, mut rx) = mpsc::channel(8);
        for line in ["%help", "", "%bogus"] {
            tx.send(Ok(line.to_string())).await.unwrap();
        }
        drop(tx);

        let mut statuses = Vec::new();
        run_cells(&mut session, &mut rx, |out| statuses.push(out.status))
            .await
            .unwrap();
        assert_eq!(statuses, vec![CellStatus::Ok, CellStatus::Error]);

        connector.shutdown().await;
    }

    #[cfg(unix)]
    #[test]
    fn runtime_shuts_down_while_input_is_still_open() {
        use std::os::unix::net::UnixStream;

        // The peer end stays open, so the reader thread stays parked in read.
        let (input, _terminal) = UnixStream::pair().unwrap();
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let mut lines = runtime.block_on(async {
            let mut lines = spawn_line_reader(io::BufReader::new(input)).unwrap();
            let waited = tokio::time::timeout(Duration::from_millis(50), lines.recv()).await;
            assert!(waited.is_err());
            lines
        });

        let started = Instant::now();
        drop(runtime);
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(lines.try_recv().is_err());
    }
}
