//! Message framing on the engine connection.
//!
//! Messages carry no length prefix or delimiter. A command is written as one
//! JSON text; a response is read until the bytes received so far form one
//! complete JSON value.

use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use spring_kernel_core::Command;

use super::types::PeerFault;

const READ_CHUNK: usize = 64 * 1024;

/// Write a command in full.
pub(crate) async fn write_command<W>(writer: &mut W, command: &Command) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(command.to_wire().as_bytes()).await?;
    writer.flush().await
}

/// Read one response value.
///
/// EOF before any byte is a disconnect. EOF inside a value, invalid JSON or
/// a value larger than `max_bytes` is malformed. A bare top-level number has
/// no closing token, so it ends at the first whitespace or at EOF.
pub(crate) async fn read_response<R>(reader: &mut R, max_bytes: usize) -> Result<Value, PeerFault>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    let mut chunk = vec![0u8; READ_CHUNK.min(max_bytes.max(1))];
    let mut scanner = ValueScanner::default();

    loop {
        let n = reader
            .read(&mut chunk)
            .await
            .map_err(|e| PeerFault::Transport(e.to_string()))?;
        if n == 0 {
            if buf.is_empty() {
                return Err(PeerFault::Disconnected);
            }
            if scanner.ends_at_eof() {
                return parse(&buf);
            }
            return Err(PeerFault::Malformed(format!(
                "connection closed after {} bytes of an incomplete message",
                buf.len()
            )));
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.len() > max_bytes {
            return Err(PeerFault::Malformed(format!(
                "message exceeds {max_bytes} bytes"
            )));
        }

        // Only the new bytes are scanned; the buffer is parsed once.
        if scanner.feed(&chunk[..n]) {
            return parse(&buf);
        }
    }
}

fn parse(buf: &[u8]) -> Result<Value, PeerFault> {
    serde_json::from_slice(buf).map_err(|e| PeerFault::Malformed(e.to_string()))
}

#[derive(Debug, Clone, Copy)]
enum Token {
    Container,
    String,
    Number,
    Literal(&'static [u8]),
}

/// Tracks where the first top-level JSON value ends without parsing it.
///
/// Brackets are counted outside strings only; whether they match is left to
/// the parser.
#[derive(Debug, Default)]
struct ValueScanner {
    token: Option<Token>,
    depth: usize,
    in_string: bool,
    escaped: bool,
    literal_len: usize,
    done: bool,
}

impl ValueScanner {
    /// Scan more bytes. Returns true once a complete value has been seen.
    fn feed(&mut self, bytes: &[u8]) -> bool {
        for &b in bytes {
            if self.done {
                break;
            }
            match self.token {
                None => self.start(b),
                Some(Token::Container | Token::String) => self.nested(b),
                Some(Token::Number) => {
                    if b.is_ascii_whitespace() {
                        self.done = true;
                    }
                }
                Some(Token::Literal(word)) => {
                    if word.get(self.literal_len) == Some(&b) {
                        self.literal_len += 1;
                        self.done = self.literal_len == word.len();
                    } else {
                        self.done = true;
                    }
                }
            }
        }
        self.done
    }

    fn start(&mut self, b: u8) {
        self.token = match b {
            b if b.is_ascii_whitespace() => return,
            b'{' | b'[' => {
                self.depth = 1;
                Some(Token::Container)
            }
            b'"' => {
                self.in_string = true;
                Some(Token::String)
            }
            b'-' | b'0'..=b'9' => Some(Token::Number),
            b't' => Some(Token::Literal(b"true")),
            b'f' => Some(Token::Literal(b"false")),
            b'n' => Some(Token::Literal(b"null")),
            _ => {
                self.done = true;
                None
            }
        };
        self.literal_len = 1;
    }

    fn nested(&mut self, b: u8) {
        if self.in_string {
            if self.escaped {
                self.escaped = false;
            } else if b == b'\\' {
                self.escaped = true;
            } else if b == b'"' {
                self.in_string = false;
                self.done = self.depth == 0;
            }
            return;
        }
        match b {
            b'"' => self.in_string = true,
            b'{' | b'[' => self.depth += 1,
            b'}' | b']' => {
                self.depth = self.depth.saturating_sub(1);
                self.done = self.depth == 0;
            }
            _ => {}
        }
    }

    fn ends_at_eof(&self) -> bool {
        matches!(self.token, Some(Token::Number))
    }
}
