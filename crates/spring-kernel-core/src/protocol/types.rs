//! Message types for the engine wire protocol.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

/// A command forwarded to the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Run Lua code in the given state.
    Execute(ExecuteRequest),
    /// Capture the current screen.
    Show,
    /// Administrative kinds the relay passes through untouched.
    Other { kind: String, data: Option<Value> },
}

/// Body of an `execute` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteRequest {
    pub code: String,
    /// Opaque to the relay; the engine interprets it.
    pub state: String,
}

impl Command {
    pub fn execute(code: impl Into<String>, state: impl Into<String>) -> Self {
        Self::Execute(ExecuteRequest {
            code: code.into(),
            state: state.into(),
        })
    }

    /// Value of the `command` discriminator.
    pub fn kind(&self) -> &str {
        match self {
            Self::Execute(_) => "execute",
            Self::Show => "show",
            Self::Other { kind, .. } => kind,
        }
    }

    /// Encode as `{"command": kind, "data": ...}`. `data` is omitted when
    /// the command has none.
    pub fn to_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("command".into(), Value::String(self.kind().to_string()));
        match self {
            Self::Execute(req) => {
                let mut data = Map::new();
                data.insert("code".into(), Value::String(req.code.clone()));
                data.insert("state".into(), Value::String(req.state.clone()));
                obj.insert("data".into(), Value::Object(data));
            }
            Self::Show => {}
            Self::Other { data, .. } => {
                if let Some(data) = data {
                    obj.insert("data".into(), data.clone());
                }
            }
        }
        Value::Object(obj)
    }

    /// Newline-free text form sent over the socket.
    pub fn to_wire(&self) -> String {
        // Compact serialization escapes embedded newlines inside strings.
        self.to_value().to_string()
    }
}

/// One line of execution output: the text and an optional style label
/// such as `error`, `warning`, `help` or `state-info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputLine {
    pub text: String,
    pub style: Option<String>,
}

impl OutputLine {
    pub fn new(text: impl Into<String>, style: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: Some(style.into()),
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: None,
        }
    }
}

/// Result of a `show` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowResult {
    #[serde(rename = "imgPath")]
    pub img_path: PathBuf,
}
