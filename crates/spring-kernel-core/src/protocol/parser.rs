//! Decoding of protocol messages.
//!
//! Implements tolerant reader pattern: unknown fields ignored, unknown
//! command kinds kept as `Command::Other`.

use serde_json::Value;

use super::types::*;
use crate::error::{Error, Result};

/// Parse a command from its wire text.
pub fn parse_command(text: &str) -> Result<Command> {
    let raw: Value = serde_json::from_str(text)?;
    parse_command_value(&raw)
}

/// Parse a JSON value into a command.
pub fn parse_command_value(raw: &Value) -> Result<Command> {
    let kind = raw
        .get("command")
        .and_then(|v| v.as_str())
        .ok_or_else(|| Error::Protocol("Missing 'command' field".into()))?;

    match kind {
        "execute" => {
            let data = raw
                .get("data")
                .ok_or_else(|| Error::Protocol("execute command without 'data'".into()))?;
            let req: ExecuteRequest = serde_json::from_value(data.clone())?;
            Ok(Command::Execute(req))
        }
        "show" => Ok(Command::Show),
        _ => Ok(Command::Other {
            kind: kind.to_string(),
            data: raw.get("data").cloned(),
        }),
    }
}

/// JSON truthiness: `null`, `false`, zero, and empty strings, arrays and
/// objects carry no usable result.
pub fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// Decode the result of an `execute` command: a sequence of
/// `[text, style]` pairs.
///
/// `text` may itself be a list, in which case the first element is a format
/// string and the rest are substituted into its `{}` placeholders. An empty
/// result decodes to no lines.
pub fn parse_output_lines(raw: &Value) -> Result<Vec<OutputLine>> {
    if is_falsy(raw) {
        return Ok(Vec::new());
    }
    let items = raw
        .as_array()
        .ok_or_else(|| Error::Protocol("execute result is not a list".into()))?;

    items.iter().map(parse_output_line).collect()
}

fn parse_output_line(item: &Value) -> Result<OutputLine> {
    match item {
        Value::String(text) => Ok(OutputLine::plain(text.clone())),
        Value::Array(pair) => {
            let text = match pair.first() {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Array(parts)) => format_parts(parts)?,
                Some(other) => render_arg(other),
                None => return Err(Error::Protocol("empty output line".into())),
            };
            let style = match pair.get(1) {
                None | Some(Value::Null) => None,
                Some(Value::String(s)) => Some(s.clone()),
                Some(other) => {
                    return Err(Error::Protocol(format!("invalid output style: {other}")));
                }
            };
            Ok(OutputLine { text, style })
        }
        other => Err(Error::Protocol(format!("invalid output line: {other}"))),
    }
}

fn format_parts(parts: &[Value]) -> Result<String> {
    let (template, args) = parts
        .split_first()
        .ok_or_else(|| Error::Protocol("empty format list".into()))?;
    let template = template
        .as_str()
        .ok_or_else(|| Error::Protocol("format string is not a string".into()))?;

    let mut out = String::with_capacity(template.len());
    let mut args = args.iter();
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        let next = chars.peek().copied();
        match (c, next) {
            ('{', Some('{')) | ('}', Some('}')) => {
                chars.next();
                out.push(c);
            }
            ('{', Some('}')) => {
                chars.next();
                let arg = args.next().ok_or_else(|| {
                    Error::Protocol(format!("not enough arguments for '{template}'"))
                })?;
                out.push_str(&render_arg(arg));
            }
            _ => out.push(c),
        }
    }
    Ok(out)
}

fn render_arg(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Decode the result of a `show` command.
pub fn parse_show_result(raw: &Value) -> Result<ShowResult> {
    if raw.get("imgPath").and_then(Value::as_str).is_none() {
        return Err(Error::Protocol("show result without 'imgPath'".into()));
    }
    Ok(serde_json::from_value(raw.clone())?)
}
