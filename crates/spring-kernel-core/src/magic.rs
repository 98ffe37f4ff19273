//! Cell magics.
//!
//! A cell may start with a single `%magic` line. State magics select the Lua
//! state the rest of the cell runs in; the others are handled locally or map
//! to a non-execute command.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Lua state inside the engine that a cell's code runs in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LuaState {
    #[default]
    #[serde(rename = "luaui")]
    LuaUi,
    #[serde(rename = "luamenu")]
    LuaMenu,
    #[serde(rename = "uluarules")]
    UnsyncedLuaRules,
    #[serde(rename = "sluarules")]
    SyncedLuaRules,
}

impl LuaState {
    pub const ALL: [Self; 4] = [
        Self::LuaUi,
        Self::LuaMenu,
        Self::UnsyncedLuaRules,
        Self::SyncedLuaRules,
    ];

    /// Identifier sent on the wire and used as the magic name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LuaUi => "luaui",
            Self::LuaMenu => "luamenu",
            Self::UnsyncedLuaRules => "uluarules",
            Self::SyncedLuaRules => "sluarules",
        }
    }

    /// Human readable name shown above execution output.
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::LuaUi => "LuaUI",
            Self::LuaMenu => "LuaMenu",
            Self::UnsyncedLuaRules => "LuaRules Unsynced",
            Self::SyncedLuaRules => "LuaRules Synced",
        }
    }
}

impl fmt::Display for LuaState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LuaState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::Protocol(format!("unknown Lua state: {s}")))
    }
}

/// What a notebook cell asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Help,
    ListMagics,
    Show,
    /// Lua code; `state` is set when the cell starts with a state magic.
    Code {
        state: Option<LuaState>,
        code: String,
    },
    UnknownMagic(String),
}

/// Magic table: name, parameter, help text. Kept sorted by name.
const MAGICS: &[(&str, &str, &str)] = &[
    ("%help", "", "show general help"),
    ("%lsmagic", "", "list all magics"),
    (
        "%luamenu",
        "LuaMenu",
        "execute code in LuaMenu/LuaUI state, whichever is present.",
    ),
    (
        "%luaui",
        "LuaUI",
        "execute code in LuaMenu/LuaUI state, whichever is present.",
    ),
    ("%show", "", "show the current screen"),
    (
        "%sluarules",
        "LuaRules Synced",
        "execute code in synced LuaRules state",
    ),
    (
        "%uluarules",
        "LuaRules Unsynced",
        "execute code in unsynced LuaRules state",
    ),
    ("_p", "", "Lua helper function to print data to the notebook"),
    ("_s", "", "Lua helper function to print the function source code"),
];

const GENERAL_HELP: &str = "SpringRTS Lua notebook
To begin, write %lsmagic to see what special identifiers are available. \
Each code block should begin with a state identifier magic, such as: %luaui, %uluarules, \
and similar. This defines the Spring Lua state in which the code will be executed.

Additional things to note:
- In case there is no state magic in the code block, the last set state will be used.
- There can only be one state-magic per code block, and it must be at the beginning of the code block.
- Non-state magics such as %lsmagic, %help and similar shouldn't appear along with Lua code.
- Don't use local variables if you want to access them in consecutive runs. They will be out of scope.
- Variable scope is shared between different notebooks.
";

pub const fn general_help() -> &'static str {
    GENERAL_HELP
}

/// Listing of every magic with its parameter and help text.
pub fn magic_help() -> String {
    let names: Vec<&str> = MAGICS.iter().map(|(name, _, _)| *name).collect();
    let details: Vec<String> = MAGICS
        .iter()
        .map(|(name, param, help)| format!("{name} {param} : {help}"))
        .collect();
    format!(
        "Available magics:\n{}\n\n{}",
        names.join("  "),
        details.join("\n")
    )
}

/// Classify a cell.
///
/// Only the first non-blank line is inspected for a magic. The magic line is
/// replaced by an empty line so that line numbers reported by the engine
/// still match the cell.
pub fn parse_cell(code: &str) -> Cell {
    let mut lines: Vec<&str> = code.lines().collect();

    let Some(index) = lines.iter().position(|line| !line.trim().is_empty()) else {
        return Cell::Code {
            state: None,
            code: code.to_string(),
        };
    };

    let first = lines[index].trim();
    let name = match first.strip_prefix('%') {
        Some(rest) if !rest.is_empty() => rest.to_lowercase(),
        _ => {
            return Cell::Code {
                state: None,
                code: code.to_string(),
            };
        }
    };

    match name.as_str() {
        "?" | "help" => Cell::Help,
        "lsmagic" => Cell::ListMagics,
        "show" => Cell::Show,
        other => match other.parse::<LuaState>() {
            Ok(state) => {
                lines[index] = "";
                Cell::Code {
                    state: Some(state),
                    code: lines.join("\n"),
                }
            }
            Err(_) => Cell::UnknownMagic(name),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_code_has_no_state() {
        let cell = parse_cell("return 1");
        assert_eq!(
            cell,
            Cell::Code {
                state: None,
                code: "return 1".into()
            }
        );
    }

    #[test]
    fn state_magic_is_blanked_keeping_line_numbers() {
        let cell = parse_cell("\n  %LuaRules\nx = 1");
        assert_eq!(cell, Cell::UnknownMagic("luarules".into()));

        let cell = parse_cell("\n  %ULuaRules\nx = 1\nreturn x");
        assert_eq!(
            cell,
            Cell::Code {
                state: Some(LuaState::UnsyncedLuaRules),
                code: "\n\nx = 1\nreturn x".into()
            }
        );
    }

    #[test]
    fn magic_only_on_first_nonblank_line() {
        let cell = parse_cell("x = 1\n%show");
        assert!(matches!(cell, Cell::Code { state: None, .. }));
    }

    #[test]
    fn local_magics() {
        assert_eq!(parse_cell("%help"), Cell::Help);
        assert_eq!(parse_cell("%?"), Cell::Help);
        assert_eq!(parse_cell("%lsmagic"), Cell::ListMagics);
        assert_eq!(parse_cell("  %show  "), Cell::Show);
    }

    #[test]
    fn unknown_magic_keeps_its_name() {
        assert_eq!(parse_cell("%frobnicate"), Cell::UnknownMagic("frobnicate".into()));
    }

    #[test]
    fn bare_percent_is_code() {
        assert!(matches!(parse_cell("%"), Cell::Code { state: None, .. }));
    }

    #[test]
    fn lua_state_round_trips_through_names() {
        for state in LuaState::ALL {
            assert_eq!(state.as_str().parse::<LuaState>().unwrap(), state);
        }
        assert!("luarules".parse::<LuaState>().is_err());
    }

    #[test]
    fn magic_help_lists_every_magic() {
        let help = magic_help();
        assert!(help.starts_with("Available magics:\n%help  %lsmagic"));
        assert!(help.contains("%sluarules LuaRules Synced : execute code in synced LuaRules state"));
        assert!(help.contains("_s  : Lua helper function"));
    }
}
