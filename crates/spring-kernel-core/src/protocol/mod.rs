//! Wire protocol between the relay and the Spring engine.
//!
//! Each message is a single JSON value written without a trailing newline.
//! Commands go relay → engine, results come back engine → relay.

mod parser;
mod types;

pub use parser::{
    is_falsy, parse_command, parse_command_value, parse_output_lines, parse_show_result,
};
pub use types::*;
