//! `spring-kernel` Core Library
//!
//! Shared functionality for the kernel components:
//! - Wire protocol between the relay and the Spring engine
//! - Cell magic parsing and Lua state identifiers
//! - Configuration resolution and hierarchy
//! - Common error types

pub mod config;
pub mod error;
pub mod magic;
pub mod protocol;
pub mod tracing_init;

pub use config::Config;
pub use error::{Error, Result};
pub use magic::{Cell, LuaState};
pub use protocol::{Command, ExecuteRequest, OutputLine, ShowResult};
