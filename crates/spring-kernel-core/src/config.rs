//! Configuration resolution for spring-kernel.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/spring-kernel/kernel-config.json)
//! 3. Explicit config file (`--config`)
//! 4. Environment variables
//! 5. CLI arguments (highest priority, applied by the binary)
//!
//! The file format is a flat JSON object, so a bare
//! `{"host": "127.0.0.1", "port": 12345}` is a valid config file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::magic::LuaState;

/// Name of the config file looked up in the global config directory.
pub const CONFIG_FILE_NAME: &str = "kernel-config.json";

/// Complete spring-kernel configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Interface the relay listens on for the engine.
    pub host: String,
    /// Port the relay listens on for the engine.
    pub port: u16,
    /// How long a submitted command may wait for its result.
    pub request_timeout_secs: u64,
    /// Upper bound on a single engine response.
    pub max_message_bytes: usize,
    /// Lua state used until a cell selects another one.
    pub default_state: LuaState,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 12345,
            request_timeout_secs: 60,
            max_message_bytes: 20 * 1024 * 1024, // 20 MiB
            default_state: LuaState::default(),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// `host:port` string suitable for binding the listener.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// On-disk representation: every key is optional and only present keys
/// override the layer below.
#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigFile {
    host: Option<String>,
    port: Option<u16>,
    request_timeout_secs: Option<u64>,
    max_message_bytes: Option<usize>,
    default_state: Option<LuaState>,
    log_level: Option<String>,
}

/// Load configuration with hierarchical resolution.
///
/// A missing global file is skipped; a missing explicit file is an error.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let mut config = Config::default();

    if let Some(global_path) = global_config_path() {
        if global_path.exists() {
            let global = load_config_file(&global_path)?;
            merge_config(&mut config, global);
        }
    }

    if let Some(path) = explicit {
        let file = load_config_file(path)?;
        merge_config(&mut config, file);
    }

    apply_env_overrides(&mut config)?;

    Ok(config)
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("spring-kernel").join(CONFIG_FILE_NAME))
}

fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

fn merge_config(base: &mut Config, overlay: ConfigFile) {
    if let Some(host) = overlay.host {
        base.host = host;
    }
    if let Some(port) = overlay.port {
        base.port = port;
    }
    if let Some(secs) = overlay.request_timeout_secs {
        base.request_timeout_secs = secs;
    }
    if let Some(bytes) = overlay.max_message_bytes {
        base.max_message_bytes = bytes;
    }
    if let Some(state) = overlay.default_state {
        base.default_state = state;
    }
    if let Some(level) = overlay.log_level {
        base.log_level = level;
    }
}

fn apply_env_overrides(config: &mut Config) -> Result<()> {
    apply_overrides_from(config, |key| std::env::var(key).ok())
}

/// Apply `SPRING_KERNEL_*` overrides read through `lookup`.
///
/// Unlike a silently ignored typo, an unparsable numeric value is reported.
fn apply_overrides_from<F>(config: &mut Config, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(val) = lookup("SPRING_KERNEL_HOST") {
        config.host = val;
    }
    if let Some(val) = lookup("SPRING_KERNEL_PORT") {
        config.port = val
            .parse()
            .map_err(|_| Error::Config(format!("SPRING_KERNEL_PORT is not a port: {val}")))?;
    }
    if let Some(val) = lookup("SPRING_KERNEL_REQUEST_TIMEOUT") {
        config.request_timeout_secs = val.parse().map_err(|_| {
            Error::Config(format!("SPRING_KERNEL_REQUEST_TIMEOUT is not a number: {val}"))
        })?;
    }
    if let Some(val) = lookup("SPRING_KERNEL_LOG_LEVEL") {
        config.log_level = val;
    }
    Ok(())
}
