//! spring-kernel
//!
//! Runs the connector the Spring engine attaches to and feeds it notebook
//! cells read from stdin. A cell ends at a blank line or at end of input.
//! Ctrl+C stops the relay even while stdin is still open.

use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use spring_kernel_core::LuaState;
use spring_kernel_core::config::load_config;
use spring_kernel_relay::console::{run_cells, spawn_line_reader};
use spring_kernel_relay::{CellOutput, CellStatus, Connector, ConnectorConfig, KernelSession};

#[derive(Parser, Debug)]
#[command(name = "spring-kernel")]
#[command(version, about = "Relay Lua cells to a running Spring engine")]
struct Args {
    /// Config file (JSON) layered over the global kernel-config.json
    #[arg(long, env = "SPRING_KERNEL_CONFIG")]
    config: Option<PathBuf>,

    /// Interface to listen on for the engine
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on for the engine
    #[arg(long)]
    port: Option<u16>,

    /// Seconds to wait for a result before reporting a timeout
    #[arg(long)]
    request_timeout: Option<u64>,

    /// Lua state used by cells without a state magic
    #[arg(long, value_parser = parse_state)]
    state: Option<LuaState>,

    /// Log level filter (e.g. "info", "debug", "warn")
    #[arg(long)]
    log_level: Option<String>,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long, env = "SPRING_KERNEL_LOG_JSON")]
    log_json: bool,
}

fn parse_state(s: &str) -> Result<LuaState, String> {
    s.parse().map_err(|e: spring_kernel_core::Error| e.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref())?;
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(secs) = args.request_timeout {
        config.request_timeout_secs = secs;
    }
    if let Some(state) = args.state {
        config.default_state = state;
    }
    if let Some(level) = args.log_level {
        config.log_level = level;
    }

    let log_filter = format!(
        "spring_kernel_relay={0},spring_kernel_core={0}",
        config.log_level
    );
    spring_kernel_core::tracing_init::init_tracing(&log_filter, args.log_json);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %config.listen_addr(),
        config = ?args.config,
        state = %config.default_state,
        "Starting spring-kernel"
    );

    let connector = Connector::spawn(ConnectorConfig::from_config(&config)).await?;
    let mut session = KernelSession::new(connector.handle(), config.default_state);

    let mut lines = spawn_line_reader(std::io::BufReader::new(std::io::stdin()))?;

    tokio::select! {
        result = run_cells(&mut session, &mut lines, print_output) => {
            result?;
            info!("End of input");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    connector.shutdown().await;
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_output(output: &CellOutput) {
    for line in &output.lines {
        match &line.style {
            Some(style) => println!("[{style}] {}", line.text),
            None => println!("{}", line.text),
        }
    }
    if let Some(image) = &output.image {
        println!("[image] {}", image.display());
    }
    if output.status == CellStatus::Error {
        println!("[status] error");
    }
}
