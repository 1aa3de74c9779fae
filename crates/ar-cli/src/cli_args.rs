//! CLI argument parsing for autorespond.

use ar_config::{parse_tools_arg, HostBackend, MonitorMode, Overrides};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Clone, Debug)]
#[command(name = "autorespond")]
#[command(about = "Answers whitelisted terminal confirmation dialogs after a cancellable countdown")]
#[command(version)]
pub struct Cli {
    /// Seconds to wait before responding (Escape cancels)
    #[arg(short, long, value_name = "SECONDS")]
    pub delay: Option<f64>,

    /// Seconds between monitoring cycles
    #[arg(short, long, value_name = "SECONDS")]
    pub interval: Option<f64>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Enable debug logging, including why dialog-like text was rejected
    #[arg(long)]
    pub debug: bool,

    /// Comma-separated list of whitelisted tools (overrides the tools file)
    #[arg(short, long, value_name = "TOOLS")]
    pub tools: Option<String>,

    /// File with one whitelisted tool per line
    #[arg(short = 'f', long, value_name = "PATH")]
    pub tools_file: Option<String>,

    /// Monitor only the focused terminal window (default: monitor all windows)
    #[arg(short, long)]
    pub single: bool,

    /// Pause detection while the system sleeps
    #[arg(long)]
    pub enable_sleep_detection: bool,

    /// Host integration: auto, macos or tmux
    #[arg(long, value_name = "BACKEND", value_parser = parse_backend)]
    pub backend: Option<HostBackend>,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Command {
    /// Parse captured terminal text and print what would be recognized
    Check {
        /// File with captured terminal text ("-" reads stdin)
        file: PathBuf,
    },
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            response_delay_secs: self.delay,
            check_interval_secs: self.interval,
            tools: self.tools.as_deref().map(parse_tools_arg),
            tools_file: self.tools_file.clone(),
            mode: self.single.then_some(MonitorMode::Single),
            backend: self.backend,
            enable_sleep_detection: self.enable_sleep_detection,
        }
    }
}

fn parse_backend(value: &str) -> Result<HostBackend, String> {
    match value.to_lowercase().as_str() {
        "auto" => Ok(HostBackend::Auto),
        "macos" | "mac" => Ok(HostBackend::Macos),
        "tmux" => Ok(HostBackend::Tmux),
        other => Err(format!("unknown backend '{}' (expected auto, macos or tmux)", other)),
    }
}
