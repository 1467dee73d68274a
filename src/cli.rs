use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;

/// Terminal client for the Graduate Programme timeline.
/// Settings come from flags, then environment, then ~/.gradpath/config.toml.
#[derive(Parser)]
#[command(name = "gp", version, about = "Track your graduate programme milestones")]
pub struct Cli {
    /// Backend base URL.
    #[arg(long, global = true, env = "GRADPATH_API_URL")]
    pub api_url: Option<String>,

    /// Bearer token; overrides the saved one.
    #[arg(long, global = true, env = "GRADPATH_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Path to the config file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}
