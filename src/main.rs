//! # gp - Graduate Programme timeline client
//!
//! A command-line and terminal UI client for the Graduate Programme
//! Knowledge Assistant's student timeline: the ordered milestones of the
//! programme and the checklist of tasks inside each one.
//!
//! ## Key Features
//!
//! - **Derived progress**: a milestone is Upcoming, In Progress or Completed
//!   purely from how many of its tasks are ticked
//! - **Optimistic updates**: ticks show immediately and are rolled back if the
//!   backend rejects them
//! - **Auto-advance**: completing a milestone opens the next one, and
//!   reopening it closes an untouched successor again
//! - **Administrator overrides**: milestones signed off by an administrator
//!   show as completed and are read-only
//!
//! ## Quick Start
//!
//! ```bash
//! # Save the token issued by the portal login
//! gp token set eyJhbGciOi...
//!
//! # Browse and tick tasks interactively
//! gp ui
//!
//! # Or from scripts
//! gp list
//! gp toggle 2 3
//! gp progress
//! ```
//!
//! Settings live in `~/.gradpath/config.toml`; see the `config` module.

use std::path::PathBuf;

use clap::Parser;

pub mod api;
pub mod claims;
pub mod cli;
pub mod cmd;
pub mod config;
pub mod display;
pub mod fields;
pub mod logging;
pub mod milestone;
pub mod session;
pub mod sync;
pub mod timeline;
pub mod tui {
    pub mod app;
    pub mod colors;
    pub mod enums;
    pub mod run;
    pub mod utils;
}

use cli::Cli;
use cmd::*;
use config::{data_dir, Config, TokenStore};

fn main() {
    let cli = Cli::parse();

    // Completions need no data directory at all.
    if let Commands::Completions { shell } = cli.command {
        cmd_completions(shell);
        return;
    }

    let data_dir = match data_dir() {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| data_dir.join("config.toml"));
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    if matches!(cli.command, Commands::Ui) {
        let log_path: PathBuf = data_dir.join("gp.log");
        if let Err(e) = logging::init_tui(&log_path, &config.log_level) {
            eprintln!("Warning: could not open log file {}: {e}", log_path.display());
        }
    } else {
        logging::init_cli();
    }

    let token = match cli.token.filter(|t| !t.trim().is_empty()) {
        Some(token) => Some(token),
        None => match TokenStore::new(&data_dir).load() {
            Ok(token) => token,
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        },
    };

    let ctx = Context {
        api_url: cli.api_url.unwrap_or_else(|| config.api_url.clone()),
        config,
        data_dir,
        token,
    };

    match cli.command {
        Commands::Ui => cmd_ui(&ctx),
        Commands::List { status, compact } => cmd_list(&ctx, status, compact),
        Commands::Progress => cmd_progress(&ctx),
        Commands::Toggle { milestone, task } => cmd_toggle(&ctx, milestone, task),
        Commands::Whoami => cmd_whoami(&ctx),
        Commands::Token { action } => cmd_token(&ctx, action),
        Commands::Profile { action } => cmd_profile(&ctx, action),
        Commands::Completions { .. } => unreachable!("completions handled above"),
    }
}
