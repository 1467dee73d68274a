//! Tracing setup.
//!
//! `GRADPATH_LOG` takes `EnvFilter` directives and wins over the configured
//! level. CLI commands log warnings to stderr; the terminal view logs to a
//! file so output never lands on the alternate screen.

use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_ENV: &str = "GRADPATH_LOG";

fn filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level))
}

/// Log to stderr. Only warnings show unless `GRADPATH_LOG` says otherwise.
pub fn init_cli() {
    let _ = tracing_subscriber::registry()
        .with(filter("warn"))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false),
        )
        .try_init();
}

/// Log to `path`, appending, at the configured level.
pub fn init_tui(path: &Path, level: &str) -> io::Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let _ = tracing_subscriber::registry()
        .with(filter(level))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
        .try_init();
    Ok(())
}
