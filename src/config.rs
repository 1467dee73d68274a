//! Configuration and stored credentials.
//!
//! Everything lives under `~/.gradpath/` (or `$GRADPATH_HOME`):
//! - `config.toml`: backend URL, timeouts and view timings
//! - `token`: the bearer token saved by `gp token set`
//! - `gp.log`: the terminal view's log file

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Overrides the data directory; used by tests and multi-account setups.
pub const HOME_ENV: &str = "GRADPATH_HOME";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("could not determine home directory (set GRADPATH_HOME)")]
    NoHomeDir,
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ConfigError + '_ {
    move |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Settings read from `config.toml`. Missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_url: String,
    pub timeout_secs: u64,
    pub scroll_delay_ms: u64,
    pub celebration_ms: u64,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_url: "http://127.0.0.1:8000".to_string(),
            timeout_secs: 10,
            scroll_delay_ms: 300,
            celebration_ms: 2500,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load a config file; a missing file means all defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let text = fs::read_to_string(path).map_err(io_error(path))?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn scroll_delay(&self) -> Duration {
        Duration::from_millis(self.scroll_delay_ms)
    }

    pub fn celebration(&self) -> Duration {
        Duration::from_millis(self.celebration_ms)
    }
}

/// Resolve the data directory, creating it if needed.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os(HOME_ENV) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => dirs::home_dir().ok_or(ConfigError::NoHomeDir)?.join(".gradpath"),
    };
    fs::create_dir_all(&dir).map_err(io_error(&dir))?;
    Ok(dir)
}

/// The saved bearer token file.
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(dir: &Path) -> Self {
        TokenStore {
            path: dir.join("token"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The saved token, if there is a non-empty one.
    pub fn load(&self) -> Result<Option<String>, ConfigError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let token = fs::read_to_string(&self.path).map_err(io_error(&self.path))?;
        let token = token.trim();
        Ok((!token.is_empty()).then(|| token.to_string()))
    }

    /// Save a token using atomic write (temp file + rename).
    pub fn save(&self, token: &str) -> Result<(), ConfigError> {
        let tmp = self.path.with_extension("tmp");
        let mut f = File::create(&tmp).map_err(io_error(&tmp))?;
        restrict_permissions(&tmp)?;
        f.write_all(token.trim().as_bytes()).map_err(io_error(&tmp))?;
        f.flush().map_err(io_error(&tmp))?;
        fs::rename(&tmp, &self.path).map_err(io_error(&self.path))?;
        Ok(())
    }

    /// Remove the saved token. Returns whether there was one.
    pub fn clear(&self) -> Result<bool, ConfigError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_error(&self.path)(e)),
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(io_error(path))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}
