//! Configuration for the `TaskDesk` client.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/taskdesk/config.toml`)
//! 4. Compiled defaults
//!
//! Missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::Command;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),

    /// A page size of zero was configured.
    #[error("{0} must be at least 1")]
    ZeroPageSize(&'static str),
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    api: ApiFileConfig,
    lists: ListsFileConfig,
    downloads: DownloadsFileConfig,
}

/// `[api]` section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ApiFileConfig {
    base_url: Option<String>,
    request_timeout_secs: Option<u64>,
}

/// `[lists]` section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ListsFileConfig {
    task_page_size: Option<u32>,
    user_page_size: Option<u32>,
    roster_page_size: Option<u32>,
    dashboard_page_size: Option<u32>,
}

/// `[downloads]` section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct DownloadsFileConfig {
    dir: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Fully resolved client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// API root, including the `/api` prefix.
    pub base_url: String,
    /// Per-request timeout handed to the HTTP client.
    pub request_timeout: Duration,
    /// Tasks per page in the task list.
    pub task_page_size: u32,
    /// Users per page in user management.
    pub user_page_size: u32,
    /// Users loaded as assignment candidates.
    pub roster_page_size: u32,
    /// Tasks shown on the dashboard.
    pub dashboard_page_size: u32,
    /// Directory downloaded documents are saved into.
    pub download_dir: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            request_timeout: Duration::from_secs(30),
            task_page_size: 10,
            user_page_size: 10,
            roster_page_size: 100,
            dashboard_page_size: 10,
            download_dir: PathBuf::from("."),
        }
    }
}

impl ClientConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the explicit config file cannot be read
    /// or parsed, or a page size resolves to zero.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Self::resolve(cli, &file)
    }

    /// Priority: CLI > file > default.
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let config = Self {
            base_url: cli
                .api_url
                .clone()
                .or_else(|| file.api.base_url.clone())
                .unwrap_or(defaults.base_url),
            request_timeout: cli
                .timeout_secs
                .or(file.api.request_timeout_secs)
                .map_or(defaults.request_timeout, Duration::from_secs),
            task_page_size: file
                .lists
                .task_page_size
                .unwrap_or(defaults.task_page_size),
            user_page_size: file
                .lists
                .user_page_size
                .unwrap_or(defaults.user_page_size),
            roster_page_size: file
                .lists
                .roster_page_size
                .unwrap_or(defaults.roster_page_size),
            dashboard_page_size: file
                .lists
                .dashboard_page_size
                .unwrap_or(defaults.dashboard_page_size),
            download_dir: cli
                .download_dir
                .clone()
                .or_else(|| file.downloads.dir.clone())
                .unwrap_or(defaults.download_dir),
        };

        for (name, size) in [
            ("task_page_size", config.task_page_size),
            ("user_page_size", config.user_page_size),
            ("roster_page_size", config.roster_page_size),
            ("dashboard_page_size", config.dashboard_page_size),
        ] {
            if size == 0 {
                return Err(ConfigError::ZeroPageSize(name));
            }
        }
        Ok(config)
    }
}

/// CLI arguments parsed by clap.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Command-line client for the TaskDesk task manager")]
pub struct CliArgs {
    /// API root URL (e.g. `http://localhost:8080/api`).
    #[arg(long, env = "TASKDESK_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Account email.
    #[arg(long, env = "TASKDESK_EMAIL", global = true)]
    pub email: Option<String>,

    /// Account password.
    #[arg(long, env = "TASKDESK_PASSWORD", hide_env_values = true, global = true)]
    pub password: Option<String>,

    /// Path to config file (default: `~/.config/taskdesk/config.toml`).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Request timeout in seconds.
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    /// Directory for downloaded documents.
    #[arg(long, global = true)]
    pub download_dir: Option<PathBuf>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "TASKDESK_LOG", global = true)]
    pub log_level: String,

    /// Path to log file (default: `$TMPDIR/taskdesk.log`).
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// What to do.
    #[command(subcommand)]
    pub command: Option<Command>,
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn load_config_file(explicit_path: Option<&Path>) -> Result<ConfigFile, ConfigError> {
    if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    }

    let Some(config_dir) = dirs::config_dir() else {
        return Ok(ConfigFile::default());
    };
    let path = config_dir.join("taskdesk").join("config.toml");

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
