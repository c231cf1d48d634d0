//! Engine configuration and builder.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use libuci::config::EngineConfig;
//!
//! let config = EngineConfig::builder()
//!     .path("/usr/local/bin/stockfish")
//!     .option("Threads", "32")
//!     .handshake_timeout(Duration::from_secs(2))
//!     .build()?;
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::process::DEFAULT_READ_BUFFER_SIZE;
use crate::{Error, Result};

/// Environment variable consulted when no engine path is configured.
pub const ENV_STOCKFISH_PATH: &str = "STOCKFISH_PATH";

/// Where to find the engine executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnginePath {
    /// Use this path directly.
    Path(PathBuf),
    /// Read the path from the named environment variable.
    FromEnv(String),
}

impl Default for EnginePath {
    fn default() -> Self {
        EnginePath::FromEnv(ENV_STOCKFISH_PATH.to_string())
    }
}

impl EnginePath {
    /// Resolve to a concrete executable path.
    pub fn resolve(&self) -> Result<PathBuf> {
        match self {
            EnginePath::Path(path) => Ok(path.clone()),
            EnginePath::FromEnv(var) => std::env::var_os(var)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .ok_or_else(|| Error::EnvVarNotFound { var: var.clone() }),
        }
    }
}

/// Configuration for spawning and driving one engine.
///
/// Use [`EngineConfig::builder()`] to create a new configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    // Process options
    pub(crate) path: PathBuf,
    pub(crate) args: Vec<String>,
    pub(crate) working_directory: Option<PathBuf>,
    pub(crate) env_vars: HashMap<String, String>,

    // Line handling
    pub(crate) read_buffer_size: usize,
    pub(crate) flush_on_write: bool,

    // Timeouts
    pub(crate) handshake_timeout: Duration,
    pub(crate) option_timeout: Duration,
    pub(crate) ready_timeout: Duration,
    pub(crate) search_slack: Duration,
    pub(crate) default_move_time: Duration,
    pub(crate) termination_grace: Duration,

    // Options applied after the handshake, in order
    pub(crate) options: Vec<(String, String)>,
}

impl EngineConfig {
    /// Create a new builder for EngineConfig.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Path to the engine executable.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Extra command line arguments.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Working directory for the engine process, if set.
    pub fn working_directory(&self) -> Option<&PathBuf> {
        self.working_directory.as_ref()
    }

    /// Environment variables added to the engine process.
    pub fn env_vars(&self) -> &HashMap<String, String> {
        &self.env_vars
    }

    /// Size of each chunk read from the engine's stdout.
    pub fn read_buffer_size(&self) -> usize {
        self.read_buffer_size
    }

    /// Whether queued output is discarded before each command.
    pub fn flush_on_write(&self) -> bool {
        self.flush_on_write
    }

    /// Budget for the `uci` handshake.
    pub fn handshake_timeout(&self) -> Duration {
        self.handshake_timeout
    }

    /// Silence window after `setoption` that counts as success.
    pub fn option_timeout(&self) -> Duration {
        self.option_timeout
    }

    /// Budget for the readiness probe loop.
    pub fn ready_timeout(&self) -> Duration {
        self.ready_timeout
    }

    /// Extra time granted on top of the clock-derived search budget.
    pub fn search_slack(&self) -> Duration {
        self.search_slack
    }

    /// Fixed search time used when the clock carries no time.
    pub fn default_move_time(&self) -> Duration {
        self.default_move_time
    }

    /// How long to wait after an interrupt before killing the engine.
    pub fn termination_grace(&self) -> Duration {
        self.termination_grace
    }

    /// Options applied after the handshake.
    pub fn options(&self) -> &[(String, String)] {
        &self.options
    }
}

/// Builder for [`EngineConfig`].
///
/// Validation happens in [`build()`](EngineConfigBuilder::build): the engine
/// path is resolved and numeric settings are range-checked.
#[derive(Debug, Clone)]
pub struct EngineConfigBuilder {
    path: EnginePath,
    args: Vec<String>,
    working_directory: Option<PathBuf>,
    env_vars: HashMap<String, String>,
    read_buffer_size: usize,
    flush_on_write: bool,
    handshake_timeout: Duration,
    option_timeout: Duration,
    ready_timeout: Duration,
    search_slack: Duration,
    default_move_time: Duration,
    termination_grace: Duration,
    options: Vec<(String, String)>,
}

impl Default for EngineConfigBuilder {
    fn default() -> Self {
        Self {
            path: EnginePath::default(),
            args: Vec::new(),
            working_directory: None,
            env_vars: HashMap::new(),
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            flush_on_write: true,
            handshake_timeout: Duration::from_secs(1),
            option_timeout: Duration::from_millis(50),
            ready_timeout: Duration::from_secs(1),
            search_slack: Duration::from_secs(1),
            default_move_time: Duration::from_secs(1),
            termination_grace: Duration::from_millis(500),
            options: Vec::new(),
        }
    }
}

/// On-disk representation accepted by [`EngineConfigBuilder::from_json`].
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    path: Option<PathBuf>,
    path_env: Option<String>,
    args: Vec<String>,
    working_directory: Option<PathBuf>,
    env: HashMap<String, String>,
    read_buffer_size: Option<usize>,
    flush_on_write: Option<bool>,
    handshake_timeout_ms: Option<u64>,
    option_timeout_ms: Option<u64>,
    ready_timeout_ms: Option<u64>,
    search_slack_ms: Option<u64>,
    default_move_time_ms: Option<u64>,
    termination_grace_ms: Option<u64>,
    options: Vec<ConfigOption>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigOption {
    name: String,
    value: String,
}

impl EngineConfigBuilder {
    /// Load builder settings from a JSON document.
    ///
    /// Durations are given in milliseconds (`handshake_timeout_ms`, ...).
    /// Unset fields keep their defaults.
    ///
    /// ```ignore
    /// let config = EngineConfigBuilder::from_json(r#"{
    ///     "path": "/usr/local/bin/stockfish",
    ///     "options": [{ "name": "Threads", "value": "32" }]
    /// }"#)?.build()?;
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        let file: ConfigFile = serde_json::from_str(json)?;
        let mut builder = Self::default();

        match (file.path, file.path_env) {
            (Some(_), Some(_)) => {
                return Err(Error::InvalidConfig(
                    "path and path_env are mutually exclusive".into(),
                ))
            }
            (Some(path), None) => builder = builder.path(path),
            (None, Some(var)) => builder = builder.path_from_env(var),
            (None, None) => {}
        }

        builder = builder.args(file.args);
        if let Some(dir) = file.working_directory {
            builder = builder.working_directory(dir);
        }
        for (key, value) in file.env {
            builder = builder.env(key, value);
        }
        if let Some(size) = file.read_buffer_size {
            builder = builder.read_buffer_size(size);
        }
        if let Some(flush) = file.flush_on_write {
            builder = builder.flush_on_write(flush);
        }
        if let Some(ms) = file.handshake_timeout_ms {
            builder = builder.handshake_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = file.option_timeout_ms {
            builder = builder.option_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = file.ready_timeout_ms {
            builder = builder.ready_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = file.search_slack_ms {
            builder = builder.search_slack(Duration::from_millis(ms));
        }
        if let Some(ms) = file.default_move_time_ms {
            builder = builder.default_move_time(Duration::from_millis(ms));
        }
        if let Some(ms) = file.termination_grace_ms {
            builder = builder.termination_grace(Duration::from_millis(ms));
        }
        for option in file.options {
            builder = builder.option(option.name, option.value);
        }

        Ok(builder)
    }

    // -------------------------------------------------------------------------
    // Process options
    // -------------------------------------------------------------------------

    /// Path to the engine executable.
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = EnginePath::Path(path.into());
        self
    }

    /// Read the engine path from an environment variable at build time.
    pub fn path_from_env(mut self, var: impl Into<String>) -> Self {
        self.path = EnginePath::FromEnv(var.into());
        self
    }

    /// Set the command line arguments passed to the engine.
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Working directory for the engine process.
    pub fn working_directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(path.into());
        self
    }

    /// Add/override environment variable for the engine process.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.insert(key.into(), value.into());
        self
    }

    // -------------------------------------------------------------------------
    // Line handling
    // -------------------------------------------------------------------------

    /// Chunk size for reads from the engine's stdout (default 4096).
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }

    /// Discard unread engine output before each command (default: true).
    pub fn flush_on_write(mut self, flush: bool) -> Self {
        self.flush_on_write = flush;
        self
    }

    // -------------------------------------------------------------------------
    // Timeouts
    // -------------------------------------------------------------------------

    /// Budget for the `uci` handshake (default 1s).
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Silence window after `setoption` treated as success (default 50ms).
    pub fn option_timeout(mut self, timeout: Duration) -> Self {
        self.option_timeout = timeout;
        self
    }

    /// Budget for waiting on `readyok` (default 1s).
    pub fn ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self
    }

    /// Extra time added to the clock-derived search budget (default 1s).
    pub fn search_slack(mut self, slack: Duration) -> Self {
        self.search_slack = slack;
        self
    }

    /// Search time used when the clock carries no time (default 1s).
    pub fn default_move_time(mut self, time: Duration) -> Self {
        self.default_move_time = time;
        self
    }

    /// Grace period between interrupt and kill on termination (default 500ms).
    pub fn termination_grace(mut self, grace: Duration) -> Self {
        self.termination_grace = grace;
        self
    }

    // -------------------------------------------------------------------------
    // Engine options
    // -------------------------------------------------------------------------

    /// Apply `setoption name NAME value VALUE` after the handshake.
    pub fn option(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.push((name.into(), value.into()));
        self
    }

    // -------------------------------------------------------------------------
    // Build
    // -------------------------------------------------------------------------

    /// Build the configuration.
    ///
    /// This validates:
    /// - The engine path resolves (environment variable is set)
    /// - The working directory exists if specified
    /// - The read buffer size is non-zero
    /// - Option names are non-empty and contain no line breaks
    ///
    /// Note: executable existence is checked lazily at spawn time.
    pub fn build(self) -> Result<EngineConfig> {
        let path = self.path.resolve()?;

        if self.read_buffer_size == 0 {
            return Err(Error::InvalidConfig(
                "read_buffer_size must be positive".into(),
            ));
        }

        if let Some(ref dir) = self.working_directory {
            if !dir.exists() {
                return Err(Error::InvalidConfig(format!(
                    "working directory does not exist: {}",
                    dir.display()
                )));
            }
        }

        for (name, value) in &self.options {
            if name.trim().is_empty() {
                return Err(Error::InvalidConfig("option name must not be empty".into()));
            }
            if name.contains('\n') || value.contains('\n') {
                return Err(Error::InvalidConfig(format!(
                    "option {name:?} contains a line break"
                )));
            }
        }

        Ok(EngineConfig {
            path,
            args: self.args,
            working_directory: self.working_directory,
            env_vars: self.env_vars,
            read_buffer_size: self.read_buffer_size,
            flush_on_write: self.flush_on_write,
            handshake_timeout: self.handshake_timeout,
            option_timeout: self.option_timeout,
            ready_timeout: self.ready_timeout,
            search_slack: self.search_slack,
            default_move_time: self.default_move_time,
            termination_grace: self.termination_grace,
            options: self.options,
        })
    }
}
