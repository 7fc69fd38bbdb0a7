//! Client configuration.
//!
//! Supports loading configuration from:
//! 1. Configuration files (YAML)
//! 2. Environment variables (`LAVA_*`, plus `LSF_ENVDIR`)
//!
//! Configuration precedence (highest to lowest):
//! 1. Environment variables
//! 2. Configuration file
//! 3. Default values

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{LavaError, LavaResult};
use crate::protocol::DEFAULT_MAX_PACKET;

/// Settings for a client session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Application name announced to the master on init
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Master host name or address
    #[serde(default = "default_master_host")]
    pub master_host: String,

    /// Master port
    #[serde(default = "default_master_port")]
    pub master_port: u16,

    /// Per-call timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Largest reply body accepted, in bytes
    #[serde(default = "default_max_packet")]
    pub max_packet_bytes: u32,

    /// Scheduler configuration directory (`LSF_ENVDIR`)
    #[serde(default)]
    pub env_dir: Option<PathBuf>,

    /// Directory holding `lsb.acct` and `lsb.events`
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn default_app_name() -> String {
    "lava".to_string()
}

fn default_master_host() -> String {
    "localhost".to_string()
}

fn default_master_port() -> u16 {
    6881
}

fn default_timeout() -> u64 {
    30
}

fn default_max_packet() -> u32 {
    DEFAULT_MAX_PACKET
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            master_host: default_master_host(),
            master_port: default_master_port(),
            timeout_seconds: default_timeout(),
            max_packet_bytes: default_max_packet(),
            env_dir: None,
            log_dir: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> LavaResult<Self> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            LavaError::Config(format!("cannot read {}: {e}", path.as_ref().display()))
        })?;
        let config: ClientConfig = serde_yaml_ng::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// File (if given and present), then environment overrides.
    pub fn load(config_file: Option<&Path>) -> LavaResult<Self> {
        let config = match config_file {
            Some(path) if path.exists() => Self::from_file(path)?,
            Some(path) => {
                debug!(path = %path.display(), "No configuration file, using defaults");
                Self::default()
            }
            None => Self::default(),
        };
        let config = config.merge_env();
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn merge_env(self) -> Self {
        self.merge_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`. Unset or unparsable values leave the
    /// field unchanged.
    pub fn merge_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(v) = lookup("LAVA_APP_NAME") {
            self.app_name = v;
        }
        if let Some(v) = lookup("LAVA_MASTER_HOST") {
            self.master_host = v;
        }
        if let Some(val) = lookup("LAVA_MASTER_PORT").and_then(|v| v.parse().ok()) {
            self.master_port = val;
        }
        if let Some(val) = lookup("LAVA_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.timeout_seconds = val;
        }
        if let Some(v) = lookup("LSF_ENVDIR") {
            self.env_dir = Some(PathBuf::from(v));
        }
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> LavaResult<()> {
        if self.app_name.trim().is_empty() {
            return Err(LavaError::Config("app_name must not be empty".to_string()));
        }
        if self.master_host.trim().is_empty() {
            return Err(LavaError::Config("master_host must not be empty".to_string()));
        }
        if self.master_port == 0 {
            return Err(LavaError::Config("master_port must be greater than 0".to_string()));
        }
        if self.timeout_seconds == 0 {
            return Err(LavaError::Config(
                "timeout_seconds must be greater than 0".to_string(),
            ));
        }
        if self.max_packet_bytes == 0 {
            return Err(LavaError::Config(
                "max_packet_bytes must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn master_addr(&self) -> String {
        format!("{}:{}", self.master_host, self.master_port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Directory holding the accounting and event logs.
    pub fn log_dir(&self) -> LavaResult<PathBuf> {
        if let Some(dir) = &self.log_dir {
            return Ok(dir.clone());
        }
        let root = find_installation_in(self.env_dir.as_deref(), Path::new("/opt"))?;
        Ok(root.join("work").join("logdir"))
    }

    pub fn accounting_log(&self) -> LavaResult<PathBuf> {
        Ok(self.log_dir()?.join("lsb.acct"))
    }

    pub fn event_log(&self) -> LavaResult<PathBuf> {
        Ok(self.log_dir()?.join("lsb.events"))
    }
}

/// Locate the scheduler installation from `LSF_ENVDIR` or under `/opt`.
pub fn find_installation() -> LavaResult<PathBuf> {
    let env_dir = std::env::var_os("LSF_ENVDIR").map(PathBuf::from);
    find_installation_in(env_dir.as_deref(), Path::new("/opt"))
}

/// Locate the installation root.
///
/// `env_dir/..` wins when given. Otherwise `opt_root/openlava`, then a
/// single `opt_root/openlava-<version>`; several versioned directories are
/// ambiguous and rejected.
pub fn find_installation_in(env_dir: Option<&Path>, opt_root: &Path) -> LavaResult<PathBuf> {
    if let Some(env_dir) = env_dir {
        let root = env_dir.join("..");
        return Ok(std::fs::canonicalize(&root).unwrap_or(root));
    }

    let plain = opt_root.join("openlava");
    if plain.exists() {
        return Ok(plain);
    }

    let mut versioned: Vec<PathBuf> = match std::fs::read_dir(opt_root) {
        Ok(entries) => entries
            .filter_map(Result::ok)
            .filter(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .and_then(|name| name.strip_prefix("openlava-"))
                    .is_some_and(|rest| rest.starts_with(|c: char| c.is_ascii_digit()))
            })
            .map(|entry| entry.path())
            .collect(),
        Err(_) => Vec::new(),
    };
    versioned.sort();

    match versioned.len() {
        0 => Err(LavaError::Config(format!(
            "no scheduler installation under {} (expected openlava or openlava-<version>)",
            opt_root.display()
        ))),
        1 => Ok(versioned.remove(0)),
        n => Err(LavaError::Config(format!(
            "{n} scheduler installations under {}; set LSF_ENVDIR",
            opt_root.display()
        ))),
    }
}
