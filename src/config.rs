use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::error::ConfigError;

/// Which message bus a process attaches to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusKind {
    #[default]
    System,
    Session,
}

impl fmt::Display for BusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusKind::System => write!(f, "system"),
            BusKind::Session => write!(f, "session"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub bus: BusKind,

    /// Well-known bus name requested at startup
    pub service_name: String,

    /// Upper bound of one receiver poll, must stay below one second
    pub receiver_poll_ms: u64,

    /// Longest single sleep of the timer thread
    pub timer_interval_ms: u64,

    /// Dispatcher wait on an empty queue
    pub dispatcher_wait_ms: u64,

    /// Auto-reject delay for unanswered pairing confirmations
    pub confirmation_timeout_ms: u64,

    /// Longest recording before it is stopped automatically, 0 = unlimited
    pub max_record_ms: u64,

    /// Directory for rotated log files; platform config dir when unset
    pub log_dir: Option<PathBuf>,

    /// Default tracing filter, `RUST_LOG` wins when set
    pub log_filter: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            bus: BusKind::System,
            service_name: "org.devbus.Core".to_string(),
            receiver_poll_ms: 250,
            timer_interval_ms: 1000,
            dispatcher_wait_ms: 500,
            confirmation_timeout_ms: 30_000,
            max_record_ms: 0,
            log_dir: None,
            log_filter: "info".to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from `path`.
    /// Creates a default config file if it doesn't exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
                path: path.display().to_string(),
                source: Box::new(e),
            })?;
            let config: RuntimeConfig =
                serde_json::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.display().to_string(),
                    source: Box::new(e),
                })?;
            config.validate()?;

            info!("Loaded config from: {}", path.display());
            Ok(config)
        } else {
            let config = RuntimeConfig::default();
            config.save(path)?;
            info!("Created default config at: {}", path.display());
            Ok(config)
        }
    }

    /// Save configuration to disk
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::DirectoryCreationFailed {
                path: parent.display().to_string(),
                source: e,
            })?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.display().to_string(),
            source: Box::new(e),
        })?;
        fs::write(path, json).map_err(|e| ConfigError::SaveFailed {
            path: path.display().to_string(),
            source: Box::new(e),
        })?;

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.trim().is_empty() {
            return Err(ConfigError::Invalid("service_name is empty".to_string()));
        }
        if self.receiver_poll_ms == 0 || self.receiver_poll_ms >= 1000 {
            return Err(ConfigError::Invalid(format!(
                "receiver_poll_ms must be between 1 and 999, got {}",
                self.receiver_poll_ms
            )));
        }
        for (name, value) in [
            ("timer_interval_ms", self.timer_interval_ms),
            ("dispatcher_wait_ms", self.dispatcher_wait_ms),
            ("confirmation_timeout_ms", self.confirmation_timeout_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{} must be non-zero", name)));
            }
        }
        Ok(())
    }

    /// Default config file of `process`: `<config dir>/devbus/<process>.json`
    pub fn default_path(process: &str) -> Result<PathBuf, ConfigError> {
        let base = dirs::config_dir().ok_or_else(|| {
            ConfigError::Invalid("Could not determine the platform config directory".to_string())
        })?;
        Ok(base.join("devbus").join(format!("{}.json", process)))
    }

    /// Resolved log directory
    pub fn log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(|| {
            dirs::config_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("devbus")
                .join("logs")
        })
    }

    pub fn receiver_poll(&self) -> Duration {
        Duration::from_millis(self.receiver_poll_ms)
    }

    pub fn timer_interval(&self) -> Duration {
        Duration::from_millis(self.timer_interval_ms)
    }

    pub fn dispatcher_wait(&self) -> Duration {
        Duration::from_millis(self.dispatcher_wait_ms)
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_millis(self.confirmation_timeout_ms)
    }

    /// None when recordings are unlimited
    pub fn max_record(&self) -> Option<Duration> {
        (self.max_record_ms > 0).then(|| Duration::from_millis(self.max_record_ms))
    }
}

/// `--config <path>` from the command line, if given
pub fn config_path_from_args<I>(args: I) -> Option<PathBuf>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
        if let Some(path) = arg.strip_prefix("--config=") {
            return Some(PathBuf::from(path));
        }
    }
    None
}
