use thiserror::Error;

/// Runtime-level errors using thiserror for structured error handling.
///
/// These errors represent failures of the shared runtime (bus transport,
/// timers, workers, configuration). Binaries chain them with anyhow.

#[derive(Error, Debug)]
pub enum BusError {
    #[error("Failed to connect to the {bus} bus")]
    ConnectFailed {
        bus: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to acquire bus name {name}")]
    NameRequestFailed {
        name: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to add match rule for {interface}.{member}")]
    MatchFailed {
        interface: String,
        member: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to build signal {interface}.{member}: {reason}")]
    BuildFailed {
        interface: String,
        member: String,
        reason: String,
    },

    #[error("Failed to send signal {interface}.{member}")]
    SendFailed { interface: String, member: String },

    #[error("Bus connection lost")]
    Disconnected(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl BusError {
    /// Short stable label for logs
    pub fn as_label(&self) -> &'static str {
        match self {
            BusError::ConnectFailed { .. } => "bus_connect_failed",
            BusError::NameRequestFailed { .. } => "bus_name_request_failed",
            BusError::MatchFailed { .. } => "bus_match_failed",
            BusError::BuildFailed { .. } => "bus_build_failed",
            BusError::SendFailed { .. } => "bus_send_failed",
            BusError::Disconnected(_) => "bus_disconnected",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Unexpected argument signature '{0}'")]
    UnexpectedSignature(String),

    #[error("Malformed arguments for signature '{signature}'")]
    MalformedArguments { signature: String },

    #[error("Unknown command code {0}")]
    UnknownCommand(i32),

    #[error("Malformed info block: {0}")]
    MalformedInfo(String),
}

impl DecodeError {
    pub fn as_label(&self) -> &'static str {
        match self {
            DecodeError::UnexpectedSignature(_) => "decode_unexpected_signature",
            DecodeError::MalformedArguments { .. } => "decode_malformed_arguments",
            DecodeError::UnknownCommand(_) => "decode_unknown_command",
            DecodeError::MalformedInfo(_) => "decode_malformed_info",
        }
    }
}

/// Timer failures are definitive: retrying the same call will not succeed.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerError {
    #[error("Timer service has no event queue attached")]
    NoQueue,

    #[error("Timer id space exhausted ({live} timers pending)")]
    IdsExhausted { live: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PairingError {
    #[error("Invalid device address '{0}'")]
    InvalidAddress(String),

    #[error(transparent)]
    Timer(#[from] TimerError),
}

/// Failure of the audio capture collaborator
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Capture device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("No capture running for session {0}")]
    NotRunning(u64),
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Failed to spawn worker thread {name}")]
    SpawnFailed {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration from {path}")]
    LoadFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to save configuration to {path}")]
    SaveFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to create config directory: {path}")]
    DirectoryCreationFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Type alias for application Results using anyhow for context chaining
pub type AppResult<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_display() {
        let err = DecodeError::UnexpectedSignature("ss".to_string());
        assert_eq!(err.to_string(), "Unexpected argument signature 'ss'");

        let err = TimerError::NoQueue;
        assert_eq!(err.to_string(), "Timer service has no event queue attached");

        let err = BusError::SendFailed {
            interface: "org.devbus.Record".to_string(),
            member: "Command".to_string(),
        };
        assert_eq!(err.to_string(), "Failed to send signal org.devbus.Record.Command");
        assert_eq!(err.as_label(), "bus_send_failed");
    }

    #[test]
    fn test_error_source_chain() {
        use std::io;

        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let config_err = ConfigError::LoadFailed {
            path: "/test/core.json".to_string(),
            source: Box::new(io_err),
        };

        assert!(config_err.source().is_some());
        assert_eq!(
            config_err.to_string(),
            "Failed to load configuration from /test/core.json"
        );
    }

    #[test]
    fn test_decode_labels() {
        assert_eq!(
            DecodeError::UnknownCommand(99).as_label(),
            "decode_unknown_command"
        );
        assert_eq!(
            DecodeError::MalformedInfo("eof".into()).as_label(),
            "decode_malformed_info"
        );
    }
}
