/// Notification info block
///
/// Fixed set of named string fields carried as the third argument of a
/// notification signal. Only the fields relevant to a command are filled,
/// the rest stay empty. On the wire the block is a JSON object whose keys
/// follow field declaration order; missing keys decode as empty strings.
use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationInfo {
    /// Human-readable message, also the failure reason
    pub message: String,
    /// Device address (bluetooth MAC)
    pub address: String,
    /// Temperature reading as reported by the sensor
    pub temperature: String,
    /// Phone number of a call
    pub number: String,
    /// Display name (device or contact)
    pub name: String,
}

impl NotificationInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    pub fn with_temperature(mut self, temperature: impl Into<String>) -> Self {
        self.temperature = temperature.into();
        self
    }

    pub fn with_number(mut self, number: impl Into<String>) -> Self {
        self.number = number.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Serialize into the wire string
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse a wire string. An empty string is an empty block.
    pub fn decode(raw: &str) -> Result<Self, DecodeError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(raw).map_err(|e| DecodeError::MalformedInfo(e.to_string()))
    }
}
