//! Error taxonomy for the Raspiforce agent
//!
//! Every failure is fatal to the process: nothing here is retried. The
//! enums only make the cause explicit instead of crashing on a missing row
//! or an unparsable device file.

use std::path::PathBuf;

/// Errors raised while loading the local configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("No configuration file found (looked at {0:?})")]
    NotFound(Vec<PathBuf>),
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid configuration in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Chat mode requested but [chat] ws_url is not configured")]
    MissingChatEndpoint,
    #[error("No Salesforce password in the configuration file or the keyring")]
    MissingPassword,
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),
}

/// Errors raised by a CRM backend
#[derive(Debug, thiserror::Error)]
pub enum CrmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Salesforce API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("Record creation rejected for {sobject}: {message}")]
    Rejected { sobject: String, message: String },
    #[error("Failed to decode record: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Errors raised by the chat channel
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("Failed to encode chat message: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Errors raised while reading the temperature sensor
#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    #[error("No sensor device matching {prefix}* under {base_dir}")]
    DeviceNotFound { base_dir: PathBuf, prefix: String },
    #[error("Failed to read sensor device {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Malformed sensor data: {0}")]
    Malformed(String),
    #[error("Sensor did not report a valid reading after {attempts} attempts")]
    Timeout { attempts: u32 },
}

/// Top-level agent error
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("No active demo configuration for host {hostname:?}")]
    NoActiveDemo { hostname: String },
    #[error("Asset {id} not found")]
    AssetNotFound { id: String },
    #[error("Sensor required outside simulation mode")]
    SensorMissing,
    #[error(transparent)]
    Crm(#[from] CrmError),
    #[error(transparent)]
    Chat(#[from] ChatError),
    #[error(transparent)]
    Sensor(#[from] SensorError),
}

pub type Result<T, E = AgentError> = std::result::Result<T, E>;
