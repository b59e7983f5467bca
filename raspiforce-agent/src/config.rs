//! Configuration management with secure storage
//!
//! Handles:
//! - Salesforce setup-org credentials (password optionally in the OS keyring)
//! - Chat WebSocket endpoint
//! - Host identifier used for the demo lookup
//! - Sensor device and loop timing parameters

use crate::error::ConfigError;
use keyring::Entry;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const KEYRING_SERVICE: &str = "raspiforce";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub salesforce: SalesforceConfig,
    #[serde(default)]
    pub chat: Option<ChatConfig>,
    #[serde(default)]
    pub host: HostConfig,
    #[serde(default)]
    pub sensor: SensorConfig,
    #[serde(default)]
    pub timing: TimingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesforceConfig {
    #[serde(default = "default_login_url")]
    pub login_url: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    #[serde(default, skip_serializing)] // Never write passwords back
    pub password: Option<String>,
    #[serde(default)]
    pub security_token: String,
    #[serde(default)]
    pub use_keyring: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    pub ws_url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostConfig {
    pub hostname: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    pub base_dir: PathBuf,
    pub device_prefix: String,
    pub load_kernel_modules: bool,
    pub retry_interval_ms: u64,
    pub max_attempts: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub sample_interval_secs: u64,
    pub cooldown_secs: u64,
}

fn default_login_url() -> String {
    "https://login.salesforce.com".to_string()
}

fn default_api_version() -> String {
    "59.0".to_string()
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("/sys/bus/w1/devices"),
            device_prefix: "28".to_string(),
            load_kernel_modules: true,
            retry_interval_ms: 200,
            max_attempts: 50,
        }
    }
}

impl SensorConfig {
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            sample_interval_secs: 2,
            cooldown_secs: 60,
        }
    }
}

impl TimingConfig {
    pub fn sample_interval(&self) -> Duration {
        Duration::from_secs(self.sample_interval_secs)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}

impl HostConfig {
    /// Hostname key for the demo lookup, falling back to the machine name
    pub fn resolve(&self) -> String {
        match &self.hostname {
            Some(name) => name.trim().trim_matches('\'').to_string(),
            None => gethostname::gethostname().to_string_lossy().to_string(),
        }
    }
}

impl AgentConfig {
    /// Load config from the first existing candidate location
    pub async fn load() -> Result<Self, ConfigError> {
        let candidates = Self::candidate_paths();
        let path = candidates
            .iter()
            .find(|p| p.exists())
            .cloned()
            .ok_or_else(|| ConfigError::NotFound(candidates.clone()))?;

        let mut config = Self::load_from(&path).await?;
        config.resolve_password()?;
        Ok(config)
    }

    /// Parse a config file without touching the keyring
    pub async fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        Self::parse(&content, path)
    }

    fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Config file locations, in lookup order
    pub fn candidate_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Ok(explicit) = std::env::var("RASPIFORCE_CONFIG") {
            paths.push(PathBuf::from(explicit));
        }
        paths.push(PathBuf::from("raspiforce.toml"));
        if let Some(mut dir) = dirs::config_dir() {
            dir.push("raspiforce");
            dir.push("config.toml");
            paths.push(dir);
        }
        paths
    }

    /// Chat endpoint, required once chat mode is on
    pub fn chat_url(&self) -> Result<&str, ConfigError> {
        self.chat
            .as_ref()
            .map(|c| c.ws_url.as_str())
            .ok_or(ConfigError::MissingChatEndpoint)
    }

    fn resolve_password(&mut self) -> Result<(), ConfigError> {
        if self.salesforce.password.is_some() {
            return Ok(());
        }
        if !self.salesforce.use_keyring {
            return Err(ConfigError::MissingPassword);
        }
        let entry = Entry::new(KEYRING_SERVICE, &self.salesforce.username)?;
        self.salesforce.password = Some(read_password(&entry)?);
        Ok(())
    }
}

/// Read the Salesforce password stored in a keyring entry
fn read_password(entry: &Entry) -> Result<String, ConfigError> {
    entry.get_password().map_err(|e| match e {
        keyring::Error::NoEntry => ConfigError::MissingPassword,
        other => ConfigError::Keyring(other),
    })
}
