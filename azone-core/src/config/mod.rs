//! Configuration for the availability-zone subsystem
//!
//! Structured configuration with defaults, TOML file loading, environment
//! variable overrides (`AZONE_*`) and validation.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{AzoneError, AzoneResult};

pub mod defaults;
pub mod network;
pub mod zones;

pub use defaults::*;
pub use network::NetworkConfig;
pub use zones::{SubnetStrategy, ZonesConfig};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AzoneConfig {
    /// Directory all durable state lives under
    pub data_dir: PathBuf,

    pub zones: ZonesConfig,

    pub network: NetworkConfig,
}

impl Default for AzoneConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            zones: ZonesConfig::default(),
            network: NetworkConfig::default(),
        }
    }
}

impl AzoneConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by environment variables.
    pub fn from_env() -> AzoneResult<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// A TOML file overridden by environment variables.
    pub fn from_file<P: AsRef<Path>>(path: P) -> AzoneResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| AzoneError::io("read configuration", path, e))?;
        let mut config: AzoneConfig =
            toml::from_str(&content).map_err(|e| AzoneError::Configuration {
                message: format!("Failed to parse {:?}: {}", path, e),
            })?;
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// [`from_file`](Self::from_file) when a path is given, otherwise
    /// [`from_env`](Self::from_env).
    pub fn load(path: Option<&Path>) -> AzoneResult<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Self::from_env(),
        }
    }

    fn apply_env(&mut self) -> AzoneResult<()> {
        if let Ok(dir) = std::env::var("AZONE_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        self.zones.apply_env()?;
        self.network.apply_env()?;
        Ok(())
    }

    pub fn validate(&self) -> AzoneResult<()> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(AzoneError::Configuration {
                message: "data_dir cannot be empty".to_string(),
            });
        }

        self.zones.validate()?;
        self.network.validate()?;
        Ok(())
    }

    /// Configuration rooted at `data_dir` with host probing disabled.
    pub fn test(data_dir: impl Into<PathBuf>) -> Self {
        let mut config = Self::default();
        config.data_dir = data_dir.into();
        config.network.probe_host_network = false;
        config
    }
}

/// Builder for AzoneConfig
pub struct AzoneConfigBuilder {
    config: AzoneConfig,
}

impl AzoneConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: AzoneConfig::default(),
        }
    }

    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.data_dir = dir.into();
        self
    }

    pub fn zone_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.zones.zone_names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn zones(mut self, zones: ZonesConfig) -> Self {
        self.config.zones = zones;
        self
    }

    pub fn network(mut self, network: NetworkConfig) -> Self {
        self.config.network = network;
        self
    }

    pub fn build(self) -> AzoneResult<AzoneConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for AzoneConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse an environment variable if it is set.
pub(crate) fn env_value<T: FromStr>(key: &str) -> AzoneResult<Option<T>> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| AzoneError::Configuration {
                message: format!("Invalid {}: '{}'", key, value),
            }),
        Err(_) => Ok(None),
    }
}
