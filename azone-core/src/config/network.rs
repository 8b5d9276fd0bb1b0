//! Host network probing configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::defaults::*;
use super::env_value;
use crate::error::{AzoneError, AzoneResult};
use crate::subnet::{Subnet, MAX_PREFIX_LENGTH};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Random picks tried before giving up on finding a free subnet
    pub max_subnet_attempts: usize,

    /// Consult the host's interfaces and probe gateways for collisions
    pub probe_host_network: bool,

    /// Range bridge subnets are generated from when none is known
    pub bridge_range: Subnet,

    pub bridge_prefix_length: u8,

    /// How long to wait for a gateway to answer
    #[serde(with = "humantime_serde")]
    pub ping_timeout: Duration,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            max_subnet_attempts: DEFAULT_MAX_SUBNET_ATTEMPTS,
            probe_host_network: true,
            bridge_range: DEFAULT_BRIDGE_RANGE,
            bridge_prefix_length: DEFAULT_BRIDGE_PREFIX_LENGTH,
            ping_timeout: Duration::from_millis(DEFAULT_PING_TIMEOUT_MS),
        }
    }
}

impl NetworkConfig {
    pub fn from_env() -> AzoneResult<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    pub(crate) fn apply_env(&mut self) -> AzoneResult<()> {
        if let Some(attempts) = env_value("AZONE_MAX_SUBNET_ATTEMPTS")? {
            self.max_subnet_attempts = attempts;
        }
        if let Some(probe) = env_value("AZONE_PROBE_HOST_NETWORK")? {
            self.probe_host_network = probe;
        }
        if let Some(range) = env_value("AZONE_BRIDGE_RANGE")? {
            self.bridge_range = range;
        }
        if let Some(prefix) = env_value("AZONE_BRIDGE_PREFIX_LENGTH")? {
            self.bridge_prefix_length = prefix;
        }
        if let Some(timeout_ms) = env_value::<u64>("AZONE_PING_TIMEOUT_MS")? {
            self.ping_timeout = Duration::from_millis(timeout_ms);
        }
        Ok(())
    }

    pub fn validate(&self) -> AzoneResult<()> {
        if self.max_subnet_attempts == 0 {
            return Err(AzoneError::Configuration {
                message: "max_subnet_attempts must be at least 1".to_string(),
            });
        }

        if self.bridge_prefix_length > MAX_PREFIX_LENGTH
            || self.bridge_prefix_length <= self.bridge_range.prefix_length()
        {
            return Err(AzoneError::Configuration {
                message: format!(
                    "bridge_prefix_length /{} must be more specific than bridge_range {} and at most /{}",
                    self.bridge_prefix_length, self.bridge_range, MAX_PREFIX_LENGTH
                ),
            });
        }

        if self.ping_timeout < Duration::from_millis(100) {
            return Err(AzoneError::Configuration {
                message: "ping_timeout too small (min 100ms)".to_string(),
            });
        }

        Ok(())
    }
}
