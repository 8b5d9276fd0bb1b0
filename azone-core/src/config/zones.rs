//! Availability zone configuration

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;

use super::defaults::*;
use super::env_value;
use crate::error::{AzoneError, AzoneResult};
use crate::subnet::{Subnet, MAX_PREFIX_LENGTH};

/// How fresh zone subnets are chosen at bootstrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubnetStrategy {
    /// Random free subnets within the range, avoiding host collisions.
    Random,
    /// Consecutive subnets from the start of the range.
    Sequential,
}

impl FromStr for SubnetStrategy {
    type Err = AzoneError;

    fn from_str(s: &str) -> AzoneResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "random" => Ok(SubnetStrategy::Random),
            "sequential" => Ok(SubnetStrategy::Sequential),
            other => Err(AzoneError::Configuration {
                message: format!(
                    "unknown subnet strategy '{}', expected 'random' or 'sequential'",
                    other
                ),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ZonesConfig {
    /// Zone names in round-robin order; the first one is the default zone
    pub zone_names: Vec<String>,

    /// Range all zone subnets are carved from
    pub address_range: Subnet,

    /// Prefix length of each zone subnet
    pub subnet_prefix_length: u8,

    pub subnet_strategy: SubnetStrategy,

    /// Subdirectory of the data directory holding zone records
    pub zones_dir_name: String,

    /// File name of the manager record inside the zones directory
    pub manager_file_name: String,
}

impl Default for ZonesConfig {
    fn default() -> Self {
        Self {
            zone_names: DEFAULT_ZONE_NAMES.iter().map(|s| s.to_string()).collect(),
            address_range: DEFAULT_ADDRESS_RANGE,
            subnet_prefix_length: DEFAULT_SUBNET_PREFIX_LENGTH,
            subnet_strategy: SubnetStrategy::Random,
            zones_dir_name: DEFAULT_ZONES_DIR_NAME.to_string(),
            manager_file_name: DEFAULT_MANAGER_FILE_NAME.to_string(),
        }
    }
}

impl ZonesConfig {
    pub fn from_env() -> AzoneResult<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    pub(crate) fn apply_env(&mut self) -> AzoneResult<()> {
        if let Ok(names) = std::env::var("AZONE_ZONE_NAMES") {
            self.zone_names = names
                .split(',')
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
                .collect();
        }
        if let Some(range) = env_value("AZONE_ADDRESS_RANGE")? {
            self.address_range = range;
        }
        if let Some(prefix) = env_value("AZONE_SUBNET_PREFIX_LENGTH")? {
            self.subnet_prefix_length = prefix;
        }
        if let Some(strategy) = env_value("AZONE_SUBNET_STRATEGY")? {
            self.subnet_strategy = strategy;
        }
        Ok(())
    }

    pub fn validate(&self) -> AzoneResult<()> {
        if self.zone_names.is_empty() {
            return Err(config_error("zone_names cannot be empty"));
        }

        let mut seen = HashSet::new();
        for name in &self.zone_names {
            if !is_valid_file_stem(name) {
                return Err(config_error(format!(
                    "zone name '{}' must be non-empty and contain only letters, digits, '-' or '_'",
                    name
                )));
            }
            if !seen.insert(name.as_str()) {
                return Err(config_error(format!("duplicate zone name '{}'", name)));
            }
        }

        if self.subnet_prefix_length > MAX_PREFIX_LENGTH {
            return Err(config_error(format!(
                "subnet_prefix_length {} exceeds the maximum of {}",
                self.subnet_prefix_length, MAX_PREFIX_LENGTH
            )));
        }
        if self.subnet_prefix_length <= self.address_range.prefix_length() {
            return Err(config_error(format!(
                "subnet_prefix_length /{} must be more specific than address_range {}",
                self.subnet_prefix_length, self.address_range
            )));
        }

        let capacity = self.address_range.size(self.subnet_prefix_length);
        if capacity < self.zone_names.len() as u64 {
            return Err(config_error(format!(
                "address_range {} holds only {} /{} subnets for {} zones",
                self.address_range,
                capacity,
                self.subnet_prefix_length,
                self.zone_names.len()
            )));
        }

        if !is_valid_file_name(&self.zones_dir_name) {
            return Err(config_error("zones_dir_name must be a plain directory name"));
        }
        if !is_valid_file_name(&self.manager_file_name) {
            return Err(config_error("manager_file_name must be a plain file name"));
        }
        if self
            .zone_names
            .iter()
            .any(|name| format!("{}.json", name) == self.manager_file_name)
        {
            return Err(config_error(
                "manager_file_name collides with a zone record file",
            ));
        }

        Ok(())
    }

    /// The zone handed out when a VM has no zone recorded.
    pub fn default_zone_name(&self) -> Option<&str> {
        self.zone_names.first().map(String::as_str)
    }
}

fn config_error(message: impl Into<String>) -> AzoneError {
    AzoneError::Configuration {
        message: message.into(),
    }
}

fn is_valid_file_stem(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn is_valid_file_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains('/') && !name.contains('\\')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = ZonesConfig::default();
        config.validate().unwrap();
        assert_eq!(config.default_zone_name(), Some("zone1"));
    }

    #[test]
    fn test_rejects_bad_zone_names() {
        for names in [vec![], vec!["zone1", "zone1"], vec!["../etc"], vec![""], vec!["a b"]] {
            let config = ZonesConfig {
                zone_names: names.iter().map(|s| s.to_string()).collect(),
                ..ZonesConfig::default()
            };
            assert!(config.validate().is_err(), "accepted {:?}", names);
        }
    }

    #[test]
    fn test_rejects_range_too_small() {
        let config = ZonesConfig {
            address_range: "10.0.0.0/23".parse().unwrap(),
            subnet_prefix_length: 24,
            ..ZonesConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("holds only 2"));
    }

    #[test]
    fn test_rejects_prefix_not_more_specific() {
        let config = ZonesConfig {
            subnet_prefix_length: 16,
            ..ZonesConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_manager_file_collision() {
        let config = ZonesConfig {
            manager_file_name: "zone2.json".to_string(),
            ..ZonesConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!("Random".parse::<SubnetStrategy>().unwrap(), SubnetStrategy::Random);
        assert_eq!(
            "sequential".parse::<SubnetStrategy>().unwrap(),
            SubnetStrategy::Sequential
        );
        assert!("roundrobin".parse::<SubnetStrategy>().is_err());
    }
}
