//! Default configuration values
//!
//! Address ranges follow the fixed-constant style of a master address space:
//! zone subnets and bridge subnets are both carved out of 10.97.0.0/16.

use crate::ip::IpAddress;
use crate::subnet::Subnet;

// Zone defaults
pub const DEFAULT_ZONE_NAMES: [&str; 3] = ["zone1", "zone2", "zone3"];
pub const DEFAULT_ADDRESS_RANGE: Subnet =
    Subnet::new_assert(IpAddress::from_octets([10, 97, 0, 0]), 16);
pub const DEFAULT_SUBNET_PREFIX_LENGTH: u8 = 24;
pub const DEFAULT_ZONES_DIR_NAME: &str = "azs";
pub const DEFAULT_MANAGER_FILE_NAME: &str = "az-manager.json";

// Network probing defaults
pub const DEFAULT_MAX_SUBNET_ATTEMPTS: usize = 100;
pub const DEFAULT_BRIDGE_RANGE: Subnet =
    Subnet::new_assert(IpAddress::from_octets([10, 97, 0, 0]), 16);
pub const DEFAULT_BRIDGE_PREFIX_LENGTH: u8 = 24;
pub const DEFAULT_PING_TIMEOUT_MS: u64 = 1000;

// Storage defaults
pub const DEFAULT_DATA_DIR: &str = "./data";
