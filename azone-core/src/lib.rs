//! Availability-zone subnet allocation and zone state management
//!
//! IPv4 address and subnet arithmetic, sequential and randomized subnet
//! allocation, and a durable set of availability zones with round-robin
//! placement for VMs.

pub mod abstractions;
pub mod allocator;
pub mod common;
pub mod config;
pub mod error;
pub mod ip;
pub mod manager;
pub mod subnet;
pub mod subnet_utils;
pub mod types;
pub mod zone;

pub use allocator::SubnetAllocator;
pub use config::{AzoneConfig, AzoneConfigBuilder, NetworkConfig, SubnetStrategy, ZonesConfig};
pub use error::{AzoneError, AzoneResult, ErrorKind};
pub use ip::IpAddress;
pub use manager::AvailabilityZoneManager;
pub use subnet::{Subnet, MAX_PREFIX_LENGTH};
pub use subnet_utils::SubnetUtils;
pub use types::{VmName, VmZoneRecord};
pub use zone::{AvailabilityZone, ZoneRecord};
