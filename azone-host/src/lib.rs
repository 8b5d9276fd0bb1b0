//! Host-side collaborators for azone
//!
//! Implements [`HostNetwork`] on Linux by reading interface addresses with
//! `ip` and probing gateways with `ping`.

pub mod command;
pub mod linux;

pub use command::{CommandOutput, CommandRunner, SystemCommandRunner};
pub use linux::{parse_ip_addr_output, InterfaceAddress, LinuxHostNetwork};

use azone_core::abstractions::{HostNetwork, NoopHostNetwork};
use azone_core::NetworkConfig;
use std::sync::Arc;
use tracing::info;

/// The host network collaborator selected by `config`: live probing when
/// `probe_host_network` is set, otherwise one that reports nothing in use.
pub fn host_network(config: &NetworkConfig) -> Arc<dyn HostNetwork> {
    if config.probe_host_network {
        Arc::new(LinuxHostNetwork::from_config(config))
    } else {
        info!("Host network probing disabled");
        Arc::new(NoopHostNetwork::new())
    }
}
