//! Host network introspection through iproute2 and ping

use azone_core::abstractions::HostNetwork;
use azone_core::{AzoneError, AzoneResult, IpAddress, NetworkConfig, Subnet};
use ipnet::Ipv4Net;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::command::{command_line, CommandRunner, SystemCommandRunner};

/// An IPv4 address configured on a local interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceAddress {
    pub interface: String,
    /// Address with its prefix, as `ip` prints it
    pub network: Ipv4Net,
}

impl InterfaceAddress {
    /// Whether this interface's network shares any address with `subnet`.
    /// Interface networks may be /31 or /32, so the comparison is done on raw
    /// address ranges.
    pub fn overlaps(&self, subnet: &Subnet) -> bool {
        let first = u32::from(self.network.network());
        let last = u32::from(self.network.broadcast());
        first <= subnet.broadcast_address().as_u32() && subnet.masked_address().as_u32() <= last
    }
}

/// Parse the one-line-per-address output of `ip -o -4 addr show`.
///
/// ```text
/// 2: eth0    inet 192.168.1.10/24 brd 192.168.1.255 scope global dynamic eth0\       valid_lft 85530sec preferred_lft 85530sec
/// ```
///
/// Lines that do not carry an `inet` address are skipped.
pub fn parse_ip_addr_output(output: &str) -> Vec<InterfaceAddress> {
    let mut addresses = Vec::new();

    for line in output.lines() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some(inet) = tokens.iter().position(|t| *t == "inet") else {
            continue;
        };
        let Some(cidr) = tokens.get(inet + 1) else {
            continue;
        };
        let network: Ipv4Net = match cidr.parse() {
            Ok(network) => network,
            Err(e) => {
                debug!("Skipping unparseable address '{}': {}", cidr, e);
                continue;
            }
        };

        // "veth0@if3" names the peer after '@'
        let interface = tokens
            .get(1)
            .map(|name| name.split('@').next().unwrap_or(name).to_string())
            .unwrap_or_default();

        addresses.push(InterfaceAddress { interface, network });
    }

    addresses
}

/// Production [`HostNetwork`] for Linux hosts.
///
/// Probing is best effort: if `ip` or `ping` cannot be run the subnet is
/// treated as free and the gateway as unreachable, and a warning is logged.
pub struct LinuxHostNetwork {
    runner: Arc<dyn CommandRunner>,
    ping_timeout: Duration,
}

impl LinuxHostNetwork {
    pub fn new(ping_timeout: Duration) -> Self {
        Self::with_runner(Arc::new(SystemCommandRunner::new()), ping_timeout)
    }

    pub fn with_runner(runner: Arc<dyn CommandRunner>, ping_timeout: Duration) -> Self {
        Self {
            runner,
            ping_timeout,
        }
    }

    pub fn from_config(config: &NetworkConfig) -> Self {
        Self::new(config.ping_timeout)
    }

    /// All IPv4 addresses configured on local interfaces.
    pub fn interface_addresses(&self) -> AzoneResult<Vec<InterfaceAddress>> {
        let args = ["-o", "-4", "addr", "show"];
        let output = self.runner.run("ip", &args)?;
        if !output.success {
            return Err(AzoneError::HostCommand {
                command: command_line("ip", &args),
                details: format!("exit status {}: {}", output.status, output.stderr.trim()),
            });
        }
        Ok(parse_ip_addr_output(&output.stdout))
    }

    /// `ping -W` takes whole seconds.
    fn ping_wait_seconds(&self) -> u64 {
        let millis = self.ping_timeout.as_millis() as u64;
        millis.div_ceil(1000).max(1)
    }
}

impl HostNetwork for LinuxHostNetwork {
    fn subnet_in_use(&self, subnet: &Subnet) -> bool {
        match self.interface_addresses() {
            Ok(addresses) => match addresses.iter().find(|a| a.overlaps(subnet)) {
                Some(address) => {
                    debug!(
                        "Subnet {} overlaps {} on interface {}",
                        subnet, address.network, address.interface
                    );
                    true
                }
                None => false,
            },
            Err(e) => {
                warn!("Could not list host addresses, assuming {} is free: {}", subnet, e);
                false
            }
        }
    }

    fn gateway_reachable(&self, gateway: IpAddress) -> bool {
        let wait = self.ping_wait_seconds().to_string();
        let target = gateway.to_string();
        match self.runner.run("ping", &["-c", "1", "-W", &wait, &target]) {
            Ok(output) => {
                if output.success {
                    debug!("Gateway {} answered ping", gateway);
                }
                output.success
            }
            Err(e) => {
                warn!("Could not ping {}, assuming unreachable: {}", gateway, e);
                false
            }
        }
    }

    fn bridge_subnet(&self, bridge: &str) -> AzoneResult<Option<Subnet>> {
        let args = ["-o", "-4", "addr", "show", "dev", bridge];
        let output = self.runner.run("ip", &args)?;
        if !output.success {
            if output.stderr.contains("does not exist") {
                debug!("Bridge {} does not exist", bridge);
                return Ok(None);
            }
            return Err(AzoneError::HostCommand {
                command: command_line("ip", &args),
                details: format!("exit status {}: {}", output.status, output.stderr.trim()),
            });
        }

        match parse_ip_addr_output(&output.stdout).into_iter().next() {
            Some(address) => Subnet::try_from(address.network).map(Some),
            None => {
                debug!("Bridge {} has no IPv4 address", bridge);
                Ok(None)
            }
        }
    }
}

impl std::fmt::Debug for LinuxHostNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinuxHostNetwork")
            .field("ping_timeout", &self.ping_timeout)
            .finish_non_exhaustive()
    }
}
