//! Host network introspection abstraction

use crate::error::AzoneResult;
use crate::ip::IpAddress;
use crate::subnet::Subnet;

/// Read-only view of the host's live network configuration.
pub trait HostNetwork: Send + Sync {
    /// Whether any local interface already has an address in `subnet`.
    fn subnet_in_use(&self, subnet: &Subnet) -> bool;

    /// Whether `gateway` answers, suggesting the range belongs to an existing
    /// external network.
    fn gateway_reachable(&self, gateway: IpAddress) -> bool;

    /// The subnet configured on `bridge`, or `None` if the bridge does not
    /// exist or carries no IPv4 address.
    fn bridge_subnet(&self, bridge: &str) -> AzoneResult<Option<Subnet>>;
}

/// Host network that reports nothing in use and no bridges.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHostNetwork;

impl NoopHostNetwork {
    pub fn new() -> Self {
        Self
    }
}

impl HostNetwork for NoopHostNetwork {
    fn subnet_in_use(&self, _subnet: &Subnet) -> bool {
        false
    }

    fn gateway_reachable(&self, _gateway: IpAddress) -> bool {
        false
    }

    fn bridge_subnet(&self, _bridge: &str) -> AzoneResult<Option<Subnet>> {
        Ok(None)
    }
}
