// Common test doubles for integration tests
#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::Arc;

use azone_core::abstractions::{HostNetwork, RandomSource};
use azone_core::{
    AvailabilityZoneManager, AzoneResult, IpAddress, NetworkConfig, Subnet, SubnetUtils,
    ZonesConfig,
};
use parking_lot::Mutex;

/// Random source that replays a fixed script of values, then repeats the
/// last one. Values outside the requested range are clamped.
#[derive(Debug, Default)]
pub struct ScriptedRandom {
    values: Mutex<VecDeque<u64>>,
    last: Mutex<u64>,
    calls: Mutex<usize>,
}

impl ScriptedRandom {
    pub fn new(values: impl IntoIterator<Item = u64>) -> Self {
        Self {
            values: Mutex::new(values.into_iter().collect()),
            last: Mutex::new(0),
            calls: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock()
    }
}

impl RandomSource for ScriptedRandom {
    fn random_int(&self, low: u64, high: u64) -> u64 {
        *self.calls.lock() += 1;
        let mut last = self.last.lock();
        if let Some(value) = self.values.lock().pop_front() {
            *last = value;
        }
        (*last).clamp(low, high)
    }
}

/// Host network whose interfaces, reachable gateways and bridges are set up
/// by the test.
#[derive(Debug, Default)]
pub struct FakeHostNetwork {
    in_use: Mutex<Vec<Subnet>>,
    reachable: Mutex<HashSet<IpAddress>>,
    bridges: Mutex<HashMap<String, Subnet>>,
    probes: Mutex<usize>,
}

impl FakeHostNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_interface(self, cidr: &str) -> Self {
        self.in_use.lock().push(subnet(cidr));
        self
    }

    pub fn with_reachable_gateway(self, ip: &str) -> Self {
        self.reachable.lock().insert(ip.parse().unwrap());
        self
    }

    pub fn with_bridge(self, name: &str, cidr: &str) -> Self {
        self.set_bridge(name, cidr);
        self
    }

    pub fn set_bridge(&self, name: &str, cidr: &str) {
        self.bridges.lock().insert(name.to_string(), subnet(cidr));
    }

    pub fn remove_bridge(&self, name: &str) {
        self.bridges.lock().remove(name);
    }

    /// Number of `subnet_in_use` queries seen.
    pub fn probes(&self) -> usize {
        *self.probes.lock()
    }
}

impl HostNetwork for FakeHostNetwork {
    fn subnet_in_use(&self, subnet: &Subnet) -> bool {
        *self.probes.lock() += 1;
        self.in_use.lock().iter().any(|s| s.overlaps(subnet))
    }

    fn gateway_reachable(&self, gateway: IpAddress) -> bool {
        self.reachable.lock().contains(&gateway)
    }

    fn bridge_subnet(&self, bridge: &str) -> AzoneResult<Option<Subnet>> {
        Ok(self.bridges.lock().get(bridge).copied())
    }
}

pub fn subnet(cidr: &str) -> Subnet {
    cidr.parse().unwrap()
}

pub fn network_config(max_attempts: usize) -> NetworkConfig {
    NetworkConfig {
        max_subnet_attempts: max_attempts,
        probe_host_network: false,
        ..NetworkConfig::default()
    }
}

pub fn scripted_utils(
    host: Arc<FakeHostNetwork>,
    values: impl IntoIterator<Item = u64>,
    max_attempts: usize,
) -> SubnetUtils {
    SubnetUtils::new(
        host,
        Arc::new(ScriptedRandom::new(values)),
        &network_config(max_attempts),
    )
}

/// Manager over `data_dir` with the default configuration. Every random
/// pick is the lowest free subnet, so zones get 10.97.0.0/24, 10.97.1.0/24, ...
pub fn open_manager(data_dir: &Path) -> AzoneResult<AvailabilityZoneManager> {
    open_manager_with(data_dir, &ZonesConfig::default())
}

pub fn open_manager_with(data_dir: &Path, config: &ZonesConfig) -> AzoneResult<AvailabilityZoneManager> {
    let utils = scripted_utils(Arc::new(FakeHostNetwork::new()), [0], 100);
    AvailabilityZoneManager::new(data_dir, config, &utils)
}

/// Initialize tracing output for a test run; safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("azone_core=debug")
        .with_test_writer()
        .try_init();
}
