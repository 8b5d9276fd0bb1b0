//! Subnet selection against live host state
//!
//! Picks random free subnets inside a range, rejecting candidates that are
//! already configured on a local interface or whose gateway answers, and
//! resolves the subnet a bridge is (or should be) using.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::abstractions::{HostNetwork, NoopHostNetwork, RandomSource, ThreadRandom};
use crate::common::{file_exists, read_json, write_json_atomic};
use crate::config::NetworkConfig;
use crate::error::{AzoneError, AzoneResult};
use crate::subnet::Subnet;

/// On-disk record of the subnet assigned to a bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BridgeSubnetRecord {
    bridge: String,
    subnet: Subnet,
}

pub struct SubnetUtils {
    host: Arc<dyn HostNetwork>,
    random: Arc<dyn RandomSource>,
    max_attempts: usize,
    bridge_range: Subnet,
    bridge_prefix_length: u8,
}

impl SubnetUtils {
    pub fn new(
        host: Arc<dyn HostNetwork>,
        random: Arc<dyn RandomSource>,
        config: &NetworkConfig,
    ) -> Self {
        Self {
            host,
            random,
            max_attempts: config.max_subnet_attempts,
            bridge_range: config.bridge_range,
            bridge_prefix_length: config.bridge_prefix_length,
        }
    }

    /// Thread RNG and no host probing.
    pub fn unprobed(config: &NetworkConfig) -> Self {
        Self::new(Arc::new(NoopHostNetwork), Arc::new(ThreadRandom), config)
    }

    pub fn host(&self) -> &dyn HostNetwork {
        self.host.as_ref()
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// A random `/prefix_length` subnet of `range` that the host is not
    /// already using.
    pub fn generate_random_subnet(&self, prefix_length: u8, range: &Subnet) -> AzoneResult<Subnet> {
        self.generate_random_subnet_excluding(prefix_length, range, &[])
    }

    /// Like [`generate_random_subnet`](Self::generate_random_subnet), but
    /// only subnets that overlap nothing in `taken` are candidates.
    ///
    /// The pick is uniform over the free children of `range`, so taken
    /// subnets never count against the attempt budget; only host collisions
    /// do.
    pub fn generate_random_subnet_excluding(
        &self,
        prefix_length: u8,
        range: &Subnet,
        taken: &[Subnet],
    ) -> AzoneResult<Subnet> {
        let count = range.size(prefix_length);
        if count == 0 {
            return Err(AzoneError::InvalidOperation {
                operation: "generate random subnet".to_string(),
                reason: format!(
                    "a /{} subnet does not fit in {}",
                    prefix_length,
                    range.canonical()
                ),
            });
        }

        // Unsupported prefixes fail here rather than after probing the host.
        range.nth_child(prefix_length, 0)?;

        let blocked = taken_child_ranges(range, prefix_length, taken);
        let blocked_count: u64 = blocked.iter().map(|(lo, hi)| hi - lo + 1).sum();
        let free = count - blocked_count;
        if free == 0 {
            return Err(AzoneError::SubnetsExhausted {
                parent: range.canonical().to_string(),
                child_prefix: prefix_length,
            });
        }

        for attempt in 1..=self.max_attempts {
            let rank = self.random.random_int(0, free - 1).min(free - 1);
            let candidate = range.nth_child(prefix_length, free_index(rank, &blocked))?;

            if self.host.subnet_in_use(&candidate) {
                debug!("Candidate {} is in use on this host (attempt {})", candidate, attempt);
                continue;
            }
            if self.host.gateway_reachable(candidate.min_address()) {
                debug!(
                    "Gateway {} of candidate {} is reachable (attempt {})",
                    candidate.min_address(),
                    candidate,
                    attempt
                );
                continue;
            }

            info!("Selected subnet {} after {} attempt(s)", candidate, attempt);
            return Ok(candidate);
        }

        warn!(
            "Gave up looking for a free /{} subnet in {} after {} attempts",
            prefix_length, range, self.max_attempts
        );
        Err(AzoneError::SubnetGenerationFailed {
            range: range.canonical().to_string(),
            prefix_length,
            attempts: self.max_attempts,
        })
    }

    /// The subnet `bridge_name` uses.
    ///
    /// The bridge's live configuration wins and is recorded under
    /// `network_dir`. Without one, the recorded subnet is returned, and
    /// failing that a fresh subnet is generated and recorded.
    pub fn get_subnet(&self, network_dir: &Path, bridge_name: &str) -> AzoneResult<Subnet> {
        if bridge_name.is_empty() || bridge_name.contains('/') || bridge_name.starts_with('.') {
            return Err(AzoneError::InvalidOperation {
                operation: "get bridge subnet".to_string(),
                reason: format!("invalid bridge name '{}'", bridge_name),
            });
        }

        let record_path = network_dir.join(format!("{}-subnet.json", bridge_name));

        if let Some(live) = self.host.bridge_subnet(bridge_name)? {
            let live = live.canonical();
            let recorded = if file_exists(&record_path) {
                read_json::<BridgeSubnetRecord, _>(&record_path, "bridge subnet record")
                    .ok()
                    .map(|record| record.subnet)
            } else {
                None
            };

            if recorded != Some(live) {
                info!("Bridge {} is configured with {}, recording it", bridge_name, live);
                self.write_record(&record_path, bridge_name, live)?;
            }
            return Ok(live);
        }

        if file_exists(&record_path) {
            let record: BridgeSubnetRecord = read_json(&record_path, "bridge subnet record")?;
            if record.bridge != bridge_name {
                return Err(AzoneError::corrupt(
                    &record_path,
                    format!(
                        "record belongs to bridge '{}', expected '{}'",
                        record.bridge, bridge_name
                    ),
                ));
            }
            debug!("Using recorded subnet {} for bridge {}", record.subnet, bridge_name);
            return Ok(record.subnet);
        }

        let subnet = self.generate_random_subnet(self.bridge_prefix_length, &self.bridge_range)?;
        info!("Assigned new subnet {} to bridge {}", subnet, bridge_name);
        self.write_record(&record_path, bridge_name, subnet)?;
        Ok(subnet)
    }

    fn write_record(&self, path: &Path, bridge: &str, subnet: Subnet) -> AzoneResult<()> {
        let record = BridgeSubnetRecord {
            bridge: bridge.to_string(),
            subnet,
        };
        write_json_atomic(path, &record, "bridge subnet record")
    }
}

/// Child indices of `range` at `prefix_length` that overlap any of `taken`,
/// as sorted, merged, inclusive `(first, last)` ranges.
fn taken_child_ranges(range: &Subnet, prefix_length: u8, taken: &[Subnet]) -> Vec<(u64, u64)> {
    let base = u64::from(range.masked_address().as_u32());
    let top = u64::from(range.broadcast_address().as_u32());
    let shift = 32 - u32::from(prefix_length);

    let mut blocked: Vec<(u64, u64)> = taken
        .iter()
        .filter(|t| t.overlaps(range))
        .map(|t| {
            let first = u64::from(t.masked_address().as_u32()).max(base);
            let last = u64::from(t.broadcast_address().as_u32()).min(top);
            ((first - base) >> shift, (last - base) >> shift)
        })
        .collect();
    blocked.sort_unstable();

    let mut merged: Vec<(u64, u64)> = Vec::with_capacity(blocked.len());
    for (first, last) in blocked {
        match merged.last_mut() {
            Some((_, end)) if first <= *end + 1 => *end = (*end).max(last),
            _ => merged.push((first, last)),
        }
    }
    merged
}

/// The child index of the `rank`-th free child, skipping `blocked`.
fn free_index(rank: u64, blocked: &[(u64, u64)]) -> u64 {
    let mut index = rank;
    for (first, last) in blocked {
        if index < *first {
            break;
        }
        index += last - first + 1;
    }
    index
}

impl std::fmt::Debug for SubnetUtils {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubnetUtils")
            .field("max_attempts", &self.max_attempts)
            .field("bridge_range", &self.bridge_range)
            .field("bridge_prefix_length", &self.bridge_prefix_length)
            .finish_non_exhaustive()
    }
}
