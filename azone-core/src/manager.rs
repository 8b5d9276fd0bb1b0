//! Availability zone manager
//!
//! Owns the fixed set of configured zones and the round-robin cursor used
//! for automatic zone selection. Layout under the data directory:
//!
//! - `<data_dir>/<zones_dir>/<manager file>`: `{"last_used": "<zone>"}`
//! - `<data_dir>/<zones_dir>/<zone>.json`: one record per zone
//!
//! The zone list never changes after construction, so lookups need no
//! locking. The cursor has its own lock, taken before any zone lock and never
//! the other way round.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::allocator::SubnetAllocator;
use crate::common::{ensure_directory, file_exists, read_json, write_json_atomic};
use crate::config::{SubnetStrategy, ZonesConfig};
use crate::error::{AzoneError, AzoneResult};
use crate::subnet::Subnet;
use crate::subnet_utils::SubnetUtils;
use crate::types::{VmName, VmZoneRecord};
use crate::zone::AvailabilityZone;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ManagerRecord {
    last_used: String,
}

#[derive(Debug)]
pub struct AvailabilityZoneManager {
    zones: Vec<AvailabilityZone>,
    zones_dir: PathBuf,
    manager_file: PathBuf,
    default_zone: String,
    /// Name of the zone most recently handed out by round-robin
    last_used: Mutex<String>,
}

impl AvailabilityZoneManager {
    /// Open the zone state under `data_dir`, creating it on first use.
    ///
    /// Existing state that cannot be read or is inconsistent with the
    /// configuration is an error; nothing is regenerated over it.
    pub fn new(data_dir: &Path, config: &ZonesConfig, subnet_utils: &SubnetUtils) -> AzoneResult<Self> {
        config.validate()?;

        let zones_dir = data_dir.join(&config.zones_dir_name);
        let manager_file = zones_dir.join(&config.manager_file_name);
        let default_zone = config
            .default_zone_name()
            .ok_or_else(|| AzoneError::Configuration {
                message: "zone_names cannot be empty".to_string(),
            })?
            .to_string();

        ensure_directory(&zones_dir)?;

        let (zones, last_used) = if file_exists(&manager_file) {
            Self::restore(config, &zones_dir, &manager_file)?
        } else {
            Self::bootstrap(config, &zones_dir, &manager_file, subnet_utils)?
        };

        info!(
            "Availability zone manager ready with {} zones in {:?} (last used: {})",
            zones.len(),
            zones_dir,
            last_used
        );

        Ok(Self {
            zones,
            zones_dir,
            manager_file,
            default_zone,
            last_used: Mutex::new(last_used),
        })
    }

    fn restore(
        config: &ZonesConfig,
        zones_dir: &Path,
        manager_file: &Path,
    ) -> AzoneResult<(Vec<AvailabilityZone>, String)> {
        debug!("Restoring availability zones from {:?}", zones_dir);

        let record: ManagerRecord = read_json(manager_file, "availability zone manager record")?;
        if !config.zone_names.contains(&record.last_used) {
            return Err(AzoneError::corrupt(
                manager_file,
                format!("last used zone '{}' is not a configured zone", record.last_used),
            ));
        }

        let zones = config
            .zone_names
            .iter()
            .map(|name| AvailabilityZone::load(name, zones_dir))
            .collect::<AzoneResult<Vec<_>>>()?;
        check_disjoint(&zones)?;

        Ok((zones, record.last_used))
    }

    fn bootstrap(
        config: &ZonesConfig,
        zones_dir: &Path,
        manager_file: &Path,
        subnet_utils: &SubnetUtils,
    ) -> AzoneResult<(Vec<AvailabilityZone>, String)> {
        info!(
            "Creating {} availability zones in {} ({:?} /{} subnets)",
            config.zone_names.len(),
            config.address_range,
            config.subnet_strategy,
            config.subnet_prefix_length
        );

        // Zones left behind by an interrupted bootstrap keep their subnets.
        let mut restored = Vec::with_capacity(config.zone_names.len());
        for name in &config.zone_names {
            let zone = if file_exists(AvailabilityZone::record_path(zones_dir, name)) {
                let zone = AvailabilityZone::load(name, zones_dir)?;
                warn!("Reusing existing record for zone {} ({})", name, zone.subnet());
                Some(zone)
            } else {
                None
            };
            restored.push(zone);
        }

        for zone in restored.iter().flatten() {
            let subnet = zone.subnet();
            if subnet.prefix_length() != config.subnet_prefix_length
                || !config.address_range.contains(&subnet)
            {
                return Err(AzoneError::corrupt(
                    zone.file_path(),
                    format!(
                        "subnet {} of zone {} is not a /{} subnet of {}",
                        subnet,
                        zone.name(),
                        config.subnet_prefix_length,
                        config.address_range
                    ),
                ));
            }
        }
        check_disjoint(restored.iter().flatten())?;

        let mut taken: Vec<Subnet> = restored.iter().flatten().map(|z| z.subnet()).collect();
        let mut allocator = match config.subnet_strategy {
            SubnetStrategy::Sequential => Some(SubnetAllocator::new(
                config.address_range,
                config.subnet_prefix_length,
            )?),
            SubnetStrategy::Random => None,
        };

        let mut zones = Vec::with_capacity(config.zone_names.len());
        for (name, existing) in config.zone_names.iter().zip(restored) {
            let zone = match existing {
                Some(zone) => zone,
                None => {
                    let subnet = match allocator.as_mut() {
                        Some(allocator) => next_free_subnet(allocator, &taken)?,
                        None => subnet_utils.generate_random_subnet_excluding(
                            config.subnet_prefix_length,
                            &config.address_range,
                            &taken,
                        )?,
                    };
                    taken.push(subnet);
                    AvailabilityZone::create(name, subnet, zones_dir)?
                }
            };
            zones.push(zone);
        }

        // Start the cursor on the last zone so the first automatic pick is the
        // first zone.
        let last_used = config
            .zone_names
            .last()
            .cloned()
            .ok_or_else(|| AzoneError::Configuration {
                message: "zone_names cannot be empty".to_string(),
            })?;
        write_json_atomic(
            manager_file,
            &ManagerRecord {
                last_used: last_used.clone(),
            },
            "availability zone manager record",
        )?;

        Ok((zones, last_used))
    }

    /// The zone called `name`.
    pub fn get_zone(&self, name: &str) -> AzoneResult<&AvailabilityZone> {
        self.zones
            .iter()
            .find(|zone| zone.name() == name)
            .ok_or_else(|| AzoneError::ZoneNotFound {
                name: name.to_string(),
            })
    }

    /// All zones in configured order.
    pub fn get_zones(&self) -> &[AvailabilityZone] {
        &self.zones
    }

    pub fn zone_names(&self) -> Vec<&str> {
        self.zones.iter().map(AvailabilityZone::name).collect()
    }

    /// All zones ordered by subnet.
    pub fn zones_by_subnet(&self) -> Vec<&AvailabilityZone> {
        let mut zones: Vec<&AvailabilityZone> = self.zones.iter().collect();
        zones.sort_by_key(|zone| zone.subnet());
        zones
    }

    /// Advance the round-robin cursor to the next available zone and return
    /// its name.
    ///
    /// Unavailable zones are skipped. If none is available the cursor stays
    /// where it is and [`AzoneError::NoZoneAvailable`] is returned.
    pub fn get_automatic_zone_name(&self) -> AzoneResult<String> {
        let mut last_used = self.last_used.lock();
        let count = self.zones.len();
        let current = self
            .zones
            .iter()
            .position(|zone| zone.name() == last_used.as_str())
            .unwrap_or(count - 1);

        for step in 1..=count {
            let zone = &self.zones[(current + step) % count];
            if !zone.is_available() {
                debug!("Skipping unavailable zone {} in round-robin", zone.name());
                continue;
            }

            let name = zone.name().to_string();
            write_json_atomic(
                &self.manager_file,
                &ManagerRecord {
                    last_used: name.clone(),
                },
                "availability zone manager record",
            )?;
            *last_used = name.clone();
            debug!("Round-robin selected zone {}", name);
            return Ok(name);
        }

        warn!("Automatic zone selection failed: all {} zones are unavailable", count);
        Err(AzoneError::NoZoneAvailable)
    }

    /// The zone for VMs that have none recorded. Constant for the lifetime of
    /// the manager.
    pub fn get_default_zone_name(&self) -> &str {
        &self.default_zone
    }

    /// Name of the zone most recently handed out by round-robin.
    pub fn last_used_zone_name(&self) -> String {
        self.last_used.lock().clone()
    }

    /// The zone `vm` is registered in, if any.
    pub fn find_zone_of_vm(&self, vm: &VmName) -> Option<&AvailabilityZone> {
        self.zones.iter().find(|zone| zone.has_vm(vm))
    }

    /// Re-register VMs into the zones their own records name.
    ///
    /// VMs with no recorded zone go to the default zone. Every record is
    /// resolved before any VM is registered, so an unknown zone leaves
    /// membership untouched. Returns the number of VMs newly registered.
    pub fn restore_memberships<I>(&self, records: I) -> AzoneResult<usize>
    where
        I: IntoIterator<Item = VmZoneRecord>,
    {
        let mut resolved = Vec::new();
        for record in records {
            let zone_name = record.zone.as_deref().unwrap_or(&self.default_zone);
            resolved.push((self.get_zone(zone_name)?, record.vm));
        }

        let mut added = 0;
        for (zone, vm) in &resolved {
            if zone.add_vm(vm) {
                added += 1;
            }
        }
        info!("Restored zone membership for {} of {} VMs", added, resolved.len());
        Ok(added)
    }

    pub fn zones_dir(&self) -> &Path {
        &self.zones_dir
    }

    pub fn manager_file(&self) -> &Path {
        &self.manager_file
    }
}

/// Fails with `CorruptState` if any two zones share address space.
fn check_disjoint<'a>(zones: impl IntoIterator<Item = &'a AvailabilityZone>) -> AzoneResult<()> {
    let mut seen: Vec<&AvailabilityZone> = Vec::new();
    for zone in zones {
        if let Some(other) = seen.iter().find(|z| z.subnet().overlaps(&zone.subnet())) {
            return Err(AzoneError::corrupt(
                zone.file_path(),
                format!(
                    "subnet {} of zone {} overlaps subnet {} of zone {}",
                    zone.subnet(),
                    zone.name(),
                    other.subnet(),
                    other.name()
                ),
            ));
        }
        seen.push(zone);
    }
    Ok(())
}

fn next_free_subnet(allocator: &mut SubnetAllocator, taken: &[Subnet]) -> AzoneResult<Subnet> {
    loop {
        let candidate = allocator.next_available()?;
        if !taken.iter().any(|t| t.overlaps(&candidate)) {
            return Ok(candidate);
        }
        debug!("Sequential candidate {} is already taken", candidate);
    }
}
