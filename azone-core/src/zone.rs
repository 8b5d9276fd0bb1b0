//! Availability zone record
//!
//! A zone's name and subnet are fixed for its lifetime. Availability and VM
//! membership change at runtime behind the zone's own lock. Availability is
//! written through to `<zones_dir>/<name>.json` on every change; membership
//! is in-memory only and rebuilt from the VMs' own records at startup.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::common::{read_json, write_json_atomic};
use crate::error::{AzoneError, AzoneResult};
use crate::subnet::Subnet;
use crate::types::VmName;

/// Persisted form of a zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneRecord {
    pub name: String,
    pub subnet: Subnet,
    pub available: bool,
}

#[derive(Debug)]
struct ZoneState {
    available: bool,
    vms: BTreeSet<VmName>,
}

#[derive(Debug)]
pub struct AvailabilityZone {
    name: String,
    subnet: Subnet,
    file_path: PathBuf,
    state: Mutex<ZoneState>,
}

impl AvailabilityZone {
    /// Path of the record for zone `name` inside `zones_dir`.
    pub fn record_path(zones_dir: &Path, name: &str) -> PathBuf {
        zones_dir.join(format!("{}.json", name))
    }

    /// Create a new, available zone and persist it.
    pub fn create(name: &str, subnet: Subnet, zones_dir: &Path) -> AzoneResult<Self> {
        let zone = Self::from_record(
            ZoneRecord {
                name: name.to_string(),
                subnet,
                available: true,
            },
            Self::record_path(zones_dir, name),
        );

        zone.persist(true)?;
        info!("Created availability zone {} with subnet {}", zone.name, zone.subnet);
        Ok(zone)
    }

    /// Restore zone `name` from its record in `zones_dir`.
    pub fn load(name: &str, zones_dir: &Path) -> AzoneResult<Self> {
        let file_path = Self::record_path(zones_dir, name);
        let record: ZoneRecord = read_json(&file_path, "availability zone record")?;

        if record.name != name {
            return Err(AzoneError::corrupt(
                &file_path,
                format!("record is for zone '{}', expected '{}'", record.name, name),
            ));
        }

        debug!(
            "Restored availability zone {} (subnet {}, available: {})",
            record.name, record.subnet, record.available
        );
        Ok(Self::from_record(record, file_path))
    }

    fn from_record(record: ZoneRecord, file_path: PathBuf) -> Self {
        Self {
            name: record.name,
            subnet: record.subnet,
            file_path,
            state: Mutex::new(ZoneState {
                available: record.available,
                vms: BTreeSet::new(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn subnet(&self) -> Subnet {
        self.subnet
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn is_available(&self) -> bool {
        self.state.lock().available
    }

    /// Mark the zone available or unavailable.
    ///
    /// The new value is on disk before it becomes visible in memory; if the
    /// write fails the zone keeps its previous value. Member VMs are not
    /// touched.
    pub fn set_available(&self, available: bool) -> AzoneResult<()> {
        let mut state = self.state.lock();
        if state.available == available {
            return Ok(());
        }

        self.persist(available)?;
        state.available = available;
        info!("Availability zone {} is now {}", self.name, availability_label(available));
        Ok(())
    }

    /// Register `vm` as placed in this zone. Returns false if it already was.
    pub fn add_vm(&self, vm: &VmName) -> bool {
        let added = self.state.lock().vms.insert(vm.clone());
        if added {
            debug!("Added VM {} to availability zone {}", vm, self.name);
        }
        added
    }

    /// Unregister `vm`. Returns false if it was not registered.
    pub fn remove_vm(&self, vm: &VmName) -> bool {
        let removed = self.state.lock().vms.remove(vm);
        if removed {
            debug!("Removed VM {} from availability zone {}", vm, self.name);
        }
        removed
    }

    pub fn has_vm(&self, vm: &VmName) -> bool {
        self.state.lock().vms.contains(vm)
    }

    /// Registered VMs in name order.
    pub fn vms(&self) -> Vec<VmName> {
        self.state.lock().vms.iter().cloned().collect()
    }

    pub fn vm_count(&self) -> usize {
        self.state.lock().vms.len()
    }

    /// Snapshot of what is persisted for this zone.
    pub fn record(&self) -> ZoneRecord {
        ZoneRecord {
            name: self.name.clone(),
            subnet: self.subnet,
            available: self.is_available(),
        }
    }

    // Callers either hold the state lock or own the zone exclusively.
    fn persist(&self, available: bool) -> AzoneResult<()> {
        let record = ZoneRecord {
            name: self.name.clone(),
            subnet: self.subnet,
            available,
        };
        write_json_atomic(&self.file_path, &record, "availability zone record")
    }
}

fn availability_label(available: bool) -> &'static str {
    if available {
        "available"
    } else {
        "unavailable"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn subnet(s: &str) -> Subnet {
        s.parse().unwrap()
    }

    #[test]
    fn test_create_persists_record() {
        let dir = TempDir::new().unwrap();
        let zone = AvailabilityZone::create("zone1", subnet("10.97.4.0/24"), dir.path()).unwrap();

        assert_eq!(zone.name(), "zone1");
        assert_eq!(zone.subnet(), subnet("10.97.4.0/24"));
        assert!(zone.is_available());

        let json = std::fs::read_to_string(dir.path().join("zone1.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"name": "zone1", "subnet": "10.97.4.0/24", "available": true})
        );
    }

    #[test]
    fn test_set_available_survives_reload() {
        let dir = TempDir::new().unwrap();
        let zone = AvailabilityZone::create("zone2", subnet("10.97.5.0/24"), dir.path()).unwrap();

        zone.set_available(false).unwrap();
        assert!(!zone.is_available());

        let reloaded = AvailabilityZone::load("zone2", dir.path()).unwrap();
        assert!(!reloaded.is_available());
        assert_eq!(reloaded.record(), zone.record());
    }

    #[test]
    fn test_failed_persist_keeps_previous_value() {
        let dir = TempDir::new().unwrap();
        let zones_dir = dir.path().join("azs");
        let zone = AvailabilityZone::create("zone1", subnet("10.97.6.0/24"), &zones_dir).unwrap();

        // Replace the zones directory with a plain file so the write fails.
        std::fs::remove_dir_all(&zones_dir).unwrap();
        std::fs::write(&zones_dir, b"not a directory").unwrap();

        let err = zone.set_available(false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Persistence);
        assert!(zone.is_available());
    }

    #[test]
    fn test_membership_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let zone = AvailabilityZone::create("zone1", subnet("10.97.7.0/24"), dir.path()).unwrap();
        let vm = VmName::from("primary");

        assert!(zone.add_vm(&vm));
        assert!(!zone.add_vm(&vm));
        assert_eq!(zone.vm_count(), 1);
        assert!(zone.has_vm(&vm));

        assert!(zone.remove_vm(&vm));
        assert!(!zone.remove_vm(&vm));
        assert_eq!(zone.vm_count(), 0);
    }

    #[test]
    fn test_membership_is_not_persisted() {
        let dir = TempDir::new().unwrap();
        let zone = AvailabilityZone::create("zone1", subnet("10.97.8.0/24"), dir.path()).unwrap();
        zone.add_vm(&VmName::from("web"));

        let reloaded = AvailabilityZone::load("zone1", dir.path()).unwrap();
        assert_eq!(reloaded.vm_count(), 0);
    }

    #[test]
    fn test_unavailable_zone_keeps_members() {
        let dir = TempDir::new().unwrap();
        let zone = AvailabilityZone::create("zone1", subnet("10.97.9.0/24"), dir.path()).unwrap();
        zone.add_vm(&VmName::from("a"));
        zone.add_vm(&VmName::from("b"));

        zone.set_available(false).unwrap();
        assert_eq!(zone.vms(), vec![VmName::from("a"), VmName::from("b")]);
    }

    #[test]
    fn test_load_rejects_mismatched_name() {
        let dir = TempDir::new().unwrap();
        AvailabilityZone::create("zone1", subnet("10.97.1.0/24"), dir.path()).unwrap();
        std::fs::copy(dir.path().join("zone1.json"), dir.path().join("zone2.json")).unwrap();

        let err = AvailabilityZone::load("zone2", dir.path()).unwrap_err();
        assert!(matches!(err, AzoneError::CorruptState { .. }));
    }

    #[test]
    fn test_concurrent_toggles_are_serialized() {
        let dir = TempDir::new().unwrap();
        let zone = Arc::new(
            AvailabilityZone::create("zone1", subnet("10.97.10.0/24"), dir.path()).unwrap(),
        );

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let zone = Arc::clone(&zone);
                std::thread::spawn(move || {
                    for _ in 0..10 {
                        zone.set_available(i % 2 == 0).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // Whatever won last, memory and disk agree.
        let reloaded = AvailabilityZone::load("zone1", dir.path()).unwrap();
        assert_eq!(reloaded.is_available(), zone.is_available());
    }
}
