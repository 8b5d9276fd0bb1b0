//! Shared identifier types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a virtual machine.
///
/// Zones record membership by name only; the VM object itself is owned and
/// resolved elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VmName(String);

impl VmName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VmName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VmName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for VmName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl AsRef<str> for VmName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A VM's own record of which zone it was placed in.
///
/// VMs created before zones existed have no zone recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmZoneRecord {
    pub vm: VmName,
    pub zone: Option<String>,
}

impl VmZoneRecord {
    pub fn new(vm: impl Into<VmName>, zone: Option<&str>) -> Self {
        Self {
            vm: vm.into(),
            zone: zone.map(str::to_string),
        }
    }
}
