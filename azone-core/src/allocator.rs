//! Sequential child-subnet allocator
//!
//! Hands out the `/child_prefix` subnets of a parent one after the other in
//! increasing address order. The sequence is fully determined by the parent
//! and child prefix, so replaying the same number of calls reproduces the same
//! subnets.

use tracing::debug;

use crate::error::{AzoneError, AzoneResult};
use crate::subnet::Subnet;

#[derive(Debug, Clone)]
pub struct SubnetAllocator {
    parent: Subnet,
    child_prefix: u8,
    next_index: u64,
}

impl SubnetAllocator {
    pub fn new(parent: Subnet, child_prefix: u8) -> AzoneResult<Self> {
        if child_prefix > 32 {
            return Err(AzoneError::PrefixLengthOutOfRange {
                prefix: child_prefix.to_string(),
            });
        }
        if child_prefix <= parent.prefix_length() {
            return Err(AzoneError::InvalidOperation {
                operation: "create subnet allocator".to_string(),
                reason: format!(
                    "child prefix /{} must be more specific than parent {}",
                    child_prefix, parent
                ),
            });
        }

        Ok(Self {
            parent,
            child_prefix,
            next_index: 0,
        })
    }

    pub fn parent(&self) -> Subnet {
        self.parent
    }

    pub fn child_prefix(&self) -> u8 {
        self.child_prefix
    }

    /// Number of subnets handed out so far.
    pub fn allocated(&self) -> u64 {
        self.next_index
    }

    pub fn remaining(&self) -> u64 {
        self.parent
            .size(self.child_prefix)
            .saturating_sub(self.next_index)
    }

    /// Returns the next child subnet.
    ///
    /// Fails with [`AzoneError::SubnetsExhausted`] once every child has been
    /// handed out, and with a prefix error if the child prefix itself is not
    /// a supported subnet size.
    pub fn next_available(&mut self) -> AzoneResult<Subnet> {
        if self.remaining() == 0 {
            return Err(AzoneError::SubnetsExhausted {
                parent: self.parent.canonical().to_string(),
                child_prefix: self.child_prefix,
            });
        }

        let subnet = self.parent.nth_child(self.child_prefix, self.next_index)?;
        self.next_index += 1;
        debug!("Allocated subnet {} from {}", subnet, self.parent);
        Ok(subnet)
    }
}
