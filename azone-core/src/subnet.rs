//! CIDR-aware IPv4 subnet value type
//!
//! A `Subnet` keeps the address exactly as it was supplied, host bits
//! included, so that `to_cidr()` round-trips the original literal. Everything
//! derived from it (network, broadcast, usable host range) is computed from
//! the masked address. Prefix lengths 31 and 32 are rejected: with the first
//! and last address of every subnet reserved they leave no usable hosts.

use ipnet::Ipv4Net;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{AzoneError, AzoneResult};
use crate::ip::IpAddress;

/// Largest prefix length this crate accepts.
pub const MAX_PREFIX_LENGTH: u8 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subnet {
    address: IpAddress,
    prefix_length: u8,
}

impl Subnet {
    pub fn new(address: IpAddress, prefix_length: u8) -> AzoneResult<Self> {
        if prefix_length > MAX_PREFIX_LENGTH {
            return Err(AzoneError::PrefixLengthOutOfRange {
                prefix: prefix_length.to_string(),
            });
        }

        Ok(Self {
            address,
            prefix_length,
        })
    }

    /// Const constructor for compile-time constants; panics on a bad prefix.
    pub const fn new_assert(address: IpAddress, prefix_length: u8) -> Self {
        assert!(prefix_length <= MAX_PREFIX_LENGTH, "prefix length out of range");
        Self {
            address,
            prefix_length,
        }
    }

    /// The address as supplied, not necessarily the network address.
    pub fn address(&self) -> IpAddress {
        self.address
    }

    pub fn prefix_length(&self) -> u8 {
        self.prefix_length
    }

    pub fn subnet_mask(&self) -> IpAddress {
        IpAddress::new(mask_for(self.prefix_length))
    }

    pub fn masked_address(&self) -> IpAddress {
        IpAddress::new(self.address.as_u32() & mask_for(self.prefix_length))
    }

    pub fn broadcast_address(&self) -> IpAddress {
        IpAddress::new(self.masked_address().as_u32() | !mask_for(self.prefix_length))
    }

    /// First usable host address (network address + 1).
    pub fn min_address(&self) -> IpAddress {
        self.masked_address() + 1
    }

    /// Last usable host address (broadcast address - 1).
    pub fn max_address(&self) -> IpAddress {
        self.broadcast_address() - 1
    }

    pub fn usable_address_count(&self) -> u64 {
        block_size(self.prefix_length).saturating_sub(2)
    }

    /// Number of `/other_prefix` subnets that fit inside this one.
    ///
    /// Zero when `other_prefix` is less specific than this subnet or is not a
    /// valid IPv4 prefix at all.
    pub fn size(&self, other_prefix: u8) -> u64 {
        if other_prefix < self.prefix_length || other_prefix > 32 {
            return 0;
        }
        1u64 << (other_prefix - self.prefix_length)
    }

    /// The same network with the host bits of the address cleared.
    pub fn canonical(&self) -> Subnet {
        Subnet {
            address: self.masked_address(),
            prefix_length: self.prefix_length,
        }
    }

    /// The original address and prefix, e.g. `192.168.0.1/16`.
    ///
    /// Use `canonical().to_cidr()` for the network form.
    pub fn to_cidr(&self) -> String {
        format!("{}/{}", self.address, self.prefix_length)
    }

    /// True if the whole usable range of `other` lies within this subnet.
    pub fn contains(&self, other: &Subnet) -> bool {
        other.min_address() >= self.masked_address()
            && other.max_address() <= self.broadcast_address()
    }

    /// True if `ip` is a usable host address of this subnet. The network and
    /// broadcast addresses are not contained.
    pub fn contains_address(&self, ip: IpAddress) -> bool {
        self.min_address() <= ip && ip <= self.max_address()
    }

    /// True if the two address ranges share at least one address.
    pub fn overlaps(&self, other: &Subnet) -> bool {
        self.masked_address() <= other.broadcast_address()
            && other.masked_address() <= self.broadcast_address()
    }

    /// The `index`-th `/child_prefix` subnet inside this one, in address order.
    pub(crate) fn nth_child(&self, child_prefix: u8, index: u64) -> AzoneResult<Subnet> {
        if index >= self.size(child_prefix) {
            return Err(AzoneError::InvalidOperation {
                operation: "nth_child".to_string(),
                reason: format!(
                    "index {} is past the last /{} subnet of {}",
                    index,
                    child_prefix,
                    self.canonical()
                ),
            });
        }

        // index < 2^(child - parent) and the block is 2^(32 - child), so the
        // product stays below 2^(32 - parent) and fits in a u32.
        let offset = index * block_size(child_prefix);
        Subnet::new(self.masked_address() + offset as u32, child_prefix)
    }
}

fn mask_for(prefix_length: u8) -> u32 {
    if prefix_length == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(prefix_length))
    }
}

fn block_size(prefix_length: u8) -> u64 {
    1u64 << (32 - u32::from(prefix_length))
}

fn parse_prefix(input: &str, text: &str) -> AzoneResult<u8> {
    let out_of_range = || AzoneError::PrefixLengthOutOfRange {
        prefix: text.to_string(),
    };

    let digits = text.strip_prefix('-').unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AzoneError::InvalidCidr {
            input: input.to_string(),
            reason: "prefix length must be a number".to_string(),
        });
    }
    if digits.len() != text.len() {
        return Err(out_of_range());
    }

    // Anything too long for a u64 is certainly out of range too.
    let value: u64 = digits.parse().map_err(|_| out_of_range())?;
    if value > u64::from(MAX_PREFIX_LENGTH) {
        return Err(out_of_range());
    }
    Ok(value as u8)
}

impl FromStr for Subnet {
    type Err = AzoneError;

    fn from_str(s: &str) -> AzoneResult<Self> {
        let (address_text, prefix_text) = s.split_once('/').ok_or_else(|| AzoneError::InvalidCidr {
            input: s.to_string(),
            reason: "expected <address>/<prefix length>".to_string(),
        })?;

        let address = address_text.parse::<IpAddress>().map_err(|e| AzoneError::InvalidCidr {
            input: s.to_string(),
            reason: e.to_string(),
        })?;
        let prefix_length = parse_prefix(s, prefix_text)?;

        Subnet::new(address, prefix_length)
    }
}

impl fmt::Display for Subnet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix_length)
    }
}

/// Orders by network address, then prefix length, then the raw address so
/// the order agrees with equality.
impl Ord for Subnet {
    fn cmp(&self, other: &Self) -> Ordering {
        self.masked_address()
            .cmp(&other.masked_address())
            .then(self.prefix_length.cmp(&other.prefix_length))
            .then(self.address.cmp(&other.address))
    }
}

impl PartialOrd for Subnet {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl TryFrom<Ipv4Net> for Subnet {
    type Error = AzoneError;

    fn try_from(net: Ipv4Net) -> AzoneResult<Self> {
        Subnet::new(net.addr().into(), net.prefix_len())
    }
}

impl Serialize for Subnet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Subnet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
