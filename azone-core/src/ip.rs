//! IPv4 address value type
//!
//! A thin wrapper over the big-endian `u32` form of an address. Ordering is
//! the natural unsigned integer order, which is what subnet arithmetic needs.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::net::Ipv4Addr;
use std::ops::{Add, Sub};
use std::str::FromStr;

use crate::error::{AzoneError, AzoneResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct IpAddress(u32);

impl IpAddress {
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    pub const fn from_octets(octets: [u8; 4]) -> Self {
        Self(u32::from_be_bytes(octets))
    }

    pub const fn as_u32(self) -> u32 {
        self.0
    }

    pub const fn octets(self) -> [u8; 4] {
        self.0.to_be_bytes()
    }

    /// Canonical dotted-decimal form.
    pub fn as_string(self) -> String {
        self.to_string()
    }

    pub fn checked_add(self, offset: u32) -> Option<Self> {
        self.0.checked_add(offset).map(Self)
    }

    pub fn checked_sub(self, offset: u32) -> Option<Self> {
        self.0.checked_sub(offset).map(Self)
    }
}

impl fmt::Display for IpAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.octets();
        write!(f, "{}.{}.{}.{}", a, b, c, d)
    }
}

impl FromStr for IpAddress {
    type Err = AzoneError;

    fn from_str(s: &str) -> AzoneResult<Self> {
        let invalid = |reason: &str| AzoneError::InvalidAddress {
            input: s.to_string(),
            reason: reason.to_string(),
        };

        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 4 {
            return Err(invalid("expected four dot-separated octets"));
        }

        let mut octets = [0u8; 4];
        for (octet, part) in octets.iter_mut().zip(parts) {
            if part.is_empty() || part.len() > 3 || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid("octets must be decimal numbers"));
            }
            // At most three digits, so this cannot overflow a u16.
            let value: u16 = part
                .parse()
                .map_err(|_| invalid("octets must be decimal numbers"))?;
            *octet = u8::try_from(value).map_err(|_| invalid("octets must be in 0-255"))?;
        }

        Ok(Self::from_octets(octets))
    }
}

impl From<u32> for IpAddress {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<IpAddress> for u32 {
    fn from(ip: IpAddress) -> Self {
        ip.0
    }
}

impl From<[u8; 4]> for IpAddress {
    fn from(octets: [u8; 4]) -> Self {
        Self::from_octets(octets)
    }
}

impl From<Ipv4Addr> for IpAddress {
    fn from(ip: Ipv4Addr) -> Self {
        Self(u32::from(ip))
    }
}

impl From<IpAddress> for Ipv4Addr {
    fn from(ip: IpAddress) -> Self {
        Ipv4Addr::from(ip.0)
    }
}

/// Offsets wrap at the ends of the address space; callers stay in range.
impl Add<u32> for IpAddress {
    type Output = IpAddress;

    fn add(self, offset: u32) -> IpAddress {
        IpAddress(self.0.wrapping_add(offset))
    }
}

impl Sub<u32> for IpAddress {
    type Output = IpAddress;

    fn sub(self, offset: u32) -> IpAddress {
        IpAddress(self.0.wrapping_sub(offset))
    }
}

impl Serialize for IpAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for IpAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_parse_and_format() {
        let ip: IpAddress = "192.168.1.10".parse().unwrap();
        assert_eq!(ip.octets(), [192, 168, 1, 10]);
        assert_eq!(ip.as_string(), "192.168.1.10");
        assert_eq!(ip.as_u32(), 0xC0A8_010A);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        let bad = vec![
            "",
            "1.2.3",
            "1.2.3.4.5",
            "1.2.3.256",
            "1..3.4",
            "a.b.c.d",
            "-1.2.3.4",
            "+1.2.3.4",
            "1.2.3.1000",
            " 1.2.3.4",
        ];
        for input in bad {
            let err = input.parse::<IpAddress>().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument, "input {:?}", input);
        }
    }

    #[test]
    fn test_ordering_follows_integer_value() {
        let a: IpAddress = "10.0.0.255".parse().unwrap();
        let b: IpAddress = "10.0.1.0".parse().unwrap();
        assert!(a < b);
        assert_eq!(a + 1, b);
        assert_eq!(b - 1, a);
    }

    #[test]
    fn test_offset_wraps_at_the_top() {
        let top = IpAddress::new(u32::MAX);
        assert_eq!(top + 1, IpAddress::new(0));
        assert_eq!(top.checked_add(1), None);
    }

    #[test]
    fn test_std_conversions() {
        let ip = IpAddress::from_octets([172, 17, 0, 1]);
        let std_ip: Ipv4Addr = ip.into();
        assert_eq!(std_ip, Ipv4Addr::new(172, 17, 0, 1));
        assert_eq!(IpAddress::from(std_ip), ip);
    }

    #[test]
    fn test_serde_as_string() {
        let ip = IpAddress::from_octets([10, 1, 2, 3]);
        assert_eq!(serde_json::to_string(&ip).unwrap(), "\"10.1.2.3\"");
        let back: IpAddress = serde_json::from_str("\"10.1.2.3\"").unwrap();
        assert_eq!(back, ip);
        assert!(serde_json::from_str::<IpAddress>("\"10.1.2\"").is_err());
    }
}
