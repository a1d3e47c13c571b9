//! Extended community attribute value.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

const TYPE_AS2_TRANSITIVE: u8 = 0x00;
const TYPE_IP4_TRANSITIVE: u8 = 0x01;
const SUBTYPE_ROUTE_TARGET: u8 = 0x02;

/// An extended community attribute: a set of 8-byte community values.
///
/// Values are kept sorted and de-duplicated so two communities carrying the
/// same members compare equal regardless of insertion order. That is what
/// lets the attribute store intern attribute sets by value.
///
/// # Examples
///
/// ```
/// use bgp_types::ExtCommunity;
///
/// let comm: ExtCommunity = "target:65000:1 target:10.1.1.1:2".parse().unwrap();
/// assert_eq!(comm.len(), 2);
/// assert_eq!(comm.to_string(), "target:65000:1 target:10.1.1.1:2");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct ExtCommunity {
    values: Vec<u64>,
}

impl ExtCommunity {
    /// Creates a community from raw 8-byte values.
    pub fn new(values: impl IntoIterator<Item = u64>) -> Self {
        let mut values: Vec<u64> = values.into_iter().collect();
        values.sort_unstable();
        values.dedup();
        ExtCommunity { values }
    }

    /// Builds the raw value of a 2-byte-ASN route target.
    pub fn route_target_as2(asn: u16, value: u32) -> u64 {
        let mut data = [0u8; 8];
        data[0] = TYPE_AS2_TRANSITIVE;
        data[1] = SUBTYPE_ROUTE_TARGET;
        data[2..4].copy_from_slice(&asn.to_be_bytes());
        data[4..8].copy_from_slice(&value.to_be_bytes());
        u64::from_be_bytes(data)
    }

    /// Builds the raw value of an IPv4-address route target.
    pub fn route_target_ipv4(addr: Ipv4Addr, value: u16) -> u64 {
        let mut data = [0u8; 8];
        data[0] = TYPE_IP4_TRANSITIVE;
        data[1] = SUBTYPE_ROUTE_TARGET;
        data[2..6].copy_from_slice(&addr.octets());
        data[6..8].copy_from_slice(&value.to_be_bytes());
        u64::from_be_bytes(data)
    }

    /// Returns the raw community values in sorted order.
    pub fn values(&self) -> &[u64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains(&self, value: u64) -> bool {
        self.values.binary_search(&value).is_ok()
    }
}

fn format_value(value: u64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let d = value.to_be_bytes();
    match (d[0], d[1]) {
        (TYPE_AS2_TRANSITIVE, SUBTYPE_ROUTE_TARGET) => {
            let asn = u16::from_be_bytes([d[2], d[3]]);
            let val = u32::from_be_bytes([d[4], d[5], d[6], d[7]]);
            write!(f, "target:{}:{}", asn, val)
        }
        (TYPE_IP4_TRANSITIVE, SUBTYPE_ROUTE_TARGET) => {
            let addr = Ipv4Addr::new(d[2], d[3], d[4], d[5]);
            let val = u16::from_be_bytes([d[6], d[7]]);
            write!(f, "target:{}:{}", addr, val)
        }
        _ => write!(f, "0x{:016x}", value),
    }
}

fn parse_value(s: &str) -> Result<u64, ParseError> {
    let invalid = || ParseError::InvalidExtCommunity(s.to_string());

    if let Some(hex) = s.strip_prefix("0x") {
        return u64::from_str_radix(hex, 16).map_err(|_| invalid());
    }

    let rest = s.strip_prefix("target:").ok_or_else(invalid)?;
    let (admin, value) = rest.rsplit_once(':').ok_or_else(invalid)?;
    if admin.contains('.') {
        let addr: Ipv4Addr = admin.parse().map_err(|_| invalid())?;
        let value: u16 = value.parse().map_err(|_| invalid())?;
        Ok(ExtCommunity::route_target_ipv4(addr, value))
    } else {
        let asn: u16 = admin.parse().map_err(|_| invalid())?;
        let value: u32 = value.parse().map_err(|_| invalid())?;
        Ok(ExtCommunity::route_target_as2(asn, value))
    }
}

impl fmt::Display for ExtCommunity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            format_value(*value, f)?;
        }
        Ok(())
    }
}

impl FromStr for ExtCommunity {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = s
            .split_whitespace()
            .map(parse_value)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ExtCommunity::new(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_values_sorted_and_deduped() {
        let a = ExtCommunity::route_target_as2(65000, 2);
        let b = ExtCommunity::route_target_as2(65000, 1);
        let comm = ExtCommunity::new([a, b, a]);
        assert_eq!(comm.len(), 2);
        assert_eq!(comm.values(), &[b, a]);
        assert_eq!(comm, ExtCommunity::new([b, a]));
    }

    #[test]
    fn test_parse_route_targets() {
        let comm: ExtCommunity = "target:10.1.1.1:2 target:65000:1".parse().unwrap();
        assert!(comm.contains(ExtCommunity::route_target_as2(65000, 1)));
        assert!(comm.contains(ExtCommunity::route_target_ipv4(Ipv4Addr::new(10, 1, 1, 1), 2)));
    }

    #[test]
    fn test_parse_raw_value() {
        let comm: ExtCommunity = "0x030c000000000008".parse().unwrap();
        assert_eq!(comm.values(), &[0x030c_0000_0000_0008]);
        assert_eq!(comm.to_string(), "0x030c000000000008");
    }

    #[test]
    fn test_parse_invalid() {
        assert!("target:70000:1".parse::<ExtCommunity>().is_err());
        assert!("origin:1:1".parse::<ExtCommunity>().is_err());
        assert!("0xzz".parse::<ExtCommunity>().is_err());
    }

    #[test]
    fn test_empty() {
        let comm: ExtCommunity = "".parse().unwrap();
        assert!(comm.is_empty());
        assert_eq!(comm, ExtCommunity::default());
    }
}
