//! Route distinguisher type with safe parsing.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

const TYPE_AS2: u16 = 0;
const TYPE_IP4: u16 = 1;
const TYPE_AS4: u16 = 2;

/// An 8-byte route distinguisher (RFC 4364 section 4.2).
///
/// Three encodings are supported:
/// - type 0: 2-byte ASN : 4-byte value (`65000:100`)
/// - type 1: IPv4 address : 2-byte value (`10.1.1.1:5`)
/// - type 2: 4-byte ASN : 2-byte value (`4200000000:7`)
///
/// The all-zero value is the null RD, used for tenant-local identity.
///
/// # Examples
///
/// ```
/// use bgp_types::RouteDistinguisher;
///
/// let rd: RouteDistinguisher = "10.1.1.1:5".parse().unwrap();
/// assert_eq!(rd.to_string(), "10.1.1.1:5");
/// assert!(!rd.is_null());
/// assert!(RouteDistinguisher::NULL.is_null());
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct RouteDistinguisher([u8; 8]);

impl RouteDistinguisher {
    /// The null route distinguisher (all zeros).
    pub const NULL: RouteDistinguisher = RouteDistinguisher([0; 8]);

    /// Creates a type 0 RD from a 2-byte ASN and a 4-byte value.
    pub fn from_as2(asn: u16, value: u32) -> Self {
        let mut data = [0u8; 8];
        data[0..2].copy_from_slice(&TYPE_AS2.to_be_bytes());
        data[2..4].copy_from_slice(&asn.to_be_bytes());
        data[4..8].copy_from_slice(&value.to_be_bytes());
        RouteDistinguisher(data)
    }

    /// Creates a type 1 RD from an IPv4 address and a 2-byte value.
    pub fn from_ipv4(addr: Ipv4Addr, value: u16) -> Self {
        let mut data = [0u8; 8];
        data[0..2].copy_from_slice(&TYPE_IP4.to_be_bytes());
        data[2..6].copy_from_slice(&addr.octets());
        data[6..8].copy_from_slice(&value.to_be_bytes());
        RouteDistinguisher(data)
    }

    /// Creates a type 2 RD from a 4-byte ASN and a 2-byte value.
    pub fn from_as4(asn: u32, value: u16) -> Self {
        let mut data = [0u8; 8];
        data[0..2].copy_from_slice(&TYPE_AS4.to_be_bytes());
        data[2..6].copy_from_slice(&asn.to_be_bytes());
        data[6..8].copy_from_slice(&value.to_be_bytes());
        RouteDistinguisher(data)
    }

    /// Creates an RD from its raw wire bytes.
    pub const fn from_bytes(data: [u8; 8]) -> Self {
        RouteDistinguisher(data)
    }

    /// Returns the raw wire bytes.
    pub const fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }

    /// Returns the encoding type field.
    pub fn rd_type(&self) -> u16 {
        u16::from_be_bytes([self.0[0], self.0[1]])
    }

    /// Returns true if this is the null RD.
    pub fn is_null(&self) -> bool {
        self.0 == [0; 8]
    }
}

impl fmt::Display for RouteDistinguisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = &self.0;
        match self.rd_type() {
            TYPE_AS2 => {
                let asn = u16::from_be_bytes([d[2], d[3]]);
                let value = u32::from_be_bytes([d[4], d[5], d[6], d[7]]);
                write!(f, "{}:{}", asn, value)
            }
            TYPE_IP4 => {
                let addr = Ipv4Addr::new(d[2], d[3], d[4], d[5]);
                let value = u16::from_be_bytes([d[6], d[7]]);
                write!(f, "{}:{}", addr, value)
            }
            TYPE_AS4 => {
                let asn = u32::from_be_bytes([d[2], d[3], d[4], d[5]]);
                let value = u16::from_be_bytes([d[6], d[7]]);
                write!(f, "{}:{}", asn, value)
            }
            other => write!(f, "type{}:{:02x?}", other, &d[2..]),
        }
    }
}

impl FromStr for RouteDistinguisher {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseError::InvalidRouteDistinguisher(s.to_string());

        let (admin, value) = s.rsplit_once(':').ok_or_else(invalid)?;

        if admin.contains('.') {
            let addr: Ipv4Addr = admin.parse().map_err(|_| invalid())?;
            let value: u16 = value.parse().map_err(|_| invalid())?;
            return Ok(Self::from_ipv4(addr, value));
        }

        let asn: u32 = admin.parse().map_err(|_| invalid())?;
        match u16::try_from(asn) {
            Ok(asn) => {
                let value: u32 = value.parse().map_err(|_| invalid())?;
                Ok(Self::from_as2(asn, value))
            }
            Err(_) => {
                let value: u16 = value.parse().map_err(|_| invalid())?;
                Ok(Self::from_as4(asn, value))
            }
        }
    }
}
