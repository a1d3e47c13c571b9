//! Multicast VPN prefix and route type.

use crate::{ParseError, RouteDistinguisher};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// Route type tag carried in an [`MvpnPrefix`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MvpnRouteType {
    /// Locally originated (S,G) state. Leaf of the replication graph.
    Native,
    /// Customer multicast route distributed between instances.
    CMcast,
    /// Distribution tree route.
    Tree,
}

impl MvpnRouteType {
    /// Returns the numeric tag used in string keys.
    pub const fn as_u8(&self) -> u8 {
        match self {
            MvpnRouteType::Native => 0,
            MvpnRouteType::CMcast => 1,
            MvpnRouteType::Tree => 2,
        }
    }

    /// Returns true for the native route type.
    pub const fn is_native(&self) -> bool {
        matches!(self, MvpnRouteType::Native)
    }
}

impl TryFrom<u8> for MvpnRouteType {
    type Error = ParseError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(MvpnRouteType::Native),
            1 => Ok(MvpnRouteType::CMcast),
            2 => Ok(MvpnRouteType::Tree),
            other => Err(ParseError::InvalidRouteType(other.to_string())),
        }
    }
}

impl fmt::Display for MvpnRouteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MvpnRouteType::Native => "native",
            MvpnRouteType::CMcast => "cmcast",
            MvpnRouteType::Tree => "tree",
        };
        f.write_str(name)
    }
}

/// A multicast VPN prefix: route type, route distinguisher, group, source.
///
/// String form is `<type>-<rd>-<group>,<source>` with the numeric type tag,
/// e.g. `1-10.1.1.1:65535-224.1.2.3,192.168.1.1`.
///
/// Ordering is by type, then RD, then group, then source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MvpnPrefix {
    route_type: MvpnRouteType,
    rd: RouteDistinguisher,
    group: Ipv4Addr,
    source: Ipv4Addr,
}

impl MvpnPrefix {
    /// Creates a new prefix.
    pub const fn new(
        route_type: MvpnRouteType,
        rd: RouteDistinguisher,
        group: Ipv4Addr,
        source: Ipv4Addr,
    ) -> Self {
        MvpnPrefix {
            route_type,
            rd,
            group,
            source,
        }
    }

    pub const fn route_type(&self) -> MvpnRouteType {
        self.route_type
    }

    pub const fn route_distinguisher(&self) -> &RouteDistinguisher {
        &self.rd
    }

    pub const fn group(&self) -> Ipv4Addr {
        self.group
    }

    pub const fn source(&self) -> Ipv4Addr {
        self.source
    }

    /// Returns a copy of this prefix with the route distinguisher replaced.
    pub fn with_route_distinguisher(mut self, rd: RouteDistinguisher) -> Self {
        self.rd = rd;
        self
    }
}

impl Default for MvpnPrefix {
    fn default() -> Self {
        MvpnPrefix::new(
            MvpnRouteType::Native,
            RouteDistinguisher::NULL,
            Ipv4Addr::UNSPECIFIED,
            Ipv4Addr::UNSPECIFIED,
        )
    }
}

impl fmt::Display for MvpnPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{},{}",
            self.route_type.as_u8(),
            self.rd,
            self.group,
            self.source
        )
    }
}

impl FromStr for MvpnPrefix {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseError::InvalidMvpnPrefix(s.to_string());

        let mut parts = s.splitn(3, '-');
        let type_str = parts.next().ok_or_else(invalid)?;
        let rd_str = parts.next().ok_or_else(invalid)?;
        let addrs = parts.next().ok_or_else(invalid)?;

        let route_type = type_str
            .parse::<u8>()
            .map_err(|_| ParseError::InvalidRouteType(type_str.to_string()))
            .and_then(MvpnRouteType::try_from)?;
        let rd: RouteDistinguisher = rd_str.parse()?;

        let (group_str, source_str) = addrs.split_once(',').ok_or_else(invalid)?;
        let group: Ipv4Addr = group_str.parse().map_err(|_| invalid())?;
        let source: Ipv4Addr = source_str.parse().map_err(|_| invalid())?;

        Ok(MvpnPrefix::new(route_type, rd, group, source))
    }
}
