//! BGP value types for the multicast VPN control plane.
//!
//! This crate provides the opaque value types the route tables key and
//! tag their entries with:
//!
//! - [`RouteDistinguisher`]: 8-byte RFC 4364 route distinguisher
//! - [`MvpnPrefix`]: multicast VPN prefix (type, RD, group, source)
//! - [`MvpnRouteType`]: route type tag carried in the prefix
//! - [`ExtCommunity`]: extended community attribute value

mod community;
mod prefix;
mod rd;

pub use community::ExtCommunity;
pub use prefix::{MvpnPrefix, MvpnRouteType};
pub use rd::RouteDistinguisher;

/// Common error type for parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid route distinguisher: {0}")]
    InvalidRouteDistinguisher(String),

    #[error("invalid mvpn prefix: {0}")]
    InvalidMvpnPrefix(String),

    #[error("invalid mvpn route type: {0}")]
    InvalidRouteType(String),

    #[error("invalid extended community: {0}")]
    InvalidExtCommunity(String),
}
