//! Multicast VPN (inetmvpn) route table
//!
//! Holds multicast VPN routes for one routing instance, hash-partitioned by
//! multicast group so that each route shares a partition with the group's
//! /32 in the IPv4 unicast table.
//!
//! On top of the route index the table:
//! - replicates routes between the default instance and tenant instances,
//!   rewriting the route distinguisher and keeping secondary paths
//!   idempotent;
//! - decides per RIB-out whether a route is exported and with which update
//!   info, depending on the output's wire encoding;
//! - owns the multicast tree manager of a tenant instance;
//! - registers itself under `inetmvpn.0` in the table family registry.

pub mod attr;
pub mod config;
pub mod error;
pub mod instance;
pub mod partition;
pub mod path;
pub mod registry;
pub mod ribout;
pub mod route;
pub mod table;
pub mod tree_manager;

pub use attr::{AttrDb, BgpAttr, BgpAttrPtr, BgpOrigin, InternAttrDb};
pub use config::{InstanceConfig, MvpnConfig, RouteSeed};
pub use error::{Result, TableError};
pub use instance::{RoutingInstance, ServerContext, DEFAULT_INSTANCE_NAME};
pub use partition::TablePartition;
pub use path::{
    BgpPath, PathFlags, PathKind, PathSource, PeerId, ReplicateInfo, SecondaryPathKey,
};
pub use registry::{create_table, register_factory, RoutingTable, TableCreateFn};
pub use ribout::{RibOut, RibPeerSet, UpdateInfo, UpdateInfoList};
pub use route::MvpnRoute;
pub use table::{MvpnTable, FAMILY_TABLE_NAME};
pub use tree_manager::{
    McastTreeManager, NoOpTreeManager, NoOpTreeManagerFactory, TreeManagerFactory,
};

pub use bgp_types::{ExtCommunity, MvpnPrefix, MvpnRouteType, ParseError, RouteDistinguisher};
