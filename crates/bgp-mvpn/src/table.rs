//! The inetmvpn table.
//!
//! Routes are hash-partitioned by multicast group so that every route for
//! a group lands on the same partition as the group's /32 in the IPv4
//! unicast table. Operations that span both tables can then run on a
//! single partition without cross-partition coordination.
//!
//! The table also replicates routes between the default instance and
//! tenant instances, exports routes to RIB-outs, and owns the tree manager
//! of a tenant instance.

use bgp_types::{ExtCommunity, MvpnPrefix, RouteDistinguisher};
use std::fmt;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::instance::{RoutingInstance, ServerContext};
use crate::partition::TablePartition;
use crate::path::{BgpPath, PathSource, PeerId, ReplicateInfo, SecondaryPathKey};
use crate::ribout::{RibOut, RibPeerSet, UpdateInfo, UpdateInfoList};
use crate::route::MvpnRoute;
use crate::tree_manager::{McastTreeManager, TreeManagerFactory, TreeManagerSlot};

/// Family table name this table type registers under.
pub const FAMILY_TABLE_NAME: &str = "inetmvpn.0";

/// Hash of an IPv4 host prefix, as computed by the unicast table.
pub fn inet_hash(addr: Ipv4Addr) -> usize {
    u32::from(addr) as usize
}

/// A multicast VPN route table.
pub struct MvpnTable {
    name: String,
    partitions: Vec<TablePartition>,
    instance: Option<RoutingInstance>,
    tree_manager: TreeManagerSlot,
    tree_manager_factory: Arc<dyn TreeManagerFactory>,
}

impl MvpnTable {
    /// Creates an unbound table with `ctx.partition_count()` partitions.
    pub fn new(name: impl Into<String>, ctx: &ServerContext) -> Self {
        let name = name.into();
        let partitions = (0..ctx.partition_count())
            .map(TablePartition::new)
            .collect();

        debug!(
            "Created table {} with {} partitions",
            name,
            ctx.partition_count()
        );

        Self {
            name,
            partitions,
            instance: None,
            tree_manager: TreeManagerSlot::Absent,
            tree_manager_factory: ctx.tree_manager_factory().clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // ---- partitioned route index ----

    /// Hash of a prefix before reduction to a partition index.
    ///
    /// Only the group address participates; RD and source never do.
    pub fn hash_function(prefix: &MvpnPrefix) -> usize {
        inet_hash(prefix.group())
    }

    /// Partition index for a request key.
    pub fn hash_key(&self, prefix: &MvpnPrefix) -> usize {
        Self::hash_function(prefix) % self.partitions.len()
    }

    /// Partition index for a route.
    pub fn hash(&self, route: &MvpnRoute) -> usize {
        self.hash_key(route.prefix())
    }

    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    pub fn partition(&self, index: usize) -> &TablePartition {
        &self.partitions[index]
    }

    pub fn partition_mut(&mut self, index: usize) -> &mut TablePartition {
        &mut self.partitions[index]
    }

    /// Allocates a new, unattached route. Never consults table state.
    pub fn alloc_entry(prefix: MvpnPrefix) -> MvpnRoute {
        MvpnRoute::new(prefix)
    }

    /// Allocates a new, unattached route from a string key.
    ///
    /// A malformed key yields a route for the default (sentinel) prefix;
    /// validating keys is the caller's job.
    pub fn alloc_entry_str(key: &str) -> MvpnRoute {
        let prefix = key.parse().unwrap_or_else(|e| {
            warn!("Malformed inetmvpn key '{}': {}", key, e);
            MvpnPrefix::default()
        });
        MvpnRoute::new(prefix)
    }

    /// Looks up a route. Pure read.
    pub fn find(&self, prefix: &MvpnPrefix) -> Option<&MvpnRoute> {
        self.partitions[self.hash_key(prefix)].find(prefix)
    }

    /// Iterates over all routes, partition by partition.
    pub fn routes(&self) -> impl Iterator<Item = &MvpnRoute> {
        self.partitions.iter().flat_map(|p| p.routes())
    }

    pub fn route_count(&self) -> usize {
        self.partitions.iter().map(|p| p.len()).sum()
    }

    /// Adds a primary path, creating or resurrecting the route.
    ///
    /// A path already learned under the same (peer, source, path id) is
    /// replaced. The partition is notified if the best path changed.
    pub fn add_path(&mut self, prefix: MvpnPrefix, path: BgpPath) -> Option<&MvpnRoute> {
        let idx = self.hash_key(&prefix);
        let partition = &mut self.partitions[idx];

        let best_changed = {
            let (route, created) = partition.locate(prefix);
            if created {
                debug!("{}: created route {}", self.name, prefix);
            }
            let replaced = route.remove_path(path.peer(), path.source(), path.path_id());
            if replaced.is_some() {
                debug!("{}: replacing path from {:?} for {}", self.name, path.peer(), prefix);
            }
            let pos = route.insert_path(path);
            replaced == Some(0) || pos == 0
        };
        if best_changed {
            partition.notify(&prefix);
        }

        partition.find(&prefix)
    }

    /// Removes a primary path. Returns false if there was no such path.
    ///
    /// A route left without paths is marked deleted and stays in its
    /// partition until [`MvpnTable::reap`].
    pub fn delete_path(
        &mut self,
        prefix: &MvpnPrefix,
        peer: Option<PeerId>,
        source: PathSource,
        path_id: u32,
    ) -> bool {
        let idx = self.hash_key(prefix);
        let partition = &mut self.partitions[idx];

        let Some(route) = partition.find_mut(prefix) else {
            return false;
        };
        let Some(pos) = route.remove_path(peer, source, path_id) else {
            return false;
        };
        let emptied = !route.has_paths();
        if emptied {
            route.mark_delete();
        }
        if pos == 0 || emptied {
            partition.notify(prefix);
        }
        true
    }

    /// Removes deleted routes without paths from every partition.
    pub fn reap(&mut self) -> usize {
        let reaped: usize = self.partitions.iter_mut().map(|p| p.reap()).sum();
        if reaped > 0 {
            debug!("{}: reaped {} routes", self.name, reaped);
        }
        reaped
    }

    /// Drains pending notifications from every partition.
    pub fn drain_notifications(&mut self) -> Vec<MvpnPrefix> {
        self.partitions
            .iter_mut()
            .flat_map(|p| p.drain_notifications())
            .collect()
    }

    // ---- routing instance and tree manager lifecycle ----

    pub fn routing_instance(&self) -> Option<&RoutingInstance> {
        self.instance.as_ref()
    }

    /// Returns true if this table belongs to the default instance.
    ///
    /// # Panics
    ///
    /// Panics if the table is not bound to a routing instance yet.
    pub fn is_default(&self) -> bool {
        match &self.instance {
            Some(instance) => instance.is_default(),
            None => panic!("table {} is not bound to a routing instance", self.name),
        }
    }

    /// Binds the table to its routing instance.
    ///
    /// For a tenant instance this creates and initializes the tree manager.
    ///
    /// # Panics
    ///
    /// Panics if a tenant table already has an active tree manager.
    #[instrument(skip(self), fields(table = %self.name))]
    pub fn set_routing_instance(&mut self, instance: RoutingInstance) {
        info!("Binding table {} to instance {}", self.name, instance);
        self.instance = Some(instance);
        self.create_tree_manager();
    }

    /// Tears down instance-bound state ahead of table deletion.
    #[instrument(skip(self), fields(table = %self.name))]
    pub fn shutdown(&mut self) {
        self.destroy_tree_manager();
    }

    /// Returns the tree manager, present only for tenant tables.
    pub fn tree_manager(&self) -> Option<&dyn McastTreeManager> {
        self.tree_manager.get()
    }

    fn create_tree_manager(&mut self) {
        if self.is_default() {
            return;
        }
        self.tree_manager
            .activate(self.tree_manager_factory.as_ref(), &self.name);
    }

    fn destroy_tree_manager(&mut self) {
        if self.is_default() {
            return;
        }
        self.tree_manager.deactivate(&self.name);
    }

    // ---- replication ----

    /// Computes the prefix a route from another table takes in this one.
    ///
    /// Returns `None` if the route must not be replicated here: native
    /// routes are never replicated, and neither is anything moving
    /// between two tenant tables.
    fn replicated_prefix(
        &self,
        src_table: &MvpnTable,
        src_route: &MvpnRoute,
        src_path: &BgpPath,
    ) -> Option<MvpnPrefix> {
        let dest_default = self.is_default();
        if !dest_default && !src_table.is_default() {
            debug!(
                "{}: not replicating {} from tenant table {}",
                self.name,
                src_route,
                src_table.name()
            );
            return None;
        }

        if src_route.prefix().route_type().is_native() {
            debug!("{}: not replicating native route {}", self.name, src_route);
            return None;
        }

        let rd = if dest_default {
            src_path.attr().source_rd
        } else {
            RouteDistinguisher::NULL
        };
        Some(src_route.prefix().with_route_distinguisher(rd))
    }

    /// Replicates `src_path` of `src_route` in `src_table` into this table.
    ///
    /// Returns the destination route, whether created, resurrected, updated
    /// or left unchanged, or `None` if replication was declined.
    ///
    /// # Panics
    ///
    /// Panics if either table is not bound to a routing instance.
    #[instrument(
        level = "debug",
        skip_all,
        fields(table = %self.name, src_table = %src_table.name(), route = %src_route)
    )]
    pub fn replicate(
        &mut self,
        server: &ServerContext,
        src_table: &MvpnTable,
        src_route: &MvpnRoute,
        src_path: &BgpPath,
        community: Option<ExtCommunity>,
    ) -> Option<&MvpnRoute> {
        let prefix = self.replicated_prefix(src_table, src_route, src_path)?;

        let new_attr = server
            .attr_db()
            .replace_ext_community_and_locate(src_path.attr(), community);

        let key = SecondaryPathKey {
            src_table: src_table.name(),
            src_route: src_route.prefix(),
            source: src_path.source(),
            peer: src_path.peer(),
            path_id: src_path.path_id(),
        };

        let idx = self.hash_key(&prefix);
        let partition = &mut self.partitions[idx];

        // Some(is_best) when a path was inserted, None when unchanged.
        let inserted = {
            let (route, created) = partition.locate(prefix);
            if created {
                debug!("{}: created replicated route {}", self.name, prefix);
            }

            let existing = route
                .find_secondary_path(&key)
                .map(|path| Arc::ptr_eq(path.attr(), &new_attr));

            match existing {
                Some(true) => None,
                stale => {
                    if stale.is_some() {
                        let removed = route.remove_secondary_path(&key);
                        assert!(
                            removed.is_some(),
                            "failed to remove stale secondary path for {} in {}",
                            prefix,
                            self.name
                        );
                    }

                    let info = ReplicateInfo {
                        src_table: src_table.name().to_string(),
                        src_route: *src_route.prefix(),
                    };
                    let path = BgpPath::new_secondary(src_path, new_attr, info);
                    Some(route.insert_path(path) == 0)
                }
            }
        };

        match inserted {
            Some(true) => partition.notify(&prefix),
            Some(false) => {}
            None => debug!("{}: replicated path for {} unchanged", self.name, prefix),
        }

        partition.find(&prefix)
    }

    /// Removes the secondary path `src_path` contributed to this table.
    ///
    /// The replica is found by its provenance, so a source path whose
    /// `source_rd` changed since it was replicated still removes the old
    /// replica. Returns false if there was nothing to remove.
    pub fn delete_replicated(
        &mut self,
        src_table: &MvpnTable,
        src_route: &MvpnRoute,
        src_path: &BgpPath,
    ) -> bool {
        let Some(expected) = self.replicated_prefix(src_table, src_route, src_path) else {
            return false;
        };

        let key = SecondaryPathKey {
            src_table: src_table.name(),
            src_route: src_route.prefix(),
            source: src_path.source(),
            peer: src_path.peer(),
            path_id: src_path.path_id(),
        };

        // Replicas differ from `expected` at most in RD, which never moves
        // them to another partition.
        let idx = self.hash_key(&expected);
        let partition = &mut self.partitions[idx];

        let holds_key = |route: &MvpnRoute| route.find_secondary_path(&key).is_some();
        let prefix = if partition.find(&expected).is_some_and(holds_key) {
            expected
        } else {
            let found = partition
                .routes()
                .filter(|route| {
                    let p = route.prefix();
                    p.route_type() == expected.route_type()
                        && p.group() == expected.group()
                        && p.source() == expected.source()
                })
                .find(|route| holds_key(route))
                .map(|route| *route.prefix());
            match found {
                Some(prefix) => prefix,
                None => return false,
            }
        };

        let Some(route) = partition.find_mut(&prefix) else {
            return false;
        };
        let Some(pos) = route.remove_secondary_path(&key) else {
            return false;
        };
        let emptied = !route.has_paths();
        if emptied {
            route.mark_delete();
        }
        if pos == 0 || emptied {
            partition.notify(&prefix);
        }

        debug!("{}: removed replicated path for {}", self.name, prefix);
        true
    }

    // ---- export ----

    /// Decides whether `route` goes out on `ribout` this round.
    ///
    /// With the standard encoding the generic per-peer computation decides.
    /// Otherwise only native routes are exported, through the tree manager,
    /// and only to the peer that owns the route's best path when that peer
    /// is registered on the output and present in `peerset`.
    ///
    /// Returns `None` when the route is not exported.
    pub fn export(
        &self,
        ribout: &dyn RibOut,
        route: &MvpnRoute,
        peerset: &RibPeerSet,
    ) -> Option<UpdateInfo> {
        if ribout.is_encoding_bgp() {
            return ribout.compute_update_info(route, peerset);
        }

        if !route.prefix().route_type().is_native() {
            return None;
        }

        let manager = self.tree_manager.get().filter(|m| !m.is_deleted())?;

        let peer = route.best_path()?.peer()?;
        if !ribout.is_registered(peer) {
            return None;
        }

        let peerbit = ribout.peer_index(peer)?;
        if !peerset.test(peerbit) {
            return None;
        }

        let mut uinfo = manager.get_update_info(route)?;
        uinfo.target.set(peerbit);
        Some(uinfo)
    }

    /// Like [`MvpnTable::export`], pushing the update info onto `list`.
    pub fn export_into(
        &self,
        ribout: &dyn RibOut,
        route: &MvpnRoute,
        peerset: &RibPeerSet,
        list: &mut UpdateInfoList,
    ) -> bool {
        match self.export(ribout, route, peerset) {
            Some(uinfo) => {
                list.push_front(uinfo);
                true
            }
            None => false,
        }
    }
}

impl Drop for MvpnTable {
    fn drop(&mut self) {
        if self.tree_manager.is_active() {
            self.tree_manager.deactivate(&self.name);
        }
    }
}

impl fmt::Debug for MvpnTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MvpnTable")
            .field("name", &self.name)
            .field("partitions", &self.partitions.len())
            .field("instance", &self.instance)
            .field("tree_manager", &self.tree_manager)
            .finish()
    }
}
