//! Table partitions (shards).
//!
//! Each partition owns a disjoint subset of a table's routes. Callers are
//! expected to serialize access to a partition; nothing in here locks.

use bgp_types::MvpnPrefix;
use std::collections::{BTreeMap, HashSet, VecDeque};

use crate::route::MvpnRoute;

/// A shard of an inetmvpn table.
#[derive(Debug, Default)]
pub struct TablePartition {
    index: usize,
    routes: BTreeMap<MvpnPrefix, MvpnRoute>,
    /// Prefixes whose best path changed, in notification order.
    pending: VecDeque<MvpnPrefix>,
    pending_set: HashSet<MvpnPrefix>,
}

impl TablePartition {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }

    /// Returns this partition's index within its table.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Looks up a route. Never creates entries.
    pub fn find(&self, prefix: &MvpnPrefix) -> Option<&MvpnRoute> {
        self.routes.get(prefix)
    }

    /// Looks up a route for modification. Never creates entries.
    pub fn find_mut(&mut self, prefix: &MvpnPrefix) -> Option<&mut MvpnRoute> {
        self.routes.get_mut(prefix)
    }

    /// Takes ownership of a new route.
    ///
    /// # Panics
    ///
    /// Panics if a route with the same prefix is already present; callers
    /// must look up before allocating.
    pub fn add(&mut self, route: MvpnRoute) -> &mut MvpnRoute {
        let prefix = *route.prefix();
        assert!(
            !self.routes.contains_key(&prefix),
            "duplicate route {} in partition {}",
            prefix,
            self.index
        );
        self.routes.entry(prefix).or_insert(route)
    }

    /// Returns the route for `prefix`, creating it if absent and clearing
    /// its deleted flag if it was pending deletion.
    ///
    /// The boolean is true when the route was newly created.
    pub fn locate(&mut self, prefix: MvpnPrefix) -> (&mut MvpnRoute, bool) {
        let mut created = false;
        let route = self.routes.entry(prefix).or_insert_with(|| {
            created = true;
            MvpnRoute::new(prefix)
        });
        route.clear_delete();
        (route, created)
    }

    /// Removes a route from the partition.
    pub fn remove(&mut self, prefix: &MvpnPrefix) -> Option<MvpnRoute> {
        self.routes.remove(prefix)
    }

    /// Schedules downstream consumers to re-evaluate a route.
    ///
    /// Repeated notifications for a route that has not been drained yet
    /// collapse into one.
    pub fn notify(&mut self, prefix: &MvpnPrefix) {
        if self.pending_set.insert(*prefix) {
            self.pending.push_back(*prefix);
        }
    }

    /// Returns true if notifications are waiting to be drained.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Drains pending notifications in the order they were raised.
    pub fn drain_notifications(&mut self) -> Vec<MvpnPrefix> {
        self.pending_set.clear();
        self.pending.drain(..).collect()
    }

    /// Removes routes that are marked deleted and have no paths left.
    ///
    /// Returns the number of routes removed.
    pub fn reap(&mut self) -> usize {
        let before = self.routes.len();
        self.routes
            .retain(|_, route| !(route.is_deleted() && !route.has_paths()));
        before - self.routes.len()
    }

    /// Iterates over routes in prefix order.
    pub fn routes(&self) -> impl Iterator<Item = &MvpnRoute> {
        self.routes.values()
    }
}
