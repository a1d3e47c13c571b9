//! Multicast VPN route: a prefix and its ordered path list.

use bgp_types::MvpnPrefix;
use std::cmp::Ordering;
use std::fmt;

use crate::path::{BgpPath, PathSource, PeerId, SecondaryPathKey};

/// A route in an inetmvpn table.
///
/// Paths are kept sorted best first according to [`BgpPath::path_compare`].
/// A route whose last path was removed is marked deleted; it stays in its
/// partition until reaped, and is resurrected if a path arrives first.
#[derive(Debug, Clone)]
pub struct MvpnRoute {
    prefix: MvpnPrefix,
    paths: Vec<BgpPath>,
    deleted: bool,
}

impl MvpnRoute {
    /// Creates an empty, unattached route.
    pub fn new(prefix: MvpnPrefix) -> Self {
        Self {
            prefix,
            paths: Vec::new(),
            deleted: false,
        }
    }

    pub fn prefix(&self) -> &MvpnPrefix {
        &self.prefix
    }

    /// Returns the paths, best first.
    pub fn paths(&self) -> &[BgpPath] {
        &self.paths
    }

    /// Returns the best path, if any.
    pub fn best_path(&self) -> Option<&BgpPath> {
        self.paths.first()
    }

    pub fn path_count(&self) -> usize {
        self.paths.len()
    }

    pub fn has_paths(&self) -> bool {
        !self.paths.is_empty()
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub fn mark_delete(&mut self) {
        self.deleted = true;
    }

    pub fn clear_delete(&mut self) {
        self.deleted = false;
    }

    /// Inserts a path in best-path order and returns its position.
    ///
    /// A path that compares equal to existing ones goes after them.
    /// Position 0 means the new path is now the best path.
    pub fn insert_path(&mut self, path: BgpPath) -> usize {
        let pos = self
            .paths
            .iter()
            .position(|existing| path.path_compare(existing) == Ordering::Less)
            .unwrap_or(self.paths.len());
        self.paths.insert(pos, path);
        pos
    }

    /// Finds a primary path by its identity.
    pub fn find_path(
        &self,
        peer: Option<PeerId>,
        source: PathSource,
        path_id: u32,
    ) -> Option<&BgpPath> {
        self.paths
            .iter()
            .find(|p| p.is_primary_match(peer, source, path_id))
    }

    /// Removes a primary path. Returns the position it occupied.
    pub fn remove_path(
        &mut self,
        peer: Option<PeerId>,
        source: PathSource,
        path_id: u32,
    ) -> Option<usize> {
        let pos = self
            .paths
            .iter()
            .position(|p| p.is_primary_match(peer, source, path_id))?;
        self.paths.remove(pos);
        Some(pos)
    }

    /// Finds the secondary path identified by `key`.
    pub fn find_secondary_path(&self, key: &SecondaryPathKey<'_>) -> Option<&BgpPath> {
        self.paths.iter().find(|p| p.is_secondary_match(key))
    }

    /// Removes the secondary path identified by `key`.
    ///
    /// Returns the position it occupied, or `None` if there was no such path.
    pub fn remove_secondary_path(&mut self, key: &SecondaryPathKey<'_>) -> Option<usize> {
        let pos = self.paths.iter().position(|p| p.is_secondary_match(key))?;
        self.paths.remove(pos);
        Some(pos)
    }
}

impl fmt::Display for MvpnRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.prefix.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::BgpAttr;
    use crate::path::{PathFlags, ReplicateInfo};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn path(peer: u32, local_pref: u32) -> BgpPath {
        BgpPath::new(
            Some(PeerId(peer)),
            0,
            PathSource::BgpXmpp,
            Arc::new(BgpAttr::new(local_pref)),
            PathFlags::NONE,
            0,
        )
    }

    fn route() -> MvpnRoute {
        MvpnRoute::new("1-10.1.1.1:1-224.1.1.1,10.0.0.1".parse().unwrap())
    }

    #[test]
    fn test_insert_keeps_best_first() {
        let mut rt = route();
        assert_eq!(rt.insert_path(path(1, 100)), 0);
        assert_eq!(rt.insert_path(path(2, 50)), 1);
        assert_eq!(rt.insert_path(path(3, 200)), 0);

        let peers: Vec<_> = rt.paths().iter().map(|p| p.peer()).collect();
        assert_eq!(peers, vec![Some(PeerId(3)), Some(PeerId(1)), Some(PeerId(2))]);
        assert_eq!(rt.best_path().unwrap().peer(), Some(PeerId(3)));
    }

    #[test]
    fn test_remove_primary_path() {
        let mut rt = route();
        rt.insert_path(path(1, 100));
        rt.insert_path(path(2, 200));

        assert_eq!(rt.remove_path(Some(PeerId(2)), PathSource::BgpXmpp, 0), Some(0));
        assert_eq!(rt.remove_path(Some(PeerId(2)), PathSource::BgpXmpp, 0), None);
        assert_eq!(rt.path_count(), 1);
        assert!(rt.find_path(Some(PeerId(1)), PathSource::BgpXmpp, 0).is_some());
    }

    #[test]
    fn test_secondary_path_lookup_ignores_primary() {
        let mut rt = route();
        let src_route = *rt.prefix();
        rt.insert_path(path(1, 100));

        let key = SecondaryPathKey {
            src_table: "inetmvpn.0",
            src_route: &src_route,
            source: PathSource::BgpXmpp,
            peer: Some(PeerId(1)),
            path_id: 0,
        };
        assert!(rt.find_secondary_path(&key).is_none());

        let info = ReplicateInfo {
            src_table: "inetmvpn.0".to_string(),
            src_route,
        };
        rt.insert_path(BgpPath::new_secondary(
            &path(1, 100),
            Arc::new(BgpAttr::new(100)),
            info,
        ));
        assert!(rt.find_secondary_path(&key).unwrap().is_replicated());
        assert_eq!(rt.remove_secondary_path(&key), Some(1));
        assert!(rt.remove_secondary_path(&key).is_none());
        assert_eq!(rt.path_count(), 1);
    }

    #[test]
    fn test_delete_flag() {
        let mut rt = route();
        assert!(!rt.is_deleted());
        rt.mark_delete();
        assert!(rt.is_deleted());
        rt.clear_delete();
        assert!(!rt.is_deleted());
    }
}
