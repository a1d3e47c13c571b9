//! BGP paths: primary paths learned directly and secondary (replicated)
//! paths mirrored in from another table.

use bgp_types::MvpnPrefix;
use std::cmp::Ordering;
use std::fmt;

use crate::attr::BgpAttrPtr;

/// Identity of a peer contributing paths to a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(pub u32);

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer-{}", self.0)
    }
}

/// Where a path came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathSource {
    None,
    BgpXmpp,
    StaticRoute,
    Local,
}

/// Flags indicating path state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PathFlags(u32);

impl PathFlags {
    /// No flags set.
    pub const NONE: Self = Self(0);
    /// Path is not usable for forwarding (e.g. next-hop unreachable).
    pub const INFEASIBLE: Self = Self(1 << 0);
    /// Path is retained across a peer's graceful restart.
    pub const STALE: Self = Self(1 << 1);

    /// Returns true if the path is usable.
    pub fn is_feasible(&self) -> bool {
        self.0 & Self::INFEASIBLE.0 == 0
    }

    /// Returns true if the path is stale.
    pub fn is_stale(&self) -> bool {
        self.0 & Self::STALE.0 != 0
    }

    /// Returns the raw flag bits.
    pub fn bits(&self) -> u32 {
        self.0
    }
}

impl std::ops::BitOr for PathFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for PathFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Provenance of a replicated path.
///
/// This is a lookup-only reference: the origin table and route may be
/// deleted independently of the replica, so only their names are kept.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReplicateInfo {
    /// Name of the table the path was replicated from.
    pub src_table: String,
    /// Prefix of the origin route in that table.
    pub src_route: MvpnPrefix,
}

/// Primary or secondary path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathKind {
    Primary,
    Secondary(ReplicateInfo),
}

/// Key identifying the secondary path a given peer contributed through
/// replication from a given origin route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecondaryPathKey<'a> {
    pub src_table: &'a str,
    pub src_route: &'a MvpnPrefix,
    pub source: PathSource,
    pub peer: Option<PeerId>,
    pub path_id: u32,
}

/// A path on a route.
#[derive(Debug, Clone)]
pub struct BgpPath {
    peer: Option<PeerId>,
    path_id: u32,
    source: PathSource,
    attr: BgpAttrPtr,
    flags: PathFlags,
    label: u32,
    kind: PathKind,
}

impl BgpPath {
    /// Creates a primary path. `peer` is `None` for locally originated state.
    pub fn new(
        peer: Option<PeerId>,
        path_id: u32,
        source: PathSource,
        attr: BgpAttrPtr,
        flags: PathFlags,
        label: u32,
    ) -> Self {
        Self {
            peer,
            path_id,
            source,
            attr,
            flags,
            label,
            kind: PathKind::Primary,
        }
    }

    /// Creates a secondary path mirroring `src_path` with a new attribute set.
    pub fn new_secondary(src_path: &BgpPath, attr: BgpAttrPtr, info: ReplicateInfo) -> Self {
        Self {
            peer: src_path.peer,
            path_id: src_path.path_id,
            source: src_path.source,
            attr,
            flags: src_path.flags,
            label: src_path.label,
            kind: PathKind::Secondary(info),
        }
    }

    pub fn peer(&self) -> Option<PeerId> {
        self.peer
    }

    pub fn path_id(&self) -> u32 {
        self.path_id
    }

    pub fn source(&self) -> PathSource {
        self.source
    }

    pub fn attr(&self) -> &BgpAttrPtr {
        &self.attr
    }

    pub fn flags(&self) -> PathFlags {
        self.flags
    }

    pub fn label(&self) -> u32 {
        self.label
    }

    pub fn kind(&self) -> &PathKind {
        &self.kind
    }

    pub fn is_feasible(&self) -> bool {
        self.flags.is_feasible()
    }

    /// Returns true for secondary paths.
    pub fn is_replicated(&self) -> bool {
        matches!(self.kind, PathKind::Secondary(_))
    }

    /// Returns the replication provenance of a secondary path.
    pub fn replicate_info(&self) -> Option<&ReplicateInfo> {
        match &self.kind {
            PathKind::Primary => None,
            PathKind::Secondary(info) => Some(info),
        }
    }

    /// Returns true if this is a primary path with the given identity.
    pub fn is_primary_match(&self, peer: Option<PeerId>, source: PathSource, path_id: u32) -> bool {
        !self.is_replicated()
            && self.peer == peer
            && self.source == source
            && self.path_id == path_id
    }

    /// Returns true if this is the secondary path identified by `key`.
    pub fn is_secondary_match(&self, key: &SecondaryPathKey<'_>) -> bool {
        match &self.kind {
            PathKind::Primary => false,
            PathKind::Secondary(info) => {
                info.src_table == key.src_table
                    && info.src_route == *key.src_route
                    && self.source == key.source
                    && self.peer == key.peer
                    && self.path_id == key.path_id
            }
        }
    }

    /// Best-path comparison. `Ordering::Less` means `self` is preferred.
    ///
    /// Feasible paths first, then higher local preference, shorter AS path,
    /// lower origin, lower MED, primary before secondary, and finally lower
    /// peer id and path id as tie breakers.
    pub fn path_compare(&self, rhs: &BgpPath) -> Ordering {
        rhs.is_feasible()
            .cmp(&self.is_feasible())
            .then_with(|| rhs.attr.local_pref.cmp(&self.attr.local_pref))
            .then_with(|| self.attr.as_path_count().cmp(&rhs.attr.as_path_count()))
            .then_with(|| self.attr.origin.cmp(&rhs.attr.origin))
            .then_with(|| self.attr.med.cmp(&rhs.attr.med))
            .then_with(|| self.is_replicated().cmp(&rhs.is_replicated()))
            .then_with(|| self.peer.cmp(&rhs.peer))
            .then_with(|| self.path_id.cmp(&rhs.path_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::BgpAttr;
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

    #[test]
    fn test_path_flags() {
        let mut flags = PathFlags::NONE;
        assert!(flags.is_feasible());
        flags |= PathFlags::INFEASIBLE;
        assert!(!flags.is_feasible());
        assert!(!flags.is_stale());
        assert!((flags | PathFlags::STALE).is_stale());
    }

    #[test]
    fn test_compare_local_pref() {
        assert_eq!(path(1, 200).path_compare(&path(1, 100)), Ordering::Less);
        assert_eq!(path(1, 100).path_compare(&path(1, 200)), Ordering::Greater);
    }

    #[test]
    fn test_compare_feasibility_beats_local_pref() {
        let infeasible = BgpPath::new(
            Some(PeerId(1)),
            0,
            PathSource::BgpXmpp,
            Arc::new(BgpAttr::new(500)),
            PathFlags::INFEASIBLE,
            0,
        );
        assert_eq!(path(2, 100).path_compare(&infeasible), Ordering::Less);
    }

    #[test]
    fn test_compare_as_path_and_med() {
        let short = BgpPath::new(
            Some(PeerId(1)),
            0,
            PathSource::BgpXmpp,
            Arc::new(BgpAttr::new(100).with_as_path(vec![65001])),
            PathFlags::NONE,
            0,
        );
        let long = BgpPath::new(
            Some(PeerId(1)),
            0,
            PathSource::BgpXmpp,
            Arc::new(BgpAttr::new(100).with_as_path(vec![65001, 65002]).with_med(0)),
            PathFlags::NONE,
            0,
        );
        assert_eq!(short.path_compare(&long), Ordering::Less);

        let low_med = path(1, 100);
        let high_med = BgpPath::new(
            Some(PeerId(1)),
            0,
            PathSource::BgpXmpp,
            Arc::new(BgpAttr::new(100).with_med(50)),
            PathFlags::NONE,
            0,
        );
        assert_eq!(low_med.path_compare(&high_med), Ordering::Less);
    }

    #[test]
    fn test_compare_primary_before_secondary() {
        let primary = path(5, 100);
        let info = ReplicateInfo {
            src_table: "blue.inetmvpn.0".to_string(),
            src_route: MvpnPrefix::default(),
        };
        let secondary = BgpPath::new_secondary(&path(1, 100), Arc::new(BgpAttr::new(100)), info);
        assert_eq!(primary.path_compare(&secondary), Ordering::Less);
    }

    #[test]
    fn test_secondary_match() {
        let src_route = MvpnPrefix::default();
        let info = ReplicateInfo {
            src_table: "blue.inetmvpn.0".to_string(),
            src_route,
        };
        let secondary = BgpPath::new_secondary(&path(1, 100), Arc::new(BgpAttr::new(100)), info);

        let key = SecondaryPathKey {
            src_table: "blue.inetmvpn.0",
            src_route: &src_route,
            source: PathSource::BgpXmpp,
            peer: Some(PeerId(1)),
            path_id: 0,
        };
        assert!(secondary.is_secondary_match(&key));
        assert!(!secondary.is_secondary_match(&SecondaryPathKey {
            peer: Some(PeerId(2)),
            ..key
        }));
        assert!(!secondary.is_secondary_match(&SecondaryPathKey {
            src_table: "red.inetmvpn.0",
            ..key
        }));
        assert!(!path(1, 100).is_secondary_match(&key));
    }
}
