//! Path attributes and the attribute interning store.
//!
//! Paths never own their attribute sets. Every set is interned through an
//! [`AttrDb`] so identical sets across routes and paths collapse into one
//! shared [`BgpAttrPtr`]. Two interned pointers are equal by value exactly
//! when they are the same allocation, which lets callers compare attribute
//! sets with [`Arc::ptr_eq`].

use bgp_types::{ExtCommunity, RouteDistinguisher};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

/// BGP ORIGIN attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum BgpOrigin {
    #[default]
    Igp,
    Egp,
    Incomplete,
}

/// A set of path attributes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct BgpAttr {
    pub origin: BgpOrigin,
    /// LOCAL_PREF, higher is preferred.
    pub local_pref: u32,
    /// MULTI_EXIT_DISC, lower is preferred.
    pub med: u32,
    /// AS numbers in the AS_PATH, nearest first.
    pub as_path: Vec<u32>,
    /// RD of the VRF the route was first advertised from.
    pub source_rd: RouteDistinguisher,
    pub ext_community: Option<ExtCommunity>,
}

impl BgpAttr {
    /// Creates an attribute set with the given local preference.
    pub fn new(local_pref: u32) -> Self {
        Self {
            local_pref,
            ..Self::default()
        }
    }

    /// Sets the source RD.
    pub fn with_source_rd(mut self, rd: RouteDistinguisher) -> Self {
        self.source_rd = rd;
        self
    }

    /// Sets the extended community.
    pub fn with_ext_community(mut self, community: ExtCommunity) -> Self {
        self.ext_community = Some(community);
        self
    }

    /// Sets the AS path.
    pub fn with_as_path(mut self, as_path: Vec<u32>) -> Self {
        self.as_path = as_path;
        self
    }

    /// Sets the MED.
    pub fn with_med(mut self, med: u32) -> Self {
        self.med = med;
        self
    }

    /// Returns the number of ASes in the AS path.
    pub fn as_path_count(&self) -> usize {
        self.as_path.len()
    }
}

/// Shared, reference-counted, interned attribute set.
pub type BgpAttrPtr = Arc<BgpAttr>;

/// Attribute interning store.
pub trait AttrDb: Send + Sync {
    /// Interns an attribute set, returning the shared instance.
    fn locate(&self, attr: BgpAttr) -> BgpAttrPtr;

    /// Interns a copy of `attr` with its extended community replaced.
    fn replace_ext_community_and_locate(
        &self,
        attr: &BgpAttr,
        community: Option<ExtCommunity>,
    ) -> BgpAttrPtr {
        let mut clone = attr.clone();
        clone.ext_community = community;
        self.locate(clone)
    }
}

/// Map size below which dead entries are never swept.
const MIN_SWEEP_LEN: usize = 64;

/// In-memory [`AttrDb`] keyed by attribute value.
///
/// The store only holds weak references, so an attribute set is released
/// as soon as the last path referring to it goes away. Dead entries are
/// swept on insertion once the map has doubled since the previous sweep,
/// which keeps insertion amortized O(1).
#[derive(Debug, Default)]
pub struct InternAttrDb {
    inner: Mutex<InternSet>,
}

#[derive(Debug, Default)]
struct InternSet {
    map: HashMap<BgpAttr, Weak<BgpAttr>>,
    sweep_at: usize,
}

impl InternSet {
    fn sweep(&mut self) {
        self.map.retain(|_, weak| weak.strong_count() > 0);
        self.sweep_at = (self.map.len() * 2).max(MIN_SWEEP_LEN);
    }
}

impl InternAttrDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of live interned attribute sets.
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .map
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AttrDb for InternAttrDb {
    fn locate(&self, attr: BgpAttr) -> BgpAttrPtr {
        let mut inner = self.inner.lock();

        if let Some(existing) = inner.map.get(&attr).and_then(Weak::upgrade) {
            return existing;
        }

        if inner.map.len() >= inner.sweep_at {
            inner.sweep();
        }

        let interned = Arc::new(attr.clone());
        inner.map.insert(attr, Arc::downgrade(&interned));
        interned
    }
}
