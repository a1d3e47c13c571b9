//! RIB-out interface: per-peer update distribution context.

use std::collections::VecDeque;

use crate::attr::BgpAttrPtr;
use crate::path::PeerId;
use crate::route::MvpnRoute;

const WORD_BITS: usize = 64;

/// Set of peers addressed by their RIB-out peer index.
#[derive(Debug, Clone, Default)]
pub struct RibPeerSet {
    words: Vec<u64>,
}

impl RibPeerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the bit for `index`, growing the set as needed.
    pub fn set(&mut self, index: usize) {
        let word = index / WORD_BITS;
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= 1u64 << (index % WORD_BITS);
    }

    /// Clears the bit for `index`.
    pub fn reset(&mut self, index: usize) {
        if let Some(word) = self.words.get_mut(index / WORD_BITS) {
            *word &= !(1u64 << (index % WORD_BITS));
        }
    }

    /// Returns true if the bit for `index` is set.
    pub fn test(&self, index: usize) -> bool {
        self.words
            .get(index / WORD_BITS)
            .map(|word| word & (1u64 << (index % WORD_BITS)) != 0)
            .unwrap_or(false)
    }

    /// Returns the number of bits set.
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    /// Iterates over set indices in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(i, word)| {
            (0..WORD_BITS)
                .filter(move |bit| word & (1u64 << bit) != 0)
                .map(move |bit| i * WORD_BITS + bit)
        })
    }
}

impl PartialEq for RibPeerSet {
    fn eq(&self, other: &Self) -> bool {
        let len = self.words.len().max(other.words.len());
        (0..len).all(|i| {
            self.words.get(i).copied().unwrap_or(0) == other.words.get(i).copied().unwrap_or(0)
        })
    }
}

impl Eq for RibPeerSet {}

impl FromIterator<usize> for RibPeerSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut set = RibPeerSet::new();
        for index in iter {
            set.set(index);
        }
        set
    }
}

/// Update payload for a route, addressed to a set of peers.
#[derive(Debug, Clone, Default)]
pub struct UpdateInfo {
    /// Peers this update is destined for.
    pub target: RibPeerSet,
    /// Attributes to advertise. `None` is a withdrawal.
    pub attr: Option<BgpAttrPtr>,
    pub label: u32,
}

impl UpdateInfo {
    pub fn new(attr: Option<BgpAttrPtr>, label: u32) -> Self {
        Self {
            target: RibPeerSet::new(),
            attr,
            label,
        }
    }
}

/// List of update infos produced for one route; new entries go in front.
pub type UpdateInfoList = VecDeque<UpdateInfo>;

/// Per-output update distribution context.
///
/// Implemented by the RIB-out layer; this crate only consumes it.
pub trait RibOut {
    /// Returns true if this output uses the standard BGP wire encoding.
    fn is_encoding_bgp(&self) -> bool;

    /// Returns true if `peer` is registered on this output.
    fn is_registered(&self, peer: PeerId) -> bool;

    /// Returns the peer's bit position on this output.
    fn peer_index(&self, peer: PeerId) -> Option<usize>;

    /// Generic per-peer update computation for the standard encoding.
    fn compute_update_info(&self, route: &MvpnRoute, peerset: &RibPeerSet) -> Option<UpdateInfo>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_set_and_test() {
        let mut set = RibPeerSet::new();
        assert!(set.is_empty());
        assert!(!set.test(5));

        set.set(5);
        set.set(130);
        assert!(set.test(5));
        assert!(set.test(130));
        assert!(!set.test(64));
        assert_eq!(set.count(), 2);
    }

    #[test]
    fn test_reset() {
        let mut set: RibPeerSet = [1, 2, 3].into_iter().collect();
        set.reset(2);
        set.reset(1000);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn test_iter_across_words() {
        let set: RibPeerSet = [70, 0, 63, 64].into_iter().collect();
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![0, 63, 64, 70]);
    }

    #[test]
    fn test_equality_ignores_cleared_words() {
        let mut a: RibPeerSet = [3, 200].into_iter().collect();
        let b: RibPeerSet = [3].into_iter().collect();
        assert_ne!(a, b);
        a.reset(200);
        assert_eq!(a, b);
    }
}
