//! Correlation keys received through ALL frames.
//!
//! Membership only grows during a session; a reconnect starts a fresh set.

use shared::{CorrelationKey, CorrelationPair};
use std::collections::HashSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HighlightSet {
    keys: HashSet<CorrelationKey>,
}

impl HighlightSet {
    pub fn add(&mut self, key: CorrelationKey) -> bool {
        self.keys.insert(key)
    }

    pub fn has(&self, key: &CorrelationKey) -> bool {
        self.keys.contains(key)
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Union the pairs of one ALL payload, returning how many keys were new.
    pub fn extend_pairs(&mut self, pairs: impl IntoIterator<Item = CorrelationPair>) -> usize {
        pairs
            .into_iter()
            .map(CorrelationKey::from)
            .filter(|key| self.add(key.clone()))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_concatenate_source_then_destination() {
        let mut set = HighlightSet::default();
        set.extend_pairs([CorrelationPair(12, 345)]);

        assert!(set.has(&CorrelationKey::from_timestamps(12, 345)));
        assert!(!set.has(&CorrelationKey::from_timestamps(345, 12)));
    }

    #[test]
    fn size_never_decreases_across_frames() {
        let mut set = HighlightSet::default();
        let frames = [
            vec![CorrelationPair(1, 2), CorrelationPair(3, 4)],
            vec![],
            vec![CorrelationPair(1, 2)],
            vec![CorrelationPair(5, 6)],
        ];

        let mut previous = set.len();
        for frame in frames {
            set.extend_pairs(frame);
            assert!(set.len() >= previous);
            previous = set.len();
        }
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn duplicate_pairs_are_not_counted_twice() {
        let mut set = HighlightSet::default();
        assert_eq!(set.extend_pairs([CorrelationPair(7, 8), CorrelationPair(7, 8)]), 1);
        assert!(!set.is_empty());
    }
}
