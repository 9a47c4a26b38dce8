use super::types::{PassTier, RewardEntry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Threshold-indexed reward container for one tier.
///
/// Buckets are append-only; entries are never removed, only flag-reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardTrack {
    tier: PassTier,
    rewards: BTreeMap<u64, Vec<RewardEntry>>,
}

impl RewardTrack {
    pub fn new(tier: PassTier) -> Self {
        Self { tier, rewards: BTreeMap::new() }
    }

    pub fn tier(&self) -> PassTier {
        self.tier
    }

    /// Append an entry to its bucket. Refused (returns false) when the id
    /// already exists at that threshold.
    pub fn insert(&mut self, threshold: u64, entry: RewardEntry) -> bool {
        let bucket = self.rewards.entry(threshold).or_default();
        if bucket.iter().any(|existing| existing.id == entry.id) {
            return false;
        }
        bucket.push(entry);
        true
    }

    pub fn entries_at(&self, threshold: u64) -> &[RewardEntry] {
        self.rewards.get(&threshold).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_rewards_at(&self, threshold: u64) -> bool {
        !self.entries_at(threshold).is_empty()
    }

    pub fn get(&self, threshold: u64, id: i32) -> Option<&RewardEntry> {
        self.rewards.get(&threshold)?.iter().find(|entry| entry.id == id)
    }

    pub fn get_mut(&mut self, threshold: u64, id: i32) -> Option<&mut RewardEntry> {
        self.rewards.get_mut(&threshold)?.iter_mut().find(|entry| entry.id == id)
    }

    /// All entries with `min <= threshold <= max`, concatenated bucket by bucket
    pub fn rewards_in_range(&self, min: u64, max: u64) -> Vec<&RewardEntry> {
        if min > max {
            return Vec::new();
        }
        self.rewards.range(min..=max).flat_map(|(_, bucket)| bucket.iter()).collect()
    }

    pub fn thresholds(&self) -> impl Iterator<Item = u64> + '_ {
        self.rewards.iter().filter(|(_, bucket)| !bucket.is_empty()).map(|(threshold, _)| *threshold)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, &RewardEntry)> + '_ {
        self.rewards
            .iter()
            .flat_map(|(threshold, bucket)| bucket.iter().map(move |entry| (*threshold, entry)))
    }

    /// Back to Locked for every entry; bucket layout untouched
    pub fn reset_flags(&mut self) {
        for entry in self.rewards.values_mut().flatten() {
            entry.reset();
        }
    }

    pub fn len(&self) -> usize {
        self.rewards.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reward::types::{RewardKind, RewardState};

    fn sample_track() -> RewardTrack {
        let mut track = RewardTrack::new(PassTier::Silver);
        track.insert(0, RewardEntry::new(1, RewardKind::Currency, 10));
        track.insert(100, RewardEntry::new(1, RewardKind::Currency, 20));
        track.insert(100, RewardEntry::new(2, RewardKind::Powerup, 1));
        track.insert(250, RewardEntry::new(1, RewardKind::CardPack, 1));
        track
    }

    #[test]
    fn test_ids_are_unique_per_bucket_only() {
        let mut track = sample_track();
        // Same id at a different threshold is fine
        assert!(track.insert(300, RewardEntry::new(2, RewardKind::Currency, 5)));
        // Same id in the same bucket is refused
        assert!(!track.insert(100, RewardEntry::new(2, RewardKind::Currency, 5)));
        assert_eq!(track.entries_at(100).len(), 2);
        assert_eq!(track.len(), 5);
    }

    #[test]
    fn test_exact_lookup() {
        let track = sample_track();
        assert_eq!(track.get(100, 2).map(|e| e.kind.clone()), Some(RewardKind::Powerup));
        assert!(track.get(100, 3).is_none());
        assert!(track.get(101, 1).is_none());
        assert!(track.entries_at(999).is_empty());
    }

    #[test]
    fn test_inclusive_range() {
        let track = sample_track();
        assert_eq!(track.rewards_in_range(0, 100).len(), 3);
        assert_eq!(track.rewards_in_range(100, 250).len(), 3);
        assert_eq!(track.rewards_in_range(101, 249).len(), 0);
        assert_eq!(track.rewards_in_range(300, 100).len(), 0);
        assert_eq!(track.thresholds().collect::<Vec<_>>(), vec![0, 100, 250]);
    }

    #[test]
    fn test_reset_keeps_layout() {
        let mut track = sample_track();
        let entry = track.get_mut(100, 1).unwrap();
        entry.mark_unlocked();
        entry.mark_claimed().unwrap();
        track.get_mut(250, 1).unwrap().mark_unlocked();

        track.reset_flags();

        assert_eq!(track.len(), 4);
        assert!(track.iter().all(|(_, e)| e.state() == RewardState::Locked));
        assert_eq!(track.iter().map(|(t, e)| (t, e.id)).collect::<Vec<_>>(), vec![
            (0, 1),
            (100, 1),
            (100, 2),
            (250, 1)
        ]);
    }
}
