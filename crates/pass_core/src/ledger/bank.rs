use crate::reward::{RewardEntry, RewardKind, RewardTrack};

/// Replays bank rewards into one running total.
///
/// Thresholds are walked ascending; within a threshold silver entries go
/// before gold entries. Base entries add, multiplier entries multiply, and
/// the two do not commute, so this order must not change.
pub struct BankAccumulator<'a> {
    thresholds: &'a [u64],
    silver: &'a RewardTrack,
    gold: &'a RewardTrack,
}

impl<'a> BankAccumulator<'a> {
    /// `thresholds` must be sorted ascending
    pub fn new(thresholds: &'a [u64], silver: &'a RewardTrack, gold: &'a RewardTrack) -> Self {
        debug_assert!(thresholds.windows(2).all(|pair| pair[0] < pair[1]));
        Self { thresholds, silver, gold }
    }

    /// Value once every threshold has been passed
    pub fn final_value(&self) -> i64 {
        self.value_until(u64::MAX)
    }

    /// Value counting only thresholds `<= points`
    pub fn value_until(&self, points: u64) -> i64 {
        let mut total = 0i64;
        for &threshold in self.thresholds.iter().take_while(|&&threshold| threshold <= points) {
            for entry in self.silver.entries_at(threshold).iter().chain(self.gold.entries_at(threshold)) {
                total = apply(total, entry);
            }
        }
        total
    }
}

fn apply(total: i64, entry: &RewardEntry) -> i64 {
    match entry.kind {
        RewardKind::BankBase => total.saturating_add(entry.amount),
        RewardKind::BankMultiplier => total.saturating_mul(entry.amount),
        _ => total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reward::PassTier;

    fn bank(kind: RewardKind, id: i32, amount: i64) -> RewardEntry {
        RewardEntry::new(id, kind, amount)
    }

    #[test]
    fn test_threshold_order_is_preserved() {
        let mut silver = RewardTrack::new(PassTier::Silver);
        let gold = RewardTrack::new(PassTier::Gold);
        silver.insert(0, bank(RewardKind::BankBase, 1, 100));
        silver.insert(100, bank(RewardKind::BankMultiplier, 1, 2));
        silver.insert(200, bank(RewardKind::BankBase, 1, 50));

        let thresholds = [0, 100, 200];
        let accumulator = BankAccumulator::new(&thresholds, &silver, &gold);
        // (100 * 2) + 50, not (100 + 50) * 2
        assert_eq!(accumulator.final_value(), 250);
        assert_eq!(accumulator.value_until(0), 100);
        assert_eq!(accumulator.value_until(150), 200);
    }

    #[test]
    fn test_silver_before_gold_within_threshold() {
        let mut silver = RewardTrack::new(PassTier::Silver);
        let mut gold = RewardTrack::new(PassTier::Gold);
        silver.insert(0, bank(RewardKind::BankBase, 1, 10));
        silver.insert(100, bank(RewardKind::BankBase, 1, 5));
        gold.insert(100, bank(RewardKind::BankMultiplier, 1, 3));

        let thresholds = [0, 100];
        // (10 + 5) * 3; gold-first would give 10 * 3 + 5 = 35
        assert_eq!(BankAccumulator::new(&thresholds, &silver, &gold).final_value(), 45);
    }

    #[test]
    fn test_non_bank_entries_and_unlisted_thresholds_ignored() {
        let mut silver = RewardTrack::new(PassTier::Silver);
        let gold = RewardTrack::new(PassTier::Gold);
        silver.insert(0, bank(RewardKind::Currency, 1, 1000));
        silver.insert(0, bank(RewardKind::BankBase, 2, 7));
        // Beyond the finite track, not part of the walk
        silver.insert(1500, bank(RewardKind::BankMultiplier, 1, 10));

        let thresholds = [0];
        assert_eq!(BankAccumulator::new(&thresholds, &silver, &gold).final_value(), 7);
    }

    #[test]
    fn test_saturates_instead_of_overflowing() {
        let mut silver = RewardTrack::new(PassTier::Silver);
        let gold = RewardTrack::new(PassTier::Gold);
        silver.insert(0, bank(RewardKind::BankBase, 1, i64::MAX - 1));
        silver.insert(10, bank(RewardKind::BankMultiplier, 1, 4));

        let thresholds = [0, 10];
        assert_eq!(BankAccumulator::new(&thresholds, &silver, &gold).final_value(), i64::MAX);
    }
}
