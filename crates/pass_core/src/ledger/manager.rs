use super::bank::BankAccumulator;
use super::signals::{PassSignal, SignalHub, SubscriptionId};
use super::unlock::{UnlockContext, UnlockEventHandler, UnlockOutcome};
use crate::catalog::{
    CatalogParser, CatalogSnapshot, RepeatableRewardExtender, RepeatableSchedule, UnlockNotification,
};
use crate::config::{FeatureGate, PassConfig};
use crate::error::{PassError, Result};
use crate::reward::{ChestItem, PassTier, RewardEntry, RewardKind, RewardState, RewardTrack};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Nearest meaningful thresholds around the current point total
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosestRewards {
    /// Largest threshold `<= points_acquired`; 0 at worst
    pub previous: u64,
    /// Smallest threshold `> points_acquired`, `None` past the last one
    pub next: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimPath {
    /// Threshold within the finite track
    Standard,
    /// Threshold beyond the track's cap
    Repeatable,
}

/// What a successful claim redeemed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimReceipt {
    pub path: ClaimPath,
    pub tier: PassTier,
    pub threshold: u64,
    pub id: i32,
    pub kind: RewardKind,
    pub amount: i64,
    pub chest_items: Vec<ChestItem>,
}

/// Campaign aggregate: both tracks plus the scalar progression fields.
///
/// All entry flag changes go through this type. Single-threaded; a
/// multi-threaded host must serialize access to one instance.
#[derive(Debug)]
pub struct ProgressionLedger {
    gate: FeatureGate,
    cycle_limit: u32,
    silver: RewardTrack,
    gold: RewardTrack,
    thresholds: Vec<u64>,
    points_acquired: u64,
    tier: PassTier,
    max_points_required: u64,
    repeatable: Option<RepeatableSchedule>,
    bank_active: bool,
    bank_coins: i64,
    final_piggy_bank_value: i64,
    unclaimed_rewards: usize,
    diagnostics: Vec<PassError>,
    signals: SignalHub,
}

impl ProgressionLedger {
    /// Build from a full catalog snapshot
    pub fn init(snapshot: &CatalogSnapshot, config: &PassConfig) -> Self {
        let mut ledger = Self {
            gate: config.features.clone(),
            cycle_limit: config.repeatable_cycle_limit,
            silver: RewardTrack::new(PassTier::Silver),
            gold: RewardTrack::new(PassTier::Gold),
            thresholds: vec![0],
            points_acquired: 0,
            tier: PassTier::Silver,
            max_points_required: 0,
            repeatable: None,
            bank_active: false,
            bank_coins: 0,
            final_piggy_bank_value: 0,
            unclaimed_rewards: 0,
            diagnostics: Vec::new(),
            signals: SignalHub::new(),
        };
        ledger.load(snapshot);
        ledger
    }

    /// Replace everything with a fresh snapshot (server refresh or season
    /// rollover). Subscribers are kept and told about the new state.
    pub fn rebuild(&mut self, snapshot: &CatalogSnapshot) {
        let previous_tier = self.tier;
        self.load(snapshot);
        if previous_tier != self.tier {
            self.signals.emit(PassSignal::TierChanged { from: previous_tier, to: self.tier });
        }
        self.emit_progress();
    }

    fn load(&mut self, snapshot: &CatalogSnapshot) {
        let parser = CatalogParser::new(&self.gate);
        let mut catalog = parser.parse(&snapshot.reward_track);

        let repeatable = snapshot
            .repeatable_rewards
            .as_ref()
            .and_then(|block| RepeatableRewardExtender::new(&parser, self.cycle_limit).extend(block, &mut catalog));

        let final_value =
            BankAccumulator::new(&catalog.thresholds, &catalog.silver, &catalog.gold).final_value();

        let points_acquired = u64::try_from(snapshot.pass_points).unwrap_or_else(|_| {
            warn!(pass_points = snapshot.pass_points, "negative pass points in snapshot, using 0");
            catalog.diagnostics.push(PassError::NegativePoints(snapshot.pass_points));
            0
        });

        let tier = PassTier::from_name(&snapshot.pass_type).unwrap_or_else(|| {
            warn!(pass_type = snapshot.pass_type.as_str(), "unknown pass type in snapshot, using silver");
            catalog.diagnostics.push(PassError::UnknownTier(snapshot.pass_type.clone()));
            PassTier::Silver
        });

        self.silver = catalog.silver;
        self.gold = catalog.gold;
        self.thresholds = catalog.thresholds;
        self.max_points_required = catalog.max_points_required;
        self.bank_active = catalog.bank_active;
        self.diagnostics = catalog.diagnostics;
        self.repeatable = repeatable;
        self.final_piggy_bank_value = final_value;
        self.points_acquired = points_acquired;
        self.bank_coins = snapshot.bank_coins;
        self.tier = tier;
        self.refresh_unclaimed();

        info!(
            points_acquired,
            %tier,
            max_points_required = self.max_points_required,
            entries = self.silver.len() + self.gold.len(),
            skipped = self.diagnostics.len(),
            "progression ledger loaded"
        );
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn points_acquired(&self) -> u64 {
        self.points_acquired
    }

    pub fn tier(&self) -> PassTier {
        self.tier
    }

    pub fn max_points_required(&self) -> u64 {
        self.max_points_required
    }

    pub fn repeatable_schedule(&self) -> Option<&RepeatableSchedule> {
        self.repeatable.as_ref()
    }

    /// Interval between repeat cycles, 0 without a schedule
    pub fn repeatable_rewards_points_required(&self) -> u64 {
        self.repeatable.map(|schedule| schedule.interval).unwrap_or(0)
    }

    pub fn max_repeatable_rewards(&self) -> u32 {
        self.repeatable.map(|schedule| schedule.max_cycles).unwrap_or(0)
    }

    pub fn bank_coins(&self) -> i64 {
        self.bank_coins
    }

    /// Bank coins are supplied by the host, never derived here
    pub fn set_bank_coins(&mut self, coins: i64) {
        self.bank_coins = coins;
    }

    pub fn is_bank_active(&self) -> bool {
        self.bank_active
    }

    pub fn final_piggy_bank_value(&self) -> i64 {
        self.final_piggy_bank_value
    }

    /// Bank value counting only thresholds up to `points`
    pub fn bank_value_for_points(&self, points: u64) -> i64 {
        BankAccumulator::new(&self.thresholds, &self.silver, &self.gold).value_until(points)
    }

    /// Meaningful thresholds of the finite track, ascending, starting at 0
    pub fn thresholds(&self) -> &[u64] {
        &self.thresholds
    }

    pub fn track(&self, tier: PassTier) -> &RewardTrack {
        match tier {
            PassTier::Silver => &self.silver,
            PassTier::Gold => &self.gold,
        }
    }

    fn track_mut(&mut self, tier: PassTier) -> &mut RewardTrack {
        match tier {
            PassTier::Silver => &mut self.silver,
            PassTier::Gold => &mut self.gold,
        }
    }

    /// Problems skipped while loading the last snapshot
    pub fn diagnostics(&self) -> &[PassError] {
        &self.diagnostics
    }

    /// Cached claimable count for the player's tier
    pub fn unclaimed_rewards(&self) -> usize {
        self.unclaimed_rewards
    }

    pub fn subscribe<F>(&mut self, subscriber: F) -> SubscriptionId
    where
        F: FnMut(&PassSignal) + 'static,
    {
        self.signals.subscribe(subscriber)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.signals.unsubscribe(id)
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Add points locally. Never unlocks anything; unlocking only happens
    /// through server notifications.
    pub fn increment_points(&mut self, amount: i64) -> Result<u64> {
        if amount <= 0 {
            return refuse(PassError::InvalidIncrement(amount));
        }
        self.points_acquired = self.points_acquired.saturating_add(amount.unsigned_abs());
        debug!(amount, points_acquired = self.points_acquired, "points incremented");
        self.refresh_unclaimed();
        self.emit_progress();
        Ok(self.points_acquired)
    }

    /// Apply a server unlock notification. Notifications must be applied in
    /// the order they were received.
    pub fn apply_unlock(&mut self, notification: &UnlockNotification) -> Result<UnlockOutcome> {
        let context = UnlockContext {
            max_points_required: self.max_points_required,
            schedule: self.repeatable.as_ref(),
        };
        let handler = UnlockEventHandler::new(&self.gate);
        let outcome = match handler.apply(notification, context, &mut self.silver, &mut self.gold) {
            Ok(outcome) => outcome,
            Err(err) => return refuse(err),
        };

        if outcome.changed() {
            self.refresh_unclaimed();
            self.emit_progress();
        }
        Ok(outcome)
    }

    /// Redeem an unlocked entry. Thresholds above the finite track's cap go
    /// through the repeatable path.
    pub fn claim_reward(&mut self, tier: PassTier, id: i32, points: u64) -> Result<ClaimReceipt> {
        let path = if points > self.max_points_required {
            ClaimPath::Repeatable
        } else {
            ClaimPath::Standard
        };

        if path == ClaimPath::Repeatable {
            let Some(schedule) = self.repeatable else {
                return refuse(PassError::NoRepeatableSchedule);
            };
            if schedule.cycle_of(points).is_none() {
                return refuse(PassError::OffSchedule { threshold: points });
            }
        }

        let Some(entry) = self.track_mut(tier).get_mut(points, id) else {
            return refuse(PassError::RewardNotFound { tier, threshold: points, id });
        };

        if let Err(state) = entry.mark_claimed() {
            let err = match state {
                RewardState::Locked => PassError::RewardLocked { tier, threshold: points, id },
                _ => PassError::AlreadyClaimed { tier, threshold: points, id },
            };
            return refuse(err);
        }

        let receipt = receipt(path, tier, points, entry);
        info!(%tier, threshold = points, id, ?path, "reward claimed");

        self.refresh_unclaimed();
        self.emit_progress();
        if path == ClaimPath::Repeatable {
            debug!(next = ?self.get_current_repeatable_chest_requirement(), "repeatable requirement after claim");
        }
        Ok(receipt)
    }

    /// Back to a fresh season: no points, silver tier, every entry locked.
    /// Catalog structure is kept.
    pub fn full_reset(&mut self) {
        self.silver.reset_flags();
        self.gold.reset_flags();
        self.points_acquired = 0;
        let previous_tier = self.tier;
        self.tier = PassTier::Silver;
        self.refresh_unclaimed();

        info!("progression ledger reset");
        if previous_tier != PassTier::Silver {
            self.signals.emit(PassSignal::TierChanged { from: previous_tier, to: PassTier::Silver });
        }
        self.emit_progress();
    }

    /// Returns false when already on `new_tier`
    pub fn upgrade_tier(&mut self, new_tier: PassTier) -> bool {
        self.set_tier(new_tier)
    }

    pub fn downgrade_to_base_tier(&mut self) -> bool {
        self.set_tier(PassTier::Silver)
    }

    fn set_tier(&mut self, new_tier: PassTier) -> bool {
        if self.tier == new_tier {
            debug!(tier = %new_tier, "tier unchanged");
            return false;
        }
        let previous = self.tier;
        self.tier = new_tier;
        self.refresh_unclaimed();
        info!(from = %previous, to = %new_tier, "pass tier changed");
        self.signals.emit(PassSignal::TierChanged { from: previous, to: new_tier });
        true
    }

    fn refresh_unclaimed(&mut self) {
        self.unclaimed_rewards = self.get_number_of_unclaimed_rewards(false);
    }

    fn emit_progress(&mut self) {
        self.signals.emit(PassSignal::ProgressChanged {
            points_acquired: self.points_acquired,
            unclaimed_rewards: self.unclaimed_rewards,
        });
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Entries with `min <= threshold <= max`, unordered
    pub fn get_all_rewards_in_range(&self, tier: PassTier, min: u64, max: u64) -> Vec<&RewardEntry> {
        self.track(tier).rewards_in_range(min, max)
    }

    pub fn get_all_rewards_for_point_total(&self, tier: PassTier, points: u64) -> Vec<&RewardEntry> {
        self.get_all_rewards_in_range(tier, 0, points)
    }

    pub fn get_reward(&self, tier: PassTier, threshold: u64, id: i32) -> Option<&RewardEntry> {
        self.track(tier).get(threshold, id)
    }

    /// Silver looks at silver thresholds only, gold at both tracks
    pub fn get_closest_rewards(&self) -> ClosestRewards {
        let tiers = self.tier.accessible_tiers();
        let candidates = self.thresholds.iter().copied().filter(|&threshold| {
            threshold == 0 || tiers.iter().any(|tier| self.track(*tier).has_rewards_at(threshold))
        });

        let mut closest = ClosestRewards { previous: 0, next: None };
        for threshold in candidates {
            if threshold <= self.points_acquired {
                closest.previous = threshold;
            } else {
                closest.next = Some(threshold);
                break;
            }
        }
        closest
    }

    /// Unlocked, unclaimed entries at thresholds already reached
    pub fn get_number_of_unclaimed_rewards(&self, include_all_tier_rewards: bool) -> usize {
        let tiers: &[PassTier] = if include_all_tier_rewards {
            &PassTier::ALL
        } else {
            self.tier.accessible_tiers()
        };

        tiers
            .iter()
            .map(|tier| {
                self.track(*tier)
                    .rewards_in_range(0, self.points_acquired)
                    .into_iter()
                    .filter(|entry| entry.is_claimable())
                    .count()
            })
            .sum()
    }

    /// Threshold of the first repeat cycle that is not fully claimed
    pub fn get_current_repeatable_chest_requirement(&self) -> Option<u64> {
        let schedule = self.repeatable.as_ref()?;
        let tracks: Vec<&RewardTrack> =
            self.tier.accessible_tiers().iter().map(|tier| self.track(*tier)).collect();
        schedule.current_requirement(&tracks)
    }
}

fn receipt(path: ClaimPath, tier: PassTier, threshold: u64, entry: &RewardEntry) -> ClaimReceipt {
    ClaimReceipt {
        path,
        tier,
        threshold,
        id: entry.id,
        kind: entry.kind.clone(),
        amount: entry.amount,
        chest_items: entry.chest_items.clone(),
    }
}

fn refuse<T>(err: PassError) -> Result<T> {
    warn!(class = ?err.class(), "{err}");
    Err(err)
}
