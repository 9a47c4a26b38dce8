use super::wire::{RewardDescriptor, ThresholdTable, TierRecords};
use crate::config::FeatureGate;
use crate::error::{PassError, Result};
use crate::reward::{ChestItem, PassTier, RewardEntry, RewardKind, RewardState, RewardTrack};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Parse a stringified threshold key as a non-negative integer
pub fn parse_threshold_key(key: &str) -> Result<u64> {
    key.trim().parse::<u64>().map_err(|_| PassError::MalformedThreshold { key: key.to_string() })
}

/// Decode one raw descriptor, attributing failures to its threshold
pub(crate) fn decode_descriptor(threshold: u64, raw: &serde_json::Value) -> Result<RewardDescriptor> {
    serde_json::from_value(raw.clone())
        .map_err(|err| PassError::MalformedReward { threshold, reason: err.to_string() })
}

/// Result of parsing the finite reward track
#[derive(Debug)]
pub struct ParsedCatalog {
    pub silver: RewardTrack,
    pub gold: RewardTrack,
    /// Sorted, de-duplicated thresholds where at least one reward was
    /// eligible. Always starts with 0.
    pub thresholds: Vec<u64>,
    pub max_points_required: u64,
    /// Any bank-base/bank-multiplier entry was seen
    pub bank_active: bool,
    /// Everything skipped along the way
    pub diagnostics: Vec<PassError>,
}

impl ParsedCatalog {
    fn empty() -> Self {
        Self {
            silver: RewardTrack::new(PassTier::Silver),
            gold: RewardTrack::new(PassTier::Gold),
            thresholds: Vec::new(),
            max_points_required: 0,
            bank_active: false,
            diagnostics: Vec::new(),
        }
    }

    pub fn track(&self, tier: PassTier) -> &RewardTrack {
        match tier {
            PassTier::Silver => &self.silver,
            PassTier::Gold => &self.gold,
        }
    }
}

/// What one threshold contributed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ThresholdOutcome {
    pub eligible: bool,
    pub bank: bool,
}

/// Builds reward tracks from the nested catalog record, applying feature
/// eligibility on the way in.
pub struct CatalogParser<'a> {
    gate: &'a FeatureGate,
}

impl<'a> CatalogParser<'a> {
    pub fn new(gate: &'a FeatureGate) -> Self {
        Self { gate }
    }

    pub fn parse(&self, table: &ThresholdTable) -> ParsedCatalog {
        let mut catalog = ParsedCatalog::empty();
        let mut meaningful = BTreeSet::new();

        for (key, tiers) in table {
            let threshold = match parse_threshold_key(key) {
                Ok(threshold) => threshold,
                Err(err) => {
                    warn!(key = key.as_str(), "skipping reward threshold: {err}");
                    catalog.diagnostics.push(err);
                    continue;
                }
            };

            let outcome = self.parse_threshold(
                threshold,
                tiers.as_ref(),
                &mut catalog.silver,
                &mut catalog.gold,
                &mut catalog.diagnostics,
            );
            if outcome.eligible {
                meaningful.insert(threshold);
            }
            catalog.bank_active |= outcome.bank;
        }

        catalog.max_points_required = meaningful.iter().next_back().copied().unwrap_or(0);
        catalog.thresholds = meaningful.into_iter().collect();
        // Anchor for "previous threshold" lookups; never holds rewards of its own
        if catalog.thresholds.first() != Some(&0) {
            catalog.thresholds.insert(0, 0);
        }

        debug!(
            thresholds = catalog.thresholds.len(),
            max_points_required = catalog.max_points_required,
            skipped = catalog.diagnostics.len(),
            "parsed reward catalog"
        );
        catalog
    }

    /// Parse every tier record at one threshold into the two tracks
    pub(crate) fn parse_threshold(
        &self,
        threshold: u64,
        tiers: Option<&TierRecords>,
        silver: &mut RewardTrack,
        gold: &mut RewardTrack,
        diagnostics: &mut Vec<PassError>,
    ) -> ThresholdOutcome {
        let mut outcome = ThresholdOutcome::default();
        let Some(tiers) = tiers else {
            warn!(threshold, "null reward record");
            diagnostics.push(PassError::NullThreshold(threshold));
            return outcome;
        };

        for (tier_name, record) in tiers {
            let Some(tier) = PassTier::from_name(tier_name) else {
                warn!(threshold, tier = tier_name.as_str(), "unknown tier in reward catalog");
                diagnostics.push(PassError::UnknownTier(tier_name.clone()));
                continue;
            };

            let record = match record {
                Some(record) if !record.rewards.is_empty() => record,
                _ => {
                    warn!(threshold, %tier, "empty reward record");
                    diagnostics.push(PassError::EmptyRecord { tier: tier_name.clone(), threshold });
                    continue;
                }
            };

            let track = match tier {
                PassTier::Silver => &mut *silver,
                PassTier::Gold => &mut *gold,
            };

            for raw in &record.rewards {
                let descriptor = match decode_descriptor(threshold, raw) {
                    Ok(descriptor) => descriptor,
                    Err(err) => {
                        warn!(threshold, %tier, "skipping reward: {err}");
                        diagnostics.push(err);
                        continue;
                    }
                };

                let Some(entry) = self.entry_from_descriptor(&descriptor) else {
                    debug!(threshold, %tier, id = descriptor.id, kind = descriptor.kind.as_str(), "reward not available on this client");
                    continue;
                };

                outcome.eligible = true;
                outcome.bank |= entry.kind.is_bank();

                let state = initial_state(tier, threshold, &descriptor, record.is_unlocked, diagnostics);
                let id = entry.id;
                if !track.insert(threshold, entry.with_state(state)) {
                    warn!(threshold, %tier, id, "duplicate reward id");
                    diagnostics.push(PassError::DuplicateReward { tier, threshold, id });
                }
            }
        }

        outcome
    }

    /// Build a locked entry from a descriptor, or `None` when the feature
    /// gate excludes it
    pub fn entry_from_descriptor(&self, descriptor: &RewardDescriptor) -> Option<RewardEntry> {
        let kind = RewardKind::from_wire(&descriptor.kind);
        let chest_items: Vec<ChestItem> = if kind == RewardKind::Chest {
            descriptor.rewards.iter().map(|item| item.to_chest_item()).collect()
        } else {
            Vec::new()
        };

        let eligible = match kind {
            RewardKind::Chest => self.gate.admits_chest(&chest_items),
            ref other => self.gate.admits(other),
        };
        if !eligible {
            return None;
        }

        let (amount, label) = descriptor.value.split();
        let mut entry = RewardEntry::new(descriptor.id, kind, amount);
        entry.label = label;
        entry.rarity = descriptor.rarity.clone();
        entry.image = descriptor.image.clone();
        entry.chest_items = chest_items;
        Some(entry)
    }
}

/// Starting state from the record's unlock flag and the descriptor's claim
/// flag. A claim on a locked record is dropped and reported.
fn initial_state(
    tier: PassTier,
    threshold: u64,
    descriptor: &RewardDescriptor,
    unlocked: bool,
    diagnostics: &mut Vec<PassError>,
) -> RewardState {
    match (unlocked, descriptor.is_claimed) {
        (true, true) => RewardState::Claimed,
        (true, false) => RewardState::Unlocked,
        (false, false) => RewardState::Locked,
        (false, true) => {
            warn!(threshold, %tier, id = descriptor.id, "claimed reward on a locked record, treating as locked");
            diagnostics.push(PassError::RewardLocked { tier, threshold, id: descriptor.id });
            RewardState::Locked
        }
    }
}
