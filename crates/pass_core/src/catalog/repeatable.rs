//! Repeat cycles beyond the finite track
//!
//! Cycle `k` (1-based) lives at `max_points_required + k * interval`. The
//! server usually sends only the first unclaimed cycle, so a cycle with no
//! local entries is "not revealed yet" rather than "empty"; unlock
//! notifications fill those in later.

use super::parser::{parse_threshold_key, CatalogParser, ParsedCatalog};
use super::wire::RepeatableBlock;
use crate::error::PassError;
use crate::reward::RewardTrack;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepeatableSchedule {
    /// Cap of the finite track
    pub base_points: u64,
    pub interval: u64,
    pub max_cycles: u32,
}

impl RepeatableSchedule {
    /// `None` when the interval or cycle count cannot describe any cycle
    pub fn new(base_points: u64, interval: u64, max_cycles: u32) -> Option<Self> {
        if interval == 0 || max_cycles == 0 {
            return None;
        }
        Some(Self { base_points, interval, max_cycles })
    }

    pub fn threshold_for_cycle(&self, cycle: u32) -> u64 {
        self.base_points.saturating_add(self.interval.saturating_mul(u64::from(cycle)))
    }

    /// Which cycle a threshold belongs to, if it sits exactly on the schedule
    pub fn cycle_of(&self, threshold: u64) -> Option<u32> {
        let offset = threshold.checked_sub(self.base_points)?;
        if offset == 0 || offset % self.interval != 0 {
            return None;
        }
        let cycle = u32::try_from(offset / self.interval).ok()?;
        (cycle <= self.max_cycles).then_some(cycle)
    }

    pub fn thresholds(&self) -> impl Iterator<Item = u64> + '_ {
        (1..=self.max_cycles).map(move |cycle| self.threshold_for_cycle(cycle))
    }

    /// First cycle that is not fully claimed across `tracks`.
    ///
    /// A cycle with no local entries is assumed to be the next one the
    /// server will reveal. `None` only when every cycle is present and claimed.
    pub fn current_requirement(&self, tracks: &[&RewardTrack]) -> Option<u64> {
        for threshold in self.thresholds() {
            let mut entries = tracks.iter().flat_map(|track| track.entries_at(threshold)).peekable();
            if entries.peek().is_none() {
                return Some(threshold);
            }
            if entries.any(|entry| !entry.is_claimed()) {
                return Some(threshold);
            }
        }
        None
    }
}

/// Parses the repeatable block into the same tracks as the finite catalog
pub struct RepeatableRewardExtender<'p, 'g> {
    parser: &'p CatalogParser<'g>,
    cycle_limit: u32,
}

impl<'p, 'g> RepeatableRewardExtender<'p, 'g> {
    pub fn new(parser: &'p CatalogParser<'g>, cycle_limit: u32) -> Self {
        Self { parser, cycle_limit }
    }

    /// Derive the schedule from the block and parse every offset it carries
    /// into `catalog`, above its `max_points_required`.
    ///
    /// Offsets off the schedule are reported and skipped. Bank entries in the
    /// block mark the catalog bank-active; they do not add meaningful
    /// thresholds.
    pub fn extend(&self, block: &RepeatableBlock, catalog: &mut ParsedCatalog) -> Option<RepeatableSchedule> {
        let max_points_required = catalog.max_points_required;
        let diagnostics = &mut catalog.diagnostics;
        let interval = u64::try_from(block.pass_points).unwrap_or(0);
        let advertised = u32::try_from(block.max_rewards_count).unwrap_or(0);
        let max_cycles = advertised.min(self.cycle_limit);
        if advertised > self.cycle_limit {
            warn!(advertised, limit = self.cycle_limit, "clamping repeatable cycle count");
        }

        let Some(schedule) = RepeatableSchedule::new(max_points_required, interval, max_cycles) else {
            warn!(
                interval = block.pass_points,
                max_rewards_count = block.max_rewards_count,
                "repeatable block describes no cycles, ignoring"
            );
            diagnostics.push(PassError::NoRepeatableSchedule);
            return None;
        };

        for (key, tiers) in &block.rewards {
            let offset = match parse_threshold_key(key) {
                Ok(offset) => offset,
                Err(err) => {
                    warn!(key = key.as_str(), "skipping repeatable offset: {err}");
                    diagnostics.push(err);
                    continue;
                }
            };

            let threshold = max_points_required.saturating_add(offset);
            if schedule.cycle_of(threshold).is_none() {
                warn!(offset, threshold, "repeatable offset is off the schedule");
                diagnostics.push(PassError::OffSchedule { threshold });
                continue;
            }

            let outcome = self.parser.parse_threshold(
                threshold,
                tiers.as_ref(),
                &mut catalog.silver,
                &mut catalog.gold,
                diagnostics,
            );
            catalog.bank_active |= outcome.bank;
        }

        debug!(
            base = schedule.base_points,
            interval = schedule.interval,
            max_cycles = schedule.max_cycles,
            "repeatable schedule active"
        );
        Some(schedule)
    }
}
