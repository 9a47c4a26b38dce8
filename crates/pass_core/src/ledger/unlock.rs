use crate::catalog::parser::{decode_descriptor, CatalogParser};
use crate::catalog::{RepeatableSchedule, UnlockNotification};
use crate::config::FeatureGate;
use crate::error::{PassError, Result};
use crate::reward::{PassTier, RewardTrack};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Ledger facts the handler needs to place a notification
#[derive(Debug, Clone, Copy)]
pub struct UnlockContext<'s> {
    pub max_points_required: u64,
    pub schedule: Option<&'s RepeatableSchedule>,
}

/// What one notification changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnlockOutcome {
    pub tier: PassTier,
    pub threshold: u64,
    /// Entries moved from locked to unlocked
    pub unlocked: usize,
    /// Entries that were already unlocked or claimed
    pub unchanged: usize,
    /// Repeatable entries created from the payload
    pub synthesized: usize,
    /// Undecodable or unavailable descriptors
    pub skipped: usize,
    /// Ids the server unlocked that this ledger does not know about
    pub missing: Vec<i32>,
    /// Payload said `is_unlocked: false`; nothing was applied
    pub ignored: bool,
}

impl UnlockOutcome {
    fn new(tier: PassTier, threshold: u64) -> Self {
        Self {
            tier,
            threshold,
            unlocked: 0,
            unchanged: 0,
            synthesized: 0,
            skipped: 0,
            missing: Vec::new(),
            ignored: false,
        }
    }

    pub fn changed(&self) -> bool {
        self.unlocked > 0 || self.synthesized > 0
    }
}

/// Applies server unlock notifications to the tracks.
///
/// Re-applying a notification is a no-op. Repeatable cycles that were never
/// fetched locally are created from the payload.
pub struct UnlockEventHandler<'g> {
    parser: CatalogParser<'g>,
}

impl<'g> UnlockEventHandler<'g> {
    pub fn new(gate: &'g FeatureGate) -> Self {
        Self { parser: CatalogParser::new(gate) }
    }

    pub fn apply(
        &self,
        notification: &UnlockNotification,
        context: UnlockContext<'_>,
        silver: &mut RewardTrack,
        gold: &mut RewardTrack,
    ) -> Result<UnlockOutcome> {
        let repeatable = notification.kind.is_repeatable();
        let points = u64::try_from(notification.cumulative_points)
            .map_err(|_| PassError::NegativePoints(notification.cumulative_points))?;

        let threshold = if repeatable {
            let threshold = context.max_points_required.saturating_add(points);
            let schedule = context.schedule.ok_or(PassError::NoRepeatableSchedule)?;
            if schedule.cycle_of(threshold).is_none() {
                return Err(PassError::OffSchedule { threshold });
            }
            threshold
        } else {
            points
        };

        let tier = PassTier::from_name(&notification.pass_type)
            .ok_or_else(|| PassError::UnknownTier(notification.pass_type.clone()))?;
        let track = match tier {
            PassTier::Silver => silver,
            PassTier::Gold => gold,
        };

        let mut outcome = UnlockOutcome::new(tier, threshold);
        let payload = &notification.unlocked_reward_data;
        if !payload.is_unlocked {
            debug!(threshold, %tier, "unlock payload not marked unlocked, ignoring");
            outcome.ignored = true;
            return Ok(outcome);
        }

        for raw in &payload.rewards {
            let descriptor = match decode_descriptor(threshold, raw) {
                Ok(descriptor) => descriptor,
                Err(err) => {
                    warn!(threshold, %tier, "skipping unlocked reward: {err}");
                    outcome.skipped += 1;
                    continue;
                }
            };

            if let Some(entry) = track.get_mut(threshold, descriptor.id) {
                if entry.mark_unlocked() {
                    outcome.unlocked += 1;
                } else {
                    outcome.unchanged += 1;
                }
                continue;
            }

            if !repeatable {
                warn!(threshold, %tier, id = descriptor.id, "server unlocked a reward this ledger does not have");
                outcome.missing.push(descriptor.id);
                continue;
            }

            match self.parser.entry_from_descriptor(&descriptor) {
                Some(mut entry) => {
                    entry.mark_unlocked();
                    track.insert(threshold, entry);
                    outcome.synthesized += 1;
                }
                None => {
                    debug!(threshold, %tier, id = descriptor.id, "repeatable reward not available on this client");
                    outcome.skipped += 1;
                }
            }
        }

        info!(
            threshold,
            %tier,
            unlocked = outcome.unlocked,
            synthesized = outcome.synthesized,
            missing = outcome.missing.len(),
            "applied unlock notification"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::UnlockKind;
    use crate::reward::{RewardEntry, RewardKind, RewardState};
    use serde_json::json;

    fn notification(points: i64, tier: &str, kind: UnlockKind, rewards: serde_json::Value) -> UnlockNotification {
        serde_json::from_value(json!({
            "cumulative_points": points,
            "pass_type": tier,
            "type": kind,
            "unlocked_reward_data": {"is_unlocked": true, "rewards": rewards}
        }))
        .unwrap()
    }

    fn tracks() -> (RewardTrack, RewardTrack) {
        let mut silver = RewardTrack::new(PassTier::Silver);
        let mut gold = RewardTrack::new(PassTier::Gold);
        silver.insert(100, RewardEntry::new(1, RewardKind::Currency, 10));
        gold.insert(100, RewardEntry::new(1, RewardKind::CardPack, 1));
        gold.insert(1500, RewardEntry::new(5, RewardKind::Chest, 1));
        (silver, gold)
    }

    #[test]
    fn test_normal_unlock_is_idempotent() {
        let gate = FeatureGate::all_enabled();
        let handler = UnlockEventHandler::new(&gate);
        let (mut silver, mut gold) = tracks();
        let context = UnlockContext { max_points_required: 1000, schedule: None };
        let message = notification(100, "gold", UnlockKind::RewardNodeUnlock, json!([{"id": 1, "type": "card_pack", "value": 1}]));

        let first = handler.apply(&message, context, &mut silver, &mut gold).unwrap();
        assert_eq!(first.unlocked, 1);
        assert!(first.changed());
        assert_eq!(gold.get(100, 1).unwrap().state(), RewardState::Unlocked);
        assert_eq!(silver.get(100, 1).unwrap().state(), RewardState::Locked);

        let snapshot = gold.clone();
        let second = handler.apply(&message, context, &mut silver, &mut gold).unwrap();
        assert_eq!(second.unchanged, 1);
        assert!(!second.changed());
        assert_eq!(gold, snapshot);
    }

    #[test]
    fn test_normal_unlock_of_unknown_id_is_reported() {
        let gate = FeatureGate::all_enabled();
        let handler = UnlockEventHandler::new(&gate);
        let (mut silver, mut gold) = tracks();
        let context = UnlockContext { max_points_required: 1000, schedule: None };
        let message = notification(100, "silver", UnlockKind::RewardNodeUnlock, json!([{"id": 42, "type": "currency", "value": 1}]));

        let outcome = handler.apply(&message, context, &mut silver, &mut gold).unwrap();
        assert_eq!(outcome.missing, vec![42]);
        assert_eq!(silver.len(), 1);
    }

    #[test]
    fn test_repeatable_unlock_synthesizes_unknown_cycles() {
        let gate = FeatureGate::all_enabled();
        let handler = UnlockEventHandler::new(&gate);
        let (mut silver, mut gold) = tracks();
        let schedule = RepeatableSchedule::new(1000, 500, 3).unwrap();
        let context = UnlockContext { max_points_required: 1000, schedule: Some(&schedule) };

        // Known cycle 1 at offset 500
        let known = notification(500, "gold", UnlockKind::RepeatNodeUnlock, json!([{"id": 5, "type": "chest", "value": 1}]));
        let outcome = handler.apply(&known, context, &mut silver, &mut gold).unwrap();
        assert_eq!((outcome.threshold, outcome.unlocked, outcome.synthesized), (1500, 1, 0));

        // Cycle 3 was never fetched
        let unseen = notification(1500, "gold", UnlockKind::RepeatNodeUnlock, json!([{"id": 5, "type": "chest", "value": 1, "rewards": [{"type": "currency", "value": 300}]}]));
        let outcome = handler.apply(&unseen, context, &mut silver, &mut gold).unwrap();
        assert_eq!((outcome.threshold, outcome.synthesized), (2500, 1));
        let synthesized = gold.get(2500, 5).unwrap();
        assert_eq!(synthesized.state(), RewardState::Unlocked);
        assert_eq!(synthesized.chest_items.len(), 1);

        // Replaying it finds the synthesized entry
        let outcome = handler.apply(&unseen, context, &mut silver, &mut gold).unwrap();
        assert_eq!((outcome.synthesized, outcome.unchanged), (0, 1));
        assert_eq!(gold.entries_at(2500).len(), 1);
    }

    #[test]
    fn test_repeatable_beyond_last_cycle_is_rejected() {
        let gate = FeatureGate::all_enabled();
        let handler = UnlockEventHandler::new(&gate);
        let (mut silver, mut gold) = tracks();
        let schedule = RepeatableSchedule::new(1000, 500, 3).unwrap();
        let context = UnlockContext { max_points_required: 1000, schedule: Some(&schedule) };

        let message = notification(2000, "gold", UnlockKind::RepeatNodeUnlock, json!([{"id": 5, "type": "chest", "value": 1}]));
        let err = handler.apply(&message, context, &mut silver, &mut gold).unwrap_err();
        assert!(matches!(err, PassError::OffSchedule { threshold: 3000 }));

        let no_schedule = UnlockContext { max_points_required: 1000, schedule: None };
        let message = notification(500, "gold", UnlockKind::RepeatNodeUnlock, json!([]));
        let err = handler.apply(&message, no_schedule, &mut silver, &mut gold).unwrap_err();
        assert!(matches!(err, PassError::NoRepeatableSchedule));
    }

    #[test]
    fn test_unknown_tier_and_negative_points() {
        let gate = FeatureGate::all_enabled();
        let handler = UnlockEventHandler::new(&gate);
        let (mut silver, mut gold) = tracks();
        let context = UnlockContext { max_points_required: 1000, schedule: None };

        let message = notification(100, "platinum", UnlockKind::RewardNodeUnlock, json!([{"id": 1, "type": "currency"}]));
        assert!(matches!(
            handler.apply(&message, context, &mut silver, &mut gold),
            Err(PassError::UnknownTier(_))
        ));

        let message = notification(-5, "silver", UnlockKind::RewardNodeUnlock, json!([]));
        assert!(matches!(
            handler.apply(&message, context, &mut silver, &mut gold),
            Err(PassError::NegativePoints(-5))
        ));
    }

    #[test]
    fn test_payload_not_unlocked_is_ignored() {
        let gate = FeatureGate::all_enabled();
        let handler = UnlockEventHandler::new(&gate);
        let (mut silver, mut gold) = tracks();
        let context = UnlockContext { max_points_required: 1000, schedule: None };
        let mut message = notification(100, "silver", UnlockKind::RewardNodeUnlock, json!([{"id": 1, "type": "currency"}]));
        message.unlocked_reward_data.is_unlocked = false;

        let outcome = handler.apply(&message, context, &mut silver, &mut gold).unwrap();
        assert!(outcome.ignored);
        assert!(!silver.get(100, 1).unwrap().is_unlocked());
    }

    #[test]
    fn test_gated_repeatable_is_skipped() {
        let gate = FeatureGate { card_packs: false, ..FeatureGate::all_enabled() };
        let handler = UnlockEventHandler::new(&gate);
        let (mut silver, mut gold) = tracks();
        let schedule = RepeatableSchedule::new(1000, 500, 3).unwrap();
        let context = UnlockContext { max_points_required: 1000, schedule: Some(&schedule) };

        let message = notification(1000, "gold", UnlockKind::RepeatNodeUnlock, json!([{"id": 8, "type": "card_pack", "value": 1}, {"bad": true}]));
        let outcome = handler.apply(&message, context, &mut silver, &mut gold).unwrap();
        assert_eq!(outcome.skipped, 2);
        assert!(gold.entries_at(2000).is_empty());
    }
}
