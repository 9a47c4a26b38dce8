//! Inbound message shapes
//!
//! Thresholds and offsets arrive as string keys; they are kept as strings
//! here so that one bad key only costs its own bucket. Reward descriptors
//! are decoded one by one for the same reason.

use crate::reward::{ChestItem, RewardKind};
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// `<tier> -> record` at one threshold
pub type TierRecords = BTreeMap<String, Option<TierRewardsRecord>>;

/// `<threshold> -> <tier> -> record`. A null at either level is kept so the
/// parser can skip just that bucket.
pub type ThresholdTable = BTreeMap<String, Option<TierRecords>>;

/// Full catalog snapshot sent at session start or on authoritative refresh
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CatalogSnapshot {
    #[serde(default)]
    pub pass_points: i64,
    #[serde(default = "default_pass_type")]
    pub pass_type: String,
    #[serde(default)]
    pub bank_coins: i64,
    #[serde(default)]
    pub reward_track: ThresholdTable,
    #[serde(default)]
    pub repeatable_rewards: Option<RepeatableBlock>,
}

fn default_pass_type() -> String {
    "silver".to_string()
}

/// Rewards of one tier at one threshold
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct TierRewardsRecord {
    #[serde(default)]
    pub is_unlocked: bool,
    /// Raw descriptors, see [`RewardDescriptor`]. `null` reads as empty.
    #[serde(default, deserialize_with = "null_as_empty")]
    #[schemars(with = "Option<Vec<serde_json::Value>>")]
    pub rewards: Vec<serde_json::Value>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<serde_json::Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<serde_json::Value>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Repeat cycles beyond the finite track
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct RepeatableBlock {
    /// Interval between cycles
    pub pass_points: i64,
    pub max_rewards_count: i32,
    /// Keyed by offset above the finite track's cap
    #[serde(default)]
    pub rewards: ThresholdTable,
}

/// Numeric amount or free text (powerup names and similar)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum RewardValue {
    Amount(i64),
    Text(String),
}

impl Default for RewardValue {
    fn default() -> Self {
        RewardValue::Amount(0)
    }
}

impl RewardValue {
    /// Numeric amount plus leftover label for non-numeric text
    pub fn split(&self) -> (i64, Option<String>) {
        match self {
            RewardValue::Amount(amount) => (*amount, None),
            RewardValue::Text(text) => match text.trim().parse::<i64>() {
                Ok(amount) => (amount, None),
                Err(_) => (0, Some(text.clone())),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RewardItemDescriptor {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub value: RewardValue,
}

impl RewardItemDescriptor {
    pub fn to_chest_item(&self) -> ChestItem {
        ChestItem { kind: RewardKind::from_wire(&self.kind), amount: self.value.split().0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RewardDescriptor {
    pub id: i32,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub value: RewardValue,
    #[serde(default)]
    pub rarity: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub is_claimed: bool,
    /// Chest contents
    #[serde(default)]
    pub rewards: Vec<RewardItemDescriptor>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum UnlockKind {
    RewardNodeUnlock,
    RepeatNodeUnlock,
}

impl UnlockKind {
    pub fn is_repeatable(&self) -> bool {
        matches!(self, UnlockKind::RepeatNodeUnlock)
    }
}

/// Server push: rewards at one threshold became claimable
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UnlockNotification {
    pub cumulative_points: i64,
    pub pass_type: String,
    #[serde(rename = "type")]
    pub kind: UnlockKind,
    pub unlocked_reward_data: TierRewardsRecord,
}

/// Server reply to a claim request
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ClaimAcknowledgement {
    #[serde(default)]
    pub rewards: Vec<RewardItemDescriptor>,
}

impl ClaimAcknowledgement {
    /// Sum of currency granted, for display. Never applied to bank coins.
    pub fn currency_total(&self) -> i64 {
        self.rewards
            .iter()
            .map(RewardItemDescriptor::to_chest_item)
            .filter(|item| item.kind == RewardKind::Currency)
            .fold(0i64, |total, item| total.saturating_add(item.amount))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_split() {
        assert_eq!(RewardValue::Amount(5).split(), (5, None));
        assert_eq!(RewardValue::Text("42".into()).split(), (42, None));
        assert_eq!(RewardValue::Text("rocket".into()).split(), (0, Some("rocket".into())));
    }

    #[test]
    fn test_descriptor_decoding() {
        let descriptor: RewardDescriptor = serde_json::from_value(json!({
            "id": 3,
            "type": "chest",
            "value": "1",
            "rarity": "epic",
            "rewards": [{"type": "currency", "value": 250}, {"type": "powerup", "value": 2}]
        }))
        .unwrap();
        assert_eq!(descriptor.id, 3);
        assert_eq!(descriptor.value, RewardValue::Text("1".into()));
        assert!(!descriptor.is_claimed);
        assert_eq!(descriptor.rewards[1].to_chest_item().kind, RewardKind::Powerup);
    }

    #[test]
    fn test_notification_kind() {
        let notification: UnlockNotification = serde_json::from_value(json!({
            "cumulative_points": 500,
            "pass_type": "gold",
            "type": "repeat_node_unlock",
            "unlocked_reward_data": {"is_unlocked": true, "rewards": []}
        }))
        .unwrap();
        assert!(notification.kind.is_repeatable());
    }

    #[test]
    fn test_snapshot_defaults() {
        let snapshot: CatalogSnapshot = serde_json::from_value(json!({})).unwrap();
        assert_eq!(snapshot.pass_type, "silver");
        assert!(snapshot.reward_track.is_empty());
        assert!(snapshot.repeatable_rewards.is_none());
    }

    #[test]
    fn test_claim_ack_currency_total() {
        let ack: ClaimAcknowledgement = serde_json::from_value(json!({
            "rewards": [
                {"type": "currency", "value": 120},
                {"type": "card_pack", "value": 1},
                {"type": "coins", "value": "30"}
            ]
        }))
        .unwrap();
        assert_eq!(ack.currency_total(), 150);
    }
}
