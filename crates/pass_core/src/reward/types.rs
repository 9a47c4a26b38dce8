use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the two parallel progression tracks
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum PassTier {
    #[default]
    Silver,
    Gold,
}

impl PassTier {
    pub const ALL: [PassTier; 2] = [PassTier::Silver, PassTier::Gold];

    pub fn as_str(&self) -> &'static str {
        match self {
            PassTier::Silver => "silver",
            PassTier::Gold => "gold",
        }
    }

    /// Case-insensitive lookup of a wire tier name
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "silver" => Some(PassTier::Silver),
            "gold" => Some(PassTier::Gold),
            _ => None,
        }
    }

    /// Tracks whose rewards a player on this tier can see and claim.
    /// Gold is an upgrade of silver, so it includes both.
    pub fn accessible_tiers(&self) -> &'static [PassTier] {
        match self {
            PassTier::Silver => &[PassTier::Silver],
            PassTier::Gold => &[PassTier::Silver, PassTier::Gold],
        }
    }
}

impl fmt::Display for PassTier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reward kind discriminator
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardKind {
    Currency,
    CardPack,
    Chest,
    Powerup,
    ElitePoint,
    BankBase,
    BankMultiplier,
    Other(String),
}

impl RewardKind {
    /// Parse a wire `type` string. Hyphens and case are normalized, anything
    /// unrecognized is kept verbatim as `Other`.
    pub fn from_wire(raw: &str) -> Self {
        let normalized = raw.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "currency" | "coins" => RewardKind::Currency,
            "card_pack" | "cardpack" => RewardKind::CardPack,
            "chest" => RewardKind::Chest,
            "powerup" | "power_up" => RewardKind::Powerup,
            "elite_point" | "elite_points" => RewardKind::ElitePoint,
            "bank_base" => RewardKind::BankBase,
            "bank_multiplier" => RewardKind::BankMultiplier,
            _ => RewardKind::Other(raw.trim().to_string()),
        }
    }

    pub fn is_bank(&self) -> bool {
        matches!(self, RewardKind::BankBase | RewardKind::BankMultiplier)
    }
}

/// Lifecycle of a single entitlement.
///
/// Storing one state instead of two flags makes "claimed but locked"
/// unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RewardState {
    #[default]
    Locked,
    Unlocked,
    Claimed,
}

/// Sub-item bundled inside a chest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChestItem {
    pub kind: RewardKind,
    pub amount: i64,
}

/// One entitlement at a (tier, threshold) bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardEntry {
    /// Unique only within its bucket
    pub id: i32,
    pub kind: RewardKind,
    pub amount: i64,
    /// Non-numeric wire value, e.g. a powerup name
    pub label: Option<String>,
    pub rarity: Option<String>,
    pub image: Option<String>,
    /// Empty unless `kind` is `Chest`
    pub chest_items: Vec<ChestItem>,
    state: RewardState,
}

impl RewardEntry {
    pub fn new(id: i32, kind: RewardKind, amount: i64) -> Self {
        Self {
            id,
            kind,
            amount,
            label: None,
            rarity: None,
            image: None,
            chest_items: Vec::new(),
            state: RewardState::Locked,
        }
    }

    pub fn with_state(mut self, state: RewardState) -> Self {
        self.state = state;
        self
    }

    pub fn state(&self) -> RewardState {
        self.state
    }

    pub fn is_unlocked(&self) -> bool {
        self.state != RewardState::Locked
    }

    pub fn is_claimed(&self) -> bool {
        self.state == RewardState::Claimed
    }

    pub fn is_claimable(&self) -> bool {
        self.state == RewardState::Unlocked
    }

    pub fn is_chest(&self) -> bool {
        self.kind == RewardKind::Chest
    }

    /// Locked -> Unlocked. Returns false when nothing changed.
    pub fn mark_unlocked(&mut self) -> bool {
        if self.state == RewardState::Locked {
            self.state = RewardState::Unlocked;
            true
        } else {
            false
        }
    }

    /// Unlocked -> Claimed. Any other starting state is refused and returned.
    pub fn mark_claimed(&mut self) -> std::result::Result<(), RewardState> {
        match self.state {
            RewardState::Unlocked => {
                self.state = RewardState::Claimed;
                Ok(())
            }
            other => Err(other),
        }
    }

    pub fn reset(&mut self) {
        self.state = RewardState::Locked;
    }
}
