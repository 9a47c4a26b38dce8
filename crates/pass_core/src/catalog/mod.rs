//! Reward catalog ingestion
//!
//! - `wire`: inbound JSON shapes
//! - `parser`: finite track parsing with feature eligibility
//! - `repeatable`: repeat cycles beyond the track's cap

pub mod parser;
pub mod repeatable;
pub mod wire;

pub use parser::{parse_threshold_key, CatalogParser, ParsedCatalog};
pub use repeatable::{RepeatableRewardExtender, RepeatableSchedule};
pub use wire::{
    CatalogSnapshot, ClaimAcknowledgement, RepeatableBlock, RewardDescriptor,
    RewardItemDescriptor, RewardValue, ThresholdTable, TierRecords, TierRewardsRecord, UnlockKind,
    UnlockNotification,
};
