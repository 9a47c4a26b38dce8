use serde::Serialize;
use thiserror::Error;

use crate::reward::PassTier;

/// Coarse classification used by hosts to decide how loudly to surface a
/// refusal. None of these abort a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Bad threshold key, null/empty record, undecodable descriptor.
    MalformedInput,
    /// Notification or lookup references something the ledger does not hold.
    StructuralMiss,
    /// Caller asked for something that is not allowed in the current state.
    InvalidArgument,
    /// JSON/YAML/IO/config problems at the host boundary.
    Host,
}

#[derive(Error, Debug)]
pub enum PassError {
    #[error("Malformed threshold key: {key:?}")]
    MalformedThreshold { key: String },

    #[error("Malformed reward at threshold {threshold}: {reason}")]
    MalformedReward { threshold: u64, reason: String },

    #[error("Empty reward record for tier {tier:?} at threshold {threshold}")]
    EmptyRecord { tier: String, threshold: u64 },

    #[error("Null reward record at threshold {0}")]
    NullThreshold(u64),

    #[error("Unknown pass tier: {0:?}")]
    UnknownTier(String),

    #[error("Duplicate reward id {id} in {tier} bucket at threshold {threshold}")]
    DuplicateReward { tier: PassTier, threshold: u64, id: i32 },

    #[error("Reward {id} not found in {tier} track at threshold {threshold}")]
    RewardNotFound { tier: PassTier, threshold: u64, id: i32 },

    #[error("Point increment must be positive, got {0}")]
    InvalidIncrement(i64),

    #[error("Negative point value: {0}")]
    NegativePoints(i64),

    #[error("Reward {id} in {tier} track at threshold {threshold} is still locked")]
    RewardLocked { tier: PassTier, threshold: u64, id: i32 },

    #[error("Reward {id} in {tier} track at threshold {threshold} was already claimed")]
    AlreadyClaimed { tier: PassTier, threshold: u64, id: i32 },

    #[error("Threshold {threshold} is not on the repeatable reward schedule")]
    OffSchedule { threshold: u64 },

    #[error("No repeatable reward schedule is active")]
    NoRepeatableSchedule,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Unsupported schema version: {0}")]
    SchemaVersion(u8),
}

impl PassError {
    pub fn class(&self) -> ErrorClass {
        match self {
            PassError::MalformedThreshold { .. }
            | PassError::MalformedReward { .. }
            | PassError::EmptyRecord { .. }
            | PassError::NullThreshold(_)
            | PassError::DuplicateReward { .. }
            | PassError::NegativePoints(_) => ErrorClass::MalformedInput,
            PassError::UnknownTier(_)
            | PassError::RewardNotFound { .. }
            | PassError::OffSchedule { .. }
            | PassError::NoRepeatableSchedule => ErrorClass::StructuralMiss,
            PassError::InvalidIncrement(_)
            | PassError::RewardLocked { .. }
            | PassError::AlreadyClaimed { .. } => ErrorClass::InvalidArgument,
            PassError::Json(_)
            | PassError::Yaml(_)
            | PassError::Io(_)
            | PassError::Config(_)
            | PassError::SchemaVersion(_) => ErrorClass::Host,
        }
    }
}

pub type Result<T> = std::result::Result<T, PassError>;
