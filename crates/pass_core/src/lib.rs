//! # pass_core - Season Pass Progression Ledger
//!
//! In-memory model of a seasonal, points-based reward pass with two
//! parallel tiers (silver and gold). The server is the source of truth for
//! unlocks; this crate mirrors its catalog, applies its unlock pushes and
//! validates claims locally.
//!
//! ## Features
//! - Deterministic catalog parsing with per-client feature eligibility
//! - Repeat cycles beyond the finite track, synthesized from server pushes
//! - Piggy bank accumulation in threshold order
//! - JSON API for host integration

// Struct initialization pattern used intentionally
#![allow(clippy::field_reassign_with_default)]
// Complex types are sometimes necessary for generic APIs
#![allow(clippy::type_complexity)]

pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod ledger;
pub mod reward;

pub use api::{
    claim_reward_json, handle_unlock_json, init_ledger_json, ledger_summary_json, SCHEMA_VERSION,
};
pub use catalog::{CatalogSnapshot, ClaimAcknowledgement, UnlockKind, UnlockNotification};
pub use config::{FeatureGate, PassConfig};
pub use error::{ErrorClass, PassError, Result};
pub use ledger::{
    ClaimPath, ClaimReceipt, ClosestRewards, PassSignal, ProgressionLedger, SubscriptionId,
    UnlockOutcome,
};
pub use reward::{PassTier, RewardEntry, RewardKind, RewardState, RewardTrack};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
