//! Season pass JSON API
//!
//! String-in, string-out entry points for the host. The host owns the
//! `ProgressionLedger` and routes inbound server messages and UI requests
//! here. Every response carries `schema_version`; failures come back as
//! `{"success": false, "error": ..., "class": ...}` instead of `Err`.

use crate::catalog::{CatalogSnapshot, ClaimAcknowledgement, UnlockNotification};
use crate::config::PassConfig;
use crate::error::{PassError, Result};
use crate::ledger::{ClaimReceipt, ClosestRewards, ProgressionLedger, UnlockOutcome};
use crate::reward::PassTier;
use schemars::schema_for;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

pub const SCHEMA_VERSION: u8 = 1;

/// Claim request from the host UI
#[derive(Debug, Deserialize)]
pub struct ClaimRequest {
    pub schema_version: u8,
    pub pass_type: String,
    pub id: i32,
    /// Threshold the entry sits at
    pub points: u64,
}

#[derive(Debug, Serialize)]
pub struct ClaimResponse {
    pub schema_version: u8,
    pub success: bool,
    pub receipt: ClaimReceipt,
    pub unclaimed_rewards: usize,
}

#[derive(Debug, Serialize)]
pub struct UnlockResponse {
    pub schema_version: u8,
    pub success: bool,
    pub outcome: UnlockOutcome,
    pub points_acquired: u64,
    pub unclaimed_rewards: usize,
}

/// Everything a pass screen needs in one read
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerSummary {
    pub schema_version: u8,
    pub points_acquired: u64,
    pub pass_type: PassTier,
    pub max_points_required: u64,
    pub closest: ClosestRewards,
    pub unclaimed_rewards: usize,
    pub bank_active: bool,
    pub bank_coins: i64,
    pub final_piggy_bank_value: i64,
    pub bank_value_at_points: i64,
    pub repeatable_rewards_points_required: u64,
    pub max_repeatable_rewards: u32,
    pub current_repeatable_requirement: Option<u64>,
    /// Number of catalog problems skipped on the last load
    pub diagnostics: usize,
}

#[derive(Debug, Serialize)]
struct CurrencyTotalResponse {
    schema_version: u8,
    success: bool,
    currency_total: i64,
}

// ============================================================================
// Entry points
// ============================================================================

/// Build a ledger from a catalog snapshot message
pub fn init_ledger_json(snapshot_json: &str, config: &PassConfig) -> Result<ProgressionLedger> {
    let snapshot: CatalogSnapshot = serde_json::from_str(snapshot_json)?;
    Ok(ProgressionLedger::init(&snapshot, config))
}

/// Apply a `reward_node_unlock` / `repeat_node_unlock` server push
pub fn handle_unlock_json(ledger: &mut ProgressionLedger, notification_json: &str) -> String {
    respond(process_unlock(ledger, notification_json))
}

pub fn claim_reward_json(ledger: &mut ProgressionLedger, request_json: &str) -> String {
    respond(process_claim(ledger, request_json))
}

/// Currency granted by a claim acknowledgement, for display only
pub fn claim_ack_currency_total_json(ack_json: &str) -> String {
    respond(process_claim_ack(ack_json))
}

pub fn ledger_summary(ledger: &ProgressionLedger) -> LedgerSummary {
    LedgerSummary {
        schema_version: SCHEMA_VERSION,
        points_acquired: ledger.points_acquired(),
        pass_type: ledger.tier(),
        max_points_required: ledger.max_points_required(),
        closest: ledger.get_closest_rewards(),
        unclaimed_rewards: ledger.unclaimed_rewards(),
        bank_active: ledger.is_bank_active(),
        bank_coins: ledger.bank_coins(),
        final_piggy_bank_value: ledger.final_piggy_bank_value(),
        bank_value_at_points: ledger.bank_value_for_points(ledger.points_acquired()),
        repeatable_rewards_points_required: ledger.repeatable_rewards_points_required(),
        max_repeatable_rewards: ledger.max_repeatable_rewards(),
        current_repeatable_requirement: ledger.get_current_repeatable_chest_requirement(),
        diagnostics: ledger.diagnostics().len(),
    }
}

pub fn ledger_summary_json(ledger: &ProgressionLedger) -> String {
    respond(to_json(&ledger_summary(ledger)))
}

/// JSON schema of the catalog snapshot message
pub fn snapshot_schema_json() -> String {
    respond(to_json(&schema_for!(CatalogSnapshot)))
}

/// JSON schema of the unlock notification message
pub fn notification_schema_json() -> String {
    respond(to_json(&schema_for!(UnlockNotification)))
}

pub fn error_response_json(err: &PassError) -> String {
    json!({
        "schema_version": SCHEMA_VERSION,
        "success": false,
        "error": err.to_string(),
        "class": err.class(),
    })
    .to_string()
}

// ============================================================================
// Internal processing
// ============================================================================

fn respond(result: Result<String>) -> String {
    result.unwrap_or_else(|err| {
        warn!(class = ?err.class(), "pass api request failed: {err}");
        error_response_json(&err)
    })
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

fn process_unlock(ledger: &mut ProgressionLedger, notification_json: &str) -> Result<String> {
    let notification: UnlockNotification = serde_json::from_str(notification_json)?;
    let outcome = ledger.apply_unlock(&notification)?;

    to_json(&UnlockResponse {
        schema_version: SCHEMA_VERSION,
        success: true,
        outcome,
        points_acquired: ledger.points_acquired(),
        unclaimed_rewards: ledger.unclaimed_rewards(),
    })
}

fn process_claim(ledger: &mut ProgressionLedger, request_json: &str) -> Result<String> {
    let request: ClaimRequest = serde_json::from_str(request_json)?;
    if request.schema_version != SCHEMA_VERSION {
        return Err(PassError::SchemaVersion(request.schema_version));
    }

    let tier = PassTier::from_name(&request.pass_type)
        .ok_or_else(|| PassError::UnknownTier(request.pass_type.clone()))?;
    let receipt = ledger.claim_reward(tier, request.id, request.points)?;

    to_json(&ClaimResponse {
        schema_version: SCHEMA_VERSION,
        success: true,
        receipt,
        unclaimed_rewards: ledger.unclaimed_rewards(),
    })
}

fn process_claim_ack(ack_json: &str) -> Result<String> {
    let ack: ClaimAcknowledgement = serde_json::from_str(ack_json)?;
    to_json(&CurrencyTotalResponse {
        schema_version: SCHEMA_VERSION,
        success: true,
        currency_total: ack.currency_total(),
    })
}
