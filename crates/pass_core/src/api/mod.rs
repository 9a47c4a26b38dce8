pub mod pass_json;

pub use pass_json::{
    claim_ack_currency_total_json, claim_reward_json, error_response_json, handle_unlock_json,
    init_ledger_json, ledger_summary, ledger_summary_json, notification_schema_json,
    snapshot_schema_json, ClaimRequest, ClaimResponse, LedgerSummary, UnlockResponse,
    SCHEMA_VERSION,
};
