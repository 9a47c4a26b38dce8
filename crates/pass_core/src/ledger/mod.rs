//! Progression ledger
//!
//! `manager::ProgressionLedger` composes the parsed tracks with the
//! scalar progression fields and exposes every operation hosts use.
//! `bank` derives the piggy bank total, `unlock` applies server pushes,
//! `signals` fans changes out to presentation subscribers.

pub mod bank;
pub mod manager;
pub mod signals;
pub mod unlock;


pub use bank::BankAccumulator;
pub use manager::{ClaimPath, ClaimReceipt, ClosestRewards, ProgressionLedger};
pub use signals::{PassSignal, SignalHub, SubscriptionId};
pub use unlock::{UnlockContext, UnlockEventHandler, UnlockOutcome};
