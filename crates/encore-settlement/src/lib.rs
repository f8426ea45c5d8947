//! Encore settlement layer.
//!
//! Decides whether a payment reference satisfies an obligation (verification
//! engine), records the verdict exactly once per obligation (settlement
//! ledger), and chases stuck references until they terminate (reconciliation
//! sweeper). The at-most-one-accepted-settlement-per-obligation property is
//! enforced here as a conditional write, not by caller discipline.

pub mod engine;
pub mod error;
pub mod ledger;
pub mod service;
pub mod sweeper;
pub mod types;

pub use engine::VerificationEngine;
pub use error::SettlementError;
pub use ledger::SettlementLedger;
pub use service::SettlementService;
pub use sweeper::{ReconciliationSweeper, SweepStats};
pub use types::{RecordResult, SettlementOutcome, Verdict};
