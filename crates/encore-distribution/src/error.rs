use encore_core::error::CoreError;
use encore_core::types::{Amount, PayoutId, SettlementId};

/// Distribution-layer errors.
#[derive(Debug, thiserror::Error)]
pub enum DistributionError {
    #[error("settlement {0} is not accepted; only accepted settlements distribute")]
    SettlementNotAccepted(SettlementId),

    #[error("distribution plan must have at least one entry")]
    EmptyPlan,

    #[error("share for member {member} is negative")]
    NegativeShare { member: String },

    #[error("share currency {share} does not match settled currency {settled}")]
    ShareCurrencyMismatch { share: String, settled: String },

    #[error("plan shares sum to {actual}, settlement verified {expected}")]
    ShareSumMismatch { expected: Amount, actual: Amount },

    #[error("a distribution plan already exists for settlement {0}")]
    PlanAlreadyExists(SettlementId),

    #[error("payout not found: {0}")]
    PayoutNotFound(PayoutId),

    #[error(transparent)]
    Core(#[from] CoreError),
}
