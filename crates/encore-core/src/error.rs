use crate::state_machine::{OutcomeState, PayoutStatus};

/// Core domain errors.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid settlement outcome transition from {from} to {to}")]
    InvalidOutcomeTransition { from: OutcomeState, to: OutcomeState },

    #[error("invalid_payout_transition: cannot move payout from {from} to {to}")]
    InvalidPayoutTransition { from: PayoutStatus, to: PayoutStatus },

    #[error("validation failed: {0}")]
    ValidationError(String),

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),
}
