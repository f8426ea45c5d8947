use encore_core::types::Rail;

/// Rail-layer errors.
///
/// `Transient` is the load-bearing variant: it marks failures that must be
/// retried (network, rate limits, oracle outages) and must never be recorded
/// as a negative settlement outcome.
#[derive(Debug, thiserror::Error)]
pub enum RailError {
    #[error("transient rail failure: {0}")]
    Transient(String),

    #[error("adapter not registered for rail: {0}")]
    AdapterNotFound(Rail),

    #[error("unsupported currency: {0}")]
    UnsupportedCurrency(String),

    #[error("invalid identity: {0}")]
    InvalidIdentity(String),

    #[error("refund not possible: {0}")]
    RefundFailed(String),

    #[error("internal rail error: {0}")]
    Internal(String),
}

impl RailError {
    /// Whether the caller should retry rather than record an outcome.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// A transient failure caused by a deadline hit.
    pub fn deadline(rail: Rail) -> Self {
        Self::Transient(format!("{} adapter call exceeded its deadline", rail))
    }
}
