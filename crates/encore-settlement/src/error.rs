use encore_core::error::CoreError;
use encore_core::types::{ObligationId, ReferenceKey};
use encore_rails::error::RailError;

/// Settlement-layer errors.
#[derive(Debug, thiserror::Error)]
pub enum SettlementError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("obligation not found: {0}")]
    ObligationNotFound(ObligationId),

    #[error("obligation already registered: {0}")]
    ObligationExists(ObligationId),

    #[error("duplicate_reference: {0} already submitted")]
    DuplicateReference(ReferenceKey),

    #[error(transparent)]
    Rail(#[from] RailError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl SettlementError {
    /// Whether the caller should retry rather than treat this as terminal.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Rail(rail) if rail.is_transient())
    }
}
