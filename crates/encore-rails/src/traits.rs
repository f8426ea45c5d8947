use async_trait::async_trait;
use chrono::{DateTime, Utc};
use encore_core::types::{Amount, Obligation, ObligationId, PaymentReference, Rail, RejectReason};
use serde::{Deserialize, Serialize};

use crate::error::RailError;

/// Rail adapter interface.
///
/// Each implementation bridges Encore to a concrete payment rail (card
/// processor, wallet transfer processor, blockchain, internal credit) and
/// owns that rail's acceptance policy: how amounts are reconciled against
/// the expectation and when a transaction counts as final.
#[async_trait]
pub trait RailAdapter: Send + Sync {
    /// The rail this adapter serves.
    fn rail(&self) -> Rail;

    /// Open a payment intent for an obligation on this rail.
    async fn create_intent(&self, obligation: &Obligation) -> Result<IntentHandle, RailError>;

    /// Check whether the referenced transaction satisfies the expectation.
    ///
    /// Network failures surface as [`RailError::Transient`] and must never be
    /// mapped to a failure verdict.
    async fn verify(
        &self,
        reference: &PaymentReference,
        expected: &Amount,
    ) -> Result<RailVerification, RailError>;

    /// Refund a previously settled transaction, in full when `amount` is None.
    async fn refund(
        &self,
        reference: &PaymentReference,
        amount: Option<Amount>,
    ) -> Result<RefundResult, RailError>;
}

/// The rail's verdict on a referenced transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RailStatus {
    /// Not yet final (unmined, or below the confirmation threshold).
    Pending,
    /// Final and satisfying the expectation under this rail's policy.
    Success,
    /// Final and not satisfying the expectation.
    Failure(RejectReason),
}

/// The result of verifying one payment reference against one expectation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RailVerification {
    /// The rail's verdict.
    pub status: RailStatus,
    /// The amount the rail observed, in rail units (e.g. `0.05 ETH`).
    pub observed: Option<Amount>,
    /// The observed amount normalized to the expected currency; present on
    /// success, converted at verification time for volatile rails.
    pub normalized: Option<Amount>,
    /// Confirmation depth; 0 for synchronous rails.
    pub confirmations: u64,
    /// Chain height at verification time, asynchronous rails only.
    pub chain_height: Option<u64>,
}

impl RailVerification {
    /// A pending verdict with the given confirmation depth.
    pub fn pending(confirmations: u64, chain_height: Option<u64>) -> Self {
        Self {
            status: RailStatus::Pending,
            observed: None,
            normalized: None,
            confirmations,
            chain_height,
        }
    }

    /// A terminal failure verdict.
    pub fn failure(reason: RejectReason, observed: Option<Amount>) -> Self {
        Self {
            status: RailStatus::Failure(reason),
            observed,
            normalized: None,
            confirmations: 0,
            chain_height: None,
        }
    }
}

/// Handle to a payment intent opened on a rail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentHandle {
    /// The obligation the intent was opened for.
    pub obligation_id: ObligationId,
    /// The rail the intent lives on.
    pub rail: Rail,
    /// Rail-specific intent identifier.
    pub intent_id: String,
    /// When the intent was opened.
    pub created_at: DateTime<Utc>,
}

/// Proof that a refund was issued on a rail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundResult {
    /// Rail-specific refund identifier.
    pub refund_id: String,
    /// The amount refunded.
    pub amount: Amount,
    /// When the refund was issued.
    pub refunded_at: DateTime<Utc>,
}
