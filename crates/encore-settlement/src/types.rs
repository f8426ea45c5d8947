use chrono::{DateTime, Utc};
use encore_core::state_machine::OutcomeState;
use encore_core::types::{Amount, ObligationId, PaymentReference, RejectReason, SettlementId};
use serde::{Deserialize, Serialize};

/// The verification engine's verdict on one reference, before it is recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// The reference satisfies the obligation.
    Accepted {
        /// Verified amount, normalized to the obligation currency.
        verified: Amount,
        confirmations: u64,
    },
    /// The reference does not satisfy the obligation.
    Rejected { reason: RejectReason },
    /// Not yet decidable; re-poll later.
    Pending { confirmations: u64 },
}

impl Verdict {
    /// Whether the verdict is final.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending { .. })
    }
}

/// The ledger's durable verdict on a payment reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementOutcome {
    /// Unique identifier for this outcome.
    pub settlement_id: SettlementId,
    /// The obligation the reference was submitted against.
    pub obligation_id: ObligationId,
    /// The reference that was verified.
    pub reference: PaymentReference,
    /// Lifecycle state.
    pub state: OutcomeState,
    /// Verified amount in the obligation currency; set iff Accepted.
    pub verified: Option<Amount>,
    /// Confirmation depth at the last verification; 0 for synchronous rails.
    pub confirmations: u64,
    /// Why the attempt was not accepted; set iff Rejected or Expired.
    pub reason: Option<RejectReason>,
    /// When the outcome reached a terminal state.
    pub decided_at: Option<DateTime<Utc>>,
    /// When the outcome was first recorded.
    pub recorded_at: DateTime<Utc>,
}

impl SettlementOutcome {
    /// A freshly recorded pending outcome.
    pub fn pending(obligation_id: ObligationId, reference: &PaymentReference, confirmations: u64) -> Self {
        Self {
            settlement_id: SettlementId::new(),
            obligation_id,
            reference: reference.clone(),
            state: OutcomeState::Pending,
            verified: None,
            confirmations,
            reason: None,
            decided_at: None,
            recorded_at: Utc::now(),
        }
    }

    /// A freshly recorded accepted outcome.
    pub fn accepted(
        obligation_id: ObligationId,
        reference: &PaymentReference,
        verified: Amount,
        confirmations: u64,
    ) -> Self {
        Self {
            settlement_id: SettlementId::new(),
            obligation_id,
            reference: reference.clone(),
            state: OutcomeState::Accepted,
            verified: Some(verified),
            confirmations,
            reason: None,
            decided_at: Some(Utc::now()),
            recorded_at: Utc::now(),
        }
    }

    /// A freshly recorded rejected outcome.
    pub fn rejected(
        obligation_id: ObligationId,
        reference: &PaymentReference,
        reason: RejectReason,
    ) -> Self {
        Self {
            settlement_id: SettlementId::new(),
            obligation_id,
            reference: reference.clone(),
            state: OutcomeState::Rejected,
            verified: None,
            confirmations: 0,
            reason: Some(reason),
            decided_at: Some(Utc::now()),
            recorded_at: Utc::now(),
        }
    }

    /// Build an outcome straight from a verdict.
    pub fn from_verdict(
        obligation_id: ObligationId,
        reference: &PaymentReference,
        verdict: Verdict,
    ) -> Self {
        match verdict {
            Verdict::Accepted {
                verified,
                confirmations,
            } => Self::accepted(obligation_id, reference, verified, confirmations),
            Verdict::Rejected { reason } => Self::rejected(obligation_id, reference, reason),
            Verdict::Pending { confirmations } => {
                Self::pending(obligation_id, reference, confirmations)
            }
        }
    }

    /// Whether the outcome is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

/// Result of asking the ledger to record an outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordResult {
    /// Whether this call acquired the obligation's accepted slot.
    pub accepted: bool,
    /// The authoritative outcome after the write: the newly recorded outcome,
    /// or the standing winner when the slot was already taken.
    pub outcome: SettlementOutcome,
}
