use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use encore_core::state_machine::{OutcomeEvent, OutcomeState, OutcomeStateMachine};
use encore_core::types::{
    Obligation, ObligationId, PaymentReference, ReferenceKey, RejectReason, SettlementId,
};

use crate::error::SettlementError;
use crate::types::{RecordResult, SettlementOutcome, Verdict};

/// The authoritative, idempotent record of obligation → settlement outcome.
///
/// The concurrency property the whole system leans on lives here: at most one
/// Accepted outcome may ever exist per obligation. It is enforced as a
/// conditional write under the obligation's map entry lock (first Accepted
/// writer wins; every later attempt is recorded as Rejected with
/// `obligation_already_settled`), not as an in-process mutex, so unrelated
/// obligations never contend.
pub struct SettlementLedger {
    /// Registered obligations.
    obligations: DashMap<ObligationId, Obligation>,
    /// Which obligation each (rail, tx id) pair is bound to, system-wide.
    references: DashMap<ReferenceKey, ObligationId>,
    /// Attempt history per obligation.
    outcomes: DashMap<ObligationId, Vec<SettlementOutcome>>,
}

impl SettlementLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self {
            obligations: DashMap::new(),
            references: DashMap::new(),
            outcomes: DashMap::new(),
        }
    }

    /// Register an obligation. Fails if the id is already registered.
    pub fn register_obligation(&self, obligation: Obligation) -> Result<(), SettlementError> {
        obligation.validate()?;
        match self.obligations.entry(obligation.id) {
            Entry::Occupied(_) => Err(SettlementError::ObligationExists(obligation.id)),
            Entry::Vacant(vacant) => {
                tracing::info!(obligation_id = %obligation.id, "obligation registered");
                vacant.insert(obligation);
                Ok(())
            }
        }
    }

    /// Look up a registered obligation.
    pub fn obligation(&self, id: ObligationId) -> Option<Obligation> {
        self.obligations.get(&id).map(|entry| entry.clone())
    }

    /// Bind a reference to its obligation, enforcing system-wide uniqueness
    /// of the (rail, tx id) pair.
    ///
    /// This runs before any adapter call: a resubmission or a cross-obligation
    /// replay is rejected without touching the rail.
    pub fn bind_reference(&self, reference: &PaymentReference) -> Result<(), SettlementError> {
        reference.validate()?;
        if !self.obligations.contains_key(&reference.obligation_id) {
            return Err(SettlementError::ObligationNotFound(reference.obligation_id));
        }
        match self.references.entry(reference.key()) {
            Entry::Occupied(_) => Err(SettlementError::DuplicateReference(reference.key())),
            Entry::Vacant(vacant) => {
                vacant.insert(reference.obligation_id);
                Ok(())
            }
        }
    }

    /// The obligation a reference key is bound to, if any.
    pub fn bound_obligation(&self, key: &ReferenceKey) -> Option<ObligationId> {
        self.references.get(key).map(|entry| *entry.value())
    }

    /// Record a verification verdict for a reference.
    ///
    /// Conditional write: an Accepted verdict lands only if the obligation has
    /// no Accepted (or Expired) outcome yet. Re-recording a Pending verdict
    /// for the same reference updates the standing Pending outcome in place,
    /// so repeated polls do not grow the history.
    pub fn record_outcome(
        &self,
        obligation_id: ObligationId,
        reference: &PaymentReference,
        verdict: Verdict,
    ) -> Result<RecordResult, SettlementError> {
        if !self.obligations.contains_key(&obligation_id) {
            return Err(SettlementError::ObligationNotFound(obligation_id));
        }

        // The entry lock serializes all writers for this obligation.
        let mut entry = self.outcomes.entry(obligation_id).or_default();
        let attempts = entry.value_mut();

        // Slot already taken: the standing winner is returned unchanged and
        // the late attempt is recorded as rejected.
        if let Some(winner) = attempts
            .iter()
            .find(|outcome| outcome.state == OutcomeState::Accepted)
            .cloned()
        {
            if winner.reference.key() != reference.key() {
                tracing::warn!(
                    obligation_id = %obligation_id,
                    tx = %reference.rail_tx_id,
                    "attempt against an already settled obligation"
                );
                attempts.push(SettlementOutcome::rejected(
                    obligation_id,
                    reference,
                    RejectReason::ObligationAlreadySettled,
                ));
            }
            return Ok(RecordResult {
                accepted: false,
                outcome: winner,
            });
        }

        // An expired obligation is terminal and human-reviewable: a late
        // confirmation must never flip it to Accepted.
        if let Some(expired) = attempts
            .iter()
            .find(|outcome| outcome.state == OutcomeState::Expired)
            .cloned()
        {
            if expired.reference.key() != reference.key() {
                attempts.push(SettlementOutcome::rejected(
                    obligation_id,
                    reference,
                    RejectReason::VerificationHorizonExceeded,
                ));
            }
            return Ok(RecordResult {
                accepted: false,
                outcome: expired,
            });
        }

        let key = reference.key();
        if let Some(existing) = attempts
            .iter_mut()
            .find(|outcome| outcome.reference.key() == key)
        {
            if existing.is_terminal() {
                // Re-recording a decided reference changes nothing.
                return Ok(RecordResult {
                    accepted: false,
                    outcome: existing.clone(),
                });
            }
            return match verdict {
                Verdict::Pending { confirmations } => {
                    existing.confirmations = confirmations;
                    Ok(RecordResult {
                        accepted: false,
                        outcome: existing.clone(),
                    })
                }
                Verdict::Accepted {
                    verified,
                    confirmations,
                } => {
                    existing.state =
                        OutcomeStateMachine::transition(existing.state, OutcomeEvent::Accept)?;
                    existing.verified = Some(verified);
                    existing.confirmations = confirmations;
                    existing.decided_at = Some(chrono::Utc::now());
                    tracing::info!(
                        obligation_id = %obligation_id,
                        settlement_id = %existing.settlement_id,
                        "settlement accepted"
                    );
                    Ok(RecordResult {
                        accepted: true,
                        outcome: existing.clone(),
                    })
                }
                Verdict::Rejected { reason } => {
                    existing.state =
                        OutcomeStateMachine::transition(existing.state, OutcomeEvent::Reject)?;
                    existing.reason = Some(reason);
                    existing.decided_at = Some(chrono::Utc::now());
                    tracing::info!(
                        obligation_id = %obligation_id,
                        reason = %reason,
                        "settlement rejected"
                    );
                    Ok(RecordResult {
                        accepted: false,
                        outcome: existing.clone(),
                    })
                }
            };
        }

        // First record for this reference.
        let accepted = matches!(verdict, Verdict::Accepted { .. });
        let outcome = SettlementOutcome::from_verdict(obligation_id, reference, verdict);
        if accepted {
            tracing::info!(
                obligation_id = %obligation_id,
                settlement_id = %outcome.settlement_id,
                "settlement accepted"
            );
        }
        attempts.push(outcome.clone());
        Ok(RecordResult { accepted, outcome })
    }

    /// Force a stuck reference to the Expired state.
    ///
    /// Called by the reconciliation sweeper once the verification horizon
    /// elapses. Terminal outcomes are returned unchanged.
    pub fn force_expire(
        &self,
        obligation_id: ObligationId,
        reference: &PaymentReference,
    ) -> Result<SettlementOutcome, SettlementError> {
        if !self.obligations.contains_key(&obligation_id) {
            return Err(SettlementError::ObligationNotFound(obligation_id));
        }

        let mut entry = self.outcomes.entry(obligation_id).or_default();
        let attempts = entry.value_mut();

        let key = reference.key();
        if let Some(existing) = attempts
            .iter_mut()
            .find(|outcome| outcome.reference.key() == key)
        {
            if existing.is_terminal() {
                return Ok(existing.clone());
            }
            existing.state = OutcomeStateMachine::transition(existing.state, OutcomeEvent::Expire)?;
            existing.reason = Some(RejectReason::VerificationHorizonExceeded);
            existing.decided_at = Some(chrono::Utc::now());
            tracing::warn!(
                obligation_id = %obligation_id,
                tx = %reference.rail_tx_id,
                "settlement expired at the verification horizon; manual reconciliation required"
            );
            return Ok(existing.clone());
        }

        // No attempt was ever recorded (every verification failed transiently).
        let mut outcome = SettlementOutcome::pending(obligation_id, reference, 0);
        outcome.state = OutcomeStateMachine::transition(outcome.state, OutcomeEvent::Expire)?;
        outcome.reason = Some(RejectReason::VerificationHorizonExceeded);
        outcome.decided_at = Some(chrono::Utc::now());
        tracing::warn!(
            obligation_id = %obligation_id,
            tx = %reference.rail_tx_id,
            "settlement expired at the verification horizon with no recorded attempt"
        );
        attempts.push(outcome.clone());
        Ok(outcome)
    }

    /// The authoritative outcome for an obligation: the Accepted outcome if
    /// one exists, else an Expired one, else the latest Rejected attempt,
    /// else the latest Pending attempt, else none.
    pub fn get_outcome(&self, obligation_id: ObligationId) -> Option<SettlementOutcome> {
        let attempts = self.outcomes.get(&obligation_id)?;

        attempts
            .iter()
            .find(|outcome| outcome.state == OutcomeState::Accepted)
            .or_else(|| {
                attempts
                    .iter()
                    .find(|outcome| outcome.state == OutcomeState::Expired)
            })
            .or_else(|| {
                attempts
                    .iter()
                    .rev()
                    .find(|outcome| outcome.state == OutcomeState::Rejected)
            })
            .or_else(|| attempts.iter().rev().find(|outcome| !outcome.is_terminal()))
            .cloned()
    }

    /// Look up an outcome by its settlement id.
    pub fn outcome_by_settlement(&self, settlement_id: SettlementId) -> Option<SettlementOutcome> {
        self.outcomes.iter().find_map(|entry| {
            entry
                .value()
                .iter()
                .find(|outcome| outcome.settlement_id == settlement_id)
                .cloned()
        })
    }

    /// Full attempt history for an obligation, for audit.
    pub fn attempts(&self, obligation_id: ObligationId) -> Vec<SettlementOutcome> {
        self.outcomes
            .get(&obligation_id)
            .map(|entry| entry.clone())
            .unwrap_or_default()
    }
}

impl Default for SettlementLedger {
    fn default() -> Self {
        Self::new()
    }
}
