use std::sync::Arc;
use std::time::Duration;

use encore_core::state_machine::OutcomeState;
use encore_core::types::{Obligation, ObligationId, PaymentReference, Rail, SettlementId};

use crate::engine::VerificationEngine;
use crate::error::SettlementError;
use crate::ledger::SettlementLedger;
use crate::sweeper::ReconciliationSweeper;
use crate::types::{SettlementOutcome, Verdict};

/// Caller-facing settlement API.
///
/// The routing/auth layer sits in front of this; everything here is already
/// validated domain input. A submission always answers with a terminal
/// outcome or an explicit Pending one: when verification fails transiently
/// the reference is handed to the sweeper and a pending answer is returned
/// without writing anything.
pub struct SettlementService {
    ledger: Arc<SettlementLedger>,
    engine: Arc<VerificationEngine>,
    sweeper: Arc<ReconciliationSweeper>,
}

impl SettlementService {
    pub fn new(
        ledger: Arc<SettlementLedger>,
        engine: Arc<VerificationEngine>,
        sweeper: Arc<ReconciliationSweeper>,
    ) -> Self {
        Self {
            ledger,
            engine,
            sweeper,
        }
    }

    /// Register an obligation with the ledger.
    pub fn register_obligation(&self, obligation: Obligation) -> Result<ObligationId, SettlementError> {
        let id = obligation.id;
        self.ledger.register_obligation(obligation)?;
        Ok(id)
    }

    /// Submit a payment reference against an obligation and verify it once.
    pub async fn submit_payment(
        &self,
        obligation_id: ObligationId,
        rail: Rail,
        rail_tx_id: impl Into<String>,
        counterpart: Option<String>,
    ) -> Result<SettlementOutcome, SettlementError> {
        let reference = self.bind(obligation_id, rail, rail_tx_id, counterpart)?;
        let obligation = self
            .ledger
            .obligation(obligation_id)
            .ok_or(SettlementError::ObligationNotFound(obligation_id))?;

        match self.engine.verify(&obligation, &reference).await {
            Ok(verdict) => self.record(obligation_id, reference, verdict),
            Err(err) if err.is_retryable() => Ok(self.park(reference, err)),
            Err(err) => Err(err),
        }
    }

    /// Submit a payment reference and wait (bounded) for a terminal outcome.
    ///
    /// `wait` overrides the configured poll window. On window close the
    /// reference is handed to the sweeper and the pending outcome returned.
    pub async fn submit_payment_and_wait(
        &self,
        obligation_id: ObligationId,
        rail: Rail,
        rail_tx_id: impl Into<String>,
        counterpart: Option<String>,
        wait: Option<Duration>,
    ) -> Result<SettlementOutcome, SettlementError> {
        let reference = self.bind(obligation_id, rail, rail_tx_id, counterpart)?;
        let obligation = self
            .ledger
            .obligation(obligation_id)
            .ok_or(SettlementError::ObligationNotFound(obligation_id))?;

        match self
            .engine
            .verify_with_wait(&obligation, &reference, wait)
            .await
        {
            Ok(verdict) => self.record(obligation_id, reference, verdict),
            Err(err) if err.is_retryable() => Ok(self.park(reference, err)),
            Err(err) => Err(err),
        }
    }

    /// The authoritative settlement outcome for an obligation, if any.
    pub fn get_settlement(&self, obligation_id: ObligationId) -> Option<SettlementOutcome> {
        self.ledger.get_outcome(obligation_id)
    }

    /// Full attempt history for an obligation, for audit.
    pub fn settlement_attempts(&self, obligation_id: ObligationId) -> Vec<SettlementOutcome> {
        self.ledger.attempts(obligation_id)
    }

    /// Look up an outcome by its settlement id.
    pub fn get_settlement_by_id(&self, settlement_id: SettlementId) -> Option<SettlementOutcome> {
        self.ledger.outcome_by_settlement(settlement_id)
    }

    fn bind(
        &self,
        obligation_id: ObligationId,
        rail: Rail,
        rail_tx_id: impl Into<String>,
        counterpart: Option<String>,
    ) -> Result<PaymentReference, SettlementError> {
        let mut reference = PaymentReference::new(obligation_id, rail, rail_tx_id);
        if let Some(counterpart) = counterpart {
            reference = reference.with_counterpart(counterpart);
        }
        // Uniqueness is enforced before any adapter call.
        self.ledger.bind_reference(&reference)?;
        Ok(reference)
    }

    fn record(
        &self,
        obligation_id: ObligationId,
        reference: PaymentReference,
        verdict: Verdict,
    ) -> Result<SettlementOutcome, SettlementError> {
        let record = self.ledger.record_outcome(obligation_id, &reference, verdict)?;
        if record.outcome.state == OutcomeState::Pending {
            self.sweeper.enqueue(reference);
        }
        Ok(record.outcome)
    }

    /// Hand a transiently failing reference to the sweeper and answer with an
    /// unpersisted pending state carrying the poll hint.
    fn park(&self, reference: PaymentReference, err: SettlementError) -> SettlementOutcome {
        tracing::info!(
            obligation_id = %reference.obligation_id,
            tx = %reference.rail_tx_id,
            error = %err,
            "verification failed transiently; reference handed to the sweeper"
        );
        let outcome = SettlementOutcome::pending(reference.obligation_id, &reference, 0);
        self.sweeper.enqueue(reference);
        outcome
    }
}
