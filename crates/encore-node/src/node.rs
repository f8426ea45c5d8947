//! Full wiring of the settlement and distribution engine.

use std::sync::Arc;

use encore_core::state_machine::PayoutStatus;
use encore_core::types::{Obligation, ObligationId, PayoutId, PlanId, Rail, SettlementId};
use encore_distribution::error::DistributionError;
use encore_distribution::{DistributionAllocator, DistributionPlan, MemberPayout, PlanEntrySpec};
use encore_rails::{CreditAdapter, RailAdapter, RailAdapterRegistry};
use encore_settlement::{
    ReconciliationSweeper, SettlementError, SettlementLedger, SettlementOutcome,
    SettlementService, VerificationEngine,
};

use crate::config::EncoreConfig;

/// One running Encore engine: rail registry, verification engine, ledger,
/// allocator, and sweeper, wired together.
///
/// The embedding service (routing layer, job runner) talks to this; the
/// daemon binary only drives the sweeper loop.
pub struct EncoreNode {
    service: SettlementService,
    allocator: DistributionAllocator,
    sweeper: Arc<ReconciliationSweeper>,
    credit: Arc<CreditAdapter>,
}

impl EncoreNode {
    /// Build a node with the internal credit rail plus any additional
    /// deployment-specific adapters (card/wallet/onchain clients).
    pub fn new(config: &EncoreConfig, extra_adapters: Vec<Arc<dyn RailAdapter>>) -> Self {
        let credit = Arc::new(CreditAdapter::new());

        let mut registry = RailAdapterRegistry::new();
        registry.register(Arc::clone(&credit) as Arc<dyn RailAdapter>);
        for adapter in extra_adapters {
            registry.register(adapter);
        }
        tracing::info!(rails = ?registry.rails(), "rail adapters registered");

        let registry = Arc::new(registry);
        let ledger = Arc::new(SettlementLedger::new());
        let engine = Arc::new(VerificationEngine::new(
            Arc::clone(&registry),
            config.engine.clone(),
        ));
        let sweeper = Arc::new(ReconciliationSweeper::new(
            Arc::clone(&ledger),
            Arc::clone(&engine),
            config.sweeper.clone(),
        ));
        let service = SettlementService::new(ledger, engine, Arc::clone(&sweeper));

        Self {
            service,
            allocator: DistributionAllocator::new(),
            sweeper,
            credit,
        }
    }

    /// The internal credit rail, for issuing credits against obligations.
    pub fn credit(&self) -> &CreditAdapter {
        &self.credit
    }

    /// Register an obligation.
    pub fn register_obligation(&self, obligation: Obligation) -> Result<ObligationId, SettlementError> {
        self.service.register_obligation(obligation)
    }

    /// Submit a payment reference and verify it once.
    pub async fn submit_payment(
        &self,
        obligation_id: ObligationId,
        rail: Rail,
        rail_tx_id: impl Into<String>,
        counterpart: Option<String>,
    ) -> Result<SettlementOutcome, SettlementError> {
        self.service
            .submit_payment(obligation_id, rail, rail_tx_id, counterpart)
            .await
    }

    /// The authoritative settlement outcome for an obligation.
    pub fn get_settlement(&self, obligation_id: ObligationId) -> Option<SettlementOutcome> {
        self.service.get_settlement(obligation_id)
    }

    /// Commit a distribution plan for an accepted settlement.
    pub fn distribute(
        &self,
        settlement_id: SettlementId,
        entries: Vec<PlanEntrySpec>,
    ) -> Result<DistributionPlan, DistributionError> {
        let settlement = self
            .find_accepted(settlement_id)
            .ok_or(DistributionError::SettlementNotAccepted(settlement_id))?;
        self.allocator.distribute(&settlement, entries)
    }

    /// Move a member payout to a terminal status.
    pub fn mark_payout(
        &self,
        payout_id: PayoutId,
        status: PayoutStatus,
        rail_tx_id: Option<String>,
        notes: Option<String>,
    ) -> Result<MemberPayout, DistributionError> {
        self.allocator.mark_payout(payout_id, status, rail_tx_id, notes)
    }

    /// All payouts of a plan.
    pub fn payouts_for_plan(&self, plan_id: PlanId) -> Vec<MemberPayout> {
        self.allocator.payouts_for_plan(plan_id)
    }

    /// Number of references the sweeper is still chasing.
    pub fn inflight_count(&self) -> usize {
        self.sweeper.pending_count()
    }

    /// Drive the reconciliation sweeper until the task is cancelled.
    pub async fn run(&self) {
        Arc::clone(&self.sweeper).run().await;
    }

    fn find_accepted(&self, settlement_id: SettlementId) -> Option<SettlementOutcome> {
        self.service.get_settlement_by_id(settlement_id)
    }
}
