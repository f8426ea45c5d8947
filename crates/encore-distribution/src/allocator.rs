use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use encore_core::state_machine::{OutcomeState, PayoutStateMachine, PayoutStatus};
use encore_core::types::{Amount, MemberId, PayoutId, PlanEntryId, PlanId, SettlementId};
use rust_decimal::Decimal;
use encore_settlement::types::SettlementOutcome;

use crate::error::DistributionError;
use crate::types::{DistributionPlan, MemberPayout, PlanEntry, PlanEntrySpec};

/// Splits an accepted settlement into member payouts and tracks each payout's
/// lifecycle independently.
///
/// Plan commit mirrors the ledger's conditional-write pattern: at most one
/// plan per settlement, enforced under the settlement's map entry lock. No
/// implicit rounding absorption: the caller pre-rounds shares and assigns
/// any remainder explicitly, so the sum check is exact.
pub struct DistributionAllocator {
    /// Committed plans keyed by the settlement they distribute.
    plans: DashMap<SettlementId, DistributionPlan>,
    /// All payouts keyed by id.
    payouts: DashMap<PayoutId, MemberPayout>,
    /// Payout ids per plan, in entry order.
    by_plan: DashMap<PlanId, Vec<PayoutId>>,
}

impl DistributionAllocator {
    /// Create an empty allocator.
    pub fn new() -> Self {
        Self {
            plans: DashMap::new(),
            payouts: DashMap::new(),
            by_plan: DashMap::new(),
        }
    }

    /// Commit a distribution plan for an accepted settlement.
    ///
    /// One pending [`MemberPayout`] is created per entry.
    pub fn distribute(
        &self,
        settlement: &SettlementOutcome,
        entries: Vec<PlanEntrySpec>,
    ) -> Result<DistributionPlan, DistributionError> {
        let verified = match (&settlement.verified, settlement.state) {
            (Some(verified), OutcomeState::Accepted) => verified,
            _ => {
                return Err(DistributionError::SettlementNotAccepted(
                    settlement.settlement_id,
                ))
            }
        };

        if entries.is_empty() {
            return Err(DistributionError::EmptyPlan);
        }
        for spec in &entries {
            if spec.share.is_negative() {
                return Err(DistributionError::NegativeShare {
                    member: spec.member_id.to_string(),
                });
            }
            if spec.share.currency != verified.currency {
                return Err(DistributionError::ShareCurrencyMismatch {
                    share: spec.share.currency.to_string(),
                    settled: verified.currency.to_string(),
                });
            }
        }

        let total: Decimal = entries.iter().map(|spec| spec.share.value).sum();
        if total != verified.value {
            return Err(DistributionError::ShareSumMismatch {
                expected: verified.clone(),
                actual: Amount::new(total, verified.currency.clone()),
            });
        }

        // Conditional write: first committer wins, everyone else is told a
        // plan already exists.
        match self.plans.entry(settlement.settlement_id) {
            Entry::Occupied(_) => Err(DistributionError::PlanAlreadyExists(
                settlement.settlement_id,
            )),
            Entry::Vacant(vacant) => {
                let plan_entries: Vec<PlanEntry> = entries
                    .into_iter()
                    .map(|spec| PlanEntry {
                        id: PlanEntryId::new(),
                        member_id: spec.member_id,
                        share: spec.share,
                        payout_method: spec.payout_method,
                    })
                    .collect();

                let plan = DistributionPlan {
                    id: PlanId::new(),
                    settlement_id: settlement.settlement_id,
                    entries: plan_entries,
                    committed_at: chrono::Utc::now(),
                };

                let mut payout_ids = Vec::with_capacity(plan.entries.len());
                for entry in &plan.entries {
                    let payout = MemberPayout::pending(entry);
                    payout_ids.push(payout.id);
                    self.payouts.insert(payout.id, payout);
                }
                self.by_plan.insert(plan.id, payout_ids);

                tracing::info!(
                    plan_id = %plan.id,
                    settlement_id = %settlement.settlement_id,
                    members = plan.entries.len(),
                    "distribution plan committed"
                );
                vacant.insert(plan.clone());
                Ok(plan)
            }
        }
    }

    /// Move a payout to a terminal status.
    ///
    /// Only Pending → Succeeded/Failed/Cancelled is allowed; anything else
    /// fails with `invalid_payout_transition` and leaves the payout untouched.
    /// A failure here never affects sibling payouts or the parent settlement.
    pub fn mark_payout(
        &self,
        payout_id: PayoutId,
        status: PayoutStatus,
        rail_tx_id: Option<String>,
        notes: Option<String>,
    ) -> Result<MemberPayout, DistributionError> {
        let mut entry = self
            .payouts
            .get_mut(&payout_id)
            .ok_or(DistributionError::PayoutNotFound(payout_id))?;

        let payout = entry.value_mut();
        payout.status = PayoutStateMachine::transition(payout.status, status)?;
        if rail_tx_id.is_some() {
            payout.rail_tx_id = rail_tx_id;
        }
        if notes.is_some() {
            payout.notes = notes;
        }
        payout.updated_at = chrono::Utc::now();

        tracing::info!(
            payout_id = %payout_id,
            member_id = %payout.member_id,
            status = %payout.status,
            "payout marked"
        );
        Ok(payout.clone())
    }

    /// The committed plan for a settlement, if any.
    pub fn plan_for_settlement(&self, settlement_id: SettlementId) -> Option<DistributionPlan> {
        self.plans.get(&settlement_id).map(|entry| entry.clone())
    }

    /// A payout by id.
    pub fn payout(&self, payout_id: PayoutId) -> Option<MemberPayout> {
        self.payouts.get(&payout_id).map(|entry| entry.clone())
    }

    /// All payouts of a plan, in entry order.
    pub fn payouts_for_plan(&self, plan_id: PlanId) -> Vec<MemberPayout> {
        self.by_plan
            .get(&plan_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.payouts.get(id).map(|entry| entry.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// All payouts owed to a member, across plans.
    pub fn payouts_for_member(&self, member_id: &MemberId) -> Vec<MemberPayout> {
        self.payouts
            .iter()
            .filter(|entry| &entry.member_id == member_id)
            .map(|entry| entry.clone())
            .collect()
    }
}

impl Default for DistributionAllocator {
    fn default() -> Self {
        Self::new()
    }
}
