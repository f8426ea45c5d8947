use chrono::{DateTime, Utc};
use encore_core::state_machine::PayoutStatus;
use encore_core::types::{Amount, MemberId, PayoutId, PlanEntryId, PlanId, Rail, SettlementId};
use serde::{Deserialize, Serialize};

/// One requested share in a distribution: who gets how much, paid out how.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanEntrySpec {
    pub member_id: MemberId,
    pub share: Amount,
    pub payout_method: Rail,
}

impl PlanEntrySpec {
    pub fn new(member_id: MemberId, share: Amount, payout_method: Rail) -> Self {
        Self {
            member_id,
            share,
            payout_method,
        }
    }
}

/// A committed entry of a distribution plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanEntry {
    pub id: PlanEntryId,
    pub member_id: MemberId,
    pub share: Amount,
    pub payout_method: Rail,
}

/// How an accepted settlement splits among band members.
///
/// Committed at most once per settlement; entry shares sum exactly to the
/// settlement's verified amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionPlan {
    pub id: PlanId,
    /// The accepted settlement this plan distributes.
    pub settlement_id: SettlementId,
    /// Ordered entries.
    pub entries: Vec<PlanEntry>,
    /// When the plan was committed.
    pub committed_at: DateTime<Utc>,
}

impl DistributionPlan {
    /// Total of all entry shares.
    pub fn total(&self) -> Option<Amount> {
        let first = self.entries.first()?;
        let mut sum = first.share.value;
        for entry in &self.entries[1..] {
            sum += entry.share.value;
        }
        Some(Amount::new(sum, first.share.currency.clone()))
    }
}

/// One member's share of a settled amount, with its own lifecycle.
///
/// A payout's rail is independent of the rail the parent settlement arrived
/// on: a settlement paid on-chain can be distributed over card payouts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberPayout {
    pub id: PayoutId,
    /// The plan entry this payout realizes.
    pub plan_entry_id: PlanEntryId,
    pub member_id: MemberId,
    pub amount: Amount,
    pub payout_method: Rail,
    pub status: PayoutStatus,
    /// Rail transaction id of the outbound payment, once attempted.
    pub rail_tx_id: Option<String>,
    /// Free-form operator notes.
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MemberPayout {
    /// A fresh pending payout for a committed plan entry.
    pub fn pending(entry: &PlanEntry) -> Self {
        let now = Utc::now();
        Self {
            id: PayoutId::new(),
            plan_entry_id: entry.id,
            member_id: entry.member_id.clone(),
            amount: entry.share.clone(),
            payout_method: entry.payout_method,
            status: PayoutStatus::Pending,
            rail_tx_id: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }
}
