use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use encore_core::types::{Amount, Currency, Obligation, PartyId, PaymentReference, Rail, RejectReason};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::RailError;
use crate::traits::{IntentHandle, RailAdapter, RailStatus, RailVerification, RefundResult};

/// An individual ledger entry in the credit ledger.
#[derive(Debug, Clone)]
struct LedgerEntry {
    /// Unique ID for this entry.
    _id: Uuid,
    /// The party whose account is affected.
    party: PartyId,
    /// Positive = credit, negative = debit.
    delta: Decimal,
    /// The credit note that produced this entry.
    credit_id: String,
    /// Currency of the entry.
    currency: Currency,
}

/// Lifecycle of an issued credit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CreditStatus {
    /// Issued and standing.
    Issued,
    /// Reversed; no longer satisfies anything.
    Refunded,
}

/// An internally issued credit note.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditNote {
    /// Rail transaction identifier (`cr_…`).
    pub credit_id: String,
    /// The party debited (venue).
    pub payer: PartyId,
    /// The party credited (band).
    pub payee: PartyId,
    /// The issued amount.
    pub amount: Amount,
    /// Current status.
    pub status: CreditStatus,
    /// When the credit was issued.
    pub issued_at: DateTime<Utc>,
}

/// Internally issued credit rail.
///
/// Settles against an in-memory double-entry ledger: issuing a credit debits
/// the payer and credits the payee; a refund reverses the pair. Verification
/// is instant: a standing credit with the exact expected amount succeeds.
pub struct CreditAdapter {
    /// Issued credits keyed by credit id.
    credits: DashMap<String, CreditNote>,
    /// Double-entry ledger.
    ledger: DashMap<Uuid, LedgerEntry>,
    /// Balance tracker: "party:currency" -> signed balance.
    balances: DashMap<String, Decimal>,
}

impl CreditAdapter {
    /// Create a new credit adapter with an empty ledger.
    pub fn new() -> Self {
        Self {
            credits: DashMap::new(),
            ledger: DashMap::new(),
            balances: DashMap::new(),
        }
    }

    /// Build a composite balance key from a party and currency.
    fn balance_key(party: &PartyId, currency: &Currency) -> String {
        format!("{}:{}", party, currency)
    }

    /// Get the current balance for a party + currency pair.
    pub fn get_balance(&self, party: &PartyId, currency: &Currency) -> Decimal {
        let key = Self::balance_key(party, currency);
        self.balances.get(&key).map(|v| *v).unwrap_or(Decimal::ZERO)
    }

    /// Look up an issued credit.
    pub fn get_credit(&self, credit_id: &str) -> Option<CreditNote> {
        self.credits.get(credit_id).map(|entry| entry.clone())
    }

    /// Issue a credit satisfying the obligation; posts the double-entry pair.
    pub fn issue(&self, obligation: &Obligation) -> CreditNote {
        let credit_id = format!("cr_{}", Uuid::now_v7().simple());
        let note = CreditNote {
            credit_id: credit_id.clone(),
            payer: obligation.payer.clone(),
            payee: obligation.payee.clone(),
            amount: obligation.expected.clone(),
            status: CreditStatus::Issued,
            issued_at: Utc::now(),
        };

        self.record_entries(&credit_id, &note.payer, &note.payee, &note.amount);
        self.credits.insert(credit_id.clone(), note.clone());
        tracing::info!(credit_id = %credit_id, obligation_id = %obligation.id, "credit issued");
        note
    }

    /// Record a double-entry pair: debit payer, credit payee.
    fn record_entries(&self, credit_id: &str, payer: &PartyId, payee: &PartyId, amount: &Amount) {
        let debit_id = Uuid::now_v7();
        self.ledger.insert(
            debit_id,
            LedgerEntry {
                _id: debit_id,
                party: payer.clone(),
                delta: -amount.value,
                credit_id: credit_id.to_string(),
                currency: amount.currency.clone(),
            },
        );

        let credit_entry_id = Uuid::now_v7();
        self.ledger.insert(
            credit_entry_id,
            LedgerEntry {
                _id: credit_entry_id,
                party: payee.clone(),
                delta: amount.value,
                credit_id: credit_id.to_string(),
                currency: amount.currency.clone(),
            },
        );

        let payer_key = Self::balance_key(payer, &amount.currency);
        let payee_key = Self::balance_key(payee, &amount.currency);

        self.balances
            .entry(payer_key)
            .and_modify(|b| *b -= amount.value)
            .or_insert(-amount.value);
        self.balances
            .entry(payee_key)
            .and_modify(|b| *b += amount.value)
            .or_insert(amount.value);
    }

    /// Reverse a double-entry pair (for refunds).
    fn reverse_entries(&self, payer: &PartyId, payee: &PartyId, amount: &Amount) {
        let payer_key = Self::balance_key(payer, &amount.currency);
        let payee_key = Self::balance_key(payee, &amount.currency);

        self.balances
            .entry(payer_key)
            .and_modify(|b| *b += amount.value)
            .or_insert(amount.value);
        self.balances
            .entry(payee_key)
            .and_modify(|b| *b -= amount.value)
            .or_insert(-amount.value);
    }
}

impl Default for CreditAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RailAdapter for CreditAdapter {
    fn rail(&self) -> Rail {
        Rail::Credit
    }

    async fn create_intent(&self, obligation: &Obligation) -> Result<IntentHandle, RailError> {
        let note = self.issue(obligation);
        Ok(IntentHandle {
            obligation_id: obligation.id,
            rail: Rail::Credit,
            intent_id: note.credit_id,
            created_at: note.issued_at,
        })
    }

    async fn verify(
        &self,
        reference: &PaymentReference,
        expected: &Amount,
    ) -> Result<RailVerification, RailError> {
        let note = match self.get_credit(&reference.rail_tx_id) {
            Some(note) => note,
            None => {
                return Ok(RailVerification::failure(RejectReason::UnknownTransaction, None));
            }
        };

        if note.status == CreditStatus::Refunded {
            return Ok(RailVerification::failure(
                RejectReason::TransactionFailed,
                Some(note.amount),
            ));
        }

        if note.amount.currency != expected.currency {
            return Ok(RailVerification::failure(
                RejectReason::CurrencyMismatch,
                Some(note.amount),
            ));
        }
        if note.amount.value != expected.value {
            return Ok(RailVerification::failure(
                RejectReason::AmountMismatch,
                Some(note.amount),
            ));
        }

        Ok(RailVerification {
            status: RailStatus::Success,
            normalized: Some(note.amount.clone()),
            observed: Some(note.amount),
            confirmations: 0,
            chain_height: None,
        })
    }

    async fn refund(
        &self,
        reference: &PaymentReference,
        amount: Option<Amount>,
    ) -> Result<RefundResult, RailError> {
        let mut entry = self.credits.get_mut(&reference.rail_tx_id).ok_or_else(|| {
            RailError::RefundFailed(format!("unknown credit {}", reference.rail_tx_id))
        })?;

        let note = entry.value_mut();
        if note.status == CreditStatus::Refunded {
            return Err(RailError::RefundFailed(format!(
                "credit {} already refunded",
                note.credit_id
            )));
        }
        if amount.as_ref().is_some_and(|a| *a != note.amount) {
            return Err(RailError::RefundFailed(
                "credits can only be refunded in full".into(),
            ));
        }

        self.reverse_entries(&note.payer, &note.payee, &note.amount);
        note.status = CreditStatus::Refunded;

        tracing::info!(credit_id = %note.credit_id, "credit refunded");
        Ok(RefundResult {
            refund_id: format!("rev_{}", note.credit_id),
            amount: note.amount.clone(),
            refunded_at: Utc::now(),
        })
    }
}
