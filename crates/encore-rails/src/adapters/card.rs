use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use encore_core::types::{Amount, Currency, Obligation, PaymentReference, Rail, RejectReason};

use crate::clients::{CardProcessorClient, ChargeStatus};
use crate::error::RailError;
use crate::traits::{IntentHandle, RailAdapter, RailStatus, RailVerification, RefundResult};

/// Card processor rail.
///
/// Verification is one synchronous processor call; a charge is final the
/// moment the processor reports it (confirmations fixed at 0). The acceptance
/// policy is an exact match on amount and currency.
pub struct CardAdapter {
    client: Arc<dyn CardProcessorClient>,
}

impl CardAdapter {
    pub fn new(client: Arc<dyn CardProcessorClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RailAdapter for CardAdapter {
    fn rail(&self) -> Rail {
        Rail::Card
    }

    async fn create_intent(&self, obligation: &Obligation) -> Result<IntentHandle, RailError> {
        let intent_id = self
            .client
            .create_charge_intent(
                obligation.expected.value,
                obligation.expected.currency.code(),
                &format!("obligation {}", obligation.id),
            )
            .await?;

        tracing::info!(obligation_id = %obligation.id, intent_id = %intent_id, "card intent opened");
        Ok(IntentHandle {
            obligation_id: obligation.id,
            rail: Rail::Card,
            intent_id,
            created_at: Utc::now(),
        })
    }

    async fn verify(
        &self,
        reference: &PaymentReference,
        expected: &Amount,
    ) -> Result<RailVerification, RailError> {
        let charge = match self.client.fetch_charge(&reference.rail_tx_id).await? {
            Some(charge) => charge,
            None => {
                return Ok(RailVerification::failure(RejectReason::UnknownTransaction, None));
            }
        };

        let observed = Amount::new(charge.amount, Currency::parse(&charge.currency_code));

        if charge.status == ChargeStatus::Declined {
            return Ok(RailVerification::failure(
                RejectReason::RailDeclined,
                Some(observed),
            ));
        }

        if observed.currency != expected.currency {
            return Ok(RailVerification::failure(
                RejectReason::CurrencyMismatch,
                Some(observed),
            ));
        }
        if observed.value != expected.value {
            return Ok(RailVerification::failure(
                RejectReason::AmountMismatch,
                Some(observed),
            ));
        }

        Ok(RailVerification {
            status: RailStatus::Success,
            normalized: Some(observed.clone()),
            observed: Some(observed),
            confirmations: 0,
            chain_height: None,
        })
    }

    async fn refund(
        &self,
        reference: &PaymentReference,
        amount: Option<Amount>,
    ) -> Result<RefundResult, RailError> {
        let charge = self
            .client
            .fetch_charge(&reference.rail_tx_id)
            .await?
            .ok_or_else(|| {
                RailError::RefundFailed(format!("unknown charge {}", reference.rail_tx_id))
            })?;

        let refund_amount = amount.unwrap_or_else(|| {
            Amount::new(charge.amount, Currency::parse(&charge.currency_code))
        });

        let refund_id = self
            .client
            .refund_charge(&reference.rail_tx_id, refund_amount.value)
            .await?;

        tracing::info!(charge_id = %reference.rail_tx_id, refund_id = %refund_id, "card charge refunded");
        Ok(RefundResult {
            refund_id,
            amount: refund_amount,
            refunded_at: Utc::now(),
        })
    }
}
