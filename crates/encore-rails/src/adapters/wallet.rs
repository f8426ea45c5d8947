use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use encore_core::types::{Amount, Currency, Obligation, PaymentReference, Rail, RejectReason};

use crate::clients::{TransferStatus, WalletProcessorClient};
use crate::error::RailError;
use crate::traits::{IntentHandle, RailAdapter, RailStatus, RailVerification, RefundResult};

/// Wallet transfer processor rail.
///
/// Same shape as the card rail: one synchronous processor call, final
/// immediately, exact amount and currency match.
pub struct WalletAdapter {
    client: Arc<dyn WalletProcessorClient>,
}

impl WalletAdapter {
    pub fn new(client: Arc<dyn WalletProcessorClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RailAdapter for WalletAdapter {
    fn rail(&self) -> Rail {
        Rail::Wallet
    }

    async fn create_intent(&self, obligation: &Obligation) -> Result<IntentHandle, RailError> {
        let intent_id = self
            .client
            .create_transfer_request(
                obligation.expected.value,
                obligation.expected.currency.code(),
                &format!("obligation {}", obligation.id),
            )
            .await?;

        tracing::info!(obligation_id = %obligation.id, intent_id = %intent_id, "wallet transfer requested");
        Ok(IntentHandle {
            obligation_id: obligation.id,
            rail: Rail::Wallet,
            intent_id,
            created_at: Utc::now(),
        })
    }

    async fn verify(
        &self,
        reference: &PaymentReference,
        expected: &Amount,
    ) -> Result<RailVerification, RailError> {
        let transfer = match self.client.fetch_transfer(&reference.rail_tx_id).await? {
            Some(transfer) => transfer,
            None => {
                return Ok(RailVerification::failure(RejectReason::UnknownTransaction, None));
            }
        };

        let observed = Amount::new(transfer.amount, Currency::parse(&transfer.currency_code));

        if transfer.status == TransferStatus::Failed {
            return Ok(RailVerification::failure(
                RejectReason::TransactionFailed,
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
        let transfer = self
            .client
            .fetch_transfer(&reference.rail_tx_id)
            .await?
            .ok_or_else(|| {
                RailError::RefundFailed(format!("unknown transfer {}", reference.rail_tx_id))
            })?;

        let refund_amount = amount.unwrap_or_else(|| {
            Amount::new(transfer.amount, Currency::parse(&transfer.currency_code))
        });

        let refund_id = self
            .client
            .refund_transfer(&reference.rail_tx_id, refund_amount.value)
            .await?;

        tracing::info!(transfer_id = %reference.rail_tx_id, refund_id = %refund_id, "wallet transfer reversed");
        Ok(RefundResult {
            refund_id,
            amount: refund_amount,
            refunded_at: Utc::now(),
        })
    }
}
