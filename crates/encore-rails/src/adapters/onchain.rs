use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use encore_core::config::OnchainConfig;
use encore_core::types::{Amount, Currency, Obligation, PaymentReference, Rail, RejectReason};
use rust_decimal::Decimal;

use crate::clients::ChainClient;
use crate::error::RailError;
use crate::oracle::RateOracle;
use crate::traits::{IntentHandle, RailAdapter, RailStatus, RailVerification, RefundResult};

/// On-chain transfer rail.
///
/// Verification fetches the transaction, its receipt, and the current chain
/// height. A transfer is accepted only when it is mined with a successful
/// receipt, pays the configured payee wallet, matches a declared counterpart
/// sender when one exists, sits at or above the confirmation threshold, and
/// its oracle-converted value falls inside the slippage band around the
/// expected amount. Below the threshold the verdict is Pending, never
/// Rejected.
pub struct OnchainAdapter {
    client: Arc<dyn ChainClient>,
    oracle: Arc<dyn RateOracle>,
    /// The wallet the band is paid into (0x-prefixed hex, any case).
    payee_wallet: String,
    /// The chain's native unit (e.g. ETH).
    chain_currency: Currency,
    config: OnchainConfig,
}

impl OnchainAdapter {
    pub fn new(
        client: Arc<dyn ChainClient>,
        oracle: Arc<dyn RateOracle>,
        payee_wallet: impl Into<String>,
        chain_currency: Currency,
        config: OnchainConfig,
    ) -> Result<Self, RailError> {
        let payee_wallet = normalize_address(&payee_wallet.into())?;
        Ok(Self {
            client,
            oracle,
            payee_wallet,
            chain_currency,
            config,
        })
    }
}

/// Lowercase a 0x-prefixed hex address after validating it decodes.
fn normalize_address(address: &str) -> Result<String, RailError> {
    let stripped = address
        .strip_prefix("0x")
        .ok_or_else(|| RailError::InvalidIdentity(format!("address missing 0x prefix: {}", address)))?;
    hex::decode(stripped)
        .map_err(|_| RailError::InvalidIdentity(format!("address is not hex: {}", address)))?;
    Ok(address.to_ascii_lowercase())
}

#[async_trait]
impl RailAdapter for OnchainAdapter {
    fn rail(&self) -> Rail {
        Rail::Onchain
    }

    async fn create_intent(&self, obligation: &Obligation) -> Result<IntentHandle, RailError> {
        // No remote intent object exists on-chain; the handle carries the
        // deposit address the payer must send to.
        tracing::info!(obligation_id = %obligation.id, wallet = %self.payee_wallet, "onchain intent opened");
        Ok(IntentHandle {
            obligation_id: obligation.id,
            rail: Rail::Onchain,
            intent_id: self.payee_wallet.clone(),
            created_at: Utc::now(),
        })
    }

    async fn verify(
        &self,
        reference: &PaymentReference,
        expected: &Amount,
    ) -> Result<RailVerification, RailError> {
        let tx = match self.client.get_transaction(&reference.rail_tx_id).await? {
            Some(tx) => tx,
            // The node may simply not have seen the hash yet.
            None => return Ok(RailVerification::pending(0, None)),
        };

        if tx.block_number.is_none() {
            return Ok(RailVerification::pending(0, None));
        }

        let receipt = match self
            .client
            .get_transaction_receipt(&reference.rail_tx_id)
            .await?
        {
            Some(receipt) => receipt,
            None => return Ok(RailVerification::pending(0, None)),
        };

        let observed = Amount::new(tx.value, self.chain_currency.clone());

        if !receipt.status_ok {
            return Ok(RailVerification::failure(
                RejectReason::TransactionFailed,
                Some(observed),
            ));
        }

        let recipient = normalize_address(&tx.to)?;
        if recipient != self.payee_wallet {
            tracing::warn!(
                tx = %reference.rail_tx_id,
                recipient = %recipient,
                "onchain transfer pays the wrong wallet"
            );
            return Ok(RailVerification::failure(
                RejectReason::WrongRecipient,
                Some(observed),
            ));
        }

        if let Some(counterpart) = &reference.counterpart {
            let declared = normalize_address(counterpart)?;
            let sender = normalize_address(&tx.from)?;
            if sender != declared {
                return Ok(RailVerification::failure(
                    RejectReason::WrongSender,
                    Some(observed),
                ));
            }
        }

        let rate = self
            .oracle
            .rate(&self.chain_currency, &expected.currency)
            .await?;
        let normalized = observed.converted(rate, expected.currency.clone());

        let band = expected.value * Decimal::from(self.config.slippage_bps) / Decimal::from(10_000u32);
        if (normalized.value - expected.value).abs() > band {
            tracing::warn!(
                tx = %reference.rail_tx_id,
                normalized = %normalized,
                expected = %expected,
                "onchain transfer outside the slippage band"
            );
            return Ok(RailVerification::failure(
                RejectReason::AmountMismatch,
                Some(observed),
            ));
        }

        let height = self.client.get_block_number().await?;
        let confirmations = height.saturating_sub(receipt.block_number);

        if confirmations < self.config.min_confirmations {
            return Ok(RailVerification {
                status: RailStatus::Pending,
                observed: Some(observed),
                normalized: None,
                confirmations,
                chain_height: Some(height),
            });
        }

        Ok(RailVerification {
            status: RailStatus::Success,
            observed: Some(observed),
            normalized: Some(normalized),
            confirmations,
            chain_height: Some(height),
        })
    }

    async fn refund(
        &self,
        reference: &PaymentReference,
        _amount: Option<Amount>,
    ) -> Result<RefundResult, RailError> {
        // The engine holds no signing keys; an on-chain refund is a new
        // transfer initiated by the wallet owner.
        Err(RailError::RefundFailed(format!(
            "onchain transfer {} must be refunded by the wallet owner",
            reference.rail_tx_id
        )))
    }
}
