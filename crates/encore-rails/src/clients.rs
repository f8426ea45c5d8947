//! Client boundaries for the external processor and chain SDKs.
//!
//! The concrete HTTP/RPC client libraries live outside this system; these
//! traits capture only the confirm/capture/refund contracts the adapters
//! need. Implementations must report network failures, rate limits, and
//! timeouts as [`RailError::Transient`].

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::RailError;

/// Final status of a card charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChargeStatus {
    /// The charge captured successfully.
    Succeeded,
    /// The processor declined the charge.
    Declined,
}

/// A card charge as reported by the processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeRecord {
    pub charge_id: String,
    pub amount: Decimal,
    pub currency_code: String,
    pub status: ChargeStatus,
}

/// Card processor contract: create, look up, refund.
#[async_trait]
pub trait CardProcessorClient: Send + Sync {
    /// Open a charge intent; returns the processor's intent id.
    async fn create_charge_intent(
        &self,
        amount: Decimal,
        currency_code: &str,
        memo: &str,
    ) -> Result<String, RailError>;

    /// Look up a charge. `None` means the processor has no such charge.
    async fn fetch_charge(&self, charge_id: &str) -> Result<Option<ChargeRecord>, RailError>;

    /// Refund a captured charge; returns the processor's refund id.
    async fn refund_charge(&self, charge_id: &str, amount: Decimal) -> Result<String, RailError>;
}

/// Final status of a wallet transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferStatus {
    /// The transfer completed.
    Completed,
    /// The transfer failed at the wallet network.
    Failed,
}

/// A wallet transfer as reported by the processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub transfer_id: String,
    pub amount: Decimal,
    pub currency_code: String,
    pub status: TransferStatus,
}

/// Wallet transfer processor contract.
#[async_trait]
pub trait WalletProcessorClient: Send + Sync {
    /// Open a transfer request; returns the processor's request id.
    async fn create_transfer_request(
        &self,
        amount: Decimal,
        currency_code: &str,
        memo: &str,
    ) -> Result<String, RailError>;

    /// Look up a transfer. `None` means the processor has no such transfer.
    async fn fetch_transfer(&self, transfer_id: &str)
        -> Result<Option<TransferRecord>, RailError>;

    /// Reverse a completed transfer; returns the processor's reversal id.
    async fn refund_transfer(&self, transfer_id: &str, amount: Decimal)
        -> Result<String, RailError>;
}

/// An on-chain transaction as returned by the node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainTransaction {
    /// Transaction hash (0x-prefixed hex).
    pub hash: String,
    /// Sender address (0x-prefixed hex).
    pub from: String,
    /// Recipient address (0x-prefixed hex).
    pub to: String,
    /// Transferred value in whole coin units (e.g. ETH, not wei).
    pub value: Decimal,
    /// Block the transaction was mined in; `None` while unmined.
    pub block_number: Option<u64>,
}

/// An on-chain transaction receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainReceipt {
    /// Whether the transaction executed successfully (not reverted).
    pub status_ok: bool,
    /// Block the transaction was mined in.
    pub block_number: u64,
}

/// Chain node contract: the three calls on-chain verification needs.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Fetch a transaction by hash. `None` means the node has not seen it.
    async fn get_transaction(&self, tx_hash: &str)
        -> Result<Option<ChainTransaction>, RailError>;

    /// Fetch the receipt of a mined transaction. `None` while unmined.
    async fn get_transaction_receipt(
        &self,
        tx_hash: &str,
    ) -> Result<Option<ChainReceipt>, RailError>;

    /// Current chain height.
    async fn get_block_number(&self) -> Result<u64, RailError>;
}
