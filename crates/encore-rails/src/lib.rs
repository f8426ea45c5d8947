//! Encore rail layer.
//!
//! Normalizes "create intent / verify / refund" across heterogeneous payment
//! rails behind the [`RailAdapter`] trait. Each adapter owns its rail's
//! acceptance policy; the processor and chain SDKs sit behind narrow client
//! traits so the engine never talks to the network directly.

pub mod adapters;
pub mod clients;
pub mod error;
pub mod oracle;
pub mod registry;
pub mod traits;

pub use adapters::{CardAdapter, CreditAdapter, CreditNote, CreditStatus, OnchainAdapter, WalletAdapter};
pub use clients::{
    CardProcessorClient, ChainClient, ChainReceipt, ChainTransaction, ChargeRecord, ChargeStatus,
    TransferRecord, TransferStatus, WalletProcessorClient,
};
pub use error::RailError;
pub use oracle::{FixedRateOracle, RateOracle};
pub use registry::RailAdapterRegistry;
pub use traits::{IntentHandle, RailAdapter, RailStatus, RailVerification, RefundResult};
