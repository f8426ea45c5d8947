//! Shared fixtures for the cross-crate integration tests.
//!
//! Provides in-memory stand-ins for the external collaborators (card
//! processor, chain node) and a fully wired settlement stack.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use rust_decimal::Decimal;

use encore_core::config::{EngineConfig, OnchainConfig, SweeperConfig};
use encore_core::types::{
    Amount, CryptoCurrency, Currency, FiatCurrency, Obligation, PartyId,
};
use encore_distribution::DistributionAllocator;
use encore_rails::clients::{
    CardProcessorClient, ChainClient, ChainReceipt, ChainTransaction, ChargeRecord, ChargeStatus,
};
use encore_rails::error::RailError;
use encore_rails::oracle::FixedRateOracle;
use encore_rails::registry::RailAdapterRegistry;
use encore_rails::traits::RailAdapter;
use encore_rails::{CardAdapter, CreditAdapter, OnchainAdapter};
use encore_settlement::{
    ReconciliationSweeper, SettlementLedger, SettlementService, VerificationEngine,
};

/// The payee wallet every test chain transfer should pay.
pub const PAYEE_WALLET: &str = "0xabcd00000000000000000000000000000000ef12";
/// A plausible payer wallet.
pub const PAYER_WALLET: &str = "0x1111000000000000000000000000000000002222";

/// Install a test subscriber once; respects RUST_LOG.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn usd(value: Decimal) -> Amount {
    Amount::new(value, Currency::Fiat(FiatCurrency::USD))
}

pub fn usd_currency() -> Currency {
    Currency::Fiat(FiatCurrency::USD)
}

pub fn eth() -> Currency {
    Currency::Crypto(CryptoCurrency::ETH)
}

pub fn obligation(value: Decimal) -> Obligation {
    Obligation::builder()
        .payer(PartyId::new("venue-blue-note"))
        .payee(PartyId::new("band-midnight"))
        .expected(usd(value))
        .build()
        .expect("test obligation is valid")
}

/// In-memory chain node with settable height.
pub struct MockChain {
    txs: DashMap<String, ChainTransaction>,
    receipts: DashMap<String, ChainReceipt>,
    height: AtomicU64,
    /// Simulated RPC outage: every call fails transiently while set.
    outage: std::sync::atomic::AtomicBool,
}

impl MockChain {
    pub fn new(height: u64) -> Self {
        Self {
            txs: DashMap::new(),
            receipts: DashMap::new(),
            height: AtomicU64::new(height),
            outage: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// Mine a successful transfer to the payee wallet at `block`.
    pub fn add_transfer(&self, hash: &str, value_eth: Decimal, block: u64) {
        self.add_transfer_to(hash, PAYEE_WALLET, value_eth, block, true);
    }

    pub fn add_transfer_to(&self, hash: &str, to: &str, value_eth: Decimal, block: u64, ok: bool) {
        self.txs.insert(
            hash.to_string(),
            ChainTransaction {
                hash: hash.to_string(),
                from: PAYER_WALLET.to_string(),
                to: to.to_string(),
                value: value_eth,
                block_number: Some(block),
            },
        );
        self.receipts.insert(
            hash.to_string(),
            ChainReceipt {
                status_ok: ok,
                block_number: block,
            },
        );
    }

    /// A transfer the node has seen but that is not mined yet.
    pub fn add_unmined(&self, hash: &str, value_eth: Decimal) {
        self.txs.insert(
            hash.to_string(),
            ChainTransaction {
                hash: hash.to_string(),
                from: PAYER_WALLET.to_string(),
                to: PAYEE_WALLET.to_string(),
                value: value_eth,
                block_number: None,
            },
        );
    }

    pub fn set_height(&self, height: u64) {
        self.height.store(height, Ordering::SeqCst);
    }

    pub fn set_outage(&self, outage: bool) {
        self.outage.store(outage, Ordering::SeqCst);
    }

    fn check_outage(&self) -> Result<(), RailError> {
        if self.outage.load(Ordering::SeqCst) {
            return Err(RailError::Transient("rpc unreachable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn get_transaction(&self, tx_hash: &str) -> Result<Option<ChainTransaction>, RailError> {
        self.check_outage()?;
        Ok(self.txs.get(tx_hash).map(|entry| entry.clone()))
    }

    async fn get_transaction_receipt(
        &self,
        tx_hash: &str,
    ) -> Result<Option<ChainReceipt>, RailError> {
        self.check_outage()?;
        Ok(self.receipts.get(tx_hash).map(|entry| entry.clone()))
    }

    async fn get_block_number(&self) -> Result<u64, RailError> {
        self.check_outage()?;
        Ok(self.height.load(Ordering::SeqCst))
    }
}

/// In-memory card processor that counts lookups.
pub struct MockCardProcessor {
    charges: DashMap<String, ChargeRecord>,
    fetches: AtomicUsize,
}

impl MockCardProcessor {
    pub fn new() -> Self {
        Self {
            charges: DashMap::new(),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn add_charge(&self, charge_id: &str, amount: Decimal, currency: &str) {
        self.charges.insert(
            charge_id.to_string(),
            ChargeRecord {
                charge_id: charge_id.to_string(),
                amount,
                currency_code: currency.to_string(),
                status: ChargeStatus::Succeeded,
            },
        );
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl Default for MockCardProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CardProcessorClient for MockCardProcessor {
    async fn create_charge_intent(
        &self,
        _amount: Decimal,
        _currency_code: &str,
        _memo: &str,
    ) -> Result<String, RailError> {
        Ok("pi_integration".to_string())
    }

    async fn fetch_charge(&self, charge_id: &str) -> Result<Option<ChargeRecord>, RailError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.charges.get(charge_id).map(|entry| entry.clone()))
    }

    async fn refund_charge(&self, charge_id: &str, _amount: Decimal) -> Result<String, RailError> {
        Ok(format!("re_{}", charge_id))
    }
}

/// A fully wired settlement and distribution stack over the mocks.
pub struct Stack {
    pub service: SettlementService,
    pub ledger: Arc<SettlementLedger>,
    pub sweeper: Arc<ReconciliationSweeper>,
    pub allocator: DistributionAllocator,
    pub chain: Arc<MockChain>,
    pub cards: Arc<MockCardProcessor>,
    pub oracle: Arc<FixedRateOracle>,
    pub credit: Arc<CreditAdapter>,
}

/// Build a stack with card, onchain, and credit rails and a 1-confirmation
/// onchain policy.
pub fn stack() -> Stack {
    stack_with(OnchainConfig {
        min_confirmations: 1,
        slippage_bps: 500,
    })
}

pub fn stack_with(onchain: OnchainConfig) -> Stack {
    init_tracing();

    let chain = Arc::new(MockChain::new(100));
    let cards = Arc::new(MockCardProcessor::new());
    let oracle = Arc::new(FixedRateOracle::new());
    oracle.set_rate(&eth(), &Currency::Fiat(FiatCurrency::USD), Decimal::new(2000, 0));
    let credit = Arc::new(CreditAdapter::new());

    let onchain_adapter = OnchainAdapter::new(
        Arc::clone(&chain) as Arc<dyn ChainClient>,
        Arc::clone(&oracle) as Arc<dyn encore_rails::RateOracle>,
        PAYEE_WALLET,
        eth(),
        onchain,
    )
    .expect("payee wallet is a valid address");

    let mut registry = RailAdapterRegistry::new();
    registry.register(Arc::new(CardAdapter::new(
        Arc::clone(&cards) as Arc<dyn CardProcessorClient>
    )));
    registry.register(Arc::new(onchain_adapter));
    registry.register(Arc::clone(&credit) as Arc<dyn RailAdapter>);

    let ledger = Arc::new(SettlementLedger::new());
    let engine = Arc::new(VerificationEngine::new(
        Arc::new(registry),
        EngineConfig::default(),
    ));
    let sweeper = Arc::new(ReconciliationSweeper::new(
        Arc::clone(&ledger),
        Arc::clone(&engine),
        SweeperConfig::default(),
    ));
    let service = SettlementService::new(Arc::clone(&ledger), engine, Arc::clone(&sweeper));

    Stack {
        service,
        ledger,
        sweeper,
        allocator: DistributionAllocator::new(),
        chain,
        cards,
        oracle,
        credit,
    }
}
