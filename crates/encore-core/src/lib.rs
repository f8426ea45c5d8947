pub mod config;
pub mod error;
pub mod state_machine;
pub mod types;

pub use config::{EngineConfig, OnchainConfig, SweeperConfig};
pub use error::CoreError;
pub use state_machine::{
    OutcomeEvent, OutcomeState, OutcomeStateMachine, PayoutStateMachine, PayoutStatus,
};
pub use types::{
    Amount, CryptoCurrency, Currency, FiatCurrency, MemberId, Obligation, ObligationBuilder,
    ObligationId, PartyId, PaymentReference, PayoutId, PlanEntryId, PlanId, Rail, ReferenceKey,
    RejectReason, SettlementId,
};
