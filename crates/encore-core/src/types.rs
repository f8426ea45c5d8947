use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

/// A monetary value: fixed-point decimal plus its currency.
///
/// Never floating point; all arithmetic goes through `rust_decimal`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount {
    /// Value in whole currency units (e.g. `100.00` USD, `0.05` ETH).
    pub value: Decimal,
    /// The currency of this amount.
    pub currency: Currency,
}

impl Amount {
    /// Create a new amount.
    pub fn new(value: Decimal, currency: Currency) -> Self {
        Self { value, currency }
    }

    /// Check if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    /// Check if the amount is negative.
    pub fn is_negative(&self) -> bool {
        self.value.is_sign_negative() && !self.value.is_zero()
    }

    /// Convert into another currency at the given rate, rounding to the
    /// target currency's decimal places.
    pub fn converted(&self, rate: Decimal, currency: Currency) -> Self {
        let value = (self.value * rate).round_dp(currency.decimals());
        Self { value, currency }
    }

    /// Round the value to this currency's decimal places.
    pub fn normalized(&self) -> Self {
        Self {
            value: self.value.round_dp(self.currency.decimals()),
            currency: self.currency.clone(),
        }
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.currency)
    }
}

/// Currency types supported by Encore.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    /// Fiat currency with ISO 4217 code.
    Fiat(FiatCurrency),
    /// Cryptocurrency.
    Crypto(CryptoCurrency),
    /// Custom token.
    Custom(String),
}

impl Currency {
    /// Currency code (ISO 4217 for fiat, ticker symbol otherwise).
    pub fn code(&self) -> &str {
        match self {
            Currency::Fiat(fiat) => fiat.code(),
            Currency::Crypto(crypto) => crypto.code(),
            Currency::Custom(code) => code,
        }
    }

    /// Number of decimal places amounts are recorded at.
    pub fn decimals(&self) -> u32 {
        match self {
            Currency::Fiat(fiat) => fiat.decimals(),
            Currency::Crypto(crypto) => crypto.decimals(),
            Currency::Custom(_) => 2,
        }
    }

    /// Parse a code, falling back to a custom token for unknown codes.
    pub fn parse(code: &str) -> Self {
        if let Some(fiat) = FiatCurrency::from_code(code) {
            return Currency::Fiat(fiat);
        }
        if let Some(crypto) = CryptoCurrency::from_code(code) {
            return Currency::Crypto(crypto);
        }
        Currency::Custom(code.to_string())
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// ISO 4217 fiat currencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FiatCurrency {
    USD,
    EUR,
    GBP,
    BRL,
    JPY,
    CHF,
    AUD,
    CAD,
}

impl FiatCurrency {
    /// ISO 4217 code.
    pub fn code(&self) -> &str {
        match self {
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
            Self::BRL => "BRL",
            Self::JPY => "JPY",
            Self::CHF => "CHF",
            Self::AUD => "AUD",
            Self::CAD => "CAD",
        }
    }

    /// Number of decimal places.
    pub fn decimals(&self) -> u32 {
        match self {
            Self::JPY => 0,
            _ => 2,
        }
    }

    /// Parse from ISO 4217 code.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "USD" => Some(Self::USD),
            "EUR" => Some(Self::EUR),
            "GBP" => Some(Self::GBP),
            "BRL" => Some(Self::BRL),
            "JPY" => Some(Self::JPY),
            "CHF" => Some(Self::CHF),
            "AUD" => Some(Self::AUD),
            "CAD" => Some(Self::CAD),
            _ => None,
        }
    }
}

/// Cryptocurrencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CryptoCurrency {
    BTC,
    ETH,
    SOL,
    USDC,
    USDT,
}

impl CryptoCurrency {
    /// Ticker symbol.
    pub fn code(&self) -> &str {
        match self {
            Self::BTC => "BTC",
            Self::ETH => "ETH",
            Self::SOL => "SOL",
            Self::USDC => "USDC",
            Self::USDT => "USDT",
        }
    }

    /// Number of decimal places amounts are recorded at.
    pub fn decimals(&self) -> u32 {
        match self {
            Self::BTC => 8,
            Self::ETH => 18,
            Self::SOL => 9,
            Self::USDC | Self::USDT => 6,
        }
    }

    /// Parse from ticker symbol.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "BTC" => Some(Self::BTC),
            "ETH" => Some(Self::ETH),
            "SOL" => Some(Self::SOL),
            "USDC" => Some(Self::USDC),
            "USDT" => Some(Self::USDT),
            _ => None,
        }
    }
}

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new random ID (UUID v7 — time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Create from an existing UUID.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Get the inner UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for an obligation.
    ObligationId
);
uuid_id!(
    /// Unique identifier for a settlement outcome.
    SettlementId
);
uuid_id!(
    /// Unique identifier for a distribution plan.
    PlanId
);
uuid_id!(
    /// Unique identifier for a distribution plan entry.
    PlanEntryId
);
uuid_id!(
    /// Unique identifier for a member payout.
    PayoutId
);

/// An account taking part in an obligation (venue, band, processor account).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartyId(pub String);

impl PartyId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A band member receiving a payout share.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemberId(pub String);

impl MemberId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A payment rail: the mechanism a payment moves over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rail {
    /// Card processor charge.
    Card,
    /// Wallet transfer processor.
    Wallet,
    /// On-chain cryptocurrency transfer.
    Onchain,
    /// Internally issued credit.
    Credit,
}

impl Rail {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Card => "card",
            Self::Wallet => "wallet",
            Self::Onchain => "onchain",
            Self::Credit => "credit",
        }
    }

    /// Whether verification on this rail resolves asynchronously
    /// (confirmation depth matters).
    pub fn is_asynchronous(&self) -> bool {
        matches!(self, Self::Onchain)
    }
}

impl fmt::Display for Rail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Machine-readable reason a settlement attempt was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    /// Observed amount outside the accepted tolerance of the expected amount.
    AmountMismatch,
    /// Observed currency differs from the expected currency.
    CurrencyMismatch,
    /// On-chain recipient does not match the configured payee wallet.
    WrongRecipient,
    /// On-chain sender does not match the declared counterpart.
    WrongSender,
    /// The rail transaction itself failed (reverted receipt, failed transfer).
    TransactionFailed,
    /// The processor declined the charge or transfer.
    RailDeclined,
    /// The rail has no record of the referenced transaction.
    UnknownTransaction,
    /// The same (rail, transaction id) pair was already submitted.
    DuplicateReference,
    /// Another reference already settled this obligation.
    ObligationAlreadySettled,
    /// The reconciliation horizon elapsed without a terminal verdict.
    VerificationHorizonExceeded,
}

impl RejectReason {
    /// Stable reason code reported to callers.
    pub fn code(&self) -> &'static str {
        match self {
            Self::AmountMismatch => "amount_mismatch",
            Self::CurrencyMismatch => "currency_mismatch",
            Self::WrongRecipient => "wrong_recipient",
            Self::WrongSender => "wrong_sender",
            Self::TransactionFailed => "transaction_failed",
            Self::RailDeclined => "rail_declined",
            Self::UnknownTransaction => "unknown_transaction",
            Self::DuplicateReference => "duplicate_reference",
            Self::ObligationAlreadySettled => "obligation_already_settled",
            Self::VerificationHorizonExceeded => "verification_horizon_exceeded",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// What one party owes another for one event.
///
/// Immutable once created; build through [`Obligation::builder`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Obligation {
    /// Unique identifier.
    pub id: ObligationId,
    /// The party that owes (venue).
    pub payer: PartyId,
    /// The party that is owed (band).
    pub payee: PartyId,
    /// The amount and currency owed.
    pub expected: Amount,
    /// When the obligation was created.
    pub created_at: DateTime<Utc>,
}

impl Obligation {
    /// Create a new ObligationBuilder.
    pub fn builder() -> ObligationBuilder {
        ObligationBuilder::default()
    }

    /// Validate the obligation.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.payer.as_str().is_empty() {
            return Err(CoreError::MissingField("payer".into()));
        }
        if self.payee.as_str().is_empty() {
            return Err(CoreError::MissingField("payee".into()));
        }
        if self.payer == self.payee {
            return Err(CoreError::ValidationError(
                "payer and payee must be different".into(),
            ));
        }
        if self.expected.is_zero() || self.expected.is_negative() {
            return Err(CoreError::InvalidAmount(
                "expected amount must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`Obligation`].
#[derive(Debug, Default)]
pub struct ObligationBuilder {
    payer: Option<PartyId>,
    payee: Option<PartyId>,
    expected: Option<Amount>,
}

impl ObligationBuilder {
    pub fn payer(mut self, payer: PartyId) -> Self {
        self.payer = Some(payer);
        self
    }

    pub fn payee(mut self, payee: PartyId) -> Self {
        self.payee = Some(payee);
        self
    }

    pub fn expected(mut self, expected: Amount) -> Self {
        self.expected = Some(expected);
        self
    }

    /// Build and validate the obligation.
    pub fn build(self) -> Result<Obligation, CoreError> {
        let obligation = Obligation {
            id: ObligationId::new(),
            payer: self.payer.ok_or_else(|| CoreError::MissingField("payer".into()))?,
            payee: self.payee.ok_or_else(|| CoreError::MissingField("payee".into()))?,
            expected: self
                .expected
                .ok_or_else(|| CoreError::MissingField("expected".into()))?,
            created_at: Utc::now(),
        };
        obligation.validate()?;
        Ok(obligation)
    }
}

/// A claim that a specific external transaction satisfies an obligation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReference {
    /// The obligation this reference claims to satisfy.
    pub obligation_id: ObligationId,
    /// The rail the transaction moved over.
    pub rail: Rail,
    /// Rail-specific transaction identifier (charge id, tx hash, credit id).
    pub rail_tx_id: String,
    /// Declared sender identity, when the caller knows it (on-chain only).
    pub counterpart: Option<String>,
    /// When the reference was submitted.
    pub submitted_at: DateTime<Utc>,
}

impl PaymentReference {
    /// Create a new reference submitted now.
    pub fn new(obligation_id: ObligationId, rail: Rail, rail_tx_id: impl Into<String>) -> Self {
        Self {
            obligation_id,
            rail,
            rail_tx_id: rail_tx_id.into(),
            counterpart: None,
            submitted_at: Utc::now(),
        }
    }

    /// Attach a declared counterpart (expected sender) identity.
    pub fn with_counterpart(mut self, counterpart: impl Into<String>) -> Self {
        self.counterpart = Some(counterpart.into());
        self
    }

    /// Validate the reference.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.rail_tx_id.trim().is_empty() {
            return Err(CoreError::MissingField("rail_tx_id".into()));
        }
        Ok(())
    }

    /// The system-wide uniqueness key for this reference.
    pub fn key(&self) -> ReferenceKey {
        ReferenceKey::new(self.rail, &self.rail_tx_id)
    }
}

/// The (rail, transaction id) pair a reference is deduplicated on.
///
/// On-chain transaction hashes are hex and compared case-insensitively, so
/// the key normalizes them to lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReferenceKey {
    pub rail: Rail,
    pub rail_tx_id: String,
}

impl ReferenceKey {
    pub fn new(rail: Rail, rail_tx_id: &str) -> Self {
        let rail_tx_id = match rail {
            Rail::Onchain => rail_tx_id.to_ascii_lowercase(),
            _ => rail_tx_id.to_string(),
        };
        Self { rail, rail_tx_id }
    }
}

impl fmt::Display for ReferenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.rail, self.rail_tx_id)
    }
}
