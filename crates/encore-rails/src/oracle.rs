use async_trait::async_trait;
use dashmap::DashMap;
use encore_core::types::Currency;
use rust_decimal::Decimal;

use crate::error::RailError;

/// Conversion-rate oracle.
///
/// Consumed only at verification time, for reconciling volatile-rail amounts
/// against the obligation currency. An unreachable oracle is a
/// [`RailError::Transient`]. There is no fallback price; the verification
/// attempt is retried instead.
#[async_trait]
pub trait RateOracle: Send + Sync {
    /// The rate converting one unit of `from` into `to`.
    async fn rate(&self, from: &Currency, to: &Currency) -> Result<Decimal, RailError>;
}

/// Rate oracle over a fixed, externally refreshed table.
///
/// An out-of-process pricing feed updates the table; lookups never block on
/// the network. A missing pair behaves exactly like an unreachable oracle.
pub struct FixedRateOracle {
    rates: DashMap<(String, String), Decimal>,
}

impl FixedRateOracle {
    /// Create an oracle with an empty rate table.
    pub fn new() -> Self {
        Self {
            rates: DashMap::new(),
        }
    }

    /// Set the rate for a currency pair.
    pub fn set_rate(&self, from: &Currency, to: &Currency, rate: Decimal) {
        self.rates
            .insert((from.code().to_string(), to.code().to_string()), rate);
    }

    /// Remove the rate for a currency pair (simulates a feed gap).
    pub fn clear_rate(&self, from: &Currency, to: &Currency) {
        self.rates
            .remove(&(from.code().to_string(), to.code().to_string()));
    }
}

impl Default for FixedRateOracle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RateOracle for FixedRateOracle {
    async fn rate(&self, from: &Currency, to: &Currency) -> Result<Decimal, RailError> {
        if from == to {
            return Ok(Decimal::ONE);
        }
        self.rates
            .get(&(from.code().to_string(), to.code().to_string()))
            .map(|entry| *entry.value())
            .ok_or_else(|| {
                RailError::Transient(format!("no rate available for {}/{}", from, to))
            })
    }
}
