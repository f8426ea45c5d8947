use serde::{Deserialize, Serialize};

use crate::types::Rail;

/// Configuration for the verification engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Deadline for a single adapter call, in seconds.
    #[serde(default = "default_adapter_deadline_secs")]
    pub adapter_deadline_secs: u64,
    /// Poll interval for the bounded synchronous wait, in seconds.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Overall timeout for the bounded synchronous wait, in seconds.
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            adapter_deadline_secs: default_adapter_deadline_secs(),
            poll_interval_secs: default_poll_interval_secs(),
            poll_timeout_secs: default_poll_timeout_secs(),
        }
    }
}

/// Configuration for the on-chain rail's acceptance policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnchainConfig {
    /// Blocks mined on top of a transaction's block before it counts as final.
    #[serde(default = "default_min_confirmations")]
    pub min_confirmations: u64,
    /// Tolerance band around the oracle-converted expected amount, in
    /// basis points (500 = ±5%).
    #[serde(default = "default_slippage_bps")]
    pub slippage_bps: u32,
}

impl Default for OnchainConfig {
    fn default() -> Self {
        Self {
            min_confirmations: default_min_confirmations(),
            slippage_bps: default_slippage_bps(),
        }
    }
}

/// Configuration for the reconciliation sweeper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweeperConfig {
    /// How often the sweep loop wakes up, in seconds.
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,
    /// Exponential backoff base for re-verification, in seconds.
    #[serde(default = "default_backoff_base_secs")]
    pub backoff_base_secs: u64,
    /// Exponential backoff cap, in seconds.
    #[serde(default = "default_backoff_cap_secs")]
    pub backoff_cap_secs: u64,
    /// Fixed retry interval after a transient adapter error, in seconds.
    #[serde(default = "default_transient_retry_secs")]
    pub transient_retry_secs: u64,
    /// Consecutive transient retries before falling back to backoff.
    #[serde(default = "default_transient_retry_cap")]
    pub transient_retry_cap: u32,
    /// Horizon for on-chain references, in seconds (default 14 days).
    #[serde(default = "default_horizon_onchain_secs")]
    pub horizon_onchain_secs: u64,
    /// Horizon for all other rails, in seconds (default 48 hours).
    #[serde(default = "default_horizon_default_secs")]
    pub horizon_default_secs: u64,
}

impl SweeperConfig {
    /// The reconciliation horizon for a rail, in seconds.
    pub fn horizon_secs(&self, rail: Rail) -> u64 {
        match rail {
            Rail::Onchain => self.horizon_onchain_secs,
            _ => self.horizon_default_secs,
        }
    }

    /// The backoff delay for the given attempt number (0-based), in seconds.
    pub fn backoff_secs(&self, attempt: u32) -> u64 {
        let shift = attempt.min(63);
        self.backoff_base_secs
            .saturating_mul(1u64 << shift)
            .min(self.backoff_cap_secs)
    }
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: default_tick_interval_secs(),
            backoff_base_secs: default_backoff_base_secs(),
            backoff_cap_secs: default_backoff_cap_secs(),
            transient_retry_secs: default_transient_retry_secs(),
            transient_retry_cap: default_transient_retry_cap(),
            horizon_onchain_secs: default_horizon_onchain_secs(),
            horizon_default_secs: default_horizon_default_secs(),
        }
    }
}

fn default_adapter_deadline_secs() -> u64 {
    30
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_poll_timeout_secs() -> u64 {
    300
}

fn default_min_confirmations() -> u64 {
    6
}

fn default_slippage_bps() -> u32 {
    500
}

fn default_tick_interval_secs() -> u64 {
    30
}

fn default_backoff_base_secs() -> u64 {
    30
}

fn default_backoff_cap_secs() -> u64 {
    3_600
}

fn default_transient_retry_secs() -> u64 {
    10
}

fn default_transient_retry_cap() -> u32 {
    5
}

fn default_horizon_onchain_secs() -> u64 {
    14 * 24 * 3_600
}

fn default_horizon_default_secs() -> u64 {
    48 * 3_600
}
