use std::sync::Arc;
use std::time::Duration;

use encore_core::config::EngineConfig;
use encore_core::types::{Obligation, PaymentReference};
use encore_rails::error::RailError;
use encore_rails::registry::RailAdapterRegistry;
use encore_rails::traits::RailStatus;

use crate::error::SettlementError;
use crate::types::Verdict;

/// Drives a rail adapter to decide whether a payment reference satisfies an
/// obligation.
///
/// The engine is stateless and idempotent: verifying the same reference twice
/// without new upstream data yields the same verdict. It never records
/// anything; recording is the ledger's job.
pub struct VerificationEngine {
    registry: Arc<RailAdapterRegistry>,
    config: EngineConfig,
}

impl VerificationEngine {
    pub fn new(registry: Arc<RailAdapterRegistry>, config: EngineConfig) -> Self {
        Self { registry, config }
    }

    /// Verify a reference once.
    ///
    /// Transient adapter failures (including a deadline hit) propagate as
    /// retryable errors; no verdict is produced for them.
    pub async fn verify(
        &self,
        obligation: &Obligation,
        reference: &PaymentReference,
    ) -> Result<Verdict, SettlementError> {
        let adapter = self.registry.get(reference.rail)?;
        let deadline = Duration::from_secs(self.config.adapter_deadline_secs);

        let verification = tokio::time::timeout(
            deadline,
            adapter.verify(reference, &obligation.expected),
        )
        .await
        .map_err(|_| RailError::deadline(reference.rail))??;

        let verdict = match verification.status {
            RailStatus::Success => {
                let verified = verification.normalized.ok_or_else(|| {
                    RailError::Internal(format!(
                        "{} adapter reported success without a normalized amount",
                        reference.rail
                    ))
                })?;
                Verdict::Accepted {
                    verified,
                    confirmations: verification.confirmations,
                }
            }
            RailStatus::Failure(reason) => Verdict::Rejected { reason },
            RailStatus::Pending => Verdict::Pending {
                confirmations: verification.confirmations,
            },
        };

        tracing::debug!(
            obligation_id = %obligation.id,
            rail = %reference.rail,
            tx = %reference.rail_tx_id,
            verdict = ?verdict,
            "verification attempt"
        );
        Ok(verdict)
    }

    /// Verify with bounded synchronous semantics: poll until a terminal
    /// verdict or until the wait window closes, whichever comes first.
    ///
    /// On window close the last pending verdict is returned; the caller
    /// decides whether to hand off to the reconciliation sweeper. Transient
    /// failures inside the window are swallowed and retried at the poll
    /// interval.
    pub async fn verify_with_wait(
        &self,
        obligation: &Obligation,
        reference: &PaymentReference,
        wait: Option<Duration>,
    ) -> Result<Verdict, SettlementError> {
        let window = wait.unwrap_or(Duration::from_secs(self.config.poll_timeout_secs));
        let interval = Duration::from_secs(self.config.poll_interval_secs);
        let deadline = tokio::time::Instant::now() + window;

        let mut last = Verdict::Pending { confirmations: 0 };
        loop {
            match self.verify(obligation, reference).await {
                Ok(verdict) if verdict.is_terminal() => return Ok(verdict),
                Ok(verdict) => last = verdict,
                Err(err) if err.is_retryable() => {
                    tracing::debug!(
                        obligation_id = %obligation.id,
                        error = %err,
                        "transient failure during bounded wait"
                    );
                }
                Err(err) => return Err(err),
            }

            if tokio::time::Instant::now() + interval > deadline {
                tracing::info!(
                    obligation_id = %obligation.id,
                    tx = %reference.rail_tx_id,
                    "bounded wait closed without a terminal verdict"
                );
                return Ok(last);
            }
            tokio::time::sleep(interval).await;
        }
    }
}
