use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use encore_core::config::SweeperConfig;
use encore_core::types::{PaymentReference, ReferenceKey};

use crate::engine::VerificationEngine;
use crate::ledger::SettlementLedger;
use crate::types::Verdict;

/// One reference the sweeper is still chasing.
#[derive(Debug, Clone)]
struct InflightEntry {
    reference: PaymentReference,
    /// Completed re-verification attempts.
    attempt: u32,
    /// Consecutive transient adapter failures.
    transient_streak: u32,
    /// Not re-verified before this instant.
    next_retry_at: DateTime<Utc>,
}

/// Counters from one sweep pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepStats {
    pub checked: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub expired: usize,
    pub rescheduled: usize,
    pub transient: usize,
}

/// Re-drives verification for settlements stuck in a pending state.
///
/// Each in-flight reference carries its own schedule: exponential backoff
/// while the rail keeps answering Pending, a fixed short interval while the
/// adapter fails transiently (capped, then back to backoff), and a hard
/// per-rail horizon after which the reference is force-expired through the
/// ledger. Independent obligations are swept without any shared lock.
pub struct ReconciliationSweeper {
    ledger: Arc<SettlementLedger>,
    engine: Arc<VerificationEngine>,
    config: SweeperConfig,
    inflight: DashMap<ReferenceKey, InflightEntry>,
}

impl ReconciliationSweeper {
    pub fn new(
        ledger: Arc<SettlementLedger>,
        engine: Arc<VerificationEngine>,
        config: SweeperConfig,
    ) -> Self {
        Self {
            ledger,
            engine,
            config,
            inflight: DashMap::new(),
        }
    }

    /// Start tracking a reference that has not reached a terminal outcome.
    ///
    /// The first re-verification is scheduled one backoff base after now;
    /// enqueueing an already tracked reference is a no-op.
    pub fn enqueue(&self, reference: PaymentReference) {
        let key = reference.key();
        self.inflight.entry(key.clone()).or_insert_with(|| {
            tracing::debug!(key = %key, "reference handed to the sweeper");
            InflightEntry {
                reference,
                attempt: 0,
                transient_streak: 0,
                next_retry_at: Utc::now()
                    + chrono::Duration::seconds(self.config.backoff_base_secs as i64),
            }
        });
    }

    /// Number of references still being chased.
    pub fn pending_count(&self) -> usize {
        self.inflight.len()
    }

    /// Whether a reference is still being chased.
    pub fn is_tracking(&self, key: &ReferenceKey) -> bool {
        self.inflight.contains_key(key)
    }

    /// When a tracked reference will next be re-verified.
    pub fn next_retry_at(&self, key: &ReferenceKey) -> Option<DateTime<Utc>> {
        self.inflight.get(key).map(|entry| entry.next_retry_at)
    }

    /// One sweep pass over everything due at `now`.
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> SweepStats {
        let due: Vec<(ReferenceKey, InflightEntry)> = self
            .inflight
            .iter()
            .filter(|entry| entry.next_retry_at <= now)
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        let mut stats = SweepStats::default();
        for (key, entry) in due {
            stats.checked += 1;
            self.sweep_entry(&key, entry, now, &mut stats).await;
        }
        stats
    }

    async fn sweep_entry(
        &self,
        key: &ReferenceKey,
        entry: InflightEntry,
        now: DateTime<Utc>,
        stats: &mut SweepStats,
    ) {
        let reference = &entry.reference;
        let horizon =
            chrono::Duration::seconds(self.config.horizon_secs(reference.rail) as i64);

        if now.signed_duration_since(reference.submitted_at) >= horizon {
            match self.ledger.force_expire(reference.obligation_id, reference) {
                Ok(_) => stats.expired += 1,
                Err(err) => {
                    tracing::error!(key = %key, error = %err, "horizon expiry failed");
                }
            }
            self.inflight.remove(key);
            return;
        }

        let obligation = match self.ledger.obligation(reference.obligation_id) {
            Some(obligation) => obligation,
            None => {
                tracing::error!(key = %key, "tracked reference points at an unknown obligation");
                self.inflight.remove(key);
                return;
            }
        };

        match self.engine.verify(&obligation, reference).await {
            Ok(verdict) if verdict.is_terminal() => {
                let was_accept = matches!(verdict, Verdict::Accepted { .. });
                match self
                    .ledger
                    .record_outcome(reference.obligation_id, reference, verdict)
                {
                    Ok(record) if record.accepted => stats.accepted += 1,
                    Ok(_) => stats.rejected += 1,
                    Err(err) => {
                        tracing::error!(key = %key, error = %err, "recording swept outcome failed");
                        if was_accept {
                            // Do not drop a confirmed payment on a write error.
                            stats.rescheduled += 1;
                            self.reschedule_backoff(key, entry, now);
                            return;
                        }
                    }
                }
                self.inflight.remove(key);
            }
            Ok(verdict) => {
                if let Err(err) =
                    self.ledger
                        .record_outcome(reference.obligation_id, reference, verdict)
                {
                    tracing::error!(key = %key, error = %err, "recording pending state failed");
                }
                stats.rescheduled += 1;
                self.reschedule_backoff(key, entry, now);
            }
            Err(err) if err.is_retryable() => {
                stats.transient += 1;
                let mut entry = entry;
                entry.transient_streak += 1;
                if entry.transient_streak <= self.config.transient_retry_cap {
                    tracing::debug!(
                        key = %key,
                        streak = entry.transient_streak,
                        "transient failure, short retry"
                    );
                    entry.next_retry_at =
                        now + chrono::Duration::seconds(self.config.transient_retry_secs as i64);
                    self.inflight.insert(key.clone(), entry);
                } else {
                    tracing::warn!(
                        key = %key,
                        "transient retry cap hit, falling back to backoff"
                    );
                    self.reschedule_backoff(key, entry, now);
                }
            }
            Err(err) => {
                // Non-retryable engine errors (unregistered adapter, internal
                // inconsistency) are kept on the schedule; the horizon bounds
                // how long they can linger.
                tracing::error!(key = %key, error = %err, "sweep verification failed");
                self.reschedule_backoff(key, entry, now);
            }
        }
    }

    fn reschedule_backoff(&self, key: &ReferenceKey, mut entry: InflightEntry, now: DateTime<Utc>) {
        entry.attempt += 1;
        entry.transient_streak = 0;
        entry.next_retry_at =
            now + chrono::Duration::seconds(self.config.backoff_secs(entry.attempt) as i64);
        self.inflight.insert(key.clone(), entry);
    }

    /// Drive sweep passes forever at the configured tick interval.
    ///
    /// Run under `tokio::select!` against a shutdown signal.
    pub async fn run(self: Arc<Self>) {
        let mut ticker =
            tokio::time::interval(Duration::from_secs(self.config.tick_interval_secs));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let stats = self.sweep_once(Utc::now()).await;
            if stats.checked > 0 {
                tracing::info!(
                    checked = stats.checked,
                    accepted = stats.accepted,
                    rejected = stats.rejected,
                    expired = stats.expired,
                    "sweep pass complete"
                );
            }
        }
    }
}
