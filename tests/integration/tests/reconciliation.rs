//! Integration test: reconciliation sweeper behavior over the full stack.

use chrono::Utc;
use rust_decimal::Decimal;

use encore_core::state_machine::OutcomeState;
use encore_core::types::{PaymentReference, Rail, RejectReason};
use encore_integration_tests::{obligation, stack};

fn minutes_from_now(minutes: i64) -> chrono::DateTime<Utc> {
    Utc::now() + chrono::Duration::minutes(minutes)
}

#[tokio::test]
async fn test_oracle_outage_never_rejects() {
    let stack = stack();
    let obligation = obligation(Decimal::new(10000, 2));
    let obligation_id = stack.service.register_obligation(obligation).unwrap();

    stack.chain.add_transfer("0xdead10", Decimal::new(5, 2), 100);
    stack.chain.set_height(101);
    stack.oracle.clear_rate(
        &encore_integration_tests::eth(),
        &encore_integration_tests::usd_currency(),
    );

    // The rate feed is down: submission parks with the sweeper and nothing
    // is recorded as an outcome.
    let outcome = stack
        .service
        .submit_payment(obligation_id, Rail::Onchain, "0xdead10", None)
        .await
        .unwrap();
    assert_eq!(outcome.state, OutcomeState::Pending);
    assert!(stack.service.get_settlement(obligation_id).is_none());
    assert_eq!(stack.sweeper.pending_count(), 1);

    // Sweeps during the outage count transient failures, still no outcome.
    let stats = stack.sweeper.sweep_once(minutes_from_now(1)).await;
    assert_eq!(stats.transient, 1);
    assert!(stack.service.get_settlement(obligation_id).is_none());

    // The feed recovers and the settlement lands on the next due sweep.
    stack.oracle.set_rate(
        &encore_integration_tests::eth(),
        &encore_integration_tests::usd_currency(),
        Decimal::new(2000, 0),
    );
    let stats = stack.sweeper.sweep_once(minutes_from_now(2)).await;
    assert_eq!(stats.accepted, 1);
    assert_eq!(
        stack.service.get_settlement(obligation_id).unwrap().state,
        OutcomeState::Accepted
    );
}

#[tokio::test]
async fn test_rpc_outage_uses_short_retries_then_backoff() {
    let stack = stack();
    let obligation = obligation(Decimal::new(10000, 2));
    let obligation_id = stack.service.register_obligation(obligation).unwrap();

    stack.chain.add_transfer("0xdead11", Decimal::new(5, 2), 100);
    stack.chain.set_outage(true);

    stack
        .service
        .submit_payment(obligation_id, Rail::Onchain, "0xdead11", None)
        .await
        .unwrap();

    let mut now = minutes_from_now(1);
    for _ in 0..3 {
        let stats = stack.sweeper.sweep_once(now).await;
        assert_eq!(stats.transient, 1);
        now = stack
            .sweeper
            .next_retry_at(&encore_core::types::ReferenceKey::new(
                Rail::Onchain,
                "0xdead11",
            ))
            .unwrap();
    }

    // Once the node is reachable again the transfer confirms.
    stack.chain.set_outage(false);
    stack.chain.set_height(101);
    let stats = stack.sweeper.sweep_once(now).await;
    assert_eq!(stats.accepted, 1);
}

#[tokio::test]
async fn test_stale_settlement_expires_at_the_horizon() {
    let stack = stack();
    let obligation = obligation(Decimal::new(10000, 2));
    let obligation_id = stack.service.register_obligation(obligation).unwrap();

    // An unmined transfer submitted 15 days ago, past the 14-day horizon.
    stack.chain.add_transfer("0xdead12", Decimal::new(5, 2), 100);
    let mut reference = PaymentReference::new(obligation_id, Rail::Onchain, "0xdead12");
    reference.submitted_at = Utc::now() - chrono::Duration::days(15);
    stack.ledger.bind_reference(&reference).unwrap();
    stack.sweeper.enqueue(reference);

    let stats = stack.sweeper.sweep_once(minutes_from_now(60)).await;
    assert_eq!(stats.expired, 1);

    let outcome = stack.service.get_settlement(obligation_id).unwrap();
    assert_eq!(outcome.state, OutcomeState::Expired);
    assert_eq!(outcome.reason, Some(RejectReason::VerificationHorizonExceeded));

    // A late confirmation arrives after expiry: the sweeper no longer tracks
    // the reference, and even a direct record attempt cannot flip the state.
    stack.chain.set_height(120);
    assert_eq!(stack.sweeper.pending_count(), 0);

    let reference = PaymentReference::new(obligation_id, Rail::Onchain, "0xdead12");
    let record = stack
        .ledger
        .record_outcome(
            obligation_id,
            &reference,
            encore_settlement::Verdict::Accepted {
                verified: encore_integration_tests::usd(Decimal::new(10000, 2)),
                confirmations: 20,
            },
        )
        .unwrap();
    assert!(!record.accepted);
    assert_eq!(record.outcome.state, OutcomeState::Expired);
    assert_eq!(
        stack.service.get_settlement(obligation_id).unwrap().state,
        OutcomeState::Expired
    );
}

#[tokio::test]
async fn test_sweeper_leaves_unrelated_obligations_alone() {
    let stack = stack();
    let stuck = stack.service.register_obligation(obligation(Decimal::new(10000, 2))).unwrap();
    let healthy = stack.service.register_obligation(obligation(Decimal::new(10000, 2))).unwrap();

    // One unmined transfer, one confirmed one.
    stack.chain.add_unmined("0xstuck", Decimal::new(5, 2));
    stack.chain.add_transfer("0xfine", Decimal::new(5, 2), 100);
    stack.chain.set_height(101);

    stack
        .service
        .submit_payment(stuck, Rail::Onchain, "0xstuck", None)
        .await
        .unwrap();
    let outcome = stack
        .service
        .submit_payment(healthy, Rail::Onchain, "0xfine", None)
        .await
        .unwrap();

    assert_eq!(outcome.state, OutcomeState::Accepted);
    assert_eq!(
        stack.service.get_settlement(stuck).unwrap().state,
        OutcomeState::Pending
    );
    assert_eq!(stack.sweeper.pending_count(), 1);
}
