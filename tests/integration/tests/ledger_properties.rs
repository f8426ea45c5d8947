//! Integration test: ledger correctness under concurrency.
//!
//! The at-most-one-accepted property must hold when many tasks race to
//! settle the same obligation, and the reference uniqueness check must keep
//! replays away from the adapters entirely.

use std::sync::Arc;

use rust_decimal::Decimal;

use encore_core::state_machine::OutcomeState;
use encore_core::types::{PaymentReference, Rail, RejectReason};
use encore_integration_tests::{init_tracing, obligation, stack, usd};
use encore_settlement::{SettlementLedger, Verdict};

fn accepted_verdict() -> Verdict {
    Verdict::Accepted {
        verified: usd(Decimal::new(10000, 2)),
        confirmations: 1,
    }
}

#[tokio::test]
async fn test_concurrent_recorders_elect_exactly_one_winner() {
    init_tracing();
    let ledger = Arc::new(SettlementLedger::new());
    let obligation = obligation(Decimal::new(10000, 2));
    let obligation_id = obligation.id;
    ledger.register_obligation(obligation).unwrap();

    // 32 tasks, each carrying a distinct valid reference for the same
    // obligation, race for the accepted slot.
    let mut handles = Vec::new();
    for i in 0..32 {
        let ledger = Arc::clone(&ledger);
        handles.push(tokio::spawn(async move {
            let reference =
                PaymentReference::new(obligation_id, Rail::Card, format!("ch_race_{}", i));
            ledger
                .record_outcome(obligation_id, &reference, accepted_verdict())
                .unwrap()
        }));
    }

    let mut winners = 0;
    let mut winner_ids = Vec::new();
    for handle in handles {
        let record = handle.await.unwrap();
        if record.accepted {
            winners += 1;
        }
        winner_ids.push(record.outcome.settlement_id);
    }

    assert_eq!(winners, 1);
    // Every racer observed the same authoritative winner.
    let authoritative = ledger.get_outcome(obligation_id).unwrap();
    assert_eq!(authoritative.state, OutcomeState::Accepted);
    assert!(winner_ids.iter().all(|id| *id == authoritative.settlement_id));

    // Losing attempts are on record with the specific reason code.
    let attempts = ledger.attempts(obligation_id);
    assert_eq!(attempts.len(), 32);
    assert_eq!(
        attempts
            .iter()
            .filter(|o| o.reason == Some(RejectReason::ObligationAlreadySettled))
            .count(),
        31
    );
}

#[tokio::test]
async fn test_concurrent_submissions_of_the_same_reference() {
    let stack = stack();
    let obligation = obligation(Decimal::new(30000, 2));
    let obligation_id = stack.service.register_obligation(obligation).unwrap();
    stack.cards.add_charge("ch_live_1", Decimal::new(30000, 2), "USD");

    let service = Arc::new(stack.service);
    let mut handles = Vec::new();
    for _ in 0..8 {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move {
            service
                .submit_payment(obligation_id, Rail::Card, "ch_live_1", None)
                .await
        }));
    }

    let results: Vec<_> = futures_join(handles).await;
    let accepted = results
        .iter()
        .filter(|r| matches!(r, Ok(outcome) if outcome.state == OutcomeState::Accepted))
        .count();
    let duplicates = results.iter().filter(|r| r.is_err()).count();

    // Exactly one submission binds the reference and settles; the rest are
    // duplicate-reference errors.
    assert_eq!(accepted, 1);
    assert_eq!(duplicates, 7);
    // The processor was consulted exactly once.
    assert_eq!(stack.cards.fetch_count(), 1);
}

async fn futures_join<T: Send + 'static>(
    handles: Vec<tokio::task::JoinHandle<T>>,
) -> Vec<T> {
    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        results.push(handle.await.unwrap());
    }
    results
}

#[tokio::test]
async fn test_pending_attempt_is_visible_until_terminal() {
    let stack = stack();
    let obligation = obligation(Decimal::new(10000, 2));
    let obligation_id = stack.service.register_obligation(obligation).unwrap();

    // Unmined transfer: submission parks as Pending and the ledger reports
    // the pending attempt, not none.
    stack.chain.add_transfer("0xdead03", Decimal::new(5, 2), 100);
    stack.chain.set_height(100);
    stack
        .service
        .submit_payment(obligation_id, Rail::Onchain, "0xdead03", None)
        .await
        .unwrap();

    let outcome = stack.service.get_settlement(obligation_id).unwrap();
    assert_eq!(outcome.state, OutcomeState::Pending);
    assert!(!outcome.is_terminal());
}

#[tokio::test]
async fn test_onchain_hash_uniqueness_is_case_insensitive() {
    let stack = stack();
    let first = stack.service.register_obligation(obligation(Decimal::new(10000, 2))).unwrap();
    let second = stack.service.register_obligation(obligation(Decimal::new(10000, 2))).unwrap();

    stack.chain.add_transfer("0xAbCdEf", Decimal::new(5, 2), 100);
    stack.chain.set_height(101);

    stack
        .service
        .submit_payment(first, Rail::Onchain, "0xAbCdEf", None)
        .await
        .unwrap();

    // The lowercased form of the same hash is the same reference.
    let result = stack
        .service
        .submit_payment(second, Rail::Onchain, "0xabcdef", None)
        .await;
    assert!(result.is_err());
}
