//! Integration test: full settlement lifecycle across crates.
//!
//! Drives a payment from submission through verification, ledger recording,
//! distribution, and member payouts, using the in-memory collaborators.

use chrono::Utc;
use rust_decimal::Decimal;

use encore_core::state_machine::{OutcomeState, PayoutStatus};
use encore_core::types::{MemberId, Rail, RejectReason};
use encore_distribution::PlanEntrySpec;
use encore_integration_tests::{obligation, stack, usd, usd_currency, PAYER_WALLET};

fn minutes_from_now(minutes: i64) -> chrono::DateTime<Utc> {
    Utc::now() + chrono::Duration::minutes(minutes)
}

// =========================================================================
// On-chain: pending below threshold, accepted at threshold
// =========================================================================

#[tokio::test]
async fn test_onchain_confirmation_lifecycle() {
    let stack = stack();
    let obligation = obligation(Decimal::new(10000, 2)); // 100.00 USD
    let obligation_id = stack.service.register_obligation(obligation).unwrap();

    // 0.05 ETH at 2000 USD/ETH = 100.00 USD, mined in the tip block: zero
    // confirmations, so the submission parks as Pending.
    stack.chain.add_transfer("0xDEAD01", Decimal::new(5, 2), 100);
    let outcome = stack
        .service
        .submit_payment(
            obligation_id,
            Rail::Onchain,
            "0xDEAD01",
            Some(PAYER_WALLET.to_string()),
        )
        .await
        .unwrap();
    assert_eq!(outcome.state, OutcomeState::Pending);
    assert_eq!(outcome.confirmations, 0);
    assert_eq!(stack.sweeper.pending_count(), 1);

    // One block later the sweeper re-verifies and the settlement lands.
    stack.chain.set_height(101);
    let stats = stack.sweeper.sweep_once(minutes_from_now(1)).await;
    assert_eq!(stats.accepted, 1);
    assert_eq!(stack.sweeper.pending_count(), 0);

    let settled = stack.service.get_settlement(obligation_id).unwrap();
    assert_eq!(settled.state, OutcomeState::Accepted);
    assert_eq!(settled.confirmations, 1);
    // Verified amount is normalized to the obligation currency.
    assert_eq!(settled.verified.as_ref().unwrap().value, Decimal::new(10000, 2));
    assert_eq!(settled.verified.unwrap().currency, usd_currency());
}

#[tokio::test]
async fn test_onchain_amount_mismatch_is_rejected() {
    let stack = stack();
    let obligation = obligation(Decimal::new(10000, 2));
    let obligation_id = stack.service.register_obligation(obligation).unwrap();

    // 0.04 ETH = 80.00 USD, 20% short of the expected 100.00.
    stack.chain.add_transfer("0xDEAD02", Decimal::new(4, 2), 100);
    stack.chain.set_height(101);

    let outcome = stack
        .service
        .submit_payment(obligation_id, Rail::Onchain, "0xDEAD02", None)
        .await
        .unwrap();

    assert_eq!(outcome.state, OutcomeState::Rejected);
    assert_eq!(outcome.reason, Some(RejectReason::AmountMismatch));
    assert_eq!(outcome.reason.unwrap().code(), "amount_mismatch");
    // A rejection does not park anything with the sweeper.
    assert_eq!(stack.sweeper.pending_count(), 0);
}

#[tokio::test]
async fn test_rejected_obligation_accepts_a_new_reference() {
    let stack = stack();
    let obligation = obligation(Decimal::new(10000, 2));
    let obligation_id = stack.service.register_obligation(obligation).unwrap();

    stack.chain.add_transfer("0xBAD", Decimal::new(4, 2), 100);
    stack.chain.add_transfer("0xGOOD", Decimal::new(5, 2), 100);
    stack.chain.set_height(101);

    let rejected = stack
        .service
        .submit_payment(obligation_id, Rail::Onchain, "0xBAD", None)
        .await
        .unwrap();
    assert_eq!(rejected.state, OutcomeState::Rejected);

    // The payer retries with a correct transaction.
    let accepted = stack
        .service
        .submit_payment(obligation_id, Rail::Onchain, "0xGOOD", None)
        .await
        .unwrap();
    assert_eq!(accepted.state, OutcomeState::Accepted);

    assert_eq!(stack.service.settlement_attempts(obligation_id).len(), 2);
}

// =========================================================================
// Card: synchronous accept, duplicate short-circuit
// =========================================================================

#[tokio::test]
async fn test_card_settlement_is_final_immediately() {
    let stack = stack();
    let obligation = obligation(Decimal::new(30000, 2));
    let obligation_id = stack.service.register_obligation(obligation).unwrap();

    stack.cards.add_charge("ch_live_1", Decimal::new(30000, 2), "USD");
    let outcome = stack
        .service
        .submit_payment(obligation_id, Rail::Card, "ch_live_1", None)
        .await
        .unwrap();

    assert_eq!(outcome.state, OutcomeState::Accepted);
    assert_eq!(outcome.confirmations, 0);
}

#[tokio::test]
async fn test_duplicate_reference_never_reverifies() {
    let stack = stack();
    let obligation = obligation(Decimal::new(30000, 2));
    let obligation_id = stack.service.register_obligation(obligation).unwrap();

    stack.cards.add_charge("ch_live_1", Decimal::new(30000, 2), "USD");
    stack
        .service
        .submit_payment(obligation_id, Rail::Card, "ch_live_1", None)
        .await
        .unwrap();
    assert_eq!(stack.cards.fetch_count(), 1);

    // Resubmitting the same charge id fails before any processor call, and
    // the ledger is unchanged.
    let result = stack
        .service
        .submit_payment(obligation_id, Rail::Card, "ch_live_1", None)
        .await;
    assert!(result.is_err());
    assert_eq!(stack.cards.fetch_count(), 1);
    assert_eq!(stack.service.settlement_attempts(obligation_id).len(), 1);
}

#[tokio::test]
async fn test_rail_tx_id_cannot_settle_two_obligations() {
    let stack = stack();
    let first = stack.service.register_obligation(obligation(Decimal::new(30000, 2))).unwrap();
    let second = stack.service.register_obligation(obligation(Decimal::new(30000, 2))).unwrap();

    stack.cards.add_charge("ch_live_1", Decimal::new(30000, 2), "USD");
    stack
        .service
        .submit_payment(first, Rail::Card, "ch_live_1", None)
        .await
        .unwrap();

    // The same charge cannot be replayed against another obligation.
    let result = stack
        .service
        .submit_payment(second, Rail::Card, "ch_live_1", None)
        .await;
    assert!(result.is_err());
    assert!(stack.service.get_settlement(second).is_none());
}

// =========================================================================
// Distribution: split, independence, exactly-once
// =========================================================================

#[tokio::test]
async fn test_three_way_split_with_independent_failure() {
    let stack = stack();
    let obligation = obligation(Decimal::new(30000, 2)); // 300.00 USD
    let obligation_id = stack.service.register_obligation(obligation).unwrap();

    stack.cards.add_charge("ch_live_1", Decimal::new(30000, 2), "USD");
    let settled = stack
        .service
        .submit_payment(obligation_id, Rail::Card, "ch_live_1", None)
        .await
        .unwrap();

    let plan = stack
        .allocator
        .distribute(
            &settled,
            vec![
                PlanEntrySpec::new(MemberId::new("alice"), usd(Decimal::new(10000, 2)), Rail::Wallet),
                PlanEntrySpec::new(MemberId::new("bo"), usd(Decimal::new(10000, 2)), Rail::Card),
                PlanEntrySpec::new(MemberId::new("cal"), usd(Decimal::new(10000, 2)), Rail::Onchain),
            ],
        )
        .unwrap();

    let payouts = stack.allocator.payouts_for_plan(plan.id);
    assert_eq!(payouts.len(), 3);

    // Member 2's card payout fails; members 1 and 3 succeed independently.
    stack
        .allocator
        .mark_payout(payouts[0].id, PayoutStatus::Succeeded, Some("tr_out_1".into()), None)
        .unwrap();
    stack
        .allocator
        .mark_payout(payouts[1].id, PayoutStatus::Failed, None, Some("card expired".into()))
        .unwrap();
    stack
        .allocator
        .mark_payout(payouts[2].id, PayoutStatus::Succeeded, Some("0xout3".into()), None)
        .unwrap();

    let after = stack.allocator.payouts_for_plan(plan.id);
    assert_eq!(after[0].status, PayoutStatus::Succeeded);
    assert_eq!(after[1].status, PayoutStatus::Failed);
    assert_eq!(after[2].status, PayoutStatus::Succeeded);

    // The parent settlement is untouched by the payout failure.
    assert_eq!(
        stack.service.get_settlement(obligation_id).unwrap().state,
        OutcomeState::Accepted
    );
}

#[tokio::test]
async fn test_distribution_sum_must_match_verified_amount() {
    let stack = stack();
    let obligation = obligation(Decimal::new(30000, 2));
    let obligation_id = stack.service.register_obligation(obligation).unwrap();

    stack.cards.add_charge("ch_live_1", Decimal::new(30000, 2), "USD");
    let settled = stack
        .service
        .submit_payment(obligation_id, Rail::Card, "ch_live_1", None)
        .await
        .unwrap();

    let short = vec![
        PlanEntrySpec::new(MemberId::new("alice"), usd(Decimal::new(10000, 2)), Rail::Wallet),
        PlanEntrySpec::new(MemberId::new("bo"), usd(Decimal::new(10000, 2)), Rail::Wallet),
    ];
    assert!(stack.allocator.distribute(&settled, short).is_err());

    let exact = vec![
        PlanEntrySpec::new(MemberId::new("alice"), usd(Decimal::new(15000, 2)), Rail::Wallet),
        PlanEntrySpec::new(MemberId::new("bo"), usd(Decimal::new(15000, 2)), Rail::Wallet),
    ];
    assert!(stack.allocator.distribute(&settled, exact.clone()).is_ok());

    // Exactly once per settlement.
    assert!(stack.allocator.distribute(&settled, exact).is_err());
}

// =========================================================================
// Credit rail
// =========================================================================

#[tokio::test]
async fn test_credit_settlement_end_to_end() {
    let stack = stack();
    let obligation = obligation(Decimal::new(30000, 2));
    let obligation_id = stack.service.register_obligation(obligation.clone()).unwrap();

    let note = stack.credit.issue(&obligation);
    let outcome = stack
        .service
        .submit_payment(obligation_id, Rail::Credit, note.credit_id, None)
        .await
        .unwrap();

    assert_eq!(outcome.state, OutcomeState::Accepted);
    assert_eq!(
        stack.credit.get_balance(&obligation.payee, &usd_currency()),
        Decimal::new(30000, 2)
    );
}
