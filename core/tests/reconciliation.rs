//! Integration tests for drift detection and repair:
//! 1. A clean book reconciles to zero corrections
//! 2. Injected drift is repaired, and the repair is idempotent
//! 3. find_aggregate_drift reports without mutating
//! 4. Remainder tracing flags non-round valid amounts
//! 5. The ledger is authoritative for interest

use chrono::NaiveDate;
use loanbook_core::{
    CustomerClass, LifecycleController, LoanConfig, LoanStore, NewOrder, OrderState,
    ReconciliationService, ReportingClock, StatCategory, StatUpdateEngine,
};

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn setup() -> (LoanStore, LoanConfig, ReportingClock) {
    let store = LoanStore::in_memory().expect("in-memory store");
    let config = LoanConfig::default();
    store.migrate(&config).expect("migrations");
    let clock = ReportingClock::fixed(day(2025, 12, 5));
    (store, config, clock)
}

fn order(id: &str, chat: i64, amount: f64) -> NewOrder {
    NewOrder {
        order_id: id.to_string(),
        group_id: None,
        chat_id: chat,
        date: day(2025, 12, 1),
        customer: CustomerClass::New,
        amount,
        initial_state: OrderState::Normal,
    }
}

#[test]
fn clean_book_needs_no_correction() {
    let (store, config, clock) = setup();
    let controller = LifecycleController::new(&store, &config, &clock);
    controller.create_order(&order("R1", 1, 5000.0)).unwrap();
    controller.create_order(&order("R2", 2, 3000.0)).unwrap();

    let service = ReconciliationService::new(&store, &config, &clock);
    let corrections = service.reconcile_all().unwrap();
    assert!(!corrections.is_empty());
    for c in corrections {
        assert!(!c.corrected, "group {} flagged on a clean book", c.group_id);
        assert_eq!(c.count_diff, 0);
    }
}

#[test]
fn injected_drift_is_repaired_once() {
    let (store, config, clock) = setup();
    let controller = LifecycleController::new(&store, &config, &clock);
    controller.create_order(&order("R3", 3, 5000.0)).unwrap();

    // A phantom delta that no order backs: the classic failed-rollback
    // residue. It skews group and global alike.
    StatUpdateEngine::new(&store, &clock)
        .apply_delta(StatCategory::Valid, 500.0, 1, Some("S01"), true)
        .unwrap();

    let service = ReconciliationService::new(&store, &config, &clock);
    let correction = service.reconcile_group("S01").unwrap();
    assert!(correction.corrected);
    assert_eq!(correction.count_diff, -1);
    assert_eq!(correction.amount_diff, -500.0);

    let group = store.group_aggregate("S01").unwrap().unwrap();
    assert_eq!(group.valid_orders, 1);
    assert_eq!(group.valid_amount, 5000.0);
    let global = store.global_aggregate().unwrap();
    assert_eq!(global.valid_orders, 1);
    assert_eq!(global.valid_amount, 5000.0, "repair keeps global in step");

    // Second pass finds nothing: the repair is idempotent.
    let again = service.reconcile_group("S01").unwrap();
    assert!(!again.corrected);
    assert_eq!(again.amount_diff, 0.0);
}

#[test]
fn sub_epsilon_differences_are_left_alone() {
    let (store, config, clock) = setup();
    let controller = LifecycleController::new(&store, &config, &clock);
    controller.create_order(&order("R4", 4, 5000.0)).unwrap();

    StatUpdateEngine::new(&store, &clock)
        .apply_delta(StatCategory::Valid, 0.005, 0, Some("S01"), true)
        .unwrap();

    let correction = ReconciliationService::new(&store, &config, &clock)
        .reconcile_group("S01")
        .unwrap();
    assert!(!correction.corrected, "float noise below epsilon is not drift");
}

#[test]
fn drift_report_covers_breach_and_does_not_mutate() {
    let (store, config, clock) = setup();
    let controller = LifecycleController::new(&store, &config, &clock);
    controller.create_order(&order("R5", 5, 5000.0)).unwrap();
    controller
        .transition_order(5, OrderState::Breach, None)
        .unwrap();

    StatUpdateEngine::new(&store, &clock)
        .apply_delta(StatCategory::Breach, 100.0, 1, Some("S01"), true)
        .unwrap();
    let before = store.group_aggregate("S01").unwrap().unwrap();

    let service = ReconciliationService::new(&store, &config, &clock);
    let drift = service.find_aggregate_drift().unwrap();
    assert_eq!(drift.len(), 1);
    assert_eq!(drift[0].category, StatCategory::Breach);
    assert_eq!(drift[0].recorded_count, 2);
    assert_eq!(drift[0].actual_count, 1);
    assert_eq!(drift[0].recorded_amount, 5100.0);
    assert_eq!(drift[0].actual_amount, 5000.0);

    assert_eq!(
        store.group_aggregate("S01").unwrap().unwrap(),
        before,
        "the report must not repair anything"
    );
}

#[test]
fn remainder_trace_flags_reduced_principal() {
    let (store, config, clock) = setup();
    let controller = LifecycleController::new(&store, &config, &clock);
    controller.create_order(&order("R6", 6, 5000.0)).unwrap();
    controller.create_order(&order("R7", 7, 3000.0)).unwrap();
    controller.reduce_principal(6, 300.0).unwrap();

    let remainders = ReconciliationService::new(&store, &config, &clock)
        .trace_amount_remainders()
        .unwrap();
    assert_eq!(remainders.len(), 1, "round amounts are not reported");
    assert_eq!(remainders[0].order_id, "R6");
    assert_eq!(remainders[0].group_id, "S01");
    assert_eq!(remainders[0].amount, 4700.0);
    assert_eq!(remainders[0].remainder, 700.0);
}

#[test]
fn interest_check_trusts_the_ledger() {
    let (store, config, clock) = setup();
    let controller = LifecycleController::new(&store, &config, &clock);
    controller.create_order(&order("R8", 8, 5000.0)).unwrap();
    controller.collect_interest(8, 250.0).unwrap();

    // Skew the global counter without a backing ledger event.
    StatUpdateEngine::new(&store, &clock)
        .apply_delta(StatCategory::Interest, 50.0, 0, None, true)
        .unwrap();

    let service = ReconciliationService::new(&store, &config, &clock);
    let check = service
        .verify_interest_against_ledger(day(2025, 1, 1), day(2026, 1, 1), None)
        .unwrap();
    assert_eq!(check.ledger_total, 250.0);
    assert_eq!(check.aggregate_total, 300.0);
    assert_eq!(check.diff, 50.0, "positive diff: aggregate overstates");

    // The group counter was not skewed, so the group check is clean.
    let group_check = service
        .verify_interest_against_ledger(day(2025, 1, 1), day(2026, 1, 1), Some("S01"))
        .unwrap();
    assert_eq!(group_check.diff, 0.0);
}
