//! Integration tests for the income ledger and the reporting reads.

use chrono::NaiveDate;
use loanbook_core::{
    CustomerClass, IncomeCategory, IncomeLedger, LifecycleController, LoanConfig, LoanError,
    LoanStore, NewOrder, OrderState, ReportingClock, StatsReporter,
};

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn setup() -> (LoanStore, LoanConfig) {
    let store = LoanStore::in_memory().expect("in-memory store");
    let config = LoanConfig::default();
    store.migrate(&config).expect("migrations");
    (store, config)
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
fn events_round_trip_with_unique_ids() {
    let (store, _) = setup();
    let ledger = IncomeLedger::new(&store);

    let id1 = ledger
        .record_event(
            day(2025, 12, 5),
            IncomeCategory::Interest,
            250.0,
            Some("S01"),
            Some("L1"),
            Some(CustomerClass::New),
            Some("weekly interest"),
            Some(42),
        )
        .unwrap();
    let id2 = ledger
        .record_event(
            day(2025, 12, 5),
            IncomeCategory::Interest,
            100.0,
            Some("S02"),
            None,
            None,
            None,
            None,
        )
        .unwrap();
    assert_ne!(id1, id2);

    let events = ledger
        .events_for_period(day(2025, 12, 1), day(2025, 12, 31), None)
        .unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].event_id, id1, "insertion order preserved");
    assert_eq!(events[0].order_id.as_deref(), Some("L1"));
    assert_eq!(events[0].note.as_deref(), Some("weekly interest"));
    assert_eq!(events[0].created_by, Some(42));
    assert_eq!(store.income_event_count(None).unwrap(), 2);
}

#[test]
fn sums_filter_by_category_group_and_window() {
    let (store, _) = setup();
    let ledger = IncomeLedger::new(&store);
    ledger
        .record_event(day(2025, 12, 5), IncomeCategory::Interest, 250.0, Some("S01"), None, None, None, None)
        .unwrap();
    ledger
        .record_event(day(2025, 12, 6), IncomeCategory::Interest, 100.0, Some("S02"), None, None, None, None)
        .unwrap();
    ledger
        .record_event(day(2025, 12, 6), IncomeCategory::Completed, 5000.0, Some("S01"), None, None, None, None)
        .unwrap();

    let all_interest = ledger
        .sum_category(day(2025, 12, 1), day(2025, 12, 31), IncomeCategory::Interest, None)
        .unwrap();
    assert_eq!(all_interest, 350.0);

    let s01_interest = ledger
        .sum_category(day(2025, 12, 1), day(2025, 12, 31), IncomeCategory::Interest, Some("S01"))
        .unwrap();
    assert_eq!(s01_interest, 250.0);

    let early = ledger
        .sum_category(day(2025, 12, 1), day(2025, 12, 5), IncomeCategory::Interest, None)
        .unwrap();
    assert_eq!(early, 250.0, "window end is inclusive");
}

#[test]
fn only_adjustments_may_be_non_positive() {
    let (store, _) = setup();
    let ledger = IncomeLedger::new(&store);

    let err = ledger
        .record_event(day(2025, 12, 5), IncomeCategory::Interest, -10.0, None, None, None, None, None)
        .unwrap_err();
    assert!(matches!(err, LoanError::NonPositiveAmount { .. }), "{err}");

    ledger
        .record_event(
            day(2025, 12, 5),
            IncomeCategory::Adjustment,
            -10.0,
            None,
            None,
            None,
            Some("offsetting correction"),
            None,
        )
        .unwrap();
}

#[test]
fn interest_after_completion_reports_not_found() {
    let (store, config) = setup();
    let clock = ReportingClock::fixed(day(2025, 12, 5));
    let controller = LifecycleController::new(&store, &config, &clock);
    controller.create_order(&order("P1", 1, 5000.0)).unwrap();
    controller.transition_order(1, OrderState::End, None).unwrap();

    // The chat has no active order left; collection must fail cleanly
    // instead of crediting interest against a settled loan.
    let err = controller.collect_interest(1, 50.0).unwrap_err();
    assert!(matches!(err, LoanError::NotFound { .. }), "{err}");
    assert_eq!(store.global_aggregate().unwrap().interest, 0.0);
}

#[test]
fn reporter_reads_match_written_tiers() {
    let (store, config) = setup();
    let friday = ReportingClock::fixed(day(2025, 12, 5));
    let saturday = ReportingClock::fixed(day(2025, 12, 6));

    let c1 = LifecycleController::new(&store, &config, &friday);
    c1.create_order(&order("Q1", 11, 5000.0)).unwrap();
    c1.transition_order(11, OrderState::End, None).unwrap();

    let c2 = LifecycleController::new(&store, &config, &saturday);
    c2.create_order(&order("Q2", 12, 3000.0)).unwrap();
    c2.transition_order(12, OrderState::End, None).unwrap();

    let reporter = StatsReporter::new(&store);

    let global = reporter.get_global().unwrap();
    assert_eq!(global.completed_orders, 2);
    assert_eq!(global.completed_amount, 8000.0);

    let s01 = reporter.get_group("S01").unwrap().unwrap();
    assert_eq!(s01.completed_orders, 2);
    assert!(reporter.get_group("S99").unwrap().is_none());

    let friday_row = reporter.get_daily(day(2025, 12, 5), None).unwrap().unwrap();
    assert_eq!(friday_row.completed_orders, 1);
    assert_eq!(friday_row.completed_amount, 5000.0);

    // Window covering both days sums them; a one-day window does not.
    let both = reporter
        .stats_for_range(day(2025, 12, 5), day(2025, 12, 6), None)
        .unwrap();
    assert_eq!(both.completed_orders, 2);
    assert_eq!(both.completed_amount, 8000.0);
    assert_eq!(both.new_clients, 2);

    let friday_only = reporter
        .stats_for_range(day(2025, 12, 5), day(2025, 12, 5), None)
        .unwrap();
    assert_eq!(friday_only.completed_orders, 1);

    let s01_range = reporter
        .stats_for_range(day(2025, 12, 5), day(2025, 12, 6), Some("S01"))
        .unwrap();
    assert_eq!(s01_range.completed_orders, 2);

    assert_eq!(reporter.all_group_ids().unwrap(), vec!["S01".to_string()]);
}
