//! Incremental statistics core for a loan-order book.
//!
//! Orders move through a small state machine; every move fans signed
//! deltas out to denormalized rollups at three scopes (global, per-group,
//! per-day) and appends income events to an append-only ledger. The
//! rollups are caches: the orders table and the ledger are the source of
//! truth, and the reconciliation service can rebuild the rollups from
//! them at any time.

pub mod category;
pub mod clock;
pub mod config;
pub mod error;
pub mod ledger;
pub mod lifecycle;
pub mod migration;
pub mod order;
pub mod reconcile;
pub mod reporting;
pub mod stats;
pub mod store;
pub mod types;

pub use category::{ExpenseKind, StatCategory};
pub use clock::ReportingClock;
pub use config::LoanConfig;
pub use error::{LoanError, LoanResult};
pub use ledger::{IncomeCategory, IncomeEvent, IncomeLedger};
pub use lifecycle::LifecycleController;
pub use migration::{AttributionMigrator, MigrationOutcome};
pub use order::{CustomerClass, NewOrder, Order, OrderState};
pub use reconcile::ReconciliationService;
pub use reporting::StatsReporter;
pub use stats::StatUpdateEngine;
pub use store::{AggregateRecord, LoanStore, Scope};
