//! Stat update engine: the single entry point that fans a signed delta
//! out to the aggregate rows a category touches.
//!
//! Fan-out order per call: Global, Daily(all-groups), Daily(group),
//! Group. The daily tier only sees allow-listed categories; the group
//! tier is updated unconditionally whenever a group is named. Each row
//! update commits independently; a failure partway through leaves the
//! earlier writes in place for reconciliation to square up.

use crate::{
    category::{ExpenseKind, StatCategory},
    clock::ReportingClock,
    error::LoanResult,
    store::LoanStore,
};
use chrono::NaiveDate;

pub struct StatUpdateEngine<'a> {
    store: &'a LoanStore,
    clock: &'a ReportingClock,
}

impl<'a> StatUpdateEngine<'a> {
    pub fn new(store: &'a LoanStore, clock: &'a ReportingClock) -> Self {
        Self { store, clock }
    }

    /// Apply a signed delta for one category. The reporting date is
    /// computed once and reused for both daily writes so a call straddling
    /// the day cutoff cannot split its own fan-out across two dates.
    pub fn apply_delta(
        &self,
        category: StatCategory,
        amount_delta: f64,
        count_delta: i64,
        group_id: Option<&str>,
        skip_daily: bool,
    ) -> LoanResult<()> {
        let date = self.clock.reporting_date();
        self.apply_delta_as_of(date, category, amount_delta, count_delta, group_id, skip_daily)
    }

    /// Same as [`apply_delta`](Self::apply_delta) with the reporting date
    /// supplied by the caller. Lifecycle transitions use this so the stat
    /// deltas and the ledger event they emit share one date.
    pub fn apply_delta_as_of(
        &self,
        date: NaiveDate,
        category: StatCategory,
        amount_delta: f64,
        count_delta: i64,
        group_id: Option<&str>,
        skip_daily: bool,
    ) -> LoanResult<()> {
        let amount_field = category.amount_field();
        let count_field = category.count_field();

        if amount_delta != 0.0 {
            self.store.add_global_amount(amount_field, amount_delta)?;
        }
        if count_delta != 0 {
            if let Some(field) = count_field {
                self.store.add_global_count(field, count_delta)?;
            }
        }

        if category.daily_tracked() && !skip_daily {
            if amount_delta != 0.0 {
                self.store
                    .add_daily_amount(date, None, amount_field, amount_delta)?;
            }
            if count_delta != 0 {
                if let Some(field) = count_field {
                    self.store.add_daily_count(date, None, field, count_delta)?;
                }
            }
            if let Some(group) = group_id {
                if amount_delta != 0.0 {
                    self.store
                        .add_daily_amount(date, Some(group), amount_field, amount_delta)?;
                }
                if count_delta != 0 {
                    if let Some(field) = count_field {
                        self.store
                            .add_daily_count(date, Some(group), field, count_delta)?;
                    }
                }
            }
        }

        // Group rollups accumulate every category, daily-tracked or not.
        if let Some(group) = group_id {
            if amount_delta != 0.0 {
                self.store.add_group_amount(group, amount_field, amount_delta)?;
            }
            if count_delta != 0 {
                if let Some(field) = count_field {
                    self.store.add_group_count(group, field, count_delta)?;
                }
            }
        }

        Ok(())
    }

    /// Move liquid capital: global balance plus the day's net flow.
    pub fn apply_cash_flow(&self, amount: f64) -> LoanResult<()> {
        let date = self.clock.reporting_date();
        self.apply_cash_flow_as_of(date, amount)
    }

    pub fn apply_cash_flow_as_of(&self, date: NaiveDate, amount: f64) -> LoanResult<()> {
        self.store.add_global_amount("liquid_funds", amount)?;
        self.store.add_daily_amount(date, None, "liquid_flow", amount)?;
        Ok(())
    }

    /// Expenses live on the daily tier only.
    pub fn record_expense(
        &self,
        date: NaiveDate,
        kind: ExpenseKind,
        amount: f64,
    ) -> LoanResult<()> {
        self.store.add_daily_amount(date, None, kind.field(), amount)
    }
}
