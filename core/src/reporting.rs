//! Read-only aggregate snapshots for collaborators that render reports.
//! Rendering itself lives outside this crate.

use crate::{
    error::LoanResult,
    store::{AggregateRecord, LoanStore},
    types::GroupId,
};
use chrono::NaiveDate;

pub struct StatsReporter<'a> {
    store: &'a LoanStore,
}

impl<'a> StatsReporter<'a> {
    pub fn new(store: &'a LoanStore) -> Self {
        Self { store }
    }

    pub fn get_global(&self) -> LoanResult<AggregateRecord> {
        self.store.global_aggregate()
    }

    /// `None` when the group has never received a delta.
    pub fn get_group(&self, group_id: &str) -> LoanResult<Option<AggregateRecord>> {
        self.store.group_aggregate(group_id)
    }

    /// `None` when nothing was recorded for the date (and group).
    pub fn get_daily(
        &self,
        date: NaiveDate,
        group_id: Option<&str>,
    ) -> LoanResult<Option<AggregateRecord>> {
        self.store.daily_aggregate(date, group_id)
    }

    /// Sum of the daily tier over an inclusive date window.
    pub fn stats_for_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        group_id: Option<&str>,
    ) -> LoanResult<AggregateRecord> {
        self.store.daily_totals_for_range(start, end, group_id)
    }

    pub fn all_group_ids(&self) -> LoanResult<Vec<GroupId>> {
        self.store.known_group_ids()
    }
}
