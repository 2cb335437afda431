//! Aggregate rollup rows: one field shape, three scope keys.
//!
//! Every mutation is an additive read-modify-write: read the current
//! value, add the delta, write the new absolute value. The two halves are
//! separate statements with no cross-operation lock, so two concurrent
//! writers on the same key can lose an update; callers serialize, and the
//! reconciliation service repairs what slips through.

use super::LoanStore;
use crate::{error::LoanResult, types::GroupId};
use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

/// Which rollup a read or write addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Global,
    Group(GroupId),
    Daily(NaiveDate, Option<GroupId>),
}

/// A rollup snapshot. Daily-only fields (`liquid_flow`, expenses) read as
/// zero for global/group scopes; `liquid_funds` reads as zero for daily.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateRecord {
    pub valid_orders: i64,
    pub valid_amount: f64,
    pub liquid_funds: f64,
    pub new_clients: i64,
    pub new_clients_amount: f64,
    pub old_clients: i64,
    pub old_clients_amount: f64,
    pub interest: f64,
    pub completed_orders: i64,
    pub completed_amount: f64,
    pub breach_orders: i64,
    pub breach_amount: f64,
    pub breach_end_orders: i64,
    pub breach_end_amount: f64,
    pub liquid_flow: f64,
    pub company_expenses: f64,
    pub other_expenses: f64,
}

const SHARED_COLS: &str = "valid_orders, valid_amount,
    new_clients, new_clients_amount, old_clients, old_clients_amount,
    interest, completed_orders, completed_amount,
    breach_orders, breach_amount, breach_end_orders, breach_end_amount";

// The daily tier has no valid columns (valid is point-in-time, not a
// per-day flow) and carries the flow/expense columns instead.
const DAILY_COLS: &str = "new_clients, new_clients_amount,
    old_clients, old_clients_amount,
    interest, completed_orders, completed_amount,
    breach_orders, breach_amount, breach_end_orders, breach_end_amount,
    liquid_flow, company_expenses, other_expenses";

fn shared_cols_mapper(row: &Row<'_>) -> rusqlite::Result<AggregateRecord> {
    Ok(AggregateRecord {
        valid_orders: row.get(0)?,
        valid_amount: row.get(1)?,
        new_clients: row.get(2)?,
        new_clients_amount: row.get(3)?,
        old_clients: row.get(4)?,
        old_clients_amount: row.get(5)?,
        interest: row.get(6)?,
        completed_orders: row.get(7)?,
        completed_amount: row.get(8)?,
        breach_orders: row.get(9)?,
        breach_amount: row.get(10)?,
        breach_end_orders: row.get(11)?,
        breach_end_amount: row.get(12)?,
        ..AggregateRecord::default()
    })
}

fn daily_cols_mapper(row: &Row<'_>) -> rusqlite::Result<AggregateRecord> {
    Ok(AggregateRecord {
        new_clients: row.get(0)?,
        new_clients_amount: row.get(1)?,
        old_clients: row.get(2)?,
        old_clients_amount: row.get(3)?,
        interest: row.get(4)?,
        completed_orders: row.get(5)?,
        completed_amount: row.get(6)?,
        breach_orders: row.get(7)?,
        breach_amount: row.get(8)?,
        breach_end_orders: row.get(9)?,
        breach_end_amount: row.get(10)?,
        liquid_flow: row.get(11)?,
        company_expenses: row.get(12)?,
        other_expenses: row.get(13)?,
        ..AggregateRecord::default()
    })
}

impl LoanStore {
    // ── Reads ──────────────────────────────────────────────────

    pub fn get_aggregate(&self, scope: &Scope) -> LoanResult<AggregateRecord> {
        match scope {
            Scope::Global => self.global_aggregate(),
            Scope::Group(g) => Ok(self.group_aggregate(g)?.unwrap_or_default()),
            Scope::Daily(date, group) => {
                Ok(self.daily_aggregate(*date, group.as_deref())?.unwrap_or_default())
            }
        }
    }

    pub fn global_aggregate(&self) -> LoanResult<AggregateRecord> {
        let record = self
            .conn
            .query_row(
                &format!("SELECT {SHARED_COLS}, liquid_funds FROM aggregate_global WHERE id = 1"),
                [],
                |row| {
                    let mut rec = shared_cols_mapper(row)?;
                    rec.liquid_funds = row.get(13)?;
                    Ok(rec)
                },
            )
            .optional()?;
        Ok(record.unwrap_or_default())
    }

    pub fn group_aggregate(&self, group_id: &str) -> LoanResult<Option<AggregateRecord>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {SHARED_COLS}, liquid_funds
                     FROM aggregate_group WHERE group_id = ?1"
                ),
                params![group_id],
                |row| {
                    let mut rec = shared_cols_mapper(row)?;
                    rec.liquid_funds = row.get(13)?;
                    Ok(rec)
                },
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn daily_aggregate(
        &self,
        date: NaiveDate,
        group_id: Option<&str>,
    ) -> LoanResult<Option<AggregateRecord>> {
        let sql = match group_id {
            Some(_) => format!(
                "SELECT {DAILY_COLS}
                 FROM aggregate_daily WHERE date = ?1 AND group_id = ?2"
            ),
            None => format!(
                "SELECT {DAILY_COLS}
                 FROM aggregate_daily WHERE date = ?1 AND group_id IS NULL"
            ),
        };
        match group_id {
            Some(g) => self
                .conn
                .query_row(&sql, params![date.to_string(), g], daily_cols_mapper)
                .optional()
                .map_err(Into::into),
            None => self
                .conn
                .query_row(&sql, params![date.to_string()], daily_cols_mapper)
                .optional()
                .map_err(Into::into),
        }
    }

    /// Sum the daily tier over a date window. Group `None` sums the
    /// all-groups rows, not every row (the per-group rows would double
    /// count).
    pub fn daily_totals_for_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        group_id: Option<&str>,
    ) -> LoanResult<AggregateRecord> {
        let group_clause = match group_id {
            Some(_) => "AND group_id = ?3",
            None => "AND group_id IS NULL",
        };
        let sql = format!(
            "SELECT COALESCE(SUM(new_clients), 0), COALESCE(SUM(new_clients_amount), 0.0),
                    COALESCE(SUM(old_clients), 0), COALESCE(SUM(old_clients_amount), 0.0),
                    COALESCE(SUM(interest), 0.0),
                    COALESCE(SUM(completed_orders), 0), COALESCE(SUM(completed_amount), 0.0),
                    COALESCE(SUM(breach_orders), 0), COALESCE(SUM(breach_amount), 0.0),
                    COALESCE(SUM(breach_end_orders), 0), COALESCE(SUM(breach_end_amount), 0.0),
                    COALESCE(SUM(liquid_flow), 0.0),
                    COALESCE(SUM(company_expenses), 0.0), COALESCE(SUM(other_expenses), 0.0)
             FROM aggregate_daily
             WHERE date >= ?1 AND date <= ?2 {group_clause}"
        );
        match group_id {
            Some(g) => self
                .conn
                .query_row(
                    &sql,
                    params![start.to_string(), end.to_string(), g],
                    daily_cols_mapper,
                )
                .map_err(Into::into),
            None => self
                .conn
                .query_row(
                    &sql,
                    params![start.to_string(), end.to_string()],
                    daily_cols_mapper,
                )
                .map_err(Into::into),
        }
    }

    // ── Additive writes ────────────────────────────────────────
    //
    // Field names are &'static str sourced from StatCategory's closed
    // table, never from user input, so splicing them into SQL is safe.

    pub fn add_global_amount(&self, field: &'static str, delta: f64) -> LoanResult<()> {
        let current = self.read_global_field(field)?;
        self.write_global_field(field, current + delta)
    }

    pub fn add_global_count(&self, field: &'static str, delta: i64) -> LoanResult<()> {
        let current = self.read_global_field(field)?;
        self.write_global_field(field, current + delta as f64)
    }

    pub fn add_group_amount(
        &self,
        group_id: &str,
        field: &'static str,
        delta: f64,
    ) -> LoanResult<()> {
        self.ensure_group_row(group_id)?;
        let current = self.read_group_field(group_id, field)?;
        self.write_group_field(group_id, field, current + delta)
    }

    pub fn add_group_count(
        &self,
        group_id: &str,
        field: &'static str,
        delta: i64,
    ) -> LoanResult<()> {
        self.ensure_group_row(group_id)?;
        let current = self.read_group_field(group_id, field)?;
        self.write_group_field(group_id, field, current + delta as f64)
    }

    pub fn add_daily_amount(
        &self,
        date: NaiveDate,
        group_id: Option<&str>,
        field: &'static str,
        delta: f64,
    ) -> LoanResult<()> {
        self.ensure_daily_row(date, group_id)?;
        let current = self.read_daily_field(date, group_id, field)?;
        self.write_daily_field(date, group_id, field, current + delta)
    }

    pub fn add_daily_count(
        &self,
        date: NaiveDate,
        group_id: Option<&str>,
        field: &'static str,
        delta: i64,
    ) -> LoanResult<()> {
        self.ensure_daily_row(date, group_id)?;
        let current = self.read_daily_field(date, group_id, field)?;
        self.write_daily_field(date, group_id, field, current + delta as f64)
    }

    /// Create a group aggregate row with zeroed counters. Used both by the
    /// lazy write path and by explicit group registration.
    pub fn ensure_group_row(&self, group_id: &str) -> LoanResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO aggregate_group (group_id) VALUES (?1)",
            params![group_id],
        )?;
        Ok(())
    }

    fn ensure_daily_row(&self, date: NaiveDate, group_id: Option<&str>) -> LoanResult<()> {
        // UNIQUE(date, group_id) does not catch duplicate NULL groups, so
        // probe before inserting the all-groups row.
        match group_id {
            Some(g) => {
                self.conn.execute(
                    "INSERT OR IGNORE INTO aggregate_daily (date, group_id) VALUES (?1, ?2)",
                    params![date.to_string(), g],
                )?;
            }
            None => {
                let exists: i64 = self.conn.query_row(
                    "SELECT COUNT(*) FROM aggregate_daily WHERE date = ?1 AND group_id IS NULL",
                    params![date.to_string()],
                    |row| row.get(0),
                )?;
                if exists == 0 {
                    self.conn.execute(
                        "INSERT INTO aggregate_daily (date, group_id) VALUES (?1, NULL)",
                        params![date.to_string()],
                    )?;
                }
            }
        }
        Ok(())
    }

    // The split read/write halves below are the race surface documented at
    // the top of this module. Crate-visible so the stats engine's tests
    // can interleave them.

    pub(crate) fn read_global_field(&self, field: &'static str) -> LoanResult<f64> {
        let value: Option<f64> = self
            .conn
            .query_row(
                &format!("SELECT \"{field}\" FROM aggregate_global WHERE id = 1"),
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value.unwrap_or(0.0))
    }

    pub(crate) fn write_global_field(&self, field: &'static str, value: f64) -> LoanResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO aggregate_global (id) VALUES (1)",
            [],
        )?;
        self.conn.execute(
            &format!(
                "UPDATE aggregate_global
                 SET \"{field}\" = ?1, updated_at = CURRENT_TIMESTAMP
                 WHERE id = 1"
            ),
            params![value],
        )?;
        Ok(())
    }

    fn read_group_field(&self, group_id: &str, field: &'static str) -> LoanResult<f64> {
        let value: Option<f64> = self
            .conn
            .query_row(
                &format!("SELECT \"{field}\" FROM aggregate_group WHERE group_id = ?1"),
                params![group_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value.unwrap_or(0.0))
    }

    fn write_group_field(
        &self,
        group_id: &str,
        field: &'static str,
        value: f64,
    ) -> LoanResult<()> {
        self.conn.execute(
            &format!(
                "UPDATE aggregate_group
                 SET \"{field}\" = ?1, updated_at = CURRENT_TIMESTAMP
                 WHERE group_id = ?2"
            ),
            params![value, group_id],
        )?;
        Ok(())
    }

    fn read_daily_field(
        &self,
        date: NaiveDate,
        group_id: Option<&str>,
        field: &'static str,
    ) -> LoanResult<f64> {
        let value: Option<f64> = match group_id {
            Some(g) => self
                .conn
                .query_row(
                    &format!(
                        "SELECT \"{field}\" FROM aggregate_daily
                         WHERE date = ?1 AND group_id = ?2"
                    ),
                    params![date.to_string(), g],
                    |row| row.get(0),
                )
                .optional()?,
            None => self
                .conn
                .query_row(
                    &format!(
                        "SELECT \"{field}\" FROM aggregate_daily
                         WHERE date = ?1 AND group_id IS NULL"
                    ),
                    params![date.to_string()],
                    |row| row.get(0),
                )
                .optional()?,
        };
        Ok(value.unwrap_or(0.0))
    }

    fn write_daily_field(
        &self,
        date: NaiveDate,
        group_id: Option<&str>,
        field: &'static str,
        value: f64,
    ) -> LoanResult<()> {
        match group_id {
            Some(g) => {
                self.conn.execute(
                    &format!(
                        "UPDATE aggregate_daily
                         SET \"{field}\" = ?1, updated_at = CURRENT_TIMESTAMP
                         WHERE date = ?2 AND group_id = ?3"
                    ),
                    params![value, date.to_string(), g],
                )?;
            }
            None => {
                self.conn.execute(
                    &format!(
                        "UPDATE aggregate_daily
                         SET \"{field}\" = ?1, updated_at = CURRENT_TIMESTAMP
                         WHERE date = ?2 AND group_id IS NULL"
                    ),
                    params![value, date.to_string()],
                )?;
            }
        }
        Ok(())
    }
}
