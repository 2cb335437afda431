//! Income ledger persistence. Insert-only: the table has no update or
//! delete path through the store, corrections are offsetting events.

use super::{parse_date_col, LoanStore};
use crate::{
    error::LoanResult,
    ledger::{IncomeCategory, IncomeEvent},
    order::CustomerClass,
};
use chrono::NaiveDate;
use rusqlite::{params, Row};

impl LoanStore {
    pub fn insert_income_event(&self, event: &IncomeEvent) -> LoanResult<()> {
        self.conn.execute(
            "INSERT INTO income_events
             (event_id, date, category, amount, group_id, order_id,
              customer, note, created_by)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                event.event_id,
                event.date.to_string(),
                event.category.as_str(),
                event.amount,
                event.group_id,
                event.order_id,
                event.customer.map(CustomerClass::as_str),
                event.note,
                event.created_by,
            ],
        )?;
        Ok(())
    }

    /// Authoritative period sum for one category, optionally scoped to a
    /// group. Interest reporting reads this, never the aggregate field.
    pub fn sum_income_events(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        category: IncomeCategory,
        group_id: Option<&str>,
    ) -> LoanResult<f64> {
        match group_id {
            Some(g) => self
                .conn
                .query_row(
                    "SELECT COALESCE(SUM(amount), 0.0) FROM income_events
                     WHERE date >= ?1 AND date <= ?2 AND category = ?3 AND group_id = ?4",
                    params![start.to_string(), end.to_string(), category.as_str(), g],
                    |row| row.get(0),
                )
                .map_err(Into::into),
            None => self
                .conn
                .query_row(
                    "SELECT COALESCE(SUM(amount), 0.0) FROM income_events
                     WHERE date >= ?1 AND date <= ?2 AND category = ?3",
                    params![start.to_string(), end.to_string(), category.as_str()],
                    |row| row.get(0),
                )
                .map_err(Into::into),
        }
    }

    pub fn income_events_for_period(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        category: Option<IncomeCategory>,
    ) -> LoanResult<Vec<IncomeEvent>> {
        match category {
            Some(c) => {
                let mut stmt = self.conn.prepare(
                    "SELECT event_id, date, category, amount, group_id,
                            order_id, customer, note, created_by
                     FROM income_events
                     WHERE date >= ?1 AND date <= ?2 AND category = ?3
                     ORDER BY created_at ASC, id ASC",
                )?;
                let rows = stmt.query_map(
                    params![start.to_string(), end.to_string(), c.as_str()],
                    income_event_mapper,
                )?;
                rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
            }
            None => {
                let mut stmt = self.conn.prepare(
                    "SELECT event_id, date, category, amount, group_id,
                            order_id, customer, note, created_by
                     FROM income_events
                     WHERE date >= ?1 AND date <= ?2
                     ORDER BY created_at ASC, id ASC",
                )?;
                let rows = stmt.query_map(
                    params![start.to_string(), end.to_string()],
                    income_event_mapper,
                )?;
                rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
            }
        }
    }

    pub fn income_event_count(&self, category: Option<IncomeCategory>) -> LoanResult<i64> {
        match category {
            Some(c) => self
                .conn
                .query_row(
                    "SELECT COUNT(*) FROM income_events WHERE category = ?1",
                    params![c.as_str()],
                    |row| row.get(0),
                )
                .map_err(Into::into),
            None => self
                .conn
                .query_row("SELECT COUNT(*) FROM income_events", [], |row| row.get(0))
                .map_err(Into::into),
        }
    }
}

fn income_event_mapper(row: &Row<'_>) -> rusqlite::Result<IncomeEvent> {
    let date_str: String = row.get(1)?;
    let category_str: String = row.get(2)?;
    let customer_str: Option<String> = row.get(6)?;
    Ok(IncomeEvent {
        event_id: row.get(0)?,
        date: parse_date_col(&date_str, 1)?,
        category: IncomeCategory::parse(&category_str).ok_or_else(|| {
            rusqlite::Error::InvalidColumnType(
                2,
                "category".into(),
                rusqlite::types::Type::Text,
            )
        })?,
        amount: row.get(3)?,
        group_id: row.get(4)?,
        order_id: row.get(5)?,
        customer: customer_str.as_deref().and_then(CustomerClass::parse),
        note: row.get(7)?,
        created_by: row.get(8)?,
    })
}
