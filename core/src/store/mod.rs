//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database. Services call store
//! methods and never execute SQL directly.

mod aggregate;
mod ledger;

pub use aggregate::{AggregateRecord, Scope};

use crate::{
    config::LoanConfig,
    error::LoanResult,
    order::{CustomerClass, Order, OrderState},
    types::{ChatId, GroupId},
};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};

pub struct LoanStore {
    conn: Connection,
}

impl LoanStore {
    pub fn open(path: &str) -> LoanResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (:memory: ignores it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> LoanResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order, then seed the global
    /// aggregate row with the configured opening balance if absent.
    pub fn migrate(&self, config: &LoanConfig) -> LoanResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_orders.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/002_aggregates.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/003_income_events.sql"))?;

        let seeded: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM aggregate_global", [], |row| {
                    row.get(0)
                })?;
        if seeded == 0 {
            self.conn.execute(
                "INSERT INTO aggregate_global (id, liquid_funds) VALUES (1, ?1)",
                params![config.opening_liquid_funds],
            )?;
            log::info!(
                "global aggregate seeded with opening liquid funds {:.2}",
                config.opening_liquid_funds
            );
        }
        Ok(())
    }

    // ── Orders ─────────────────────────────────────────────────

    pub fn insert_order(&self, order: &Order) -> LoanResult<()> {
        self.conn.execute(
            "INSERT INTO orders
             (order_id, group_id, chat_id, date, weekday_group, customer, amount, state)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                order.order_id,
                order.group_id,
                order.chat_id,
                order.date.to_string(),
                order.weekday_group,
                order.customer.as_str(),
                order.amount,
                order.state.as_str(),
            ],
        )?;
        Ok(())
    }

    pub fn order_exists(&self, order_id: &str) -> LoanResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM orders WHERE order_id = ?1",
            params![order_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// The chat's active order, if any. Terminal rows do not bind a chat.
    pub fn active_order_for_chat(&self, chat_id: ChatId) -> LoanResult<Option<Order>> {
        self.conn
            .query_row(
                "SELECT order_id, group_id, chat_id, date, weekday_group,
                        customer, amount, state
                 FROM orders
                 WHERE chat_id = ?1 AND state NOT IN ('end', 'breach_end')
                 ORDER BY id DESC LIMIT 1",
                params![chat_id],
                order_row_mapper,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn order_by_id(&self, order_id: &str) -> LoanResult<Option<Order>> {
        self.conn
            .query_row(
                "SELECT order_id, group_id, chat_id, date, weekday_group,
                        customer, amount, state
                 FROM orders WHERE order_id = ?1",
                params![order_id],
                order_row_mapper,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn update_order_state(&self, chat_id: ChatId, state: OrderState) -> LoanResult<bool> {
        let changed = self.conn.execute(
            "UPDATE orders SET state = ?1, updated_at = CURRENT_TIMESTAMP
             WHERE chat_id = ?2 AND state NOT IN ('end', 'breach_end')",
            params![state.as_str(), chat_id],
        )?;
        Ok(changed > 0)
    }

    pub fn update_order_amount(&self, chat_id: ChatId, amount: f64) -> LoanResult<bool> {
        let changed = self.conn.execute(
            "UPDATE orders SET amount = ?1, updated_at = CURRENT_TIMESTAMP
             WHERE chat_id = ?2 AND state NOT IN ('end', 'breach_end')",
            params![amount, chat_id],
        )?;
        Ok(changed > 0)
    }

    /// Repoint any order (terminal included) at a new attribution group.
    pub fn update_order_group(&self, order_id: &str, group_id: &str) -> LoanResult<bool> {
        let changed = self.conn.execute(
            "UPDATE orders SET group_id = ?1, updated_at = CURRENT_TIMESTAMP
             WHERE order_id = ?2",
            params![group_id, order_id],
        )?;
        Ok(changed > 0)
    }

    pub fn orders_by_group(
        &self,
        group_id: &str,
        state: Option<OrderState>,
    ) -> LoanResult<Vec<Order>> {
        match state {
            Some(s) => {
                let mut stmt = self.conn.prepare(
                    "SELECT order_id, group_id, chat_id, date, weekday_group,
                            customer, amount, state
                     FROM orders WHERE group_id = ?1 AND state = ?2
                     ORDER BY date ASC",
                )?;
                let rows = stmt.query_map(params![group_id, s.as_str()], order_row_mapper)?;
                rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
            }
            None => {
                let mut stmt = self.conn.prepare(
                    "SELECT order_id, group_id, chat_id, date, weekday_group,
                            customer, amount, state
                     FROM orders WHERE group_id = ?1
                     ORDER BY date ASC",
                )?;
                let rows = stmt.query_map(params![group_id], order_row_mapper)?;
                rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
            }
        }
    }

    /// All orders currently pooled as valid (normal/overdue), any group.
    pub fn valid_orders(&self) -> LoanResult<Vec<Order>> {
        let mut stmt = self.conn.prepare(
            "SELECT order_id, group_id, chat_id, date, weekday_group,
                    customer, amount, state
             FROM orders WHERE state IN ('normal', 'overdue')
             ORDER BY group_id ASC, date ASC",
        )?;
        let rows = stmt.query_map([], order_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Ground truth for reconciliation: count and sum of a group's orders
    /// in the given states, recomputed from the orders table.
    pub fn count_and_sum_by_states(
        &self,
        group_id: &str,
        states: &[OrderState],
    ) -> LoanResult<(i64, f64)> {
        // states come from a closed enum; safe to splice as literals.
        let list = states
            .iter()
            .map(|s| format!("'{}'", s.as_str()))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT COUNT(*), COALESCE(SUM(amount), 0.0)
             FROM orders WHERE group_id = ?1 AND state IN ({list})"
        );
        self.conn
            .query_row(&sql, params![group_id], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .map_err(Into::into)
    }

    /// Every group referenced by either an order or a group aggregate row.
    pub fn known_group_ids(&self) -> LoanResult<Vec<GroupId>> {
        let mut stmt = self.conn.prepare(
            "SELECT group_id FROM aggregate_group
             UNION SELECT DISTINCT group_id FROM orders
             ORDER BY group_id",
        )?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

fn order_row_mapper(row: &Row<'_>) -> rusqlite::Result<Order> {
    let date_str: String = row.get(3)?;
    let customer_str: String = row.get(5)?;
    let state_str: String = row.get(7)?;
    Ok(Order {
        order_id: row.get(0)?,
        group_id: row.get(1)?,
        chat_id: row.get(2)?,
        date: parse_date_col(&date_str, 3)?,
        weekday_group: row.get(4)?,
        customer: CustomerClass::parse(&customer_str).ok_or_else(|| {
            rusqlite::Error::InvalidColumnType(
                5,
                "customer".into(),
                rusqlite::types::Type::Text,
            )
        })?,
        amount: row.get(6)?,
        state: OrderState::parse(&state_str).ok_or_else(|| {
            rusqlite::Error::InvalidColumnType(7, "state".into(), rusqlite::types::Type::Text)
        })?,
    })
}

pub(crate) fn parse_date_col(raw: &str, idx: usize) -> rusqlite::Result<NaiveDate> {
    raw.parse::<NaiveDate>().map_err(|_| {
        rusqlite::Error::InvalidColumnType(idx, "date".into(), rusqlite::types::Type::Text)
    })
}
