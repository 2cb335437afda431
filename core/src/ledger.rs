//! Income ledger: the append-only record of monetary events.
//!
//! The ledger, not the aggregate store, is the source of truth for what
//! money actually moved. Interest reports in particular sum ledger events
//! for the period instead of trusting the aggregate's interest field.

use crate::{
    error::{LoanError, LoanResult},
    order::CustomerClass,
    store::LoanStore,
    types::{EventId, GroupId, OrderId},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncomeCategory {
    /// Order completed at full amount.
    Completed,
    /// Breach settled, possibly above or below the order amount.
    BreachEnd,
    Interest,
    PrincipalReduction,
    /// Manual correction; offsets a prior event rather than editing it.
    Adjustment,
}

impl IncomeCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::BreachEnd => "breach_end",
            Self::Interest => "interest",
            Self::PrincipalReduction => "principal_reduction",
            Self::Adjustment => "adjustment",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "completed" => Some(Self::Completed),
            "breach_end" => Some(Self::BreachEnd),
            "interest" => Some(Self::Interest),
            "principal_reduction" => Some(Self::PrincipalReduction),
            "adjustment" => Some(Self::Adjustment),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomeEvent {
    pub event_id: EventId,
    pub date: NaiveDate,
    pub category: IncomeCategory,
    pub amount: f64,
    pub group_id: Option<GroupId>,
    pub order_id: Option<OrderId>,
    pub customer: Option<CustomerClass>,
    pub note: Option<String>,
    pub created_by: Option<i64>,
}

pub struct IncomeLedger<'a> {
    store: &'a LoanStore,
}

impl<'a> IncomeLedger<'a> {
    pub fn new(store: &'a LoanStore) -> Self {
        Self { store }
    }

    /// Append one event. Amounts may be negative only for adjustments
    /// (an offsetting correction); every other category records money in.
    #[allow(clippy::too_many_arguments)]
    pub fn record_event(
        &self,
        date: NaiveDate,
        category: IncomeCategory,
        amount: f64,
        group_id: Option<&str>,
        order_id: Option<&str>,
        customer: Option<CustomerClass>,
        note: Option<&str>,
        created_by: Option<i64>,
    ) -> LoanResult<EventId> {
        if amount <= 0.0 && category != IncomeCategory::Adjustment {
            return Err(LoanError::NonPositiveAmount { amount });
        }
        let event = IncomeEvent {
            event_id: Uuid::new_v4().to_string(),
            date,
            category,
            amount,
            group_id: group_id.map(str::to_string),
            order_id: order_id.map(str::to_string),
            customer,
            note: note.map(str::to_string),
            created_by,
        };
        self.store.insert_income_event(&event)?;
        Ok(event.event_id)
    }

    pub fn sum_category(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        category: IncomeCategory,
        group_id: Option<&str>,
    ) -> LoanResult<f64> {
        self.store.sum_income_events(start, end, category, group_id)
    }

    pub fn events_for_period(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        category: Option<IncomeCategory>,
    ) -> LoanResult<Vec<IncomeEvent>> {
        self.store.income_events_for_period(start, end, category)
    }
}
