//! Statistic categories and their fixed column mapping.
//!
//! Column names are derived from a closed table rather than string
//! concatenation so a typo cannot silently create a dead counter. The
//! daily tier only tracks an allow-listed subset; the group tier tracks
//! everything. That asymmetry matches observed production behavior and is
//! kept as-is: valid counters are point-in-time while daily rows are
//! per-day flows, yet old_clients/new_clients got daily rows and valid did
//! not. Flagged for product clarification, do not "fix" here.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatCategory {
    /// Orders currently in normal/overdue, pooled.
    Valid,
    NewClients,
    OldClients,
    /// Amount-only: there is no interest count column.
    Interest,
    Completed,
    Breach,
    BreachEnd,
}

impl StatCategory {
    pub fn amount_field(self) -> &'static str {
        match self {
            Self::Valid => "valid_amount",
            Self::NewClients => "new_clients_amount",
            Self::OldClients => "old_clients_amount",
            Self::Interest => "interest",
            Self::Completed => "completed_amount",
            Self::Breach => "breach_amount",
            Self::BreachEnd => "breach_end_amount",
        }
    }

    pub fn count_field(self) -> Option<&'static str> {
        match self {
            Self::Valid => Some("valid_orders"),
            Self::NewClients => Some("new_clients"),
            Self::OldClients => Some("old_clients"),
            Self::Interest => None,
            Self::Completed => Some("completed_orders"),
            Self::Breach => Some("breach_orders"),
            Self::BreachEnd => Some("breach_end_orders"),
        }
    }

    /// Whether the daily tier keeps a row for this category.
    pub fn daily_tracked(self) -> bool {
        !matches!(self, Self::Valid)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::NewClients => "new_clients",
            Self::OldClients => "old_clients",
            Self::Interest => "interest",
            Self::Completed => "completed",
            Self::Breach => "breach",
            Self::BreachEnd => "breach_end",
        }
    }
}

/// Daily expense columns. Amount-only, daily tier only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseKind {
    Company,
    Other,
}

impl ExpenseKind {
    pub fn field(self) -> &'static str {
        match self {
            Self::Company => "company_expenses",
            Self::Other => "other_expenses",
        }
    }
}
