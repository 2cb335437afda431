//! Order data model and the state machine's transition rules.

use crate::types::{ChatId, GroupId, OrderId};
use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    Normal,
    Overdue,
    Breach,
    End,
    BreachEnd,
}

impl OrderState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::End | Self::BreachEnd)
    }

    /// Normal and overdue are pooled as "valid" in every rollup.
    pub fn is_valid_pool(self) -> bool {
        matches!(self, Self::Normal | Self::Overdue)
    }

    /// Transition guard. Effects are the Lifecycle Controller's job; this
    /// only answers whether the edge exists.
    ///
    /// normal <-> overdue        free (both valid)
    /// normal/overdue -> breach
    /// normal/overdue -> end
    /// breach -> breach_end
    /// breach -> normal/overdue  forbidden (breach never un-breaches)
    /// terminal -> anything      forbidden
    pub fn can_transition_to(self, target: OrderState) -> bool {
        if self.is_terminal() || self == target {
            return false;
        }
        match (self, target) {
            (Self::Normal, Self::Overdue) | (Self::Overdue, Self::Normal) => true,
            (Self::Normal | Self::Overdue, Self::Breach | Self::End) => true,
            (Self::Breach, Self::BreachEnd) => true,
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Overdue => "overdue",
            Self::Breach => "breach",
            Self::End => "end",
            Self::BreachEnd => "breach_end",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "normal" => Some(Self::Normal),
            "overdue" => Some(Self::Overdue),
            "breach" => Some(Self::Breach),
            "end" => Some(Self::End),
            "breach_end" => Some(Self::BreachEnd),
            _ => None,
        }
    }
}

/// Customer class parsed from the order's business key upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CustomerClass {
    /// "A" suffix: first-time client.
    New,
    /// No suffix: returning client.
    Returning,
}

impl CustomerClass {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "A",
            Self::Returning => "B",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "A" => Some(Self::New),
            "B" => Some(Self::Returning),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub group_id: GroupId,
    pub chat_id: ChatId,
    pub date: NaiveDate,
    pub weekday_group: String,
    pub customer: CustomerClass,
    pub amount: f64,
    pub state: OrderState,
}

/// Input for order creation. The title decoder (out of scope) supplies
/// date, amount, customer class, and initial state. `group_id` of `None`
/// places the order in the configured default group.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_id: OrderId,
    pub group_id: Option<GroupId>,
    pub chat_id: ChatId,
    pub date: NaiveDate,
    pub customer: CustomerClass,
    pub amount: f64,
    pub initial_state: OrderState,
}

/// Weekday bucket label for an order date, Monday..Sunday.
pub fn weekday_group(date: NaiveDate) -> &'static str {
    match date.weekday() {
        Weekday::Mon => "mon",
        Weekday::Tue => "tue",
        Weekday::Wed => "wed",
        Weekday::Thu => "thu",
        Weekday::Fri => "fri",
        Weekday::Sat => "sat",
        Weekday::Sun => "sun",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breach_cannot_return_to_valid_pool() {
        assert!(!OrderState::Breach.can_transition_to(OrderState::Normal));
        assert!(!OrderState::Breach.can_transition_to(OrderState::Overdue));
        assert!(OrderState::Breach.can_transition_to(OrderState::BreachEnd));
    }

    #[test]
    fn terminal_states_admit_nothing() {
        for target in [
            OrderState::Normal,
            OrderState::Overdue,
            OrderState::Breach,
            OrderState::End,
            OrderState::BreachEnd,
        ] {
            assert!(!OrderState::End.can_transition_to(target));
            assert!(!OrderState::BreachEnd.can_transition_to(target));
        }
    }

    #[test]
    fn valid_pool_round_trip_is_allowed() {
        assert!(OrderState::Normal.can_transition_to(OrderState::Overdue));
        assert!(OrderState::Overdue.can_transition_to(OrderState::Normal));
    }
}
