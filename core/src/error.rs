use crate::order::OrderState;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoanError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("No active order for chat {chat_id}")]
    NotFound { chat_id: i64 },

    #[error("Order id '{order_id}' already exists")]
    DuplicateOrder { order_id: String },

    #[error("Chat {chat_id} already has a non-terminal order ({order_id})")]
    ChatOccupied { chat_id: i64, order_id: String },

    #[error("Invalid transition {from:?} -> {to:?}")]
    InvalidTransition { from: OrderState, to: OrderState },

    #[error("Amount must be positive (got {amount})")]
    NonPositiveAmount { amount: f64 },

    #[error("Insufficient liquid funds: balance {balance:.2}, required {required:.2}")]
    InsufficientFunds { balance: f64, required: f64 },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type LoanResult<T> = Result<T, LoanError>;
