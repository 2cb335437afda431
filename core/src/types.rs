//! Shared primitive types used across the whole crate.

/// Chat binding. At most one non-terminal order exists per chat.
pub type ChatId = i64;

/// Attribution group id, e.g. "S01".
pub type GroupId = String;

/// Business key of an order, parsed from the encoded chat title upstream.
pub type OrderId = String;

/// Ledger event id (uuid v4).
pub type EventId = String;
