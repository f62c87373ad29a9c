//! Crate-wide error type.
//!
//! Every fallible path funnels into [`Error`] so dashboard callers can match
//! on one enum: configuration problems, data-service failures, and domain
//! rule violations (status transitions, settlement checks).

use crate::models::OrderStatus;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Service URL or anon key missing or unusable.
    #[error("data service not configured: {0}")]
    Config(String),

    /// Network-level failure talking to the hosted store.
    #[error("{0}")]
    Fetch(String),

    /// Non-success HTTP response from the hosted store.
    #[error("{message} (HTTP {status})")]
    Service { status: u16, message: String },

    /// Response body was not the JSON we expected.
    #[error("invalid JSON from data service: {0}")]
    Decode(#[from] serde_json::Error),

    /// Unusable reporting window (end before start).
    #[error("invalid report range: {0}")]
    InvalidRange(String),

    /// Order-status change rejected by the state machine.
    #[error("cannot move order from '{from}' to '{to}'")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// No order row matched the given id.
    #[error("order {0} not found")]
    OrderNotFound(i64),

    /// An order draft with no line items cannot be submitted.
    #[error("order draft has no line items")]
    EmptyDraft,

    /// Payment settlement rejected before reaching the store.
    #[error("payment rejected: {0}")]
    Settlement(String),
}
