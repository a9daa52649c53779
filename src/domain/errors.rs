use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Order-level validation failures. Recorded on the rejected `Order`, never raised:
/// the order processor matches on these, it does not propagate them as exceptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectReason {
    #[error("lot size rounding left a zero quantity")]
    LotSizeZero,
    #[error("order placed outside trading hours")]
    MarketClosed,
    #[error("price outside the daily band")]
    PriceOutOfBand,
    #[error("position not yet sellable under T+1")]
    T1Violation,
    #[error("sell quantity exceeds shares held")]
    InsufficientShares,
    #[error("cash insufficient for quantity, price and fees")]
    InsufficientCash,
    #[error("fees exceed sell proceeds")]
    FeesExceedProceeds,
}

/// Not-found and state errors surfaced to callers (the HTTP layer maps these to 404/400).
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("agent not found: {0}")]
    AgentNotFound(String),
    #[error("template not found: {0}")]
    TemplateNotFound(String),
    #[error("provider not found: {0}")]
    ProviderNotFound(String),
    #[error("stock not found: {0}")]
    StockNotFound(String),
    #[error("agent is paused: {0}")]
    AgentPaused(String),
    #[error("agent busy")]
    AgentBusy,
    #[error("llm unavailable: {0}")]
    LlmUnavailable(String),
}

/// Raised by `LockService` implementations; acquisition failure is reported as `Ok(false)`
/// by the trait, this is reserved for backend-level faults (connection lost, script error).
#[derive(Debug, Error)]
pub enum LockError {
    #[error("lock backend error: {0}")]
    Backend(String),
}
