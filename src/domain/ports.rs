use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::time::Duration;

/// Named exclusive locking, backed by Redis in production (`infrastructure::lock`). The owner
/// token that makes `release`/`extend` a compare-and-delete is an implementation detail, not
/// part of this contract.
#[async_trait]
pub trait LockService: Send + Sync {
    /// Sets `key` only if absent, with expiry `ttl`. When `blocking` is false, retries up to
    /// `retries` times separated by `delay` and returns `false` if still unheld; `blocking`
    /// waits until acquired.
    async fn acquire(
        &self,
        key: &str,
        ttl: Duration,
        blocking: bool,
        retries: u32,
        delay: Duration,
    ) -> Result<bool>;

    /// Deletes `key` only if still held by this caller. A no-op after the TTL has elapsed.
    async fn release(&self, key: &str) -> Result<bool>;

    /// Re-expires `key` by `additional` iff still held by this caller.
    async fn extend(&self, key: &str, additional: Duration) -> Result<bool>;

    /// Advisory only; never a substitute for a successful `acquire`.
    async fn is_locked(&self, key: &str) -> Result<bool>;
}

/// One row of the upstream A-share real-time spot snapshot. Carries `turnover_rate` and
/// `change_pct`, which the quote store has no column for, alongside the OHLCV fields the
/// market data service folds into a `StockQuote` for idempotent daily upsert.
#[derive(Debug, Clone)]
pub struct MarketSnapshotRow {
    pub stock_code: String,
    pub stock_name: Option<String>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub current_price: Decimal,
    pub prev_close: Decimal,
    pub change_pct: Decimal,
    pub volume: u64,
    pub amount: Decimal,
    pub turnover_rate: Decimal,
}

/// One row of the upstream index spot snapshot (a distinct upstream call from the A-share
/// spot snapshot; index-level quotes are not part of the per-stock dataframe).
#[derive(Debug, Clone)]
pub struct IndexSnapshotRow {
    pub name: String,
    pub code: String,
    pub current: Decimal,
    pub change: Decimal,
    pub change_pct: Decimal,
    pub volume: Decimal,
    pub amount: Decimal,
}

/// The upstream A-share snapshot fetcher. Out of scope per the ingestion pipeline's internals,
/// but the core depends on a stable, single-call-per-refresh contract: `fetch_snapshot` is
/// called exactly once per `refresh_all`, shared across the market sentiment and hot stocks
/// derivations; `fetch_index_overview` is a separate upstream call for index-level quotes.
#[async_trait]
pub trait QuoteSnapshotFetcher: Send + Sync {
    async fn fetch_snapshot(&self) -> Result<Vec<MarketSnapshotRow>>;
    async fn fetch_index_overview(&self) -> Result<Vec<IndexSnapshotRow>>;
}

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct ChatCompletion {
    pub text: String,
    pub tokens_in: i64,
    pub tokens_out: i64,
}

/// Protocol-neutral LLM chat capability; see `infrastructure::llm` for the HTTP-backed impl.
#[async_trait]
pub trait LlmChatClient: Send + Sync {
    async fn chat(&self, model: &str, messages: &[ChatMessage]) -> Result<ChatCompletion>;
}
