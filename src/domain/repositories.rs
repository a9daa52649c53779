use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::domain::agent::{Agent, AgentStatus};
use crate::domain::decision_log::{DecisionLog, DecisionLogStatus};
use crate::domain::llm_log::LlmRequestLog;
use crate::domain::market_data::{MarketDataSnapshot, MarketDataType};
use crate::domain::order::{Order, OrderStatus};
use crate::domain::portfolio::{Portfolio, Position};
use crate::domain::provider::LlmProvider;
use crate::domain::quote::StockQuote;
use crate::domain::task::{SystemTask, TaskLog};
use crate::domain::template::PromptTemplate;
use crate::domain::transaction::Transaction;

#[async_trait]
pub trait AgentRepository: Send + Sync {
    async fn get(&self, agent_id: &str) -> Result<Option<Agent>>;
    async fn list(&self, status: Option<AgentStatus>) -> Result<Vec<Agent>>;
    async fn save(&self, agent: &Agent) -> Result<()>;
    async fn update_status(&self, agent_id: &str, status: AgentStatus) -> Result<()>;
    async fn update_cash(&self, agent_id: &str, new_cash: Decimal) -> Result<()>;
}

#[async_trait]
pub trait PortfolioRepository: Send + Sync {
    /// Rebuilds the portfolio value object from persisted cash and position rows.
    async fn get(&self, agent_id: &str) -> Result<Portfolio>;
}

#[async_trait]
pub trait PositionRepository: Send + Sync {
    async fn upsert(&self, position: &Position) -> Result<()>;
    async fn delete(&self, agent_id: &str, stock_code: &str) -> Result<()>;
    async fn list_by_agent(&self, agent_id: &str) -> Result<Vec<Position>>;
    async fn get(&self, agent_id: &str, stock_code: &str) -> Result<Option<Position>>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn save(&self, order: &Order) -> Result<()>;
    async fn get(&self, order_id: &str) -> Result<Option<Order>>;
    async fn list_by_agent(&self, agent_id: &str, limit: i64) -> Result<Vec<Order>>;
    async fn update_status(&self, order_id: &str, status: OrderStatus) -> Result<()>;
    async fn count_by_agent(&self, agent_id: &str) -> Result<i64>;
}

#[async_trait]
pub trait TransactionRepository: Send + Sync {
    async fn save(&self, tx: &Transaction) -> Result<()>;
    async fn list_by_agent(&self, agent_id: &str, limit: i64) -> Result<Vec<Transaction>>;
    async fn sum_fees(&self, agent_id: &str) -> Result<Decimal>;
}

#[async_trait]
pub trait QuoteRepository: Send + Sync {
    async fn upsert(&self, quote: &StockQuote) -> Result<()>;
    /// Returns `(success, fail)` counts; a malformed row is skipped, not propagated.
    async fn upsert_batch(&self, quotes: &[StockQuote]) -> Result<(usize, usize)>;
    async fn get_latest(&self, stock_code: &str) -> Result<Option<StockQuote>>;
    async fn get_latest_n(&self, stock_code: &str, n: i64) -> Result<Vec<StockQuote>>;
    async fn get_range(
        &self,
        stock_code: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<StockQuote>>;
}

#[async_trait]
pub trait MarketDataRepository: Send + Sync {
    async fn upsert(&self, snapshot: &MarketDataSnapshot) -> Result<()>;
    async fn get_latest(&self, data_type: MarketDataType) -> Result<Option<MarketDataSnapshot>>;
}

#[async_trait]
pub trait LlmLogRepository: Send + Sync {
    /// Returns the auto-increment row id, threaded into downstream Order rows.
    async fn append(&self, log: &LlmRequestLog) -> Result<i64>;
}

#[async_trait]
pub trait DecisionLogRepository: Send + Sync {
    async fn append(&self, log: &DecisionLog) -> Result<i64>;
    async fn list_by_agent(
        &self,
        agent_id: &str,
        status: Option<DecisionLogStatus>,
        limit: i64,
    ) -> Result<Vec<DecisionLog>>;
}

#[async_trait]
pub trait TemplateRepository: Send + Sync {
    async fn get(&self, template_id: &str) -> Result<Option<PromptTemplate>>;
    async fn list(&self) -> Result<Vec<PromptTemplate>>;
    /// Inserts or updates; a content change bumps `version`.
    async fn save(&self, template: &PromptTemplate) -> Result<()>;
    async fn delete(&self, template_id: &str) -> Result<()>;
}

#[async_trait]
pub trait ProviderRepository: Send + Sync {
    async fn get(&self, provider_id: &str) -> Result<Option<LlmProvider>>;
    async fn list_active(&self) -> Result<Vec<LlmProvider>>;
}

#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn get(&self, task_id: &str) -> Result<Option<SystemTask>>;
    async fn list_active(&self) -> Result<Vec<SystemTask>>;
}

#[async_trait]
pub trait TaskLogRepository: Send + Sync {
    /// Inserts a `running` row and returns its id.
    async fn start(&self, task_id: &str, started_at: DateTime<Utc>) -> Result<i64>;
    async fn complete(&self, id: i64, log: &TaskLog) -> Result<()>;
}
