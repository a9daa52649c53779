pub mod agent_repository;
pub mod decision_log_repository;
pub mod llm_log_repository;
pub mod market_data_repository;
pub mod order_repository;
pub mod portfolio_repository;
pub mod position_repository;
pub mod provider_repository;
pub mod quote_repository;
pub mod task_log_repository;
pub mod task_repository;
pub mod template_repository;
pub mod transaction_repository;

pub use agent_repository::SqliteAgentRepository;
pub use decision_log_repository::SqliteDecisionLogRepository;
pub use llm_log_repository::SqliteLlmLogRepository;
pub use market_data_repository::SqliteMarketDataRepository;
pub use order_repository::SqliteOrderRepository;
pub use portfolio_repository::SqlitePortfolioRepository;
pub use position_repository::SqlitePositionRepository;
pub use provider_repository::SqliteProviderRepository;
pub use quote_repository::SqliteQuoteRepository;
pub use task_log_repository::SqliteTaskLogRepository;
pub use task_repository::SqliteTaskRepository;
pub use template_repository::SqliteTemplateRepository;
pub use transaction_repository::SqliteTransactionRepository;
