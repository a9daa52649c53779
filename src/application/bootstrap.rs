use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use crate::config::Config;
use crate::domain::ports::LockService;
use crate::domain::repositories::AgentRepository;

use crate::application::agent_manager::AgentManager;
use crate::application::market_data_service::MarketDataService;
use crate::application::order_processor::OrderProcessor;
use crate::application::quote_service::QuoteService;
use crate::application::scheduler::Scheduler;
use crate::application::task_executor::TaskExecutor;

use crate::infrastructure::llm::LlmClientRegistry;
use crate::infrastructure::lock::{InMemoryLockService, RedisLockService};
use crate::infrastructure::market_data::UnconfiguredQuoteSnapshotFetcher;
use crate::infrastructure::persistence::Database;
use crate::infrastructure::persistence::repositories::{
    SqliteAgentRepository, SqliteDecisionLogRepository, SqliteLlmLogRepository, SqliteMarketDataRepository,
    SqliteOrderRepository, SqlitePortfolioRepository, SqlitePositionRepository, SqliteProviderRepository,
    SqliteQuoteRepository, SqliteTaskLogRepository, SqliteTaskRepository, SqliteTemplateRepository,
    SqliteTransactionRepository,
};

/// Everything `bin/server.rs` needs after startup: the agent repository (for the metrics
/// reporter) and the background scheduler task handle.
pub struct ApplicationHandle {
    pub agents: Arc<dyn AgentRepository>,
}

/// Wires persistence, locking, the LLM client registry, and the application-layer services
/// together, the way `Config`'s own sub-configs know how to build themselves from the
/// environment. `build` performs no I/O side effects beyond opening the database and (for the
/// Redis backend) a lock connection; `start` spawns the scheduler loop.
pub struct Application {
    config: Config,
    agents: Arc<dyn AgentRepository>,
    scheduler: Scheduler,
}

impl Application {
    pub async fn build(config: Config) -> Result<Self> {
        info!(url = %config.database.url, "connecting to database");
        let db = Database::new(&config.database.url).await?;

        let agents: Arc<dyn AgentRepository> = Arc::new(SqliteAgentRepository::new(db.clone()));
        let portfolios = Arc::new(SqlitePortfolioRepository::new(db.clone()));
        let positions = Arc::new(SqlitePositionRepository::new(db.clone()));
        let orders = Arc::new(SqliteOrderRepository::new(db.clone()));
        let transactions = Arc::new(SqliteTransactionRepository::new(db.clone()));
        let templates = Arc::new(SqliteTemplateRepository::new(db.clone()));
        let providers = Arc::new(SqliteProviderRepository::new(db.clone()));
        let quotes = Arc::new(SqliteQuoteRepository::new(db.clone()));
        let llm_logs = Arc::new(SqliteLlmLogRepository::new(db.clone()));
        let decision_logs = Arc::new(SqliteDecisionLogRepository::new(db.clone()));
        let market_data = Arc::new(SqliteMarketDataRepository::new(db.clone()));
        let tasks = Arc::new(SqliteTaskRepository::new(db.clone()));
        let task_logs = Arc::new(SqliteTaskLogRepository::new(db.clone()));

        let lock = Self::build_lock_service(&config).await;
        let llm_clients = Arc::new(LlmClientRegistry::new(config.llm.clone()));
        let fetcher = Arc::new(UnconfiguredQuoteSnapshotFetcher);

        let order_processor = OrderProcessor::new(config.fees.clone());
        let agent_manager = Arc::new(AgentManager::new(
            agents.clone(),
            portfolios.clone(),
            positions,
            orders,
            transactions,
            templates,
            providers,
            quotes.clone(),
            llm_logs,
            decision_logs,
            lock,
            llm_clients,
            order_processor,
        ));

        let quote_service = Arc::new(QuoteService::new(fetcher.clone(), quotes.clone()));
        let market_data_service = Arc::new(MarketDataService::new(fetcher, market_data, quotes.clone()));

        let executor = Arc::new(TaskExecutor::new(
            tasks.clone(),
            task_logs,
            agents.clone(),
            portfolios,
            quotes,
            agent_manager,
            quote_service,
            market_data_service,
        ));

        let scheduler = Scheduler::new(tasks, executor, &config.scheduler);

        Ok(Self { config, agents, scheduler })
    }

    async fn build_lock_service(config: &Config) -> Arc<dyn LockService> {
        match RedisLockService::connect(&config.redis.url).await {
            Ok(redis) => {
                info!(url = %config.redis.url, "using redis-backed decision lock");
                Arc::new(redis)
            }
            Err(err) => {
                warn!(
                    error = %err,
                    "failed to connect to redis; falling back to an in-process lock (unsafe across multiple instances)"
                );
                Arc::new(InMemoryLockService::new())
            }
        }
    }

    pub async fn start(self) -> Result<ApplicationHandle> {
        info!(
            poll_interval_secs = self.config.scheduler.poll_interval_secs,
            "starting task scheduler"
        );
        let handle = ApplicationHandle { agents: self.agents };
        tokio::spawn(async move { self.scheduler.run().await });
        Ok(handle)
    }
}
