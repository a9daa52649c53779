use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};

use crate::domain::agent::{Agent, AgentStatus};
use crate::domain::calendar;
use crate::domain::repositories::{AgentRepository, PortfolioRepository, QuoteRepository, TaskLogRepository, TaskRepository};
use crate::domain::task::{AgentResult, AgentRunStatus, SystemTask, TaskLog, TaskLogStatus, TaskStatus, TaskType};

use crate::application::agent_manager::{AgentManager, CycleInputs};
use crate::application::market_data_service::MarketDataService;
use crate::application::prompt_manager::HotStockHistory;
use crate::application::quote_service::QuoteService;

/// Dispatches one `SystemTask` run by `task_type`, evaluates skip rules before any side effect,
/// and writes one `TaskLog` row per run. Agent fan-out runs every target concurrently; each
/// still goes through `AgentManager::trigger`'s own per-agent lock.
pub struct TaskExecutor {
    tasks: Arc<dyn TaskRepository>,
    task_logs: Arc<dyn TaskLogRepository>,
    agents: Arc<dyn AgentRepository>,
    portfolios: Arc<dyn PortfolioRepository>,
    quotes: Arc<dyn QuoteRepository>,
    agent_manager: Arc<AgentManager>,
    quote_service: Arc<QuoteService>,
    market_data_service: Arc<MarketDataService>,
}

impl TaskExecutor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tasks: Arc<dyn TaskRepository>,
        task_logs: Arc<dyn TaskLogRepository>,
        agents: Arc<dyn AgentRepository>,
        portfolios: Arc<dyn PortfolioRepository>,
        quotes: Arc<dyn QuoteRepository>,
        agent_manager: Arc<AgentManager>,
        quote_service: Arc<QuoteService>,
        market_data_service: Arc<MarketDataService>,
    ) -> Self {
        Self {
            tasks,
            task_logs,
            agents,
            portfolios,
            quotes,
            agent_manager,
            quote_service,
            market_data_service,
        }
    }

    #[instrument(skip(self), fields(task_id = %task_id))]
    pub async fn execute_task(&self, task_id: &str, now: DateTime<Utc>) -> Result<TaskLog> {
        let task = self
            .tasks
            .get(task_id)
            .await?
            .ok_or_else(|| anyhow!("task not found: {task_id}"))?;

        let started_at = now;
        let log_id = self.task_logs.start(task_id, started_at).await?;

        if let Some(skip_reason) = should_skip(&task, now) {
            info!(task_id, skip_reason, "task skipped");
            let log = TaskLog {
                id: log_id,
                task_id: task.task_id.clone(),
                started_at,
                completed_at: Some(now),
                status: TaskLogStatus::Skipped,
                skip_reason: Some(skip_reason),
                error_message: None,
                agent_results: Vec::new(),
            };
            self.task_logs.complete(log_id, &log).await?;
            return Ok(log);
        }

        let (status, agent_results, error_message) = match task.task_type {
            TaskType::AgentDecision => self.execute_agents(&task, now).await,
            TaskType::QuoteSync => self.execute_quote_sync(&task, now).await,
            TaskType::MarketRefresh => self.execute_market_refresh(now).await,
        };

        info!(task_id, status = ?status, "task run completed");
        let log = TaskLog {
            id: log_id,
            task_id: task.task_id.clone(),
            started_at,
            completed_at: Some(Utc::now()),
            status,
            skip_reason: None,
            error_message,
            agent_results,
        };
        self.task_logs.complete(log_id, &log).await?;
        Ok(log)
    }

    async fn execute_agents(&self, task: &SystemTask, now: DateTime<Utc>) -> (TaskLogStatus, Vec<AgentResult>, Option<String>) {
        let active = match self.agents.list(Some(AgentStatus::Active)).await {
            Ok(agents) => agents,
            Err(err) => return (TaskLogStatus::Failed, Vec::new(), Some(err.to_string())),
        };

        let targets: Vec<Agent> = if task.targets_all_agents() {
            active
        } else {
            active.into_iter().filter(|a| task.agent_ids.contains(&a.id)).collect()
        };

        if targets.is_empty() {
            warn!(task_id = %task.task_id, "no active agents matched this task's target set");
            return (TaskLogStatus::Success, Vec::new(), None);
        }

        let results = futures::future::join_all(targets.iter().map(|agent| self.run_single_agent(agent, now))).await;

        let failed = results.iter().filter(|r| r.status == AgentRunStatus::Failed).count();
        let status = if failed > 0 && failed == results.len() {
            TaskLogStatus::Failed
        } else {
            TaskLogStatus::Success
        };
        let error_message = if status == TaskLogStatus::Failed {
            Some("all agents failed".to_string())
        } else {
            None
        };

        (status, results, error_message)
    }

    async fn run_single_agent(&self, agent: &Agent, now: DateTime<Utc>) -> AgentResult {
        let started_at = now;

        if !agent.is_active() {
            return AgentResult {
                agent_id: agent.id.clone(),
                agent_name: agent.name.clone(),
                status: AgentRunStatus::Skipped,
                started_at,
                completed_at: started_at,
                duration_ms: 0,
                error_message: Some(format!("agent status is not active: {:?}", agent.status)),
            };
        }

        let inputs = match self.build_cycle_inputs(&agent.id).await {
            Ok(inputs) => inputs,
            Err(err) => {
                let completed_at = Utc::now();
                return AgentResult {
                    agent_id: agent.id.clone(),
                    agent_name: agent.name.clone(),
                    status: AgentRunStatus::Failed,
                    started_at,
                    completed_at,
                    duration_ms: (completed_at - started_at).num_milliseconds().max(0),
                    error_message: Some(err.to_string()),
                };
            }
        };

        let outcome = self.agent_manager.trigger(&agent.id, inputs, now).await;
        let completed_at = Utc::now();
        let duration_ms = (completed_at - started_at).num_milliseconds().max(0);

        match outcome {
            Ok(outcome) if outcome.success => AgentResult {
                agent_id: agent.id.clone(),
                agent_name: agent.name.clone(),
                status: AgentRunStatus::Success,
                started_at,
                completed_at,
                duration_ms,
                error_message: None,
            },
            Ok(outcome) => AgentResult {
                agent_id: agent.id.clone(),
                agent_name: agent.name.clone(),
                status: AgentRunStatus::Failed,
                started_at,
                completed_at,
                duration_ms,
                error_message: outcome.error_message,
            },
            Err(err) => AgentResult {
                agent_id: agent.id.clone(),
                agent_name: agent.name.clone(),
                status: AgentRunStatus::Failed,
                started_at,
                completed_at,
                duration_ms,
                error_message: Some(err.to_string()),
            },
        }
    }

    /// Assembles the market bundle, the agent's held-position quote history, and a hot-stocks
    /// history slice, all from already-persisted snapshots (never a live upstream call).
    async fn build_cycle_inputs(&self, agent_id: &str) -> Result<CycleInputs> {
        let portfolio = self.portfolios.get(agent_id).await?;

        let mut latest_quotes = HashMap::new();
        let mut position_quote_history = HashMap::new();
        for position in portfolio.positions.values() {
            if let Some(quote) = self.quotes.get_latest(&position.stock_code).await? {
                latest_quotes.insert(position.stock_code.clone(), quote);
            }
            let history = self.quotes.get_latest_n(&position.stock_code, 30).await?;
            position_quote_history.insert(position.stock_code.clone(), history);
        }

        let bundle = self.market_data_service.get_market_data_for_prompt().await?;
        let sentiment_score = bundle
            .get("market_sentiment")
            .and_then(|s| s.get("fear_greed_index"))
            .and_then(|v| v.as_f64())
            .map(|fear_greed| fear_greed / 100.0)
            .unwrap_or(0.5);

        let hot_codes: Vec<String> = bundle
            .get("hot_stocks")
            .and_then(|v| v.as_array())
            .map(|rows| {
                rows.iter()
                    .take(20)
                    .filter_map(|row| row.get("code").and_then(|c| c.as_str()).map(String::from))
                    .collect()
            })
            .unwrap_or_default();

        let mut hot_stocks_history = Vec::new();
        for code in hot_codes {
            let rows = self.quotes.get_latest_n(&code, 3).await?;
            if rows.is_empty() {
                continue;
            }
            let stock_name = rows.last().and_then(|r| r.stock_name.clone()).unwrap_or_else(|| code.clone());
            hot_stocks_history.push(HotStockHistory { stock_code: code, stock_name, rows });
        }

        Ok(CycleInputs {
            market_bundle: bundle,
            sentiment_score,
            latest_quotes,
            hot_stocks_history,
            position_quote_history,
            enforce_trading_hours: true,
        })
    }

    async fn execute_quote_sync(&self, task: &SystemTask, now: DateTime<Utc>) -> (TaskLogStatus, Vec<AgentResult>, Option<String>) {
        let today = now.date_naive();
        let stock_codes: Vec<String> = task
            .config
            .get("stock_codes")
            .and_then(|v| v.as_array())
            .map(|rows| rows.iter().filter_map(|v| v.as_str().map(String::from)).collect())
            .unwrap_or_default();
        let days = task.config.get("days").and_then(|v| v.as_i64()).unwrap_or(7);
        let force_full = task.config.get("force_full").and_then(|v| v.as_bool()).unwrap_or(false);

        let result = if stock_codes.is_empty() {
            self.quote_service.sync_quotes(today, force_full).await
        } else {
            self.quote_service.sync_specific_stocks(&stock_codes, today, days).await
        };

        match result {
            Ok((success, fail)) => {
                let error_message = if fail > 0 { Some(format!("{fail} quote rows failed to upsert ({success} succeeded)")) } else { None };
                (TaskLogStatus::Success, Vec::new(), error_message)
            }
            Err(err) => (TaskLogStatus::Failed, Vec::new(), Some(err.to_string())),
        }
    }

    async fn execute_market_refresh(&self, now: DateTime<Utc>) -> (TaskLogStatus, Vec<AgentResult>, Option<String>) {
        match self.market_data_service.refresh_all(now.date_naive()).await {
            Ok(_) => (TaskLogStatus::Success, Vec::new(), None),
            Err(err) => (TaskLogStatus::Failed, Vec::new(), Some(err.to_string())),
        }
    }
}

fn should_skip(task: &SystemTask, now: DateTime<Utc>) -> Option<String> {
    if task.status == TaskStatus::Paused {
        return Some("任务已暂停".to_string());
    }
    if task.trading_day_only {
        let today = now.with_timezone(&chrono_tz::Asia::Shanghai).date_naive();
        if !calendar::is_trading_day(today) {
            return Some(format!("非交易日（{} {}）", today, calendar::weekday_name_zh(today)));
        }
    }
    None
}
