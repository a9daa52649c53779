use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use tracing::{instrument, warn};

use crate::config::lock_config::{lock_key_for_decision, LockPolicies};
use crate::domain::agent::Agent;
use crate::domain::decision::{parse_decisions, Decision, DecisionAction};
use crate::domain::decision_log::{classify_error, DecisionLog, DecisionLogStatus};
use crate::domain::errors::DomainError;
use crate::domain::llm_log::{truncate_for_log, LlmRequestLog, LlmRequestStatus};
use crate::domain::ports::{ChatMessage, LockService};
use crate::domain::portfolio::Portfolio;
use crate::domain::provider::LlmProvider;
use crate::domain::quote::StockQuote;
use crate::domain::repositories::{
    AgentRepository, DecisionLogRepository, LlmLogRepository, OrderRepository, PortfolioRepository,
    PositionRepository, ProviderRepository, QuoteRepository, TemplateRepository, TransactionRepository,
};

use crate::application::order_processor::{OrderProcessor, PositionChange, Settlement};
use crate::application::prompt_manager::{self, HotStockHistory, PositionHistory, PromptError};
use crate::infrastructure::llm::LlmClientRegistry;

/// Outcome of one `execute_decision_cycle` call. `decisions` always reflects what was parsed,
/// even when some were skipped during settlement; `executed_count` is the subset that actually
/// filled as a buy or sell — hold/wait and rejected orders don't count.
#[derive(Debug)]
pub struct DecisionCycleOutcome {
    pub success: bool,
    pub decisions: Vec<Decision>,
    pub executed_count: usize,
    pub error_message: Option<String>,
}

/// Everything the decision cycle needs beyond the agent's own row: the market bundle the
/// caller assembled via `MarketDataService::get_market_data_for_prompt`, the agent's latest
/// known price per held/candidate symbol, and whether trading-hours enforcement applies
/// (manual triggers may disable it).
pub struct CycleInputs {
    pub market_bundle: serde_json::Value,
    pub sentiment_score: f64,
    pub latest_quotes: HashMap<String, StockQuote>,
    pub hot_stocks_history: Vec<HotStockHistory>,
    pub position_quote_history: HashMap<String, Vec<StockQuote>>,
    pub enforce_trading_hours: bool,
}

/// Orchestrates one agent's decision cycle: acquire the per-agent lock, render the prompt,
/// call the LLM, parse decisions, settle each through `OrderProcessor`, and persist the
/// per-decision trail plus the aggregate decision log.
pub struct AgentManager {
    agents: Arc<dyn AgentRepository>,
    portfolios: Arc<dyn PortfolioRepository>,
    positions: Arc<dyn PositionRepository>,
    orders: Arc<dyn OrderRepository>,
    transactions: Arc<dyn TransactionRepository>,
    templates: Arc<dyn TemplateRepository>,
    providers: Arc<dyn ProviderRepository>,
    quotes: Arc<dyn QuoteRepository>,
    llm_logs: Arc<dyn LlmLogRepository>,
    decision_logs: Arc<dyn DecisionLogRepository>,
    lock: Arc<dyn LockService>,
    llm_clients: Arc<LlmClientRegistry>,
    order_processor: OrderProcessor,
    lock_policies: LockPolicies,
}

impl AgentManager {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        agents: Arc<dyn AgentRepository>,
        portfolios: Arc<dyn PortfolioRepository>,
        positions: Arc<dyn PositionRepository>,
        orders: Arc<dyn OrderRepository>,
        transactions: Arc<dyn TransactionRepository>,
        templates: Arc<dyn TemplateRepository>,
        providers: Arc<dyn ProviderRepository>,
        quotes: Arc<dyn QuoteRepository>,
        llm_logs: Arc<dyn LlmLogRepository>,
        decision_logs: Arc<dyn DecisionLogRepository>,
        lock: Arc<dyn LockService>,
        llm_clients: Arc<LlmClientRegistry>,
        order_processor: OrderProcessor,
    ) -> Self {
        Self {
            agents,
            portfolios,
            positions,
            orders,
            transactions,
            templates,
            providers,
            quotes,
            llm_logs,
            decision_logs,
            lock,
            llm_clients,
            order_processor,
            lock_policies: LockPolicies::default(),
        }
    }

    /// Acquires the agent's decision lock (non-blocking) and runs the cycle if acquired.
    /// Returns `Err(DomainError::AgentBusy)` immediately when another cycle holds the lock —
    /// it is never queued.
    #[instrument(skip(self, inputs), fields(agent_id = %agent_id))]
    pub async fn trigger(&self, agent_id: &str, inputs: CycleInputs, now: DateTime<Utc>) -> Result<DecisionCycleOutcome> {
        let policy = self.lock_policies.decision;
        let key = lock_key_for_decision(agent_id);
        let acquired = self
            .lock
            .acquire(&key, policy.ttl, policy.blocking, policy.retries, policy.delay)
            .await?;
        if !acquired {
            return Err(DomainError::AgentBusy.into());
        }

        let result = self.run_cycle(agent_id, inputs, now).await;

        if !self.lock.release(&key).await.unwrap_or(false) {
            warn!(agent_id, "decision lock release was a no-op; ttl may have elapsed mid-cycle");
        }

        result
    }

    async fn run_cycle(&self, agent_id: &str, inputs: CycleInputs, now: DateTime<Utc>) -> Result<DecisionCycleOutcome> {
        let agent = self
            .agents
            .get(agent_id)
            .await?
            .ok_or_else(|| DomainError::AgentNotFound(agent_id.to_string()))?;
        if !agent.is_active() {
            return Err(DomainError::AgentPaused(agent_id.to_string()).into());
        }

        let mut portfolio = self.portfolios.get(agent_id).await?;
        let template = self
            .templates
            .get(&agent.template_id)
            .await?
            .ok_or_else(|| DomainError::TemplateNotFound(agent.template_id.clone()))?;
        let provider = self
            .providers
            .get(&agent.provider_id)
            .await?
            .ok_or_else(|| DomainError::ProviderNotFound(agent.provider_id.clone()))?;

        let context = render_context(&agent, &portfolio, &inputs, now);
        let prompt = match prompt_manager::render(&template, &context) {
            Ok(prompt) => prompt,
            Err(err) => return self.record_cycle_failure(&agent, err_to_string(&err), now).await,
        };

        let chat_result = self.invoke_llm(&agent, &provider, &prompt, now).await;
        let (completion, log_id) = match chat_result {
            Ok(pair) => pair,
            Err(err) => return self.record_cycle_failure(&agent, err.to_string(), now).await,
        };

        let decisions = parse_decisions(&completion);
        let executed_count = self
            .settle_decisions(&agent, &mut portfolio, &decisions, &inputs, now, log_id)
            .await?;

        let status = if decisions.is_empty() { DecisionLogStatus::NoTrade } else { DecisionLogStatus::Success };
        self.decision_logs
            .append(&DecisionLog {
                id: 0,
                agent_id: agent.id.clone(),
                status,
                parsed_decision: Some(serde_json::to_value(&decisions).unwrap_or(serde_json::Value::Null)),
                error_message: None,
                created_at: now,
            })
            .await?;

        Ok(DecisionCycleOutcome {
            success: true,
            decisions,
            executed_count,
            error_message: None,
        })
    }

    async fn invoke_llm(
        &self,
        agent: &Agent,
        provider: &LlmProvider,
        prompt: &str,
        now: DateTime<Utc>,
    ) -> Result<(String, Option<i64>)> {
        let client = self.llm_clients.build(provider.clone());
        let messages = vec![ChatMessage { role: "user".to_string(), content: prompt.to_string() }];

        let started_at = Utc::now();
        let outcome = client.chat(&agent.model_name, &messages).await;
        let duration_ms = (Utc::now() - started_at).num_milliseconds().max(0);

        let (status, response_text, error_message, tokens_in, tokens_out) = match &outcome {
            Ok(completion) => (LlmRequestStatus::Success, completion.text.clone(), None, completion.tokens_in, completion.tokens_out),
            Err(err) => (LlmRequestStatus::Error, String::new(), Some(err.to_string()), 0, 0),
        };

        let log = LlmRequestLog {
            id: 0,
            provider_id: provider.provider_id.clone(),
            model_name: agent.model_name.clone(),
            agent_id: agent.id.clone(),
            request_content: truncate_for_log(prompt),
            response_content: truncate_for_log(&response_text),
            duration_ms,
            status,
            error_message,
            tokens_in,
            tokens_out,
            created_at: now,
        };
        let log_id = self.llm_logs.append(&log).await?;

        match outcome {
            Ok(completion) => Ok((completion.text, Some(log_id))),
            Err(err) => Err(anyhow!("llm request failed: {err}")),
        }
    }

    async fn settle_decisions(
        &self,
        agent: &Agent,
        portfolio: &mut Portfolio,
        decisions: &[Decision],
        inputs: &CycleInputs,
        now: DateTime<Utc>,
        log_id: Option<i64>,
    ) -> Result<usize> {
        let today = now.date_naive();
        let mut executed = 0usize;

        for decision in decisions {
            let fallback_quote = match &decision.stock_code {
                Some(code) if !inputs.latest_quotes.contains_key(code) => self.quotes.get_latest(code).await?,
                _ => None,
            };
            let latest_quote = decision
                .stock_code
                .as_ref()
                .and_then(|code| inputs.latest_quotes.get(code))
                .or(fallback_quote.as_ref());

            let settlement = self.order_processor.process(
                &agent.id,
                decision,
                portfolio,
                latest_quote,
                inputs.enforce_trading_hours,
                now,
                today,
                log_id,
            );

            let is_filled_trade = matches!(decision.decision, DecisionAction::Buy | DecisionAction::Sell)
                && matches!(settlement, Settlement::Filled { .. });

            self.persist_settlement(settlement).await?;
            if is_filled_trade {
                executed += 1;
            }
        }

        self.agents.update_cash(&agent.id, portfolio.cash).await?;
        Ok(executed)
    }

    async fn persist_settlement(&self, settlement: Settlement) -> Result<()> {
        match settlement {
            Settlement::Rejected { order } => {
                self.orders.save(&order).await?;
            }
            Settlement::Filled { order, transaction, position_change } => {
                self.orders.save(&order).await?;
                self.transactions.save(&transaction).await?;
                match position_change {
                    PositionChange::None => {}
                    PositionChange::Upsert(position) => self.positions.upsert(&position).await?,
                    PositionChange::Delete { agent_id, stock_code } => {
                        self.positions.delete(&agent_id, &stock_code).await?
                    }
                }
            }
        }
        Ok(())
    }

    async fn record_cycle_failure(&self, agent: &Agent, message: String, now: DateTime<Utc>) -> Result<DecisionCycleOutcome> {
        let status = classify_error(&message);
        self.decision_logs
            .append(&DecisionLog {
                id: 0,
                agent_id: agent.id.clone(),
                status,
                parsed_decision: None,
                error_message: Some(message.clone()),
                created_at: now,
            })
            .await?;

        Ok(DecisionCycleOutcome {
            success: false,
            decisions: Vec::new(),
            executed_count: 0,
            error_message: Some(message),
        })
    }
}

fn err_to_string(err: &PromptError) -> String {
    err.to_string()
}

/// Assembles the full placeholder vocabulary from the agent's own state, the caller-supplied
/// market bundle, and the current wall-clock moment. Placeholders the caller's bundle doesn't
/// carry (fundamentals, capital flow, news) are left absent from the map and render empty.
fn render_context(agent: &Agent, portfolio: &Portfolio, inputs: &CycleInputs, now: DateTime<Utc>) -> HashMap<String, String> {
    let mut ctx = HashMap::new();

    let mut last_prices = HashMap::new();
    for (code, quote) in &inputs.latest_quotes {
        last_prices.insert(code.clone(), quote.close);
    }
    let market_value = portfolio.market_value(&last_prices);
    let total_equity = portfolio.total_equity(&last_prices);
    let return_rate = if agent.initial_cash.is_zero() {
        rust_decimal::Decimal::ZERO
    } else {
        (total_equity - agent.initial_cash) / agent.initial_cash * rust_decimal::Decimal::from(100)
    };

    ctx.insert("cash".to_string(), format!("{:.2}", portfolio.cash));
    ctx.insert("market_value".to_string(), format!("{:.2}", market_value));
    ctx.insert("return_rate".to_string(), format!("{:.2}%", return_rate));
    ctx.insert("sentiment_score".to_string(), format!("{:.2}", inputs.sentiment_score));

    let positions_json = serde_json::to_string(
        &portfolio
            .positions
            .values()
            .map(|p| serde_json::json!({
                "stock_code": p.stock_code,
                "shares": p.shares,
                "avg_cost": p.avg_cost,
                "buy_date": p.buy_date,
            }))
            .collect::<Vec<_>>(),
    )
    .unwrap_or_else(|_| "[]".to_string());
    ctx.insert("positions".to_string(), positions_json);

    if let Some(sentiment) = inputs.market_bundle.get("market_sentiment") {
        ctx.insert("market_sentiment".to_string(), sentiment.to_string());
    }
    if let Some(overview) = inputs.market_bundle.get("index_overview") {
        ctx.insert("market_overview".to_string(), overview.to_string());
    }
    if let Some(hot) = inputs.market_bundle.get("hot_stocks") {
        ctx.insert("hot_stocks".to_string(), hot.to_string());
    }

    let local = now.with_timezone(&chrono_tz::Asia::Shanghai);
    ctx.insert("current_time".to_string(), local.format("%H:%M:%S").to_string());
    ctx.insert("current_date".to_string(), local.format("%Y-%m-%d").to_string());
    ctx.insert(
        "current_weekday".to_string(),
        crate::domain::calendar::weekday_name_zh(local.date_naive()).to_string(),
    );
    ctx.insert(
        "is_trading_day".to_string(),
        crate::domain::calendar::is_trading_day(local.date_naive()).to_string(),
    );

    ctx.insert(
        "hot_stocks_quotes".to_string(),
        prompt_manager::format_hot_stocks_quotes(&inputs.hot_stocks_history),
    );
    ctx.insert(
        "positions_quotes".to_string(),
        prompt_manager::format_positions_quotes(&positions_history(portfolio, &inputs.position_quote_history)),
    );

    ctx
}

/// Builds the positions-quotes Markdown block from each held position's trailing quote
/// history, per §6.2's "up to 30 rows, ascending" rule.
pub fn positions_history(portfolio: &Portfolio, history_by_code: &HashMap<String, Vec<StockQuote>>) -> Vec<PositionHistory> {
    portfolio
        .positions
        .values()
        .map(|position| PositionHistory {
            stock_code: position.stock_code.clone(),
            stock_name: history_by_code
                .get(&position.stock_code)
                .and_then(|rows| rows.last())
                .and_then(|row| row.stock_name.clone())
                .unwrap_or_else(|| position.stock_code.clone()),
            shares: position.shares,
            avg_cost: position.avg_cost,
            rows: history_by_code.get(&position.stock_code).cloned().unwrap_or_default(),
        })
        .collect()
}
