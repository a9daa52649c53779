//! Push-based metrics reporter.
//!
//! Periodically outputs metrics as structured JSON to stdout. No HTTP server, no incoming
//! requests — only outbound data, matching the headless server's design.

use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::domain::agent::AgentStatus;
use crate::domain::repositories::AgentRepository;
use crate::infrastructure::observability::metrics::Metrics;

#[derive(Serialize)]
pub struct MetricsSnapshot {
    pub timestamp: String,
    pub uptime_seconds: u64,
    pub version: String,
    pub active_agents: usize,
    pub total_cash_usd: f64,
}

/// Outputs a population-wide snapshot on a configurable interval.
pub struct MetricsReporter {
    agents: Arc<dyn AgentRepository>,
    metrics: Metrics,
    start_time: Instant,
    interval: Duration,
}

impl MetricsReporter {
    pub fn new(agents: Arc<dyn AgentRepository>, metrics: Metrics, interval_seconds: u64) -> Self {
        Self {
            agents,
            metrics,
            start_time: Instant::now(),
            interval: Duration::from_secs(interval_seconds),
        }
    }

    pub async fn run(self) {
        info!(
            "MetricsReporter: starting push-based metrics (interval: {:?})",
            self.interval
        );

        loop {
            tokio::time::sleep(self.interval).await;

            match self.collect_snapshot().await {
                Ok(snapshot) => match serde_json::to_string(&snapshot) {
                    Ok(json) => {
                        println!("METRICS_JSON:{json}");
                        info!(
                            "Active agents: {} | Total cash: ${:.2} | Uptime: {}s",
                            snapshot.active_agents,
                            snapshot.total_cash_usd,
                            snapshot.uptime_seconds
                        );
                    }
                    Err(e) => warn!("failed to serialize metrics snapshot: {e}"),
                },
                Err(e) => warn!("failed to collect metrics snapshot: {e}"),
            }
        }
    }

    async fn collect_snapshot(&self) -> anyhow::Result<MetricsSnapshot> {
        let active = self.agents.list(Some(AgentStatus::Active)).await?;
        let mut total_cash = 0.0_f64;
        for agent in &active {
            let cash = agent.current_cash.to_f64().unwrap_or(0.0);
            total_cash += cash;
            self.metrics.set_agent_cash(&agent.id, cash);
        }
        self.metrics.active_agents.set(active.len() as f64);

        Ok(MetricsSnapshot {
            timestamp: chrono::Utc::now().to_rfc3339(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            active_agents: active.len(),
            total_cash_usd: total_cash,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::agent::Agent;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::sync::Mutex;

    struct FakeAgentRepository {
        agents: Mutex<Vec<Agent>>,
    }

    #[async_trait]
    impl AgentRepository for FakeAgentRepository {
        async fn get(&self, agent_id: &str) -> anyhow::Result<Option<Agent>> {
            Ok(self
                .agents
                .lock()
                .unwrap()
                .iter()
                .find(|a| a.id == agent_id)
                .cloned())
        }
        async fn list(&self, status: Option<AgentStatus>) -> anyhow::Result<Vec<Agent>> {
            Ok(self
                .agents
                .lock()
                .unwrap()
                .iter()
                .filter(|a| status.is_none_or(|s| a.status == s))
                .cloned()
                .collect())
        }
        async fn save(&self, agent: &Agent) -> anyhow::Result<()> {
            self.agents.lock().unwrap().push(agent.clone());
            Ok(())
        }
        async fn update_status(&self, _agent_id: &str, _status: AgentStatus) -> anyhow::Result<()> {
            Ok(())
        }
        async fn update_cash(
            &self,
            _agent_id: &str,
            _new_cash: rust_decimal::Decimal,
        ) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn snapshot_sums_cash_across_active_agents_only() {
        let repo = Arc::new(FakeAgentRepository {
            agents: Mutex::new(vec![
                Agent {
                    id: "a1".into(),
                    name: "one".into(),
                    initial_cash: dec!(100000),
                    current_cash: dec!(90000),
                    template_id: "t1".into(),
                    provider_id: "p1".into(),
                    model_name: "m".into(),
                    status: AgentStatus::Active,
                    schedule_type: "daily".into(),
                    created_at: chrono::Utc::now(),
                },
                Agent {
                    id: "a2".into(),
                    name: "two".into(),
                    initial_cash: dec!(50000),
                    current_cash: dec!(50000),
                    template_id: "t1".into(),
                    provider_id: "p1".into(),
                    model_name: "m".into(),
                    status: AgentStatus::Paused,
                    schedule_type: "daily".into(),
                    created_at: chrono::Utc::now(),
                },
            ]),
        });
        let metrics = Metrics::new().expect("metrics construct");
        let reporter = MetricsReporter::new(repo, metrics, 60);

        let snapshot = reporter.collect_snapshot().await.expect("snapshot");

        assert_eq!(snapshot.active_agents, 1);
        assert_eq!(snapshot.total_cash_usd, 90000.0);
    }
}
