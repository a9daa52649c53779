//! Prometheus metrics for the decision-cycle engine.
//!
//! All metrics use the `agentrade_` prefix. Pushed as structured JSON logs to stdout rather
//! than served over an HTTP scrape endpoint — there is no web surface in this crate.

use prometheus::{
    CounterVec, Gauge, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
    core::{AtomicF64, GenericGauge, GenericGaugeVec},
};
use std::sync::Arc;

#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,
    /// Decision cycles completed, by outcome (`success`, `no_trade`, `api_error`).
    pub decisions_total: CounterVec,
    /// Orders settled, by side and status (`filled`, `rejected`).
    pub orders_total: CounterVec,
    /// Rejected orders, by `reject_reason` code.
    pub order_rejections_total: CounterVec,
    /// Decision-lock acquisition attempts that failed because the agent was already busy.
    pub lock_contention_total: CounterVec,
    /// LLM chat call latency in seconds, by provider protocol.
    pub llm_latency_seconds: HistogramVec,
    /// Scheduled task runs, by task_type and outcome (`success`, `failed`, `skipped`).
    pub task_runs_total: CounterVec,
    /// Active agents currently tracked by the scheduler.
    pub active_agents: GenericGauge<AtomicF64>,
    /// Aggregate cash across active agent portfolios.
    pub total_cash: GenericGaugeVec<AtomicF64>,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let decisions_total = CounterVec::new(
            Opts::new(
                "agentrade_decisions_total",
                "Decision cycles completed by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(decisions_total.clone()))?;

        let orders_total = CounterVec::new(
            Opts::new("agentrade_orders_total", "Orders settled by side and status"),
            &["side", "status"],
        )?;
        registry.register(Box::new(orders_total.clone()))?;

        let order_rejections_total = CounterVec::new(
            Opts::new(
                "agentrade_order_rejections_total",
                "Rejected orders by reject_reason code",
            ),
            &["reject_reason"],
        )?;
        registry.register(Box::new(order_rejections_total.clone()))?;

        let lock_contention_total = CounterVec::new(
            Opts::new(
                "agentrade_lock_contention_total",
                "Decision-lock acquisitions that found the agent already busy",
            ),
            &["lock_class"],
        )?;
        registry.register(Box::new(lock_contention_total.clone()))?;

        let llm_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "agentrade_llm_latency_seconds",
                "LLM chat call latency in seconds",
            )
            .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 40.0]),
            &["protocol"],
        )?;
        registry.register(Box::new(llm_latency_seconds.clone()))?;

        let task_runs_total = CounterVec::new(
            Opts::new(
                "agentrade_task_runs_total",
                "Scheduled task runs by task_type and outcome",
            ),
            &["task_type", "outcome"],
        )?;
        registry.register(Box::new(task_runs_total.clone()))?;

        let active_agents = Gauge::with_opts(Opts::new(
            "agentrade_active_agents",
            "Number of active agents tracked by the scheduler",
        ))?;
        registry.register(Box::new(active_agents.clone()))?;

        let total_cash = GaugeVec::new(
            Opts::new("agentrade_total_cash", "Cash balance per agent"),
            &["agent_id"],
        )?;
        registry.register(Box::new(total_cash.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            decisions_total,
            orders_total,
            order_rejections_total,
            lock_contention_total,
            llm_latency_seconds,
            task_runs_total,
            active_agents,
            total_cash,
        })
    }

    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder
            .encode_to_string(&metric_families)
            .unwrap_or_default()
    }

    pub fn inc_decision(&self, outcome: &str) {
        self.decisions_total.with_label_values(&[outcome]).inc();
    }

    pub fn inc_order(&self, side: &str, status: &str) {
        self.orders_total.with_label_values(&[side, status]).inc();
    }

    pub fn inc_rejection(&self, reject_reason: &str) {
        self.order_rejections_total
            .with_label_values(&[reject_reason])
            .inc();
    }

    pub fn inc_lock_contention(&self, lock_class: &str) {
        self.lock_contention_total
            .with_label_values(&[lock_class])
            .inc();
    }

    pub fn observe_llm_latency(&self, protocol: &str, seconds: f64) {
        self.llm_latency_seconds
            .with_label_values(&[protocol])
            .observe(seconds);
    }

    pub fn inc_task_run(&self, task_type: &str, outcome: &str) {
        self.task_runs_total
            .with_label_values(&[task_type, outcome])
            .inc();
    }

    pub fn set_agent_cash(&self, agent_id: &str, cash: f64) {
        self.total_cash.with_label_values(&[agent_id]).set(cash);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("failed to construct default Metrics")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_includes_the_metric_prefix() {
        let metrics = Metrics::new().expect("metrics construct");
        assert!(metrics.render().contains("agentrade_"));
    }

    #[test]
    fn order_rejection_counter_is_labeled_by_reason() {
        let metrics = Metrics::new().expect("metrics construct");
        metrics.inc_rejection("LOT_SIZE_ZERO");
        metrics.inc_rejection("T1_VIOLATION");
        let output = metrics.render();
        assert!(output.contains("LOT_SIZE_ZERO"));
        assert!(output.contains("T1_VIOLATION"));
    }

    #[test]
    fn decision_counter_tracks_outcomes_independently() {
        let metrics = Metrics::new().expect("metrics construct");
        metrics.inc_decision("success");
        metrics.inc_decision("success");
        metrics.inc_decision("api_error");
        let output = metrics.render();
        assert!(output.contains(r#"outcome="success""#));
        assert!(output.contains(r#"outcome="api_error""#));
    }
}
