//! Push-based observability for the decision-cycle engine.
//!
//! Outbound data only — no HTTP server, no incoming requests. Metrics are pushed via
//! structured JSON logs to stdout (for Loki, Fluentd, CloudWatch Logs and similar collectors).

pub mod metrics;
pub mod reporter;

pub use metrics::Metrics;
pub use reporter::MetricsReporter;
