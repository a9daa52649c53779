use std::env;

/// Poll-loop settings for `Scheduler::run` (see `application::scheduler`).
#[derive(Debug, Clone)]
pub struct SchedulerEnvConfig {
    pub poll_interval_secs: u64,
    /// When false, `trading_day_only` tasks run on any day — useful for local testing.
    pub enforce_trading_day_gate: bool,
}

impl SchedulerEnvConfig {
    pub fn from_env() -> Self {
        Self {
            poll_interval_secs: env::var("SCHEDULER_POLL_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            enforce_trading_day_gate: env::var("SCHEDULER_ENFORCE_TRADING_DAY_GATE")
                .ok()
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
        }
    }
}
