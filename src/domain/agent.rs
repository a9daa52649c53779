use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Active,
    Paused,
    Deleted,
}

/// A model agent: an LLM-driven trader holding a simulated portfolio. Never hard-deleted,
/// only transitioned to `Deleted`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub name: String,
    pub initial_cash: Decimal,
    pub current_cash: Decimal,
    pub template_id: String,
    pub provider_id: String,
    pub model_name: String,
    pub status: AgentStatus,
    pub schedule_type: String,
    pub created_at: DateTime<Utc>,
}

impl Agent {
    pub fn is_active(&self) -> bool {
        matches!(self.status, AgentStatus::Active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paused_agent_is_not_active() {
        let agent = Agent {
            id: "a1".into(),
            name: "test".into(),
            initial_cash: Decimal::ZERO,
            current_cash: Decimal::ZERO,
            template_id: "t1".into(),
            provider_id: "p1".into(),
            model_name: "m".into(),
            status: AgentStatus::Paused,
            schedule_type: "daily".into(),
            created_at: Utc::now(),
        };
        assert!(!agent.is_active());
    }
}
