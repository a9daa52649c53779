use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    AgentDecision,
    QuoteSync,
    MarketRefresh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Active,
    Paused,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemTask {
    pub task_id: String,
    pub name: String,
    pub task_type: TaskType,
    /// `["all"]` targets every active agent; otherwise the listed ids intersected with active.
    pub agent_ids: Vec<String>,
    pub config: serde_json::Value,
    pub schedule: String,
    pub status: TaskStatus,
    pub trading_day_only: bool,
}

impl SystemTask {
    pub const ALL_AGENTS: &'static str = "all";

    pub fn targets_all_agents(&self) -> bool {
        self.agent_ids.iter().any(|id| id == Self::ALL_AGENTS)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskLogStatus {
    Running,
    Success,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRunStatus {
    Success,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResult {
    pub agent_id: String,
    pub agent_name: String,
    pub status: AgentRunStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: i64,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskLog {
    pub id: i64,
    pub task_id: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub status: TaskLogStatus,
    pub skip_reason: Option<String>,
    pub error_message: Option<String>,
    pub agent_results: Vec<AgentResult>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targets_all_agents_detects_the_all_sentinel() {
        let task = SystemTask {
            task_id: "t1".into(),
            name: "daily decision".into(),
            task_type: TaskType::AgentDecision,
            agent_ids: vec!["all".into()],
            config: serde_json::json!({}),
            schedule: "0 9 * * *".into(),
            status: TaskStatus::Active,
            trading_day_only: true,
        };
        assert!(task.targets_all_agents());
    }

    #[test]
    fn explicit_agent_list_does_not_target_all() {
        let task = SystemTask {
            task_id: "t2".into(),
            name: "subset".into(),
            task_type: TaskType::AgentDecision,
            agent_ids: vec!["a1".into(), "a2".into()],
            config: serde_json::json!({}),
            schedule: "0 9 * * *".into(),
            status: TaskStatus::Active,
            trading_day_only: false,
        };
        assert!(!task.targets_all_agents());
    }
}
