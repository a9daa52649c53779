use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionLogStatus {
    Success,
    NoTrade,
    ApiError,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionLog {
    pub id: i64,
    pub agent_id: String,
    pub status: DecisionLogStatus,
    pub parsed_decision: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

const ERROR_KEYWORDS: [&str; 7] = [
    "timeout",
    "connection",
    "api",
    "llm",
    "request",
    "response",
    "http",
];

/// Classifies an unhandled cycle-level error as `api_error` when it looks network/LLM-shaped,
/// otherwise `no_trade`.
pub fn classify_error(message: &str) -> DecisionLogStatus {
    let lower = message.to_lowercase();
    if ERROR_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        DecisionLogStatus::ApiError
    } else {
        DecisionLogStatus::NoTrade
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_classifies_as_api_error() {
        assert_eq!(
            classify_error("request timed out after 30s"),
            DecisionLogStatus::ApiError
        );
    }

    #[test]
    fn unrelated_message_classifies_as_no_trade() {
        assert_eq!(
            classify_error("no actionable signal found"),
            DecisionLogStatus::NoTrade
        );
    }
}
