use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MAX_LOGGED_CONTENT_CHARS: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmRequestStatus {
    Success,
    Error,
}

/// One row per LLM invocation. `id` is the auto-increment key threaded into downstream
/// `Order.llm_request_log_id` rows — never a mutable "latest id" slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequestLog {
    pub id: i64,
    pub provider_id: String,
    pub model_name: String,
    pub agent_id: String,
    pub request_content: String,
    pub response_content: String,
    pub duration_ms: i64,
    pub status: LlmRequestStatus,
    pub error_message: Option<String>,
    pub tokens_in: i64,
    pub tokens_out: i64,
    pub created_at: DateTime<Utc>,
}

/// Truncates to at most `MAX_LOGGED_CONTENT_CHARS` characters on a char boundary. The full
/// body must already have been parsed before this runs — truncation is for storage only.
pub fn truncate_for_log(content: &str) -> String {
    if content.chars().count() <= MAX_LOGGED_CONTENT_CHARS {
        content.to_string()
    } else {
        content.chars().take(MAX_LOGGED_CONTENT_CHARS).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_leaves_short_content_untouched() {
        assert_eq!(truncate_for_log("hello"), "hello");
    }

    #[test]
    fn truncate_caps_long_content_at_char_boundary() {
        let long = "x".repeat(MAX_LOGGED_CONTENT_CHARS + 500);
        let truncated = truncate_for_log(&long);
        assert_eq!(truncated.chars().count(), MAX_LOGGED_CONTENT_CHARS);
    }
}
