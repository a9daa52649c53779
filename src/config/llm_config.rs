use std::env;
use std::time::Duration;

/// HTTP transport policy for `infrastructure::llm::HttpLlmClient`.
#[derive(Debug, Clone)]
pub struct LlmEnvConfig {
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub circuit_breaker_failure_threshold: u32,
    pub circuit_breaker_reset_timeout: Duration,
}

impl LlmEnvConfig {
    pub fn from_env() -> Self {
        Self {
            request_timeout: Duration::from_secs(
                env::var("LLM_REQUEST_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(60),
            ),
            max_retries: env::var("LLM_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3),
            circuit_breaker_failure_threshold: env::var("LLM_CIRCUIT_BREAKER_FAILURE_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            circuit_breaker_reset_timeout: Duration::from_secs(
                env::var("LLM_CIRCUIT_BREAKER_RESET_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }
}
