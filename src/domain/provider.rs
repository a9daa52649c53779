use serde::{Deserialize, Serialize};

/// The two wire-protocol shapes an LLM provider may speak; the client dispatches on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProtocol {
    OpenAiCompatible,
    Anthropic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmProvider {
    pub provider_id: String,
    pub name: String,
    pub protocol: LlmProtocol,
    pub api_url: String,
    pub api_key: String,
    pub is_active: bool,
}
