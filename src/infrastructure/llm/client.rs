use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use std::sync::Arc;
use tracing::error;

use crate::config::llm_config::LlmEnvConfig;
use crate::domain::ports::{ChatCompletion, ChatMessage, LlmChatClient};
use crate::domain::provider::{LlmProtocol, LlmProvider};
use crate::infrastructure::core::http_client_factory::HttpClientFactory;
use crate::infrastructure::llm::circuit_breaker::{CircuitBreakerError, ProviderCircuitBreaker};
use crate::infrastructure::llm::protocol::{
    AnthropicChatResponse, OpenAiChatResponse, build_anthropic_request, build_openai_request,
};

const ANTHROPIC_MAX_TOKENS: u32 = 4096;
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// HTTP-backed `LlmChatClient`, dispatching on the provider's declared wire protocol. One
/// instance is shared across all providers; retry/timeout policy comes from the environment,
/// failure isolation comes from a per-provider circuit breaker.
pub struct HttpLlmClient {
    client: ClientWithMiddleware,
    provider: LlmProvider,
    circuit_breaker: ProviderCircuitBreaker,
}

impl HttpLlmClient {
    pub fn new(provider: LlmProvider, config: &LlmEnvConfig) -> Self {
        let client = HttpClientFactory::create_client_with(config.request_timeout, config.max_retries);
        let circuit_breaker = ProviderCircuitBreaker::new(
            provider.provider_id.clone(),
            config.circuit_breaker_failure_threshold as usize,
            config.circuit_breaker_reset_timeout,
        );

        Self {
            client,
            provider,
            circuit_breaker,
        }
    }

    async fn chat_inner(&self, model: &str, messages: &[ChatMessage]) -> Result<ChatCompletion> {
        match self.provider.protocol {
            LlmProtocol::OpenAiCompatible => self.chat_openai(model, messages).await,
            LlmProtocol::Anthropic => self.chat_anthropic(model, messages).await,
        }
    }

    async fn chat_openai(&self, model: &str, messages: &[ChatMessage]) -> Result<ChatCompletion> {
        let request = build_openai_request(model, messages);
        let url = format!("{}/chat/completions", self.provider.api_url.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.provider.api_key)
            .json(&request)
            .send()
            .await
            .context("openai-compatible chat request failed")?;

        let status = response.status();
        let body = response.text().await.context("failed to read chat response body")?;

        if !status.is_success() {
            bail!("llm provider {} returned {status}: {body}", self.provider.provider_id);
        }

        let parsed: OpenAiChatResponse =
            serde_json::from_str(&body).context("failed to parse openai-compatible response")?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("llm provider {} returned no choices", self.provider.provider_id))?;

        let usage = parsed.usage.unwrap_or_default();

        Ok(ChatCompletion {
            text: choice.message.content,
            tokens_in: usage.prompt_tokens,
            tokens_out: usage.completion_tokens,
        })
    }

    async fn chat_anthropic(&self, model: &str, messages: &[ChatMessage]) -> Result<ChatCompletion> {
        let request = build_anthropic_request(model, messages, ANTHROPIC_MAX_TOKENS);
        let url = format!("{}/v1/messages", self.provider.api_url.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.provider.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .context("anthropic chat request failed")?;

        let status = response.status();
        let body = response.text().await.context("failed to read chat response body")?;

        if !status.is_success() {
            bail!("llm provider {} returned {status}: {body}", self.provider.provider_id);
        }

        let parsed: AnthropicChatResponse =
            serde_json::from_str(&body).context("failed to parse anthropic response")?;

        let text = parsed
            .content
            .into_iter()
            .map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");

        let usage = parsed.usage.unwrap_or_default();

        Ok(ChatCompletion {
            text,
            tokens_in: usage.input_tokens,
            tokens_out: usage.output_tokens,
        })
    }
}

#[async_trait]
impl LlmChatClient for HttpLlmClient {
    async fn chat(&self, model: &str, messages: &[ChatMessage]) -> Result<ChatCompletion> {
        self.circuit_breaker
            .call(self.chat_inner(model, messages))
            .await
            .map_err(|err| match err {
                CircuitBreakerError::Open(msg) => anyhow!(msg),
                CircuitBreakerError::Inner(inner) => {
                    error!(provider = %self.provider.provider_id, error = %inner, "llm chat request failed");
                    inner
                }
            })
    }
}

/// Builds one `HttpLlmClient` per provider on demand; providers are looked up fresh each
/// decision cycle rather than cached, since `is_active` can change between cycles.
pub struct LlmClientRegistry {
    config: LlmEnvConfig,
}

impl LlmClientRegistry {
    pub fn new(config: LlmEnvConfig) -> Self {
        Self { config }
    }

    pub fn build(&self, provider: LlmProvider) -> Arc<dyn LlmChatClient> {
        Arc::new(HttpLlmClient::new(provider, &self.config))
    }
}
