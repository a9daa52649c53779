use anyhow::{Context, Result, bail};
use async_trait::async_trait;

use crate::domain::provider::{LlmProtocol, LlmProvider};
use crate::domain::repositories::ProviderRepository;
use crate::infrastructure::persistence::database::Database;

#[allow(dead_code)]
fn protocol_to_str(protocol: LlmProtocol) -> &'static str {
    match protocol {
        LlmProtocol::OpenAiCompatible => "openai_compatible",
        LlmProtocol::Anthropic => "anthropic",
    }
}

fn protocol_from_str(value: &str) -> Result<LlmProtocol> {
    match value {
        "openai_compatible" => Ok(LlmProtocol::OpenAiCompatible),
        "anthropic" => Ok(LlmProtocol::Anthropic),
        other => bail!("unrecognized llm protocol: {other}"),
    }
}

pub struct SqliteProviderRepository {
    database: Database,
}

impl SqliteProviderRepository {
    pub fn new(database: Database) -> Self {
        Self { database }
    }
}

type ProviderRow = (String, String, String, String, String, bool);

fn row_to_provider(row: ProviderRow) -> Result<LlmProvider> {
    let (provider_id, name, protocol, api_url, api_key, is_active) = row;
    Ok(LlmProvider {
        provider_id,
        name,
        protocol: protocol_from_str(&protocol)?,
        api_url,
        api_key,
        is_active,
    })
}

#[async_trait]
impl ProviderRepository for SqliteProviderRepository {
    async fn get(&self, provider_id: &str) -> Result<Option<LlmProvider>> {
        let row = sqlx::query_as::<_, ProviderRow>(
            r#"
            SELECT provider_id, name, protocol, api_url, api_key, is_active
            FROM llm_providers WHERE provider_id = $1
            "#,
        )
        .bind(provider_id)
        .fetch_optional(&self.database.pool)
        .await
        .context("failed to load llm provider")?;

        row.map(row_to_provider).transpose()
    }

    async fn list_active(&self) -> Result<Vec<LlmProvider>> {
        let rows = sqlx::query_as::<_, ProviderRow>(
            r#"
            SELECT provider_id, name, protocol, api_url, api_key, is_active
            FROM llm_providers WHERE is_active = 1
            "#,
        )
        .fetch_all(&self.database.pool)
        .await
        .context("failed to list active llm providers")?;

        rows.into_iter().map(row_to_provider).collect()
    }
}
