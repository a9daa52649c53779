use anyhow::{Context, Result, bail};
use async_trait::async_trait;

use crate::domain::llm_log::{LlmRequestLog, LlmRequestStatus};
use crate::domain::repositories::LlmLogRepository;
use crate::infrastructure::persistence::database::Database;

fn status_to_str(status: LlmRequestStatus) -> &'static str {
    match status {
        LlmRequestStatus::Success => "success",
        LlmRequestStatus::Error => "error",
    }
}

#[allow(dead_code)]
fn status_from_str(value: &str) -> Result<LlmRequestStatus> {
    match value {
        "success" => Ok(LlmRequestStatus::Success),
        "error" => Ok(LlmRequestStatus::Error),
        other => bail!("unrecognized llm request status: {other}"),
    }
}

pub struct SqliteLlmLogRepository {
    database: Database,
}

impl SqliteLlmLogRepository {
    pub fn new(database: Database) -> Self {
        Self { database }
    }
}

#[async_trait]
impl LlmLogRepository for SqliteLlmLogRepository {
    async fn append(&self, log: &LlmRequestLog) -> Result<i64> {
        let row: (i64,) = sqlx::query_as(
            r#"
            INSERT INTO llm_request_logs (
                provider_id, model_name, agent_id, request_content, response_content,
                duration_ms, status, error_message, tokens_in, tokens_out, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id
            "#,
        )
        .bind(&log.provider_id)
        .bind(&log.model_name)
        .bind(&log.agent_id)
        .bind(&log.request_content)
        .bind(&log.response_content)
        .bind(log.duration_ms)
        .bind(status_to_str(log.status))
        .bind(&log.error_message)
        .bind(log.tokens_in)
        .bind(log.tokens_out)
        .bind(log.created_at)
        .fetch_one(&self.database.pool)
        .await
        .context("failed to append llm request log")?;

        Ok(row.0)
    }
}
