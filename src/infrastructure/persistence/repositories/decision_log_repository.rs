use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::decision_log::{DecisionLog, DecisionLogStatus};
use crate::domain::repositories::DecisionLogRepository;
use crate::infrastructure::persistence::database::Database;

fn status_to_str(status: DecisionLogStatus) -> &'static str {
    match status {
        DecisionLogStatus::Success => "success",
        DecisionLogStatus::NoTrade => "no_trade",
        DecisionLogStatus::ApiError => "api_error",
    }
}

fn status_from_str(value: &str) -> Result<DecisionLogStatus> {
    match value {
        "success" => Ok(DecisionLogStatus::Success),
        "no_trade" => Ok(DecisionLogStatus::NoTrade),
        "api_error" => Ok(DecisionLogStatus::ApiError),
        other => bail!("unrecognized decision log status: {other}"),
    }
}

pub struct SqliteDecisionLogRepository {
    database: Database,
}

impl SqliteDecisionLogRepository {
    pub fn new(database: Database) -> Self {
        Self { database }
    }
}

type DecisionLogRow = (i64, String, String, Option<String>, Option<String>, DateTime<Utc>);

fn row_to_decision_log(row: DecisionLogRow) -> Result<DecisionLog> {
    let (id, agent_id, status, parsed_decision, error_message, created_at) = row;
    Ok(DecisionLog {
        id,
        agent_id,
        status: status_from_str(&status)?,
        parsed_decision: parsed_decision
            .map(|raw| serde_json::from_str(&raw))
            .transpose()
            .context("parse parsed_decision")?,
        error_message,
        created_at,
    })
}

#[async_trait]
impl DecisionLogRepository for SqliteDecisionLogRepository {
    async fn append(&self, log: &DecisionLog) -> Result<i64> {
        let row: (i64,) = sqlx::query_as(
            r#"
            INSERT INTO decision_logs (agent_id, status, parsed_decision, error_message, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&log.agent_id)
        .bind(status_to_str(log.status))
        .bind(log.parsed_decision.as_ref().map(|v| v.to_string()))
        .bind(&log.error_message)
        .bind(log.created_at)
        .fetch_one(&self.database.pool)
        .await
        .context("failed to append decision log")?;

        Ok(row.0)
    }

    async fn list_by_agent(
        &self,
        agent_id: &str,
        status: Option<DecisionLogStatus>,
        limit: i64,
    ) -> Result<Vec<DecisionLog>> {
        let rows = match status {
            Some(status) => {
                sqlx::query_as::<_, DecisionLogRow>(
                    r#"
                    SELECT id, agent_id, status, parsed_decision, error_message, created_at
                    FROM decision_logs WHERE agent_id = $1 AND status = $2
                    ORDER BY created_at DESC LIMIT $3
                    "#,
                )
                .bind(agent_id)
                .bind(status_to_str(status))
                .bind(limit)
                .fetch_all(&self.database.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, DecisionLogRow>(
                    r#"
                    SELECT id, agent_id, status, parsed_decision, error_message, created_at
                    FROM decision_logs WHERE agent_id = $1
                    ORDER BY created_at DESC LIMIT $2
                    "#,
                )
                .bind(agent_id)
                .bind(limit)
                .fetch_all(&self.database.pool)
                .await
            }
        }
        .context("failed to list decision logs")?;

        rows.into_iter().map(row_to_decision_log).collect()
    }
}
