use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::repositories::TaskLogRepository;
use crate::domain::task::{AgentRunStatus, TaskLog, TaskLogStatus};
use crate::infrastructure::persistence::database::Database;

fn status_to_str(status: TaskLogStatus) -> &'static str {
    match status {
        TaskLogStatus::Running => "running",
        TaskLogStatus::Success => "success",
        TaskLogStatus::Failed => "failed",
        TaskLogStatus::Skipped => "skipped",
    }
}

#[allow(dead_code)]
fn run_status_to_str(status: AgentRunStatus) -> &'static str {
    match status {
        AgentRunStatus::Success => "success",
        AgentRunStatus::Failed => "failed",
        AgentRunStatus::Skipped => "skipped",
    }
}

#[allow(dead_code)]
fn run_status_from_str(value: &str) -> Result<AgentRunStatus> {
    match value {
        "success" => Ok(AgentRunStatus::Success),
        "failed" => Ok(AgentRunStatus::Failed),
        "skipped" => Ok(AgentRunStatus::Skipped),
        other => bail!("unrecognized agent run status: {other}"),
    }
}

pub struct SqliteTaskLogRepository {
    database: Database,
}

impl SqliteTaskLogRepository {
    pub fn new(database: Database) -> Self {
        Self { database }
    }
}

#[async_trait]
impl TaskLogRepository for SqliteTaskLogRepository {
    async fn start(&self, task_id: &str, started_at: DateTime<Utc>) -> Result<i64> {
        let row: (i64,) = sqlx::query_as(
            r#"
            INSERT INTO task_logs (task_id, started_at, status, agent_results)
            VALUES ($1, $2, $3, '[]')
            RETURNING id
            "#,
        )
        .bind(task_id)
        .bind(started_at)
        .bind(status_to_str(TaskLogStatus::Running))
        .fetch_one(&self.database.pool)
        .await
        .context("failed to start task log")?;

        Ok(row.0)
    }

    async fn complete(&self, id: i64, log: &TaskLog) -> Result<()> {
        let agent_results =
            serde_json::to_string(&log.agent_results).context("serialize agent_results")?;

        sqlx::query(
            r#"
            UPDATE task_logs
            SET completed_at = $1, status = $2, skip_reason = $3, error_message = $4, agent_results = $5
            WHERE id = $6
            "#,
        )
        .bind(log.completed_at)
        .bind(status_to_str(log.status))
        .bind(&log.skip_reason)
        .bind(&log.error_message)
        .bind(agent_results)
        .bind(id)
        .execute(&self.database.pool)
        .await
        .context("failed to complete task log")?;

        Ok(())
    }
}
