use anyhow::{Context, Result, bail};
use async_trait::async_trait;

use crate::domain::repositories::TaskRepository;
use crate::domain::task::{SystemTask, TaskStatus, TaskType};
use crate::infrastructure::persistence::database::Database;

#[allow(dead_code)]
fn task_type_to_str(task_type: TaskType) -> &'static str {
    match task_type {
        TaskType::AgentDecision => "agent_decision",
        TaskType::QuoteSync => "quote_sync",
        TaskType::MarketRefresh => "market_refresh",
    }
}

fn task_type_from_str(value: &str) -> Result<TaskType> {
    match value {
        "agent_decision" => Ok(TaskType::AgentDecision),
        "quote_sync" => Ok(TaskType::QuoteSync),
        "market_refresh" => Ok(TaskType::MarketRefresh),
        other => bail!("unrecognized task type: {other}"),
    }
}

fn status_to_str(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Active => "active",
        TaskStatus::Paused => "paused",
    }
}

fn status_from_str(value: &str) -> Result<TaskStatus> {
    match value {
        "active" => Ok(TaskStatus::Active),
        "paused" => Ok(TaskStatus::Paused),
        other => bail!("unrecognized task status: {other}"),
    }
}

pub struct SqliteTaskRepository {
    database: Database,
}

impl SqliteTaskRepository {
    pub fn new(database: Database) -> Self {
        Self { database }
    }
}

type TaskRow = (String, String, String, String, String, String, String, bool);

fn row_to_task(row: TaskRow) -> Result<SystemTask> {
    let (task_id, name, task_type, agent_ids, config, schedule, status, trading_day_only) = row;
    Ok(SystemTask {
        task_id,
        name,
        task_type: task_type_from_str(&task_type)?,
        agent_ids: serde_json::from_str(&agent_ids).context("parse agent_ids")?,
        config: serde_json::from_str(&config).context("parse task config")?,
        schedule,
        status: status_from_str(&status)?,
        trading_day_only,
    })
}

#[async_trait]
impl TaskRepository for SqliteTaskRepository {
    async fn get(&self, task_id: &str) -> Result<Option<SystemTask>> {
        let row = sqlx::query_as::<_, TaskRow>(
            r#"
            SELECT task_id, name, task_type, agent_ids, config, schedule, status, trading_day_only
            FROM system_tasks WHERE task_id = $1
            "#,
        )
        .bind(task_id)
        .fetch_optional(&self.database.pool)
        .await
        .context("failed to load task")?;

        row.map(row_to_task).transpose()
    }

    async fn list_active(&self) -> Result<Vec<SystemTask>> {
        let rows = sqlx::query_as::<_, TaskRow>(
            r#"
            SELECT task_id, name, task_type, agent_ids, config, schedule, status, trading_day_only
            FROM system_tasks WHERE status = $1
            "#,
        )
        .bind(status_to_str(TaskStatus::Active))
        .fetch_all(&self.database.pool)
        .await
        .context("failed to list active tasks")?;

        rows.into_iter().map(row_to_task).collect()
    }
}
