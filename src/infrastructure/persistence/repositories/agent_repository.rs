use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::domain::agent::{Agent, AgentStatus};
use crate::domain::repositories::AgentRepository;
use crate::infrastructure::persistence::database::Database;

fn status_to_str(status: AgentStatus) -> &'static str {
    match status {
        AgentStatus::Active => "active",
        AgentStatus::Paused => "paused",
        AgentStatus::Deleted => "deleted",
    }
}

fn status_from_str(value: &str) -> Result<AgentStatus> {
    match value {
        "active" => Ok(AgentStatus::Active),
        "paused" => Ok(AgentStatus::Paused),
        "deleted" => Ok(AgentStatus::Deleted),
        other => bail!("unrecognized agent status: {other}"),
    }
}

pub struct SqliteAgentRepository {
    database: Database,
}

impl SqliteAgentRepository {
    pub fn new(database: Database) -> Self {
        Self { database }
    }
}

type AgentRow = (
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    chrono::DateTime<chrono::Utc>,
);

fn row_to_agent(row: AgentRow) -> Result<Agent> {
    let (id, name, initial_cash, current_cash, template_id, provider_id, model_name, status, schedule_type, created_at) =
        row;
    Ok(Agent {
        id,
        name,
        initial_cash: Decimal::from_str(&initial_cash).context("parse initial_cash")?,
        current_cash: Decimal::from_str(&current_cash).context("parse current_cash")?,
        template_id,
        provider_id,
        model_name,
        status: status_from_str(&status)?,
        schedule_type,
        created_at,
    })
}

#[async_trait]
impl AgentRepository for SqliteAgentRepository {
    async fn get(&self, agent_id: &str) -> Result<Option<Agent>> {
        let row = sqlx::query_as::<_, AgentRow>(
            r#"
            SELECT id, name, initial_cash, current_cash, template_id, provider_id,
                   model_name, status, schedule_type, created_at
            FROM agents WHERE id = $1
            "#,
        )
        .bind(agent_id)
        .fetch_optional(&self.database.pool)
        .await
        .context("failed to load agent")?;

        row.map(row_to_agent).transpose()
    }

    async fn list(&self, status: Option<AgentStatus>) -> Result<Vec<Agent>> {
        let rows = match status {
            Some(status) => {
                sqlx::query_as::<_, AgentRow>(
                    r#"
                    SELECT id, name, initial_cash, current_cash, template_id, provider_id,
                           model_name, status, schedule_type, created_at
                    FROM agents WHERE status = $1 ORDER BY created_at
                    "#,
                )
                .bind(status_to_str(status))
                .fetch_all(&self.database.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, AgentRow>(
                    r#"
                    SELECT id, name, initial_cash, current_cash, template_id, provider_id,
                           model_name, status, schedule_type, created_at
                    FROM agents WHERE status != 'deleted' ORDER BY created_at
                    "#,
                )
                .fetch_all(&self.database.pool)
                .await
            }
        }
        .context("failed to list agents")?;

        rows.into_iter().map(row_to_agent).collect()
    }

    async fn save(&self, agent: &Agent) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO agents (
                id, name, initial_cash, current_cash, template_id, provider_id,
                model_name, status, schedule_type, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                current_cash = excluded.current_cash,
                template_id = excluded.template_id,
                provider_id = excluded.provider_id,
                model_name = excluded.model_name,
                status = excluded.status,
                schedule_type = excluded.schedule_type
            "#,
        )
        .bind(&agent.id)
        .bind(&agent.name)
        .bind(agent.initial_cash.to_string())
        .bind(agent.current_cash.to_string())
        .bind(&agent.template_id)
        .bind(&agent.provider_id)
        .bind(&agent.model_name)
        .bind(status_to_str(agent.status))
        .bind(&agent.schedule_type)
        .bind(agent.created_at)
        .execute(&self.database.pool)
        .await
        .context("failed to save agent")?;

        Ok(())
    }

    async fn update_status(&self, agent_id: &str, status: AgentStatus) -> Result<()> {
        sqlx::query("UPDATE agents SET status = $1 WHERE id = $2")
            .bind(status_to_str(status))
            .bind(agent_id)
            .execute(&self.database.pool)
            .await
            .context("failed to update agent status")?;
        Ok(())
    }

    async fn update_cash(&self, agent_id: &str, new_cash: Decimal) -> Result<()> {
        sqlx::query("UPDATE agents SET current_cash = $1 WHERE id = $2")
            .bind(new_cash.to_string())
            .bind(agent_id)
            .execute(&self.database.pool)
            .await
            .context("failed to update agent cash")?;
        Ok(())
    }
}
