use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::domain::portfolio::Position;
use crate::domain::repositories::PositionRepository;
use crate::infrastructure::persistence::database::Database;

pub struct SqlitePositionRepository {
    database: Database,
}

impl SqlitePositionRepository {
    pub fn new(database: Database) -> Self {
        Self { database }
    }
}

type PositionRow = (String, String, i64, String, NaiveDate);

fn row_to_position(row: PositionRow) -> Result<Position> {
    let (agent_id, stock_code, shares, avg_cost, buy_date) = row;
    Ok(Position {
        agent_id,
        stock_code,
        shares: shares as u64,
        avg_cost: Decimal::from_str(&avg_cost).context("parse avg_cost")?,
        buy_date,
    })
}

#[async_trait]
impl PositionRepository for SqlitePositionRepository {
    async fn upsert(&self, position: &Position) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO positions (agent_id, stock_code, shares, avg_cost, buy_date)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT(agent_id, stock_code) DO UPDATE SET
                shares = excluded.shares,
                avg_cost = excluded.avg_cost,
                buy_date = excluded.buy_date
            "#,
        )
        .bind(&position.agent_id)
        .bind(&position.stock_code)
        .bind(position.shares as i64)
        .bind(position.avg_cost.to_string())
        .bind(position.buy_date)
        .execute(&self.database.pool)
        .await
        .context("failed to upsert position")?;

        Ok(())
    }

    async fn delete(&self, agent_id: &str, stock_code: &str) -> Result<()> {
        sqlx::query("DELETE FROM positions WHERE agent_id = $1 AND stock_code = $2")
            .bind(agent_id)
            .bind(stock_code)
            .execute(&self.database.pool)
            .await
            .context("failed to delete position")?;
        Ok(())
    }

    async fn list_by_agent(&self, agent_id: &str) -> Result<Vec<Position>> {
        let rows = sqlx::query_as::<_, PositionRow>(
            "SELECT agent_id, stock_code, shares, avg_cost, buy_date FROM positions WHERE agent_id = $1",
        )
        .bind(agent_id)
        .fetch_all(&self.database.pool)
        .await
        .context("failed to list positions")?;

        rows.into_iter().map(row_to_position).collect()
    }

    async fn get(&self, agent_id: &str, stock_code: &str) -> Result<Option<Position>> {
        let row = sqlx::query_as::<_, PositionRow>(
            "SELECT agent_id, stock_code, shares, avg_cost, buy_date FROM positions WHERE agent_id = $1 AND stock_code = $2",
        )
        .bind(agent_id)
        .bind(stock_code)
        .fetch_optional(&self.database.pool)
        .await
        .context("failed to load position")?;

        row.map(row_to_position).transpose()
    }
}
