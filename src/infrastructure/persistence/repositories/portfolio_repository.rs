use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::domain::portfolio::Portfolio;
use crate::domain::repositories::PositionRepository;
use crate::domain::repositories::PortfolioRepository;
use crate::infrastructure::persistence::database::Database;
use crate::infrastructure::persistence::repositories::position_repository::SqlitePositionRepository;

/// Rebuilds the `Portfolio` value object from the `agents` and `positions` tables — never a
/// persistent mutable graph.
pub struct SqlitePortfolioRepository {
    database: Database,
    positions: SqlitePositionRepository,
}

impl SqlitePortfolioRepository {
    pub fn new(database: Database) -> Self {
        Self {
            positions: SqlitePositionRepository::new(database.clone()),
            database,
        }
    }
}

#[async_trait]
impl PortfolioRepository for SqlitePortfolioRepository {
    async fn get(&self, agent_id: &str) -> Result<Portfolio> {
        let cash_row: Option<(String,)> =
            sqlx::query_as("SELECT current_cash FROM agents WHERE id = $1")
                .bind(agent_id)
                .fetch_optional(&self.database.pool)
                .await
                .context("failed to load agent cash")?;

        let Some((cash_str,)) = cash_row else {
            bail!("agent not found: {agent_id}");
        };
        let cash = Decimal::from_str(&cash_str).context("parse cash")?;

        let mut portfolio = Portfolio::new(agent_id, cash);
        for position in self.positions.list_by_agent(agent_id).await? {
            portfolio
                .positions
                .insert(position.stock_code.clone(), position);
        }

        Ok(portfolio)
    }
}
