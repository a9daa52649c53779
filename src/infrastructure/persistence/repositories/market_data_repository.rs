use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::market_data::{MarketDataSnapshot, MarketDataType};
use crate::domain::repositories::MarketDataRepository;
use crate::infrastructure::persistence::database::Database;

fn data_type_to_str(data_type: MarketDataType) -> &'static str {
    match data_type {
        MarketDataType::MarketSentiment => "market_sentiment",
        MarketDataType::IndexOverview => "index_overview",
        MarketDataType::HotStocks => "hot_stocks",
    }
}

fn data_type_from_str(value: &str) -> Result<MarketDataType> {
    match value {
        "market_sentiment" => Ok(MarketDataType::MarketSentiment),
        "index_overview" => Ok(MarketDataType::IndexOverview),
        "hot_stocks" => Ok(MarketDataType::HotStocks),
        other => bail!("unrecognized market data type: {other}"),
    }
}

pub struct SqliteMarketDataRepository {
    database: Database,
}

impl SqliteMarketDataRepository {
    pub fn new(database: Database) -> Self {
        Self { database }
    }
}

#[async_trait]
impl MarketDataRepository for SqliteMarketDataRepository {
    async fn upsert(&self, snapshot: &MarketDataSnapshot) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO market_data_snapshots (data_type, data_date, data_content)
            VALUES ($1, $2, $3)
            ON CONFLICT(data_type, data_date) DO UPDATE SET
                data_content = excluded.data_content
            "#,
        )
        .bind(data_type_to_str(snapshot.data_type))
        .bind(snapshot.data_date)
        .bind(snapshot.data_content.to_string())
        .execute(&self.database.pool)
        .await
        .context("failed to upsert market data snapshot")?;

        Ok(())
    }

    async fn get_latest(&self, data_type: MarketDataType) -> Result<Option<MarketDataSnapshot>> {
        let row: Option<(String, NaiveDate, String)> = sqlx::query_as(
            r#"
            SELECT data_type, data_date, data_content
            FROM market_data_snapshots WHERE data_type = $1 ORDER BY data_date DESC LIMIT 1
            "#,
        )
        .bind(data_type_to_str(data_type))
        .fetch_optional(&self.database.pool)
        .await
        .context("failed to load latest market data snapshot")?;

        row.map(|(data_type, data_date, data_content)| {
            Ok(MarketDataSnapshot {
                data_type: data_type_from_str(&data_type)?,
                data_date,
                data_content: serde_json::from_str(&data_content)
                    .context("parse market data snapshot content")?,
            })
        })
        .transpose()
    }
}
