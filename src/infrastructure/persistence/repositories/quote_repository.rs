use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::warn;

use crate::domain::quote::StockQuote;
use crate::domain::repositories::QuoteRepository;
use crate::infrastructure::persistence::database::Database;

pub struct SqliteQuoteRepository {
    database: Database,
}

impl SqliteQuoteRepository {
    pub fn new(database: Database) -> Self {
        Self { database }
    }
}

type QuoteRow = (
    String,
    NaiveDate,
    String,
    String,
    String,
    String,
    String,
    i64,
    String,
    Option<String>,
);

fn row_to_quote(row: QuoteRow) -> Result<StockQuote> {
    let (stock_code, trade_date, open, high, low, close, prev_close, volume, amount, stock_name) =
        row;
    Ok(StockQuote {
        stock_code,
        trade_date,
        open: Decimal::from_str(&open).context("parse open")?,
        high: Decimal::from_str(&high).context("parse high")?,
        low: Decimal::from_str(&low).context("parse low")?,
        close: Decimal::from_str(&close).context("parse close")?,
        prev_close: Decimal::from_str(&prev_close).context("parse prev_close")?,
        volume: volume as u64,
        amount: Decimal::from_str(&amount).context("parse amount")?,
        stock_name,
    })
}

#[async_trait]
impl QuoteRepository for SqliteQuoteRepository {
    async fn upsert(&self, quote: &StockQuote) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO stock_quotes (
                stock_code, trade_date, open, high, low, close, prev_close,
                volume, amount, stock_name
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT(stock_code, trade_date) DO UPDATE SET
                open = excluded.open,
                high = excluded.high,
                low = excluded.low,
                close = excluded.close,
                prev_close = excluded.prev_close,
                volume = excluded.volume,
                amount = excluded.amount,
                stock_name = excluded.stock_name
            "#,
        )
        .bind(&quote.stock_code)
        .bind(quote.trade_date)
        .bind(quote.open.to_string())
        .bind(quote.high.to_string())
        .bind(quote.low.to_string())
        .bind(quote.close.to_string())
        .bind(quote.prev_close.to_string())
        .bind(quote.volume as i64)
        .bind(quote.amount.to_string())
        .bind(&quote.stock_name)
        .execute(&self.database.pool)
        .await
        .context("failed to upsert quote")?;

        Ok(())
    }

    async fn upsert_batch(&self, quotes: &[StockQuote]) -> Result<(usize, usize)> {
        let mut success = 0;
        let mut fail = 0;
        for quote in quotes {
            match self.upsert(quote).await {
                Ok(()) => success += 1,
                Err(err) => {
                    warn!(stock_code = %quote.stock_code, error = %err, "skipping malformed quote row");
                    fail += 1;
                }
            }
        }
        Ok((success, fail))
    }

    async fn get_latest(&self, stock_code: &str) -> Result<Option<StockQuote>> {
        let row = sqlx::query_as::<_, QuoteRow>(
            r#"
            SELECT stock_code, trade_date, open, high, low, close, prev_close,
                   volume, amount, stock_name
            FROM stock_quotes WHERE stock_code = $1 ORDER BY trade_date DESC LIMIT 1
            "#,
        )
        .bind(stock_code)
        .fetch_optional(&self.database.pool)
        .await
        .context("failed to load latest quote")?;

        row.map(row_to_quote).transpose()
    }

    async fn get_latest_n(&self, stock_code: &str, n: i64) -> Result<Vec<StockQuote>> {
        let rows = sqlx::query_as::<_, QuoteRow>(
            r#"
            SELECT stock_code, trade_date, open, high, low, close, prev_close,
                   volume, amount, stock_name
            FROM stock_quotes WHERE stock_code = $1 ORDER BY trade_date DESC LIMIT $2
            "#,
        )
        .bind(stock_code)
        .bind(n)
        .fetch_all(&self.database.pool)
        .await
        .context("failed to load latest quotes")?;

        rows.into_iter().map(row_to_quote).collect()
    }

    async fn get_range(
        &self,
        stock_code: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<StockQuote>> {
        let rows = sqlx::query_as::<_, QuoteRow>(
            r#"
            SELECT stock_code, trade_date, open, high, low, close, prev_close,
                   volume, amount, stock_name
            FROM stock_quotes
            WHERE stock_code = $1 AND trade_date BETWEEN $2 AND $3
            ORDER BY trade_date ASC
            "#,
        )
        .bind(stock_code)
        .bind(from)
        .bind(to)
        .fetch_all(&self.database.pool)
        .await
        .context("failed to load quote range")?;

        rows.into_iter().map(row_to_quote).collect()
    }
}
