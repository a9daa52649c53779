use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::domain::fees::TradingFees;
use crate::domain::repositories::TransactionRepository;
use crate::domain::transaction::Transaction;
use crate::infrastructure::persistence::database::Database;
use crate::infrastructure::persistence::repositories::order_repository::{
    side_from_str, side_to_str,
};

pub struct SqliteTransactionRepository {
    database: Database,
}

impl SqliteTransactionRepository {
    pub fn new(database: Database) -> Self {
        Self { database }
    }
}

type TransactionRow = (
    String,
    String,
    String,
    Option<String>,
    String,
    Option<i64>,
    Option<String>,
    String,
    String,
    String,
    DateTime<Utc>,
);

fn row_to_transaction(row: TransactionRow) -> Result<Transaction> {
    let (
        tx_id,
        order_id,
        agent_id,
        stock_code,
        side,
        quantity,
        price,
        commission,
        stamp_tax,
        transfer_fee,
        executed_at,
    ) = row;

    Ok(Transaction {
        tx_id,
        order_id,
        agent_id,
        stock_code,
        side: side_from_str(&side)?,
        quantity: quantity.map(|q| q as u64),
        price: price.map(|p| Decimal::from_str(&p)).transpose().context("parse price")?,
        fees: TradingFees {
            commission: Decimal::from_str(&commission).context("parse commission")?,
            stamp_tax: Decimal::from_str(&stamp_tax).context("parse stamp_tax")?,
            transfer_fee: Decimal::from_str(&transfer_fee).context("parse transfer_fee")?,
        },
        executed_at,
    })
}

#[async_trait]
impl TransactionRepository for SqliteTransactionRepository {
    async fn save(&self, tx: &Transaction) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO transactions (
                tx_id, order_id, agent_id, stock_code, side, quantity, price,
                commission, stamp_tax, transfer_fee, executed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(&tx.tx_id)
        .bind(&tx.order_id)
        .bind(&tx.agent_id)
        .bind(&tx.stock_code)
        .bind(side_to_str(tx.side))
        .bind(tx.quantity.map(|q| q as i64))
        .bind(tx.price.map(|p| p.to_string()))
        .bind(tx.fees.commission.to_string())
        .bind(tx.fees.stamp_tax.to_string())
        .bind(tx.fees.transfer_fee.to_string())
        .bind(tx.executed_at)
        .execute(&self.database.pool)
        .await
        .context("failed to save transaction")?;

        Ok(())
    }

    async fn list_by_agent(&self, agent_id: &str, limit: i64) -> Result<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            r#"
            SELECT tx_id, order_id, agent_id, stock_code, side, quantity, price,
                   commission, stamp_tax, transfer_fee, executed_at
            FROM transactions WHERE agent_id = $1 ORDER BY executed_at DESC LIMIT $2
            "#,
        )
        .bind(agent_id)
        .bind(limit)
        .fetch_all(&self.database.pool)
        .await
        .context("failed to list transactions")?;

        rows.into_iter().map(row_to_transaction).collect()
    }

    async fn sum_fees(&self, agent_id: &str) -> Result<Decimal> {
        let rows: Vec<(String, String, String)> = sqlx::query_as(
            "SELECT commission, stamp_tax, transfer_fee FROM transactions WHERE agent_id = $1",
        )
        .bind(agent_id)
        .fetch_all(&self.database.pool)
        .await
        .context("failed to sum transaction fees")?;

        let mut total = Decimal::ZERO;
        for (commission, stamp_tax, transfer_fee) in rows {
            total += Decimal::from_str(&commission).context("parse commission")?;
            total += Decimal::from_str(&stamp_tax).context("parse stamp_tax")?;
            total += Decimal::from_str(&transfer_fee).context("parse transfer_fee")?;
        }
        Ok(total)
    }
}
