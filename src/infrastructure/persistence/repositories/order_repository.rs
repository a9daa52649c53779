use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::domain::errors::RejectReason;
use crate::domain::order::{Order, OrderSide, OrderStatus};
use crate::domain::repositories::OrderRepository;
use crate::infrastructure::persistence::database::Database;

pub fn side_to_str(side: OrderSide) -> &'static str {
    match side {
        OrderSide::Buy => "buy",
        OrderSide::Sell => "sell",
        OrderSide::Hold => "hold",
    }
}

pub fn side_from_str(value: &str) -> Result<OrderSide> {
    match value {
        "buy" => Ok(OrderSide::Buy),
        "sell" => Ok(OrderSide::Sell),
        "hold" => Ok(OrderSide::Hold),
        other => bail!("unrecognized order side: {other}"),
    }
}

fn status_to_str(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Pending => "pending",
        OrderStatus::Filled => "filled",
        OrderStatus::Rejected => "rejected",
    }
}

fn status_from_str(value: &str) -> Result<OrderStatus> {
    match value {
        "pending" => Ok(OrderStatus::Pending),
        "filled" => Ok(OrderStatus::Filled),
        "rejected" => Ok(OrderStatus::Rejected),
        other => bail!("unrecognized order status: {other}"),
    }
}

pub fn reject_reason_to_str(reason: RejectReason) -> &'static str {
    match reason {
        RejectReason::LotSizeZero => "LOT_SIZE_ZERO",
        RejectReason::MarketClosed => "MARKET_CLOSED",
        RejectReason::PriceOutOfBand => "PRICE_OUT_OF_BAND",
        RejectReason::T1Violation => "T1_VIOLATION",
        RejectReason::InsufficientShares => "INSUFFICIENT_SHARES",
        RejectReason::InsufficientCash => "INSUFFICIENT_CASH",
        RejectReason::FeesExceedProceeds => "FEES_EXCEED_PROCEEDS",
    }
}

fn reject_reason_from_str(value: &str) -> Result<RejectReason> {
    match value {
        "LOT_SIZE_ZERO" => Ok(RejectReason::LotSizeZero),
        "MARKET_CLOSED" => Ok(RejectReason::MarketClosed),
        "PRICE_OUT_OF_BAND" => Ok(RejectReason::PriceOutOfBand),
        "T1_VIOLATION" => Ok(RejectReason::T1Violation),
        "INSUFFICIENT_SHARES" => Ok(RejectReason::InsufficientShares),
        "INSUFFICIENT_CASH" => Ok(RejectReason::InsufficientCash),
        "FEES_EXCEED_PROCEEDS" => Ok(RejectReason::FeesExceedProceeds),
        other => bail!("unrecognized reject reason: {other}"),
    }
}

pub struct SqliteOrderRepository {
    database: Database,
}

impl SqliteOrderRepository {
    pub fn new(database: Database) -> Self {
        Self { database }
    }
}

type OrderRow = (
    String,
    String,
    Option<String>,
    String,
    Option<i64>,
    Option<String>,
    String,
    Option<String>,
    String,
    Option<i64>,
    DateTime<Utc>,
);

fn row_to_order(row: OrderRow) -> Result<Order> {
    let (
        order_id,
        agent_id,
        stock_code,
        side,
        quantity,
        price,
        status,
        reject_reason,
        reason,
        llm_request_log_id,
        created_at,
    ) = row;

    Ok(Order {
        order_id,
        agent_id,
        stock_code,
        side: side_from_str(&side)?,
        quantity: quantity.map(|q| q as u64),
        price: price.map(|p| Decimal::from_str(&p)).transpose().context("parse price")?,
        status: status_from_str(&status)?,
        reject_reason: reject_reason.map(|r| reject_reason_from_str(&r)).transpose()?,
        reason,
        llm_request_log_id,
        created_at,
    })
}

#[async_trait]
impl OrderRepository for SqliteOrderRepository {
    async fn save(&self, order: &Order) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (
                order_id, agent_id, stock_code, side, quantity, price, status,
                reject_reason, reason, llm_request_log_id, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(&order.order_id)
        .bind(&order.agent_id)
        .bind(&order.stock_code)
        .bind(side_to_str(order.side))
        .bind(order.quantity.map(|q| q as i64))
        .bind(order.price.map(|p| p.to_string()))
        .bind(status_to_str(order.status))
        .bind(order.reject_reason.map(reject_reason_to_str))
        .bind(&order.reason)
        .bind(order.llm_request_log_id)
        .bind(order.created_at)
        .execute(&self.database.pool)
        .await
        .context("failed to save order")?;

        Ok(())
    }

    async fn get(&self, order_id: &str) -> Result<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT order_id, agent_id, stock_code, side, quantity, price, status,
                   reject_reason, reason, llm_request_log_id, created_at
            FROM orders WHERE order_id = $1
            "#,
        )
        .bind(order_id)
        .fetch_optional(&self.database.pool)
        .await
        .context("failed to load order")?;

        row.map(row_to_order).transpose()
    }

    async fn list_by_agent(&self, agent_id: &str, limit: i64) -> Result<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT order_id, agent_id, stock_code, side, quantity, price, status,
                   reject_reason, reason, llm_request_log_id, created_at
            FROM orders WHERE agent_id = $1 ORDER BY created_at DESC LIMIT $2
            "#,
        )
        .bind(agent_id)
        .bind(limit)
        .fetch_all(&self.database.pool)
        .await
        .context("failed to list orders")?;

        rows.into_iter().map(row_to_order).collect()
    }

    async fn update_status(&self, order_id: &str, status: OrderStatus) -> Result<()> {
        sqlx::query("UPDATE orders SET status = $1 WHERE order_id = $2")
            .bind(status_to_str(status))
            .bind(order_id)
            .execute(&self.database.pool)
            .await
            .context("failed to update order status")?;
        Ok(())
    }

    async fn count_by_agent(&self, agent_id: &str) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders WHERE agent_id = $1")
            .bind(agent_id)
            .fetch_one(&self.database.pool)
            .await
            .context("failed to count orders")?;
        Ok(row.0)
    }
}
