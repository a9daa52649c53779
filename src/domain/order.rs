use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::RejectReason;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
    Hold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Filled,
    Rejected,
}

/// `hold`-side orders carry no stock/quantity/price and are recorded filled, for audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub agent_id: String,
    pub stock_code: Option<String>,
    pub side: OrderSide,
    pub quantity: Option<u64>,
    pub price: Option<Decimal>,
    pub status: OrderStatus,
    pub reject_reason: Option<RejectReason>,
    pub reason: String,
    pub llm_request_log_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn synthetic_hold(
        agent_id: impl Into<String>,
        reason: impl Into<String>,
        llm_request_log_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            order_id: Uuid::new_v4().to_string(),
            agent_id: agent_id.into(),
            stock_code: None,
            side: OrderSide::Hold,
            quantity: None,
            price: None,
            status: OrderStatus::Filled,
            reject_reason: None,
            reason: reason.into(),
            llm_request_log_id,
            created_at: now,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn rejected(
        agent_id: impl Into<String>,
        side: OrderSide,
        stock_code: Option<String>,
        quantity: Option<u64>,
        price: Option<Decimal>,
        reason: impl Into<String>,
        reject_reason: RejectReason,
        llm_request_log_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            order_id: Uuid::new_v4().to_string(),
            agent_id: agent_id.into(),
            stock_code,
            side,
            quantity,
            price,
            status: OrderStatus::Rejected,
            reject_reason: Some(reject_reason),
            reason: reason.into(),
            llm_request_log_id,
            created_at: now,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn filled(
        agent_id: impl Into<String>,
        side: OrderSide,
        stock_code: String,
        quantity: u64,
        price: Decimal,
        reason: impl Into<String>,
        llm_request_log_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            order_id: Uuid::new_v4().to_string(),
            agent_id: agent_id.into(),
            stock_code: Some(stock_code),
            side,
            quantity: Some(quantity),
            price: Some(price),
            status: OrderStatus::Filled,
            reject_reason: None,
            reason: reason.into(),
            llm_request_log_id,
            created_at: now,
        }
    }
}
