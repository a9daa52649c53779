use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::fees::TradingFees;
use crate::domain::order::OrderSide;

/// One transaction per filled order; `hold` orders get a synthetic transaction with zero fees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub tx_id: String,
    pub order_id: String,
    pub agent_id: String,
    pub stock_code: Option<String>,
    pub side: OrderSide,
    pub quantity: Option<u64>,
    pub price: Option<Decimal>,
    pub fees: TradingFees,
    pub executed_at: DateTime<Utc>,
}

impl Transaction {
    pub fn synthetic_hold(
        order_id: impl Into<String>,
        agent_id: impl Into<String>,
        executed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            tx_id: Uuid::new_v4().to_string(),
            order_id: order_id.into(),
            agent_id: agent_id.into(),
            stock_code: None,
            side: OrderSide::Hold,
            quantity: None,
            price: None,
            fees: TradingFees::default(),
            executed_at,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn filled(
        order_id: impl Into<String>,
        agent_id: impl Into<String>,
        stock_code: String,
        side: OrderSide,
        quantity: u64,
        price: Decimal,
        fees: TradingFees,
        executed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            tx_id: Uuid::new_v4().to_string(),
            order_id: order_id.into(),
            agent_id: agent_id.into(),
            stock_code: Some(stock_code),
            side,
            quantity: Some(quantity),
            price: Some(price),
            fees,
            executed_at,
        }
    }
}
