use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketDataType {
    MarketSentiment,
    IndexOverview,
    HotStocks,
}

/// Unique on `(data_type, data_date)`. `data_content` is a structured map, shape depends on
/// `data_type` (sentiment fields, index rows, or hot-stock rows).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketDataSnapshot {
    pub data_type: MarketDataType,
    pub data_date: NaiveDate,
    pub data_content: serde_json::Value,
}
