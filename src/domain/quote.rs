use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Daily OHLCV row. Unique on `(stock_code, trade_date)`; upserts are idempotent on that key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockQuote {
    pub stock_code: String,
    pub trade_date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub prev_close: Decimal,
    pub volume: u64,
    pub amount: Decimal,
    pub stock_name: Option<String>,
}

impl StockQuote {
    pub fn change_pct(&self) -> Decimal {
        if self.prev_close.is_zero() {
            return Decimal::ZERO;
        }
        (self.close - self.prev_close) / self.prev_close * Decimal::from(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn change_pct_is_relative_to_prev_close() {
        let quote = StockQuote {
            stock_code: "600000".into(),
            trade_date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            open: dec!(10.00),
            high: dec!(10.50),
            low: dec!(9.90),
            close: dec!(11.00),
            prev_close: dec!(10.00),
            volume: 1_000_000,
            amount: dec!(10_000_000),
            stock_name: Some("浦发银行".into()),
        };
        assert_eq!(quote.change_pct(), dec!(10.00));
    }
}
