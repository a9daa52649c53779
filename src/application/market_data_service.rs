use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::domain::market_data::MarketDataType;
use crate::domain::ports::{MarketSnapshotRow, QuoteSnapshotFetcher};
use crate::domain::quote::StockQuote;
use crate::domain::repositories::{MarketDataRepository, QuoteRepository};

const MAIN_INDICES: &[&str] = &["上证指数", "深证成指", "创业板指", "科创50", "沪深300", "中证500"];
const HOT_STOCKS_TOP_N: usize = 20;

pub struct RefreshSummary {
    pub hot_stocks_success: usize,
    pub hot_stocks_fail: usize,
}

/// Derives market sentiment, index overview, and hot stocks from the upstream snapshot, and
/// delegates daily-quote persistence for every snapshot row to `QuoteRepository`. Does not
/// own quote history beyond that single upsert; callers needing multi-day history query
/// `QuoteRepository` directly.
pub struct MarketDataService {
    fetcher: Arc<dyn QuoteSnapshotFetcher>,
    market_data: Arc<dyn MarketDataRepository>,
    quotes: Arc<dyn QuoteRepository>,
}

impl MarketDataService {
    pub fn new(
        fetcher: Arc<dyn QuoteSnapshotFetcher>,
        market_data: Arc<dyn MarketDataRepository>,
        quotes: Arc<dyn QuoteRepository>,
    ) -> Self {
        Self { fetcher, market_data, quotes }
    }

    /// Fetches the A-share spot snapshot exactly once and shares it across the sentiment and
    /// hot-stocks derivations, then fetches the index overview separately.
    pub async fn refresh_all(&self, today: NaiveDate) -> Result<RefreshSummary> {
        let snapshot = self.fetcher.fetch_snapshot().await.unwrap_or_else(|err| {
            warn!(error = %err, "failed to fetch a-share spot snapshot; sentiment and hot stocks will use empty data");
            Vec::new()
        });

        self.refresh_market_sentiment(&snapshot, today).await?;
        self.refresh_index_overview(today).await?;
        let (success, fail) = self.refresh_hot_stocks(&snapshot, today).await?;

        info!(success, fail, "market data refresh completed");
        Ok(RefreshSummary { hot_stocks_success: success, hot_stocks_fail: fail })
    }

    async fn refresh_market_sentiment(&self, rows: &[MarketSnapshotRow], today: NaiveDate) -> Result<()> {
        let sentiment = compute_sentiment(rows);
        self.market_data.upsert(&snapshot(MarketDataType::MarketSentiment, today, sentiment)).await
    }

    pub async fn refresh_index_overview(&self, today: NaiveDate) -> Result<()> {
        let rows = self.fetcher.fetch_index_overview().await.unwrap_or_else(|err| {
            warn!(error = %err, "failed to fetch index overview");
            Vec::new()
        });

        let indices: Vec<Value> = MAIN_INDICES
            .iter()
            .filter_map(|name| rows.iter().find(|row| &row.name == name))
            .map(|row| {
                json!({
                    "name": row.name,
                    "code": row.code,
                    "current": row.current,
                    "change": row.change,
                    "change_pct": row.change_pct,
                    "volume": row.volume,
                    "amount": row.amount,
                })
            })
            .collect();

        self.market_data
            .upsert(&snapshot(MarketDataType::IndexOverview, today, json!({ "indices": indices })))
            .await
    }

    async fn refresh_hot_stocks(&self, rows: &[MarketSnapshotRow], today: NaiveDate) -> Result<(usize, usize)> {
        let mut sorted: Vec<&MarketSnapshotRow> = rows.iter().collect();
        sorted.sort_by(|a, b| b.amount.cmp(&a.amount));
        sorted.truncate(HOT_STOCKS_TOP_N);

        let stocks: Vec<Value> = sorted
            .iter()
            .map(|row| {
                json!({
                    "code": row.stock_code,
                    "name": row.stock_name,
                    "current_price": row.current_price,
                    "change_pct": row.change_pct,
                    "volume": row.volume,
                    "amount": row.amount,
                    "turnover_rate": row.turnover_rate,
                })
            })
            .collect();

        let quotes: Vec<StockQuote> = sorted
            .iter()
            .map(|row| StockQuote {
                stock_code: row.stock_code.clone(),
                trade_date: today,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.current_price,
                prev_close: row.prev_close,
                volume: row.volume,
                amount: row.amount,
                stock_name: row.stock_name.clone(),
            })
            .collect();

        let (success, fail) = if quotes.is_empty() {
            (0, 0)
        } else {
            self.quotes.upsert_batch(&quotes).await?
        };

        self.market_data
            .upsert(&snapshot(MarketDataType::HotStocks, today, json!({ "stocks": stocks })))
            .await?;

        Ok((success, fail))
    }

    /// Assembles the three stored snapshots into one bundle for prompt rendering. A data type
    /// with no snapshot yet (first run before any refresh) renders as an empty JSON object.
    pub async fn get_market_data_for_prompt(&self) -> Result<Value> {
        let sentiment = self.market_data.get_latest(MarketDataType::MarketSentiment).await?;
        let index_overview = self.market_data.get_latest(MarketDataType::IndexOverview).await?;
        let hot_stocks = self.market_data.get_latest(MarketDataType::HotStocks).await?;

        Ok(json!({
            "market_sentiment": sentiment.map(|s| s.data_content).unwrap_or_else(|| json!({})),
            "index_overview": index_overview.map(|s| s.data_content).unwrap_or_else(|| json!({})),
            "hot_stocks": hot_stocks
                .map(|s| s.data_content.get("stocks").cloned().unwrap_or_else(|| json!([])))
                .unwrap_or_else(|| json!([])),
        }))
    }
}

fn snapshot(data_type: MarketDataType, data_date: NaiveDate, data_content: Value) -> crate::domain::market_data::MarketDataSnapshot {
    crate::domain::market_data::MarketDataSnapshot { data_type, data_date, data_content }
}

fn compute_sentiment(rows: &[MarketSnapshotRow]) -> Value {
    if rows.is_empty() {
        return json!({
            "fear_greed_index": 50,
            "market_mood": "中性",
            "trading_activity": "正常",
            "volatility": "低",
        });
    }

    let total = rows.len() as i64;
    let up_count = rows.iter().filter(|r| r.change_pct > Decimal::ZERO).count() as i64;
    let down_count = rows.iter().filter(|r| r.change_pct < Decimal::ZERO).count() as i64;
    let flat_count = total - up_count - down_count;

    let fear_greed = ((up_count * 100) as f64 / total as f64).round() as i64;
    let market_mood = if fear_greed >= 70 {
        "极度贪婪"
    } else if fear_greed >= 55 {
        "偏乐观"
    } else if fear_greed >= 45 {
        "中性"
    } else if fear_greed >= 30 {
        "偏悲观"
    } else {
        "极度恐惧"
    };

    let limit_up_count = rows.iter().filter(|r| r.change_pct >= dec!(9.9)).count() as i64;
    let limit_down_count = rows.iter().filter(|r| r.change_pct <= dec!(-9.9)).count() as i64;

    let turnover_sum: Decimal = rows.iter().map(|r| r.turnover_rate).sum();
    let avg_turnover = turnover_sum / Decimal::from(total);
    let trading_activity = if avg_turnover > dec!(5) {
        "活跃"
    } else if avg_turnover > dec!(2) {
        "正常"
    } else {
        "低迷"
    };

    json!({
        "fear_greed_index": fear_greed,
        "market_mood": market_mood,
        "trading_activity": trading_activity,
        "volatility": "低",
        "up_count": up_count,
        "down_count": down_count,
        "flat_count": flat_count,
        "total_count": total,
        "limit_up_count": limit_up_count,
        "limit_down_count": limit_down_count,
    })
}
