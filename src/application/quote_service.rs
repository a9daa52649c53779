use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use tracing::{info, warn};

use crate::domain::ports::QuoteSnapshotFetcher;
use crate::domain::quote::StockQuote;
use crate::domain::repositories::QuoteRepository;

/// Owns daily-quote persistence. `MarketDataService` delegates its snapshot-row-to-quote
/// upserts here rather than writing `QuoteRepository` directly, matching the upstream
/// system's separation between market-wide derivations and quote storage.
pub struct QuoteService {
    fetcher: Arc<dyn QuoteSnapshotFetcher>,
    quotes: Arc<dyn QuoteRepository>,
}

impl QuoteService {
    pub fn new(fetcher: Arc<dyn QuoteSnapshotFetcher>, quotes: Arc<dyn QuoteRepository>) -> Self {
        Self { fetcher, quotes }
    }

    /// Full resync: pulls the entire upstream spot snapshot and upserts every row as today's
    /// quote. `force_full` is accepted for interface parity with the scheduled task contract;
    /// there is no incremental snapshot mode, so both paths fetch and upsert everything.
    pub async fn sync_quotes(&self, today: NaiveDate, _force_full: bool) -> Result<(usize, usize)> {
        let snapshot = self.fetcher.fetch_snapshot().await?;
        let quotes: Vec<StockQuote> = snapshot
            .into_iter()
            .map(|row| StockQuote {
                stock_code: row.stock_code,
                trade_date: today,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.current_price,
                prev_close: row.prev_close,
                volume: row.volume,
                amount: row.amount,
                stock_name: row.stock_name,
            })
            .collect();

        self.upsert_quotes(&quotes).await
    }

    /// Syncs only the named stocks, filtering the full snapshot rather than issuing a
    /// narrower upstream call (the snapshot fetcher contract has no per-symbol query).
    /// `days` is accepted for interface parity; only the latest trading day is ever synced
    /// from a spot snapshot, so history backfill is out of scope here.
    pub async fn sync_specific_stocks(&self, codes: &[String], today: NaiveDate, _days: i64) -> Result<(usize, usize)> {
        let snapshot = self.fetcher.fetch_snapshot().await?;
        let quotes: Vec<StockQuote> = snapshot
            .into_iter()
            .filter(|row| codes.contains(&row.stock_code))
            .map(|row| StockQuote {
                stock_code: row.stock_code,
                trade_date: today,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.current_price,
                prev_close: row.prev_close,
                volume: row.volume,
                amount: row.amount,
                stock_name: row.stock_name,
            })
            .collect();

        self.upsert_quotes(&quotes).await
    }

    pub async fn upsert_quotes(&self, quotes: &[StockQuote]) -> Result<(usize, usize)> {
        if quotes.is_empty() {
            return Ok((0, 0));
        }
        let (success, fail) = self.quotes.upsert_batch(quotes).await?;
        if fail > 0 {
            warn!(success, fail, "some quote rows failed to upsert");
        } else {
            info!(success, "quote sync completed");
        }
        Ok((success, fail))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{IndexSnapshotRow, MarketSnapshotRow};
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::sync::Mutex;

    struct StubFetcher {
        rows: Vec<MarketSnapshotRow>,
    }

    #[async_trait]
    impl QuoteSnapshotFetcher for StubFetcher {
        async fn fetch_snapshot(&self) -> Result<Vec<MarketSnapshotRow>> {
            Ok(self.rows.clone())
        }
        async fn fetch_index_overview(&self) -> Result<Vec<IndexSnapshotRow>> {
            Ok(Vec::new())
        }
    }

    struct RecordingQuoteRepo {
        seen: Mutex<Vec<StockQuote>>,
    }

    #[async_trait]
    impl QuoteRepository for RecordingQuoteRepo {
        async fn upsert(&self, quote: &StockQuote) -> Result<()> {
            self.seen.lock().unwrap().push(quote.clone());
            Ok(())
        }
        async fn upsert_batch(&self, quotes: &[StockQuote]) -> Result<(usize, usize)> {
            self.seen.lock().unwrap().extend(quotes.iter().cloned());
            Ok((quotes.len(), 0))
        }
        async fn get_latest(&self, _stock_code: &str) -> Result<Option<StockQuote>> {
            Ok(None)
        }
        async fn get_latest_n(&self, _stock_code: &str, _n: i64) -> Result<Vec<StockQuote>> {
            Ok(Vec::new())
        }
        async fn get_range(&self, _stock_code: &str, _from: NaiveDate, _to: NaiveDate) -> Result<Vec<StockQuote>> {
            Ok(Vec::new())
        }
    }

    fn row(code: &str) -> MarketSnapshotRow {
        MarketSnapshotRow {
            stock_code: code.to_string(),
            stock_name: Some(code.to_string()),
            open: dec!(10),
            high: dec!(11),
            low: dec!(9),
            current_price: dec!(10.5),
            prev_close: dec!(10),
            change_pct: dec!(5),
            volume: 1000,
            amount: dec!(10_000),
            turnover_rate: dec!(1),
        }
    }

    #[tokio::test]
    async fn sync_quotes_upserts_every_snapshot_row() {
        let fetcher = Arc::new(StubFetcher { rows: vec![row("600519"), row("000001")] });
        let quotes = Arc::new(RecordingQuoteRepo { seen: Mutex::new(Vec::new()) });
        let service = QuoteService::new(fetcher, quotes.clone());

        let (success, fail) = service
            .sync_quotes(NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(), true)
            .await
            .unwrap();

        assert_eq!(success, 2);
        assert_eq!(fail, 0);
        assert_eq!(quotes.seen.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn sync_specific_stocks_filters_to_the_requested_codes() {
        let fetcher = Arc::new(StubFetcher { rows: vec![row("600519"), row("000001")] });
        let quotes = Arc::new(RecordingQuoteRepo { seen: Mutex::new(Vec::new()) });
        let service = QuoteService::new(fetcher, quotes.clone());

        let (success, _) = service
            .sync_specific_stocks(
                &["600519".to_string()],
                NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
                30,
            )
            .await
            .unwrap();

        assert_eq!(success, 1);
        let seen = quotes.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].stock_code, "600519");
    }
}
