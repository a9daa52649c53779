use anyhow::Result;
use async_trait::async_trait;
use tracing::warn;

use crate::domain::ports::{IndexSnapshotRow, MarketSnapshotRow, QuoteSnapshotFetcher};

/// Stand-in `QuoteSnapshotFetcher` for deployments that haven't wired a real upstream spot
/// provider yet. The upstream A-share scraping library has no stable public wire contract to
/// ground an HTTP reimplementation on, so this crate depends on the trait rather than shipping
/// a concrete scraper; operators supply their own `QuoteSnapshotFetcher` at bootstrap. This
/// implementation returns empty snapshots so the market-refresh and quote-sync tasks degrade
/// gracefully instead of panicking when no real fetcher is configured.
pub struct UnconfiguredQuoteSnapshotFetcher;

#[async_trait]
impl QuoteSnapshotFetcher for UnconfiguredQuoteSnapshotFetcher {
    async fn fetch_snapshot(&self) -> Result<Vec<MarketSnapshotRow>> {
        warn!("no upstream quote snapshot fetcher configured; returning an empty snapshot");
        Ok(Vec::new())
    }

    async fn fetch_index_overview(&self) -> Result<Vec<IndexSnapshotRow>> {
        warn!("no upstream index snapshot fetcher configured; returning an empty snapshot");
        Ok(Vec::new())
    }
}
