pub mod browser;
pub mod chrome;
pub mod cleaner;
pub mod pacing;
pub mod pagination;
pub mod parsers;

#[cfg(test)]
pub mod testing;

use crate::config::AppConfig;
use crate::models::{DetailExtraction, LinkBatch};
use anyhow::{Context, Result};
use scraper::Html;
use tracing::debug;

use self::browser::{BrowserResult, Page};
use self::cleaner::Denoiser;
use self::pagination::{PageMove, Paginator};
use self::parsers::{LinkCollector, SpecExtractor};

// ── Site scraper ──────────────────────────────────────────────────────────────

/// Listing and detail page readers for one retail site, bound to a live page.
pub struct SiteScraper {
    extractor: SpecExtractor,
    links: LinkCollector,
    paginator: Paginator,
}

impl SiteScraper {
    pub fn new(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            extractor: SpecExtractor::new(Denoiser::site_default())
                .context("Failed to build spec extractor")?,
            links: LinkCollector::new(&config.crawl.site_domain)
                .context("Failed to build link collector")?,
            paginator: Paginator::new(config.browser.network_idle()),
        })
    }

    /// Product links on the listing currently shown by `page`.
    pub async fn product_links<P: Page + ?Sized>(&self, page: &P, cap: Option<usize>) -> BrowserResult<LinkBatch> {
        let html = page.content().await?;
        // Html is !Send; parse and drop it without crossing an await.
        let batch = self.links.collect(&Html::parse_document(&html), cap);
        debug!("{} links via {:?}", batch.links.len(), batch.strategy);
        Ok(batch)
    }

    /// Spec table contents of the detail page currently shown by `page`.
    pub async fn detail_specs<P: Page + ?Sized>(&self, page: &P) -> BrowserResult<DetailExtraction> {
        let html = page.content().await?;
        Ok(self.extractor.extract_detail(&Html::parse_document(&html)))
    }

    pub async fn go_to_page<P: Page + ?Sized>(&self, page: &P, page_num: u32) -> BrowserResult<PageMove> {
        self.paginator.go_to_page(page, page_num).await
    }

    pub fn extractor(&self) -> &SpecExtractor {
        &self.extractor
    }

    pub fn link_collector(&self) -> &LinkCollector {
        &self.links
    }
}
