//! Crawl orchestrator: listing pages → product links → detail specs.
//!
//! ## Loop
//!
//! One listing page stays open for the whole run. For every listing page:
//!   1. Collect product links (first matching selector strategy).
//!   2. Open each link in its own short-lived page, mine the spec tables and
//!      record every label that holds a checkmark glyph.
//!   3. Move the listing to the next page number.
//!
//! The loop ends when the page limit is reached, a page has no links, the item
//! budget is spent, or the next page cannot be reached. None of these is an
//! error: the report always carries whatever was collected. Only failing to
//! open the listing in the first place is returned as `Err`.

use crate::config::AppConfig;
use crate::models::{CheckmarkKeySet, Completion, CrawlReport, DetailExtraction};
use crate::scraper::browser::{Browser, BrowserResult, Page};
use crate::scraper::cleaner::is_checkmark;
use crate::scraper::pacing::PacingPolicy;
use crate::scraper::pagination::PageMove;
use crate::scraper::SiteScraper;
use crate::utils::truncate_chars;
use anyhow::{Context, Result};
use tracing::{debug, info, warn};
use url::Url;

/// Result of visiting one product link.
#[derive(Debug)]
pub enum ItemOutcome {
    Scanned { new_keys: usize },
    Skipped(anyhow::Error),
}

pub struct Pipeline {
    config: AppConfig,
    scraper: SiteScraper,
    pacing: PacingPolicy,
}

impl Pipeline {
    pub fn new(config: AppConfig, pacing: PacingPolicy) -> Result<Self> {
        let scraper = SiteScraper::new(&config).context("Failed to build scraper")?;
        Ok(Self {
            config,
            scraper,
            pacing,
        })
    }

    /// Crawl `category_url` and close `browser` afterwards, whatever happened.
    pub async fn run<B: Browser>(&self, browser: &B, category_url: &str) -> Result<CrawlReport> {
        let result = self.crawl(browser, category_url).await;
        if let Err(e) = browser.close().await {
            warn!("Failed to close browser: {}", e);
        }
        result
    }

    async fn crawl<B: Browser>(&self, browser: &B, category_url: &str) -> Result<CrawlReport> {
        let base = Url::parse(category_url)
            .with_context(|| format!("Invalid category URL {category_url}"))?;
        let crawl = &self.config.crawl;
        let max_pages = crawl.max_pages;
        let budget = crawl.total_budget();

        let listing = browser.open_page().await.context("Failed to open listing page")?;
        listing
            .goto(category_url, self.config.browser.navigation_timeout())
            .await
            .with_context(|| format!("Failed to load category page {category_url}"))?;
        listing.wait_for_idle(self.config.browser.network_idle()).await;
        self.pacing.settle(&listing).await;

        let mut report = CrawlReport {
            checkmark_keys: CheckmarkKeySet::new(),
            items_scanned: 0,
            items_skipped: 0,
            pages_visited: 0,
            completion: Completion::PagesDone,
        };
        let budget_spent = |report: &CrawlReport| budget.is_some_and(|n| report.items_scanned >= n);

        for page_index in 0..max_pages {
            info!("Scanning page {}/{}", page_index + 1, max_pages);
            report.pages_visited += 1;

            let batch = match self.scraper.product_links(&listing, crawl.item_cap()).await {
                Ok(batch) => batch,
                Err(e) => {
                    warn!("  Error reading page {}: {}", page_index + 1, e);
                    report.completion = Completion::Failed { reason: e.to_string() };
                    break;
                }
            };
            info!("  {} links found", batch.links.len());
            if batch.links.is_empty() {
                report.completion = Completion::Exhausted;
                break;
            }

            for link in &batch.links {
                if budget_spent(&report) {
                    break;
                }
                match self.scan_item(browser, &base, link, &mut report.checkmark_keys).await {
                    ItemOutcome::Scanned { new_keys } => {
                        report.items_scanned += 1;
                        debug!("  {} (+{} checkmark keys)", link, new_keys);
                    }
                    ItemOutcome::Skipped(e) => {
                        report.items_skipped += 1;
                        warn!("  Warning: {} scan failed - {:#}", truncate_chars(link, 50), e);
                    }
                }
            }

            if budget_spent(&report) {
                report.completion = Completion::BudgetReached;
                break;
            }

            if page_index + 1 < max_pages {
                let next_page = page_index + 2;
                match self.scraper.go_to_page(&listing, next_page).await {
                    Ok(PageMove::Moved(strategy)) => {
                        debug!("Moved to page {} via {}", next_page, strategy);
                        self.pacing.settle(&listing).await;
                    }
                    Ok(PageMove::Unreachable) => {
                        report.completion = Completion::Unreachable { page: next_page };
                        break;
                    }
                    Err(e) => {
                        warn!("  Error during pagination: {}", e);
                        report.completion = Completion::Failed { reason: e.to_string() };
                        break;
                    }
                }
            }
        }

        if let Err(e) = listing.close().await {
            debug!("Listing page close failed: {}", e);
        }

        info!(
            "[done] {} items scanned, {} checkmark keys found ({:?})",
            report.items_scanned,
            report.checkmark_keys.len(),
            report.completion
        );
        Ok(report)
    }

    /// Visit one product link and fold its checkmark labels into `keys`.
    pub async fn scan_item<B: Browser>(
        &self,
        browser: &B,
        base: &Url,
        link: &str,
        keys: &mut CheckmarkKeySet,
    ) -> ItemOutcome {
        match self.extract_item(browser, base, link).await {
            Ok(detail) => {
                let new_keys = detail
                    .checkmark_labels(is_checkmark)
                    .into_iter()
                    .filter(|label| keys.insert(label))
                    .count();
                ItemOutcome::Scanned { new_keys }
            }
            Err(e) => ItemOutcome::Skipped(e),
        }
    }

    async fn extract_item<B: Browser>(&self, browser: &B, base: &Url, link: &str) -> Result<DetailExtraction> {
        let url = base.join(link).with_context(|| format!("Bad product link {link}"))?;
        let page = browser.open_page().await.context("Failed to open detail page")?;

        let result = self.visit_detail(&page, url.as_str()).await;
        if let Err(e) = page.close().await {
            debug!("Detail page close failed: {}", e);
        }
        Ok(result?)
    }

    async fn visit_detail<P: Page>(&self, page: &P, url: &str) -> BrowserResult<DetailExtraction> {
        page.goto(url, self.config.browser.detail_timeout()).await?;
        page.wait_for_idle(self.config.browser.network_idle()).await;
        self.scraper.detail_specs(page).await
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
