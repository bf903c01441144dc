//! In-memory browser over fixture HTML for crawl and pagination tests.

use async_trait::async_trait;
use scraper::{Html, Selector};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::browser::{Browser, BrowserError, BrowserResult, Nth, Page};

pub const CATEGORY_URL: &str = "https://prod.danawa.com/list/?cate=112758";

/// How the listing's `movePage` function behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingScript {
    Available,
    Missing,
    /// Every script evaluation fails.
    Broken,
}

#[derive(Debug, Clone)]
pub struct FakeSite {
    pages: u32,
    links_per_page: usize,
    group_size: u32,
    script: ListingScript,
    default_detail: String,
    details: HashMap<String, String>,
    timeouts: HashSet<String>,
}

impl FakeSite {
    pub fn with_pages(pages: u32, links_per_page: usize) -> Self {
        Self {
            pages,
            links_per_page,
            group_size: 10,
            script: ListingScript::Available,
            default_detail: detail_page(&[]),
            details: HashMap::new(),
            timeouts: HashSet::new(),
        }
    }

    pub fn group_size(mut self, size: u32) -> Self {
        self.group_size = size;
        self
    }

    pub fn script(mut self, script: ListingScript) -> Self {
        self.script = script;
        self
    }

    /// Detail page served for every product without an override.
    pub fn default_detail(mut self, html: String) -> Self {
        self.default_detail = html;
        self
    }

    pub fn detail(mut self, url: &str, html: String) -> Self {
        self.details.insert(url.to_string(), html);
        self
    }

    /// Navigation to `url` times out.
    pub fn timeout_on(mut self, url: &str) -> Self {
        self.timeouts.insert(url.to_string());
        self
    }

    /// Absolute URL of the `item`-th (1-based) product on listing `page`.
    pub fn link_url(page: u32, item: usize) -> String {
        format!("https://prod.danawa.com{}", Self::link_href(page, item))
    }

    fn link_href(page: u32, item: usize) -> String {
        format!("/info/?pcode={page}{item:03}")
    }

    fn render_listing(&self, current: u32) -> String {
        let mut html = String::from("<html><body><ul class=\"product_list\">");
        for item in 1..=self.links_per_page {
            html.push_str(&format!(
                "<li class=\"prod_item\"><div class=\"prod_info\">\
                 <a class=\"prod_link\" href=\"{}\">item {item}</a></div></li>",
                Self::link_href(current, item)
            ));
        }
        html.push_str("</ul><div class=\"number_wrap\">");

        let group = self.group_size.max(1);
        let start = (current - 1) / group * group + 1;
        let end = (start + group - 1).min(self.pages.max(1));
        for n in start..=end {
            html.push_str(&format!("<a class=\"num\" onclick=\"movePage({n}); return false;\">{n}</a>"));
        }
        if end < self.pages {
            html.push_str(&format!(
                "<a class=\"edge_nav nav_next\" onclick=\"movePage({}); return false;\">다음</a>",
                end + 1
            ));
        }
        html.push_str("</div></body></html>");
        html
    }
}

/// A detail page with one spec table built from `(label, cells)` rows.
pub fn detail_page(rows: &[(&str, &[&str])]) -> String {
    let mut html = String::from("<html><body><table class=\"spec_tbl\">");
    for (label, cells) in rows {
        html.push_str(&format!("<tr><th>{label}</th>"));
        for cell in *cells {
            html.push_str(&format!("<td>{cell}</td>"));
        }
        html.push_str("</tr>");
    }
    html.push_str("</table></body></html>");
    html
}

/// What happened during a fake crawl.
#[derive(Debug, Clone, Default)]
pub struct FakeLog {
    pub listing_page: u32,
    /// Listing page number at every listing `content()` read.
    pub listing_reads: Vec<u32>,
    /// Listing reads and scroll steps in call order, e.g. `"scroll@1"`, `"read@1"`.
    pub listing_events: Vec<String>,
    pub detail_visits: Vec<String>,
    pub pages_opened: usize,
    pub pages_closed: usize,
    pub browser_closed: bool,
}

struct SiteState {
    site: FakeSite,
    log: FakeLog,
}

#[derive(Clone)]
pub struct FakeBrowser {
    state: Arc<Mutex<SiteState>>,
}

impl FakeBrowser {
    pub fn new(site: FakeSite) -> Self {
        Self {
            state: Arc::new(Mutex::new(SiteState { site, log: FakeLog::default() })),
        }
    }

    pub fn log(&self) -> FakeLog {
        self.state.lock().unwrap().log.clone()
    }
}

#[async_trait]
impl Browser for FakeBrowser {
    type Page = FakePage;

    async fn open_page(&self) -> BrowserResult<FakePage> {
        self.state.lock().unwrap().log.pages_opened += 1;
        Ok(FakePage {
            state: Arc::clone(&self.state),
            location: Mutex::new(Location::Blank),
        })
    }

    async fn close(&self) -> BrowserResult<()> {
        self.state.lock().unwrap().log.browser_closed = true;
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum Location {
    Blank,
    Listing,
    Detail(String),
}

pub struct FakePage {
    state: Arc<Mutex<SiteState>>,
    location: Mutex<Location>,
}

impl FakePage {
    /// Current document; `record` logs listing reads.
    fn html(&self, record: bool) -> String {
        let location = self.location.lock().unwrap().clone();
        let mut state = self.state.lock().unwrap();
        match location {
            Location::Blank => "<html><body></body></html>".to_string(),
            Location::Listing => {
                let current = state.log.listing_page;
                if record {
                    state.log.listing_reads.push(current);
                    state.log.listing_events.push(format!("read@{current}"));
                }
                state.site.render_listing(current)
            }
            Location::Detail(url) => state
                .site
                .details
                .get(&url)
                .unwrap_or(&state.site.default_detail)
                .clone(),
        }
    }

    fn move_listing(&self, target: u32) {
        let mut state = self.state.lock().unwrap();
        if (1..=state.site.pages).contains(&target) {
            state.log.listing_page = target;
        }
    }

    fn script(&self) -> ListingScript {
        self.state.lock().unwrap().site.script
    }

    fn record_scroll(&self) {
        if !matches!(*self.location.lock().unwrap(), Location::Listing) {
            return;
        }
        let mut state = self.state.lock().unwrap();
        let current = state.log.listing_page;
        state.log.listing_events.push(format!("scroll@{current}"));
    }
}

fn move_page_arg(text: &str) -> Option<u32> {
    let rest = &text[text.find("movePage(")? + "movePage(".len()..];
    rest[..rest.find(')')?].trim().parse().ok()
}

fn parse(selector: &str) -> BrowserResult<Selector> {
    Selector::parse(selector).map_err(|e| BrowserError::Script {
        script: selector.to_string(),
        reason: format!("{e:?}"),
    })
}

#[async_trait]
impl Page for FakePage {
    async fn goto(&self, url: &str, timeout: Duration) -> BrowserResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.site.timeouts.contains(url) {
            return Err(BrowserError::Timeout {
                what: format!("navigation to {url}"),
                after: timeout,
            });
        }
        let location = if url == CATEGORY_URL {
            state.log.listing_page = 1;
            Location::Listing
        } else {
            state.log.detail_visits.push(url.to_string());
            Location::Detail(url.to_string())
        };
        *self.location.lock().unwrap() = location;
        Ok(())
    }

    async fn wait_for_idle(&self, _quiet: Duration) {}

    async fn content(&self) -> BrowserResult<String> {
        Ok(self.html(true))
    }

    async fn count(&self, selector: &str) -> BrowserResult<usize> {
        let sel = parse(selector)?;
        Ok(Html::parse_document(&self.html(false)).select(&sel).count())
    }

    async fn click(&self, selector: &str, nth: Nth) -> BrowserResult<()> {
        let sel = parse(selector)?;
        let doc = Html::parse_document(&self.html(false));
        let matches: Vec<_> = doc.select(&sel).collect();
        let target = match nth {
            Nth::First => matches.first(),
            Nth::Last => matches.last(),
        }
        .ok_or_else(|| BrowserError::NoMatch(selector.to_string()))?;

        if let Some(n) = target.value().attr("onclick").and_then(move_page_arg) {
            self.move_listing(n);
        }
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> BrowserResult<serde_json::Value> {
        let listing = self.script();
        let fail = || BrowserError::Script {
            script: script.to_string(),
            reason: "ReferenceError".to_string(),
        };
        if listing == ListingScript::Broken {
            return Err(fail());
        }
        if script.starts_with("window.scrollBy") {
            self.record_scroll();
            return Ok(serde_json::Value::Null);
        }
        if script.starts_with("typeof movePage") {
            return Ok(serde_json::Value::Bool(listing == ListingScript::Available));
        }
        if let Some(n) = move_page_arg(script) {
            if listing != ListingScript::Available {
                return Err(fail());
            }
            self.move_listing(n);
        }
        Ok(serde_json::Value::Null)
    }

    async fn close(&self) -> BrowserResult<()> {
        self.state.lock().unwrap().log.pages_closed += 1;
        Ok(())
    }
}
