use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// Top-level application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub pacing: PacingConfig,
}

/// Browsing-session profile and timeouts
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BrowserConfig {
    #[serde(default)]
    pub headless: bool,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,

    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,

    #[serde(default = "default_locale")]
    pub locale: String,

    #[serde(default = "default_timezone")]
    pub timezone: String,

    #[serde(default = "default_action_timeout_ms")]
    pub action_timeout_ms: u64,

    #[serde(default = "default_navigation_timeout_ms")]
    pub navigation_timeout_ms: u64,

    #[serde(default = "default_detail_timeout_ms")]
    pub detail_timeout_ms: u64,

    #[serde(default = "default_network_idle_ms")]
    pub network_idle_ms: u64,
}

/// Crawl budgets and site scope
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CrawlConfig {
    #[serde(default = "default_site_domain")]
    pub site_domain: String,

    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// 0 = unlimited
    #[serde(default)]
    pub max_items_per_page: usize,

    /// 0 = unlimited
    #[serde(default)]
    pub max_total_items: usize,
}

/// Human-like pacing between browser actions
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PacingConfig {
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    /// Upper bound of the random jitter added to `delay_ms`; defaults to `delay_ms`.
    #[serde(default)]
    pub jitter_ms: Option<u64>,

    #[serde(default = "default_scroll_steps")]
    pub scroll_steps: u32,

    #[serde(default = "default_scroll_step_px")]
    pub scroll_step_px: u32,

    #[serde(default = "default_scroll_delay_ms")]
    pub scroll_delay_ms: u64,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/124.0.0.0 Safari/537.36"
        .to_string()
}
fn default_viewport_width() -> u32 {
    1366
}
fn default_viewport_height() -> u32 {
    800
}
fn default_locale() -> String {
    "ko-KR".to_string()
}
fn default_timezone() -> String {
    "Asia/Seoul".to_string()
}
fn default_action_timeout_ms() -> u64 {
    10_000
}
fn default_navigation_timeout_ms() -> u64 {
    30_000
}
fn default_detail_timeout_ms() -> u64 {
    15_000
}
fn default_network_idle_ms() -> u64 {
    3_000
}
fn default_site_domain() -> String {
    "danawa.com".to_string()
}
fn default_max_pages() -> u32 {
    1
}
fn default_delay_ms() -> u64 {
    1_000
}
fn default_scroll_steps() -> u32 {
    6
}
fn default_scroll_step_px() -> u32 {
    800
}
fn default_scroll_delay_ms() -> u64 {
    300
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: false,
            user_agent: default_user_agent(),
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
            locale: default_locale(),
            timezone: default_timezone(),
            action_timeout_ms: default_action_timeout_ms(),
            navigation_timeout_ms: default_navigation_timeout_ms(),
            detail_timeout_ms: default_detail_timeout_ms(),
            network_idle_ms: default_network_idle_ms(),
        }
    }
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            site_domain: default_site_domain(),
            max_pages: default_max_pages(),
            max_items_per_page: 0,
            max_total_items: 0,
        }
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_delay_ms(),
            jitter_ms: None,
            scroll_steps: default_scroll_steps(),
            scroll_step_px: default_scroll_step_px(),
            scroll_delay_ms: default_scroll_delay_ms(),
        }
    }
}

impl BrowserConfig {
    pub fn action_timeout(&self) -> Duration {
        Duration::from_millis(self.action_timeout_ms)
    }
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }
    pub fn detail_timeout(&self) -> Duration {
        Duration::from_millis(self.detail_timeout_ms)
    }
    pub fn network_idle(&self) -> Duration {
        Duration::from_millis(self.network_idle_ms)
    }
}

impl CrawlConfig {
    /// Per-page link cap; `None` when unlimited.
    pub fn item_cap(&self) -> Option<usize> {
        crate::utils::limit(self.max_items_per_page)
    }

    /// Run-wide item budget; `None` when unlimited.
    pub fn total_budget(&self) -> Option<usize> {
        crate::utils::limit(self.max_total_items)
    }
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file + environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(config::Environment::with_prefix("LEARNER").separator("__"))
            .build()?;

        Ok(Self::from_layers(cfg))
    }

    /// Deserialize the merged layers, or fall back to defaults on a bad value.
    fn from_layers(cfg: config::Config) -> Self {
        cfg.try_deserialize().unwrap_or_else(|e| {
            warn!("Invalid configuration, using defaults: {}", e);
            AppConfig::default()
        })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            browser: BrowserConfig::default(),
            crawl: CrawlConfig::default(),
            pacing: PacingConfig::default(),
        }
    }
}
