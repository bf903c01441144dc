use crate::config::BrowserConfig;
use async_trait::async_trait;
use headless_chrome::protocol::cdp::Emulation;
use headless_chrome::{Browser as ChromeBrowser, LaunchOptions, Tab};
use std::ffi::OsStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::spawn_blocking;
use tracing::debug;

use super::browser::{js_string, Browser, BrowserError, BrowserResult, Nth, Page};

// ── Session ───────────────────────────────────────────────────────────────────

/// Headless (or headed) Chrome session driven over CDP.
pub struct ChromeSession {
    browser: Arc<ChromeBrowser>,
    config: BrowserConfig,
}

impl ChromeSession {
    pub async fn launch(config: &BrowserConfig) -> BrowserResult<Self> {
        let cfg = config.clone();
        let browser = spawn_blocking(move || {
            let user_agent = format!("--user-agent={}", cfg.user_agent);
            let lang = format!("--lang={}", cfg.locale);
            let args: Vec<&OsStr> = vec![OsStr::new(&user_agent), OsStr::new(&lang)];

            ChromeBrowser::new(LaunchOptions {
                headless: cfg.headless,
                window_size: Some((cfg.viewport_width, cfg.viewport_height)),
                idle_browser_timeout: Duration::from_secs(600),
                args,
                ..Default::default()
            })
            .map_err(|e| BrowserError::Launch(e.to_string()))
        })
        .await
        .map_err(|e| BrowserError::Task(e.to_string()))??;

        debug!("Chrome launched (headless={})", config.headless);
        Ok(Self {
            browser: Arc::new(browser),
            config: config.clone(),
        })
    }
}

#[async_trait]
impl Browser for ChromeSession {
    type Page = ChromePage;

    async fn open_page(&self) -> BrowserResult<ChromePage> {
        let browser = Arc::clone(&self.browser);
        let timeout = self.config.action_timeout();
        let timezone = self.config.timezone.clone();

        let tab = spawn_blocking(move || {
            let tab = browser
                .new_tab()
                .map_err(|e| BrowserError::Launch(e.to_string()))?;
            tab.set_default_timeout(timeout);
            if let Err(e) = tab.call_method(Emulation::SetTimezoneOverride { timezone_id: timezone }) {
                debug!("Timezone override rejected: {}", e);
            }
            Ok::<_, BrowserError>(tab)
        })
        .await
        .map_err(|e| BrowserError::Task(e.to_string()))??;

        Ok(ChromePage {
            tab,
            action_timeout: timeout,
        })
    }

    async fn close(&self) -> BrowserResult<()> {
        // The Chrome process is killed when the last handle drops; tabs go first.
        let browser = Arc::clone(&self.browser);
        spawn_blocking(move || {
            let tabs = match browser.get_tabs().lock() {
                Ok(tabs) => tabs.clone(),
                Err(_) => return,
            };
            for tab in tabs {
                if let Err(e) = tab.close(false) {
                    debug!("Tab close failed: {}", e);
                }
            }
        })
        .await
        .map_err(|e| BrowserError::Task(e.to_string()))
    }
}

// ── Page ──────────────────────────────────────────────────────────────────────

pub struct ChromePage {
    tab: Arc<Tab>,
    action_timeout: Duration,
}

impl ChromePage {
    /// Run a blocking tab operation off the runtime, bounded by `limit`.
    async fn blocking<T, F>(&self, what: &str, limit: Duration, op: F) -> BrowserResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Tab) -> BrowserResult<T> + Send + 'static,
    {
        let tab = Arc::clone(&self.tab);
        let task = spawn_blocking(move || op(tab.as_ref()));
        match tokio::time::timeout(limit, task).await {
            Ok(joined) => joined.map_err(|e| BrowserError::Task(e.to_string()))?,
            Err(_) => Err(BrowserError::Timeout {
                what: what.to_string(),
                after: limit,
            }),
        }
    }

    async fn eval_json(&self, script: String) -> BrowserResult<serde_json::Value> {
        // Wrapped in JSON.stringify so arrays and objects come back by value.
        let wrapped = format!("JSON.stringify((() => {{ return ({script}); }})())");
        self.blocking("evaluate", self.action_timeout, move |tab| {
            let remote = tab.evaluate(&wrapped, false).map_err(|e| BrowserError::Script {
                script: script.clone(),
                reason: e.to_string(),
            })?;
            match remote.value {
                Some(serde_json::Value::String(json)) => {
                    serde_json::from_str(&json).map_err(|e| BrowserError::Script {
                        script,
                        reason: e.to_string(),
                    })
                }
                _ => Ok(serde_json::Value::Null),
            }
        })
        .await
    }
}

#[async_trait]
impl Page for ChromePage {
    async fn goto(&self, url: &str, timeout: Duration) -> BrowserResult<()> {
        let target = url.to_string();
        self.blocking(&format!("navigation to {url}"), timeout, move |tab| {
            tab.set_default_timeout(timeout);
            tab.navigate_to(&target)
                .and_then(|t| t.wait_until_navigated())
                .map(|_| ())
                .map_err(|e| BrowserError::Navigation {
                    url: target.clone(),
                    reason: e.to_string(),
                })
        })
        .await
    }

    async fn wait_for_idle(&self, quiet: Duration) {
        let started = Instant::now();
        let poll = Duration::from_millis(250);
        let mut last_resources: Option<u64> = None;
        let mut stable_since = Instant::now();

        while started.elapsed() < quiet {
            let probe = self
                .eval_json(
                    "[document.readyState, performance.getEntriesByType('resource').length]"
                        .to_string(),
                )
                .await;
            let Ok(serde_json::Value::Array(state)) = probe else {
                return;
            };
            let loading = state.first().and_then(|v| v.as_str()) == Some("loading");
            let resources = state.get(1).and_then(|v| v.as_u64());

            if loading || resources != last_resources {
                last_resources = resources;
                stable_since = Instant::now();
            } else if stable_since.elapsed() >= Duration::from_millis(500) {
                return;
            }
            tokio::time::sleep(poll).await;
        }
        debug!("Network did not settle within {:?}", quiet);
    }

    async fn content(&self) -> BrowserResult<String> {
        self.blocking("content", self.action_timeout, |tab| {
            tab.get_content().map_err(|e| BrowserError::Script {
                script: "content".to_string(),
                reason: e.to_string(),
            })
        })
        .await
    }

    async fn count(&self, selector: &str) -> BrowserResult<usize> {
        let value = self
            .eval_json(format!("document.querySelectorAll({}).length", js_string(selector)))
            .await?;
        Ok(value.as_u64().unwrap_or(0) as usize)
    }

    async fn click(&self, selector: &str, nth: Nth) -> BrowserResult<()> {
        let pick = match nth {
            Nth::First => "all[0]",
            Nth::Last => "all[all.length - 1]",
        };
        let script = format!(
            "(() => {{ const all = document.querySelectorAll({}); \
             if (all.length === 0) return false; {}.click(); return true; }})()",
            js_string(selector),
            pick
        );
        match self.eval_json(script).await? {
            serde_json::Value::Bool(true) => Ok(()),
            _ => Err(BrowserError::NoMatch(selector.to_string())),
        }
    }

    async fn evaluate(&self, script: &str) -> BrowserResult<serde_json::Value> {
        self.eval_json(script.to_string()).await
    }

    async fn close(&self) -> BrowserResult<()> {
        self.blocking("close", self.action_timeout, |tab| {
            tab.close(false).map(|_| ()).map_err(|e| BrowserError::Task(e.to_string()))
        })
        .await
    }
}
