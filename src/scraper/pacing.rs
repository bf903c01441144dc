use crate::config::PacingConfig;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

use super::browser::Page;

/// Delays and scrolling that make the crawl look less like a bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacingPolicy {
    pub base_delay_ms: u64,
    pub jitter_ms: u64,
    pub scroll_steps: u32,
    pub scroll_step_px: u32,
    pub scroll_delay_ms: u64,
}

impl PacingPolicy {
    pub fn from_config(config: &PacingConfig) -> Self {
        Self {
            base_delay_ms: config.delay_ms,
            jitter_ms: config.jitter_ms.unwrap_or(config.delay_ms),
            scroll_steps: config.scroll_steps,
            scroll_step_px: config.scroll_step_px,
            scroll_delay_ms: config.scroll_delay_ms,
        }
    }

    /// No sleeping and no scrolling.
    pub fn none() -> Self {
        Self {
            base_delay_ms: 0,
            jitter_ms: 0,
            scroll_steps: 0,
            scroll_step_px: 0,
            scroll_delay_ms: 0,
        }
    }

    /// `base + uniform(0..=jitter)`.
    pub fn jittered(base_ms: u64, jitter_ms: u64) -> Duration {
        let jitter = if jitter_ms == 0 { 0 } else { rand::random_range(0..=jitter_ms) };
        Duration::from_millis(base_ms + jitter)
    }

    pub async fn delay(&self) {
        if self.base_delay_ms == 0 && self.jitter_ms == 0 {
            return;
        }
        sleep(Self::jittered(self.base_delay_ms, self.jitter_ms)).await;
    }

    /// Scroll down in steps to trigger lazy-loaded content. Failures are ignored.
    pub async fn scroll<P: Page + ?Sized>(&self, page: &P) {
        for _ in 0..self.scroll_steps {
            let script = format!("window.scrollBy(0, {})", self.scroll_step_px);
            if let Err(e) = page.evaluate(&script).await {
                debug!("Scroll step failed: {}", e);
                return;
            }
            if self.scroll_delay_ms > 0 {
                sleep(Self::jittered(self.scroll_delay_ms, self.scroll_delay_ms)).await;
            }
        }
    }

    /// Scroll, then wait the base delay.
    pub async fn settle<P: Page + ?Sized>(&self, page: &P) {
        self.scroll(page).await;
        self.delay().await;
    }
}
