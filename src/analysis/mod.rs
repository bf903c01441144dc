//! Turns the crawl's checkmark keys into the persisted pattern mapping.
//!
//! No per-category rules exist yet, so the mapping is always empty and this
//! step only reports what was found. Category rules belong here once they are
//! written down.

use crate::models::{CheckmarkKeySet, PatternMapping};
use tracing::info;

const PREVIEW_LEN: usize = 10;

pub fn aggregate(keys: &CheckmarkKeySet) -> PatternMapping {
    info!("=== Analyzing patterns ===");
    info!("  Collected {} checkmark keys", keys.len());
    if let Some(line) = preview(keys, PREVIEW_LEN) {
        info!("  e.g. {}", line);
    }
    PatternMapping::new()
}

/// The first `limit` keys joined by ", ", plus " ... and N more" when cut.
pub fn preview(keys: &CheckmarkKeySet, limit: usize) -> Option<String> {
    if keys.is_empty() {
        return None;
    }
    let shown = keys.iter().take(limit).collect::<Vec<_>>().join(", ");
    let hidden = keys.len().saturating_sub(limit);
    if hidden > 0 {
        Some(format!("{shown} ... and {hidden} more"))
    } else {
        Some(shown)
    }
}
