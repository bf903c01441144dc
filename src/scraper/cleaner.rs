use crate::models::SpecMap;
use regex::Regex;
use scraper::ElementRef;

// ── Checkmark glyphs ──────────────────────────────────────────────────────────

/// Marker characters the site uses for "feature present".
pub const CHECKMARK_GLYPHS: [&str; 4] = ["○", "O", "o", "●"];

pub fn is_checkmark(value: &str) -> bool {
    CHECKMARK_GLYPHS.contains(&value.trim())
}

// ── Text ──────────────────────────────────────────────────────────────────────

/// Display text of an element: text nodes joined, whitespace runs collapsed.
/// "  최대\n  출력 " → "최대 출력"
pub fn element_text(el: &ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

// ── Denoise rules ─────────────────────────────────────────────────────────────

/// One cleaning step applied to a raw cell value.
#[derive(Debug, Clone)]
pub enum DenoiseRule {
    /// Drop the marker and everything after it.
    TruncateAt(String),
    /// Delete every match of the pattern.
    Remove(Regex),
}

impl DenoiseRule {
    pub fn apply(&self, value: &str) -> String {
        match self {
            DenoiseRule::TruncateAt(marker) => match value.find(marker.as_str()) {
                Some(idx) => value[..idx].trim().to_string(),
                None => value.trim().to_string(),
            },
            DenoiseRule::Remove(pattern) => pattern.replace_all(value, "").trim().to_string(),
        }
    }
}

/// Ordered list of cleaning steps for positional header/value pairs.
#[derive(Debug, Clone)]
pub struct Denoiser {
    rules: Vec<DenoiseRule>,
}

impl Denoiser {
    pub fn new(rules: Vec<DenoiseRule>) -> Self {
        Self { rules }
    }

    /// Footer annotations ("인증번호 확인", "바로가기") and parenthesised asides.
    pub fn site_default() -> Self {
        let mut rules = vec![
            DenoiseRule::TruncateAt("인증번호 확인".to_string()),
            DenoiseRule::TruncateAt("바로가기".to_string()),
        ];
        if let Ok(aside) = Regex::new(r"\s*\([^)]*\)") {
            rules.push(DenoiseRule::Remove(aside));
        }
        Self::new(rules)
    }

    pub fn clean(&self, value: &str) -> String {
        self.rules
            .iter()
            .fold(value.trim().to_string(), |acc, rule| rule.apply(&acc))
    }
}

// ── Merge ─────────────────────────────────────────────────────────────────────

/// Insert `value` under `key`, or extend the existing value with it.
///
/// A label captured as its own value is dropped. An existing value is never
/// overwritten: identical values and substring/superstring values are no-ops,
/// anything else is appended as a new comma-separated fragment unless one of
/// the existing fragments already equals it.
pub fn add_or_append(specs: &mut SpecMap, key: &str, value: &str) {
    if key == value {
        return;
    }
    let Some(existing) = specs.get_mut(key) else {
        specs.insert(key.to_string(), value.to_string());
        return;
    };

    // NOTE: "1" against "10GB/1개" is swallowed by the substring test.
    if existing.as_str() == value || existing.contains(value) || value.contains(existing.as_str()) {
        return;
    }

    let fragment = value.trim();
    if existing.split(',').any(|part| part.trim() == fragment) {
        return;
    }
    existing.push(',');
    existing.push_str(value);
}

// ── Tests ─────────────────────────────────────────────────────────────────────
