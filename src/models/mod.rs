use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

// ── Spec map ──────────────────────────────────────────────────────────────────

/// Label → value pairs mined from one detail page.
pub type SpecMap = HashMap<String, String>;

/// Everything the extractor learns from one detail page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailExtraction {
    pub specs: SpecMap,
    /// Every label touched, in document order.
    pub labels: Vec<String>,
    /// Labels of shared-label rows where a checkmark glyph cell was dropped
    /// from `specs`.
    pub marker_labels: Vec<String>,
}

impl DetailExtraction {
    pub fn note_label(&mut self, label: &str) {
        if !self.labels.iter().any(|l| l == label) {
            self.labels.push(label.to_string());
        }
    }

    /// Labels whose final value is `marker`-like, or that had a glyph cell
    /// dropped, in document order.
    pub fn checkmark_labels(&self, is_marker: impl Fn(&str) -> bool) -> Vec<&str> {
        self.labels
            .iter()
            .filter(|label| {
                self.marker_labels.contains(*label)
                    || self.specs.get(label.as_str()).is_some_and(|v| is_marker(v))
            })
            .map(String::as_str)
            .collect()
    }
}

// ── Product link ──────────────────────────────────────────────────────────────

/// Raw `href` of a product detail page, as found on the listing.
pub type ProductLink = String;

/// Links collected from one listing page together with the selector that produced them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkBatch {
    pub strategy: Option<&'static str>,
    pub links: Vec<ProductLink>,
}

// ── Checkmark keys ────────────────────────────────────────────────────────────

/// Insertion-ordered set of labels seen holding a checkmark glyph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct CheckmarkKeySet {
    order: Vec<String>,
    seen: HashSet<String>,
}

impl CheckmarkKeySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when the label was not present before.
    pub fn insert(&mut self, label: &str) -> bool {
        if self.seen.contains(label) {
            return false;
        }
        self.seen.insert(label.to_string());
        self.order.push(label.to_string());
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }
}

impl From<Vec<String>> for CheckmarkKeySet {
    fn from(labels: Vec<String>) -> Self {
        let mut set = Self::new();
        for label in &labels {
            set.insert(label);
        }
        set
    }
}

impl From<CheckmarkKeySet> for Vec<String> {
    fn from(set: CheckmarkKeySet) -> Self {
        set.order
    }
}

// ── Pattern mapping ───────────────────────────────────────────────────────────

/// Rule key → semantic meaning. Ordered so the persisted form is lexicographic.
pub type PatternMapping = BTreeMap<String, String>;

// ── Crawl report ──────────────────────────────────────────────────────────────

/// Why the outer crawl loop stopped. Every variant is a normal completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// All requested listing pages were scanned.
    PagesDone,
    /// A listing page yielded no product links.
    Exhausted,
    /// The run-wide item budget was spent.
    BudgetReached,
    /// No pagination strategy reached this 1-based page.
    Unreachable { page: u32 },
    /// The listing page itself failed (read error, pagination error).
    Failed { reason: String },
}

#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub checkmark_keys: CheckmarkKeySet,
    pub items_scanned: usize,
    pub items_skipped: usize,
    pub pages_visited: u32,
    pub completion: Completion,
}
