use crate::models::{DetailExtraction, LinkBatch, ProductLink, SpecMap};
use anyhow::Result;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use tracing::debug;
use url::Url;

use super::cleaner::{add_or_append, element_text, is_checkmark, Denoiser};

pub fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow::anyhow!("selector {:?}: {:?}", css, e))
}

// ── Detail page ───────────────────────────────────────────────────────────────

/// Mines every `<tr>` of a detail page into label → value pairs.
pub struct SpecExtractor {
    row: Selector,
    header: Selector,
    data: Selector,
    denoiser: Denoiser,
}

/// Header and data cell texts of one table row.
struct RowCells {
    headers: Vec<String>,
    values: Vec<String>,
}

impl SpecExtractor {
    pub fn new(denoiser: Denoiser) -> Result<Self> {
        Ok(Self {
            row: selector("tr")?,
            header: selector("th")?,
            data: selector("td")?,
            denoiser,
        })
    }

    pub fn extract(&self, doc: &Html) -> SpecMap {
        self.extract_detail(doc).specs
    }

    /// Like [`extract`](Self::extract), but also reports the labels of
    /// shared-label rows whose glyph cells were left out of the map.
    pub fn extract_detail(&self, doc: &Html) -> DetailExtraction {
        let mut out = DetailExtraction::default();
        for tr in doc.select(&self.row) {
            let Some(cells) = self.row_cells(&tr) else {
                continue;
            };
            self.apply_row(&cells, &mut out);
        }
        out
    }

    fn row_cells(&self, tr: &ElementRef<'_>) -> Option<RowCells> {
        let headers: Vec<String> = tr.select(&self.header).map(|th| element_text(&th)).collect();
        let values: Vec<String> = tr.select(&self.data).map(|td| element_text(&td)).collect();
        if headers.is_empty() || values.is_empty() {
            return None;
        }
        Some(RowCells { headers, values })
    }

    fn apply_row(&self, row: &RowCells, out: &mut DetailExtraction) {
        // One header spanning several data cells: the header labels each of them.
        if let [label] = row.headers.as_slice()
            && row.values.len() > 1
        {
            if label.is_empty() {
                return;
            }
            for value in &row.values {
                if value.is_empty() {
                    continue;
                }
                out.note_label(label);
                if is_checkmark(value) {
                    if !out.marker_labels.contains(label) {
                        out.marker_labels.push(label.clone());
                    }
                    continue;
                }
                add_or_append(&mut out.specs, label, value);
            }
            return;
        }

        for (label, raw) in row.headers.iter().zip(&row.values) {
            if label.is_empty() {
                continue;
            }
            let value = self.denoiser.clean(raw);
            if value.is_empty() {
                continue;
            }
            out.note_label(label);
            add_or_append(&mut out.specs, label, &value);
        }
    }
}

// ── Listing page ──────────────────────────────────────────────────────────────

/// Product link selectors, most specific first.
pub const LINK_STRATEGIES: [&str; 5] = [
    "li.prod_item div.prod_info a.prod_link",
    "li.prod_item .prod_name a",
    "div.prod_info a.prod_link",
    "a[href*='/product/']",
    "a[href*='product/view.html']",
];

pub struct LinkCollector {
    strategies: Vec<(&'static str, Selector)>,
    site_domain: String,
}

impl LinkCollector {
    pub fn new(site_domain: &str) -> Result<Self> {
        let strategies = LINK_STRATEGIES
            .iter()
            .map(|css| Ok((*css, selector(css)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            strategies,
            site_domain: site_domain.trim_start_matches('.').to_lowercase(),
        })
    }

    /// Links from the first strategy that matches anything, in document order.
    pub fn collect(&self, doc: &Html, cap: Option<usize>) -> LinkBatch {
        let Some((name, sel)) = self
            .strategies
            .iter()
            .find(|(_, sel)| doc.select(sel).next().is_some())
        else {
            debug!("No link strategy matched");
            return LinkBatch::default();
        };
        debug!("Link strategy: {}", name);

        let mut links: Vec<ProductLink> = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();

        for a in doc.select(sel) {
            if cap.is_some_and(|cap| links.len() >= cap) {
                break;
            }
            let Some(href) = a.value().attr("href").map(str::trim) else {
                continue;
            };
            if !self.accepts(href) || !seen.insert(href) {
                continue;
            }
            links.push(href.to_string());
        }

        LinkBatch {
            strategy: Some(*name),
            links,
        }
    }

    fn accepts(&self, href: &str) -> bool {
        if href.is_empty() || href.to_ascii_lowercase().starts_with("javascript:") {
            return false;
        }
        // "//host/path" inherits the scheme but not the host.
        let absolute = match href.strip_prefix("//") {
            Some(rest) => format!("https://{rest}"),
            None if href.starts_with('/') => return true,
            None => href.to_string(),
        };
        Url::parse(&absolute)
            .ok()
            .and_then(|u| u.host_str().map(str::to_lowercase))
            .is_some_and(|host| {
                host == self.site_domain || host.ends_with(&format!(".{}", self.site_domain))
            })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> SpecExtractor {
        SpecExtractor::new(Denoiser::site_default()).unwrap()
    }

    fn table(rows: &str) -> Html {
        Html::parse_document(&format!("<html><body><table>{rows}</table></body></html>"))
    }

    #[test]
    fn shared_header_labels_every_cell_and_skips_glyphs() {
        let doc = table("<tr><th>색상</th><td>빨강</td><td>파랑</td><td>●</td></tr>");
        let out = extractor().extract_detail(&doc);

        assert_eq!(out.specs.len(), 1);
        assert_eq!(out.specs["색상"], "빨강,파랑");
        assert_eq!(out.marker_labels, vec!["색상".to_string()]);
        assert!(out.specs.values().all(|v| !["○", "O", "o", "●"].contains(&v.as_str())));
    }

    #[test]
    fn positional_pairs_are_cleaned() {
        let doc = table(
            "<tr><th>제조사</th><td>삼성전자 바로가기</td>\
                 <th>무게</th><td>1.2kg (배터리 포함)</td></tr>\
             <tr><th>KC인증</th><td>R-R-SEC-1 인증번호 확인</td></tr>",
        );
        let specs = extractor().extract(&doc);

        assert_eq!(specs["제조사"], "삼성전자");
        assert_eq!(specs["무게"], "1.2kg");
        assert_eq!(specs["KC인증"], "R-R-SEC-1");
    }

    #[test]
    fn positional_glyph_values_are_kept() {
        let doc = table("<tr><th>방수</th><td>●</td><th>블루투스</th><td>○</td></tr>");
        let specs = extractor().extract(&doc);
        assert_eq!(specs["방수"], "●");
        assert_eq!(specs["블루투스"], "○");
    }

    #[test]
    fn empty_headers_values_and_cellless_rows_are_skipped() {
        let doc = table(
            "<tr><th></th><td>고아 값</td><th>용량</th><td>(없음)</td></tr>\
             <tr><td>only data</td></tr>\
             <tr><th>only header</th></tr>\
             <tr><th>출시</th><td>2024년</td></tr>",
        );
        let specs = extractor().extract(&doc);
        assert_eq!(specs.len(), 1);
        assert_eq!(specs["출시"], "2024년");
    }

    #[test]
    fn extra_headers_beyond_values_are_ignored() {
        let doc = table("<tr><th>A</th><th>B</th><th>C</th><td>1</td><td>2</td></tr>");
        let specs = extractor().extract(&doc);
        assert_eq!(specs.len(), 2);
        assert_eq!(specs["A"], "1");
        assert_eq!(specs["B"], "2");
    }

    #[test]
    fn repeated_rows_merge_without_duplicates() {
        let row = "<tr><th>인터페이스</th><td>USB-C</td></tr>";
        let doc = table(&format!("{row}{row}<tr><th>인터페이스</th><td>HDMI</td></tr>{row}"));
        let specs = extractor().extract(&doc);
        assert_eq!(specs["인터페이스"], "USB-C,HDMI");
    }

    #[test]
    fn cell_text_whitespace_is_collapsed() {
        let doc = table("<tr><th>  최대\n  출력 </th><td>\n 65W <br> 고속 </td></tr>");
        let specs = extractor().extract(&doc);
        assert_eq!(specs["최대 출력"], "65W 고속");
    }

    // ── Links ────────────────────────────────────────────────────────────────

    fn collector() -> LinkCollector {
        LinkCollector::new("danawa.com").unwrap()
    }

    const LISTING: &str = r#"
        <ul>
          <li class="prod_item"><div class="prod_info">
            <a class="prod_link" href="https://prod.danawa.com/info/?pcode=1">a</a></div></li>
          <li class="prod_item"><div class="prod_info">
            <a class="prod_link" href="javascript:void(0)">b</a></div></li>
          <li class="prod_item"><div class="prod_info">
            <a class="prod_link" href="/info/?pcode=2">c</a></div></li>
          <li class="prod_item"><div class="prod_info">
            <a class="prod_link" href="https://ads.example.com/x">d</a></div></li>
          <li class="prod_item"><div class="prod_info">
            <a class="prod_link" href="https://prod.danawa.com/info/?pcode=1">dup</a></div></li>
          <li class="prod_item"><div class="prod_info">
            <a class="prod_link" href="">empty</a></div></li>
          <li class="prod_item"><div class="prod_info">
            <a class="prod_link" href="https://prod.danawa.com/info/?pcode=3">e</a></div></li>
        </ul>
        <a href="https://prod.danawa.com/product/99">other strategy</a>
    "#;

    #[test]
    fn first_matching_strategy_wins_and_filters_hrefs() {
        let doc = Html::parse_document(LISTING);
        let batch = collector().collect(&doc, None);

        assert_eq!(batch.strategy, Some(LINK_STRATEGIES[0]));
        assert_eq!(
            batch.links,
            vec![
                "https://prod.danawa.com/info/?pcode=1",
                "/info/?pcode=2",
                "https://prod.danawa.com/info/?pcode=3",
            ]
        );
    }

    #[test]
    fn cap_stops_collection_early() {
        let doc = Html::parse_document(LISTING);
        let batch = collector().collect(&doc, Some(2));
        assert_eq!(batch.links, vec!["https://prod.danawa.com/info/?pcode=1", "/info/?pcode=2"]);
    }

    #[test]
    fn falls_back_to_later_strategy() {
        let doc = Html::parse_document(
            r#"<a href="/product/view.html?id=1">x</a>
               <a href="https://shop.danawa.com/product/7">y</a>
               <a href="https://evil.example.net/product/8">z</a>"#,
        );
        let batch = collector().collect(&doc, None);
        assert_eq!(batch.strategy, Some("a[href*='/product/']"));
        assert_eq!(batch.links, vec!["/product/view.html?id=1", "https://shop.danawa.com/product/7"]);
    }

    #[test]
    fn protocol_relative_hrefs_need_a_site_host() {
        let doc = Html::parse_document(
            r#"<li class="prod_item"><div class="prod_info">
                 <a class="prod_link" href="//evil.example.com/info/?pcode=1">x</a>
                 <a class="prod_link" href="//prod.danawa.com/info/?pcode=2">y</a>
               </div></li>"#,
        );
        let batch = collector().collect(&doc, None);
        assert_eq!(batch.links, vec!["//prod.danawa.com/info/?pcode=2"]);
    }

    #[test]
    fn collection_is_stable_across_calls() {
        let doc = Html::parse_document(LISTING);
        let c = collector();
        assert_eq!(c.collect(&doc, None), c.collect(&doc, None));
    }

    #[test]
    fn no_match_yields_empty_batch() {
        let doc = Html::parse_document("<p>no products</p>");
        assert_eq!(collector().collect(&doc, None), LinkBatch::default());
    }
}
