//! Moves a listing page to a given page number.
//!
//! The listing has no stable pagination URL. Depending on the category template
//! a page is reached by clicking its numbered button, by calling the page's own
//! `movePage(n)` function, or by first advancing to the next group of page
//! buttons. Strategies are tried in that order and the first one that works wins.

use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

use super::browser::{BrowserResult, Nth, Page};

const NEXT_GROUP: &str = "a.edge_nav.nav_next, a[class*='nav_next'], a[onclick*='movePage']";
const HAS_MOVE_PAGE: &str = "typeof movePage === 'function'";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStrategy {
    PageButton,
    ScriptCall,
    NextGroup,
}

impl fmt::Display for PageStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PageStrategy::PageButton => "page button",
            PageStrategy::ScriptCall => "movePage() call",
            PageStrategy::NextGroup => "next group + page button",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageMove {
    Moved(PageStrategy),
    Unreachable,
}

pub struct Paginator {
    settle: Duration,
}

impl Paginator {
    /// `settle` bounds the network-idle wait after every navigation.
    pub fn new(settle: Duration) -> Self {
        Self { settle }
    }

    fn page_button(page_num: u32) -> String {
        format!("a.num[onclick*='movePage({page_num})']")
    }

    /// Navigate `page` to the 1-based `page_num`. Driver errors propagate.
    pub async fn go_to_page<P: Page + ?Sized>(&self, page: &P, page_num: u32) -> BrowserResult<PageMove> {
        let button = Self::page_button(page_num);

        if self.click_if_present(page, &button, Nth::First).await? {
            return Ok(PageMove::Moved(PageStrategy::PageButton));
        }

        if page.evaluate(HAS_MOVE_PAGE).await?.as_bool() == Some(true) {
            page.evaluate(&format!("movePage({page_num})")).await?;
            page.wait_for_idle(self.settle).await;
            return Ok(PageMove::Moved(PageStrategy::ScriptCall));
        }

        if self.click_if_present(page, NEXT_GROUP, Nth::Last).await? {
            debug!("Advanced page group looking for page {}", page_num);
            if self.click_if_present(page, &button, Nth::First).await? {
                return Ok(PageMove::Moved(PageStrategy::NextGroup));
            }
        }

        warn!("movePage({}) failed: no page button or function available", page_num);
        Ok(PageMove::Unreachable)
    }

    async fn click_if_present<P: Page + ?Sized>(&self, page: &P, selector: &str, nth: Nth) -> BrowserResult<bool> {
        if page.count(selector).await? == 0 {
            return Ok(false);
        }
        page.click(selector, nth).await?;
        page.wait_for_idle(self.settle).await;
        Ok(true)
    }
}
