//! Offset pagination helpers.
//!
//! Listings are addressed by a 1-based page index and a page size. The query
//! layer fills in `total` before any rows are fetched; a page that is empty
//! or lies beyond the end yields no storage query at all.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Pagination request as received from callers (`?page=2&size=20`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PageQuery {
    pub page: u32,
    pub size: u32,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            page: 1,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageQuery {
    pub fn new(page: u32, size: u32) -> Self {
        Self { page, size }
    }

    pub fn into_page(self) -> Page {
        Page::new(self.page, self.size)
    }
}

/// Offset/limit pair handed to the storage layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub offset: u64,
    pub limit: u32,
}

impl Window {
    pub fn new(offset: u64, limit: u32) -> Self {
        Self { offset, limit }
    }

    /// The first `limit` rows.
    pub fn head(limit: u32) -> Self {
        Self { offset: 0, limit }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub index: u32,
    pub limit: u32,
    pub offset: u64,
    pub total: u64,
    pub pages: u32,
    pub is_empty: bool,
}

impl Page {
    /// Build a page for a 1-based `index`. Index 0 is treated as 1 and the
    /// limit is clamped into `1..=MAX_PAGE_SIZE`.
    pub fn new(index: u32, limit: u32) -> Self {
        let index = index.max(1);
        let limit = limit.clamp(1, MAX_PAGE_SIZE);
        Self {
            index,
            limit,
            offset: u64::from(index - 1) * u64::from(limit),
            total: 0,
            pages: 0,
            is_empty: true,
        }
    }

    pub fn set_total(&mut self, total: u64) {
        self.total = total;
        self.is_empty = total == 0;
        let pages = total.div_ceil(u64::from(self.limit));
        self.pages = u32::try_from(pages).unwrap_or(u32::MAX);
    }

    /// Whether the requested page starts past the last item.
    pub fn is_beyond_end(&self) -> bool {
        self.offset >= self.total
    }

    /// Rows to fetch for a plain listing, or `None` when nothing is on this page.
    pub fn window(&self) -> Option<Window> {
        if self.is_empty || self.is_beyond_end() {
            return None;
        }
        Some(Window::new(self.offset, self.limit))
    }

    /// Rows to fetch for a reply listing.
    ///
    /// The topic occupies item 1 of the thread, so `total` must already be
    /// `reply_count + 1`. Page 1 fetches `limit - 1` replies from offset 0;
    /// later pages fetch `limit` replies from `offset - 1`.
    pub fn reply_window(&self) -> Option<Window> {
        let replies = self.total.saturating_sub(1);
        if replies == 0 || self.is_beyond_end() {
            return None;
        }

        let window = if self.index == 1 {
            Window::new(0, self.limit - 1)
        } else {
            Window::new(self.offset - 1, self.limit)
        };

        (window.limit > 0).then_some(window)
    }
}

/// Page on which a reply is displayed when `replies_before` replies precede
/// it in the thread and the topic counts as the first item.
pub fn reply_page_index(replies_before: u64, page_size: u32) -> u32 {
    let page_size = u64::from(page_size.clamp(1, MAX_PAGE_SIZE));
    let index = (replies_before + 1) / page_size + 1;
    u32::try_from(index).unwrap_or(u32::MAX)
}

/// Items of one page together with its metadata.
#[derive(Debug, Clone, Serialize)]
pub struct Listing<T> {
    pub page: Page,
    pub items: Vec<T>,
}

impl<T> Listing<T> {
    pub fn new(page: Page, items: Vec<T>) -> Self {
        Self { page, items }
    }

    pub fn empty(page: Page) -> Self {
        Self {
            page,
            items: Vec::new(),
        }
    }
}
