//! Page-number pagination helpers.

use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

/// Request for one 1-indexed page of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    per_page: NonZeroU32,
}

impl PageRequest {
    /// Page numbers below 1 are clamped to the first page.
    pub fn new(page: u32, per_page: NonZeroU32) -> Self {
        Self {
            page: page.max(1),
            per_page,
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn per_page(&self) -> u32 {
        self.per_page.get()
    }

    /// Number of records preceding this page.
    pub fn offset(&self) -> usize {
        (self.page as usize - 1).saturating_mul(self.per_page.get() as usize)
    }

    pub fn limit(&self) -> usize {
        self.per_page.get() as usize
    }
}

/// One page of a listing together with the total it was cut from. Requests
/// past the last page yield an empty `items` list rather than an error.
#[derive(Debug, Clone, PartialEq)]
pub struct NumberedPage<T> {
    pub items: Vec<T>,
    pub request: PageRequest,
    pub total: u64,
}

impl<T> NumberedPage<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total: u64) -> Self {
        Self {
            items,
            request,
            total,
        }
    }

    /// Slice an in-memory listing that is already sorted.
    pub fn from_sorted(items: Vec<T>, request: PageRequest) -> Self {
        let total = items.len() as u64;
        let items = items
            .into_iter()
            .skip(request.offset())
            .take(request.limit())
            .collect();
        Self::new(items, request, total)
    }

    pub fn meta(&self) -> PageMeta {
        PageMeta::compute(self.request, self.total)
    }
}

/// Navigation numbers for a page; zero records means zero pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub page: u32,
    pub pages: u32,
    pub has_next: bool,
    pub has_prev: bool,
    pub next_num: Option<u32>,
    pub prev_num: Option<u32>,
}

impl PageMeta {
    pub fn compute(request: PageRequest, total: u64) -> Self {
        let per_page = u64::from(request.per_page());
        let pages = u32::try_from(total.div_ceil(per_page)).unwrap_or(u32::MAX);
        let page = request.page();
        let has_next = page < pages;
        let has_prev = page > 1;

        Self {
            page,
            pages,
            has_next,
            has_prev,
            next_num: has_next.then(|| page + 1),
            prev_num: has_prev.then(|| page - 1),
        }
    }
}
