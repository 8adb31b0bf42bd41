//! Fixed-size pages over an ordered result set.
//!
//! A requested page arrives as a raw, untrusted token. Missing or malformed
//! tokens resolve to the first page and tokens past the end resolve to the
//! last page, so resolving a page never fails.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageWindow {
    pub number: usize,
    pub num_pages: usize,
    pub per_page: usize,
    pub count: usize,
}

impl PageWindow {
    pub fn offset(&self) -> usize {
        (self.number - 1) * self.per_page
    }

    pub fn limit(&self) -> usize {
        self.per_page
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    count: usize,
    per_page: usize,
}

impl Paginator {
    pub fn new(count: usize, per_page: usize) -> Self {
        Self {
            count,
            per_page: per_page.max(1),
        }
    }

    /// Number of pages; an empty result set still has one (empty) page.
    pub fn num_pages(&self) -> usize {
        if self.count == 0 {
            1
        } else {
            self.count.div_ceil(self.per_page)
        }
    }

    pub fn resolve(&self, token: Option<&str>) -> PageWindow {
        let num_pages = self.num_pages();
        let number = match token.map(str::trim) {
            Some(t) => match t.parse::<i64>() {
                Ok(n) if n > num_pages as i64 => num_pages,
                Ok(n) if n >= 1 => n as usize,
                Ok(_) => 1,
                // Too many digits for an i64 is still "past the end".
                Err(_) if !t.is_empty() && t.bytes().all(|b| b.is_ascii_digit()) => num_pages,
                Err(_) => 1,
            },
            None => 1,
        };

        PageWindow {
            number,
            num_pages,
            per_page: self.per_page,
            count: self.count,
        }
    }
}

/// One page of results plus the navigation data templates need.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: usize,
    pub num_pages: usize,
    pub count: usize,
    pub has_previous: bool,
    pub has_next: bool,
    pub previous_page: Option<usize>,
    pub next_page: Option<usize>,
}

impl<T> Page<T> {
    /// Wraps items that were already fetched for `window`.
    pub fn from_window(items: Vec<T>, window: PageWindow) -> Self {
        Self {
            items,
            number: window.number,
            num_pages: window.num_pages,
            count: window.count,
            has_previous: window.has_previous(),
            has_next: window.has_next(),
            previous_page: window.has_previous().then(|| window.number - 1),
            next_page: window.has_next().then(|| window.number + 1),
        }
    }

    /// Replaces the items of this page, keeping its navigation data.
    pub fn try_map<U, E>(self, f: impl FnOnce(Vec<T>) -> Result<Vec<U>, E>) -> Result<Page<U>, E> {
        Ok(Page {
            items: f(self.items)?,
            number: self.number,
            num_pages: self.num_pages,
            count: self.count,
            has_previous: self.has_previous,
            has_next: self.has_next,
            previous_page: self.previous_page,
            next_page: self.next_page,
        })
    }
}

/// Slices an in-memory ordered sequence.
pub fn paginate<T>(items: Vec<T>, per_page: usize, token: Option<&str>) -> Page<T> {
    let window = Paginator::new(items.len(), per_page).resolve(token);
    let page_items = items
        .into_iter()
        .skip(window.offset())
        .take(window.limit())
        .collect();
    Page::from_window(page_items, window)
}
