use std::num::IntErrorKind;

/// Posts shown per listing page.
pub const POSTS_PER_PAGE: u64 = 10;

/// Position of one page within a paginated result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    /// Current page number (1-based, always valid).
    pub number: u64,
    /// Total number of pages. An empty result still has one page.
    pub num_pages: u64,
    /// Total number of items.
    pub count: u64,
    pub per_page: u64,
}

impl PageWindow {
    /// Resolve a raw `?page=` value against `count` items.
    ///
    /// Missing or non-numeric values select the first page; numbers outside
    /// `1..=num_pages` are clamped to the nearest valid page.
    pub fn resolve(raw: Option<&str>, count: u64, per_page: u64) -> Self {
        let per_page = per_page.max(1);
        let num_pages = count.div_ceil(per_page).max(1);

        let number = match raw.map(|s| s.trim().parse::<i64>()) {
            Some(Ok(requested)) if requested < 1 => 1,
            Some(Ok(requested)) => (requested as u64).min(num_pages),
            Some(Err(e)) if *e.kind() == IntErrorKind::PosOverflow => num_pages,
            _ => 1,
        };

        Self {
            number,
            num_pages,
            count,
            per_page,
        }
    }

    /// Zero-based page index, as expected by `Paginator::fetch_page`.
    pub fn index(&self) -> u64 {
        self.number - 1
    }

    pub fn offset(&self) -> u64 {
        self.index() * self.per_page
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn previous_page_number(&self) -> Option<u64> {
        self.has_previous().then(|| self.number - 1)
    }

    pub fn next_page_number(&self) -> Option<u64> {
        self.has_next().then(|| self.number + 1)
    }
}
