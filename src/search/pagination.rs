use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PER_PAGE: i64 = 20;
pub const MAX_PER_PAGE: i64 = 100;

/// PageRequest
///
/// A clamped page window: `page >= 1`, `1 <= per_page <= 100`. Construction never fails;
/// out-of-range input is pulled back into bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: i64,
    per_page: i64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

impl PageRequest {
    pub fn new(page: Option<i64>, per_page: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(DEFAULT_PAGE).max(1),
            per_page: per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE),
        }
    }

    pub fn page(&self) -> i64 {
        self.page
    }

    pub fn per_page(&self) -> i64 {
        self.per_page
    }

    /// Saturates rather than overflowing for absurd page numbers; such a page is simply empty.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }

    pub fn limit(&self) -> i64 {
        self.per_page
    }

    pub fn meta(&self, total: i64) -> PageMeta {
        let total = total.max(0);
        let pages = if total == 0 {
            0
        } else {
            (total + self.per_page - 1) / self.per_page
        };
        PageMeta {
            page: self.page,
            per_page: self.per_page,
            total,
            pages,
            has_prev: self.page > 1,
            has_next: self.page < pages,
        }
    }
}

/// PageMeta
///
/// The `pagination` object attached to every paginated response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct PageMeta {
    pub page: i64,
    pub per_page: i64,
    /// Number of records matching the filters, across all pages.
    pub total: i64,
    /// `ceil(total / per_page)`; 0 when nothing matches.
    pub pages: i64,
    pub has_prev: bool,
    pub has_next: bool,
}

/// Page
///
/// One window of an ordered result set plus its metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub meta: PageMeta,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            meta: self.meta,
        }
    }
}

/// Cuts the window described by `request` out of an already ordered slice.
pub fn paginate_slice<T: Clone>(ordered: &[T], request: PageRequest) -> Page<T> {
    let total = ordered.len() as i64;
    let offset = usize::try_from(request.offset()).unwrap_or(usize::MAX);
    let limit = usize::try_from(request.limit()).unwrap_or(usize::MAX);
    Page {
        items: ordered.iter().skip(offset).take(limit).cloned().collect(),
        meta: request.meta(total),
    }
}

/// PageParams
///
/// `page` / `per_page` query parameters for endpoints without other filters.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl PageParams {
    pub fn request(&self) -> PageRequest {
        PageRequest::new(self.page, self.per_page)
    }
}
