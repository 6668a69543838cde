//! Page-number pagination for list resources

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::{AppError, AppResult};

use super::{author::AuthorSummary, book::BookSummary, book_instance::InstanceListing};

/// `?page=N` or `?page=last`
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    pub page: Option<String>,
}

/// Resolves page numbers against a known row count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    pub total: i64,
    pub per_page: i64,
}

impl Paginator {
    pub fn new(total: i64, per_page: i64) -> Self {
        Self {
            total: total.max(0),
            per_page: per_page.max(1),
        }
    }

    /// Always at least one page, even when there are no rows
    pub fn num_pages(&self) -> i64 {
        if self.total == 0 {
            1
        } else {
            (self.total + self.per_page - 1) / self.per_page
        }
    }

    /// Validate a requested page; missing means the first page.
    pub fn resolve(&self, requested: Option<&str>) -> AppResult<i64> {
        let page = match requested.map(str::trim) {
            None | Some("") => 1,
            Some("last") => self.num_pages(),
            Some(raw) => raw
                .parse::<i64>()
                .map_err(|_| AppError::NotFound("Page is not a number".to_string()))?,
        };

        if page < 1 || page > self.num_pages() {
            return Err(AppError::NotFound(format!("Invalid page ({})", page)));
        }
        Ok(page)
    }

    pub fn offset(&self, page: i64) -> i64 {
        (page - 1) * self.per_page
    }

    /// Row count of the given page
    pub fn page_len(&self, page: i64) -> i64 {
        (self.total - self.offset(page)).clamp(0, self.per_page)
    }
}

/// Paginated response wrapper
#[derive(Debug, Serialize, ToSchema)]
#[aliases(
    BookPage = Page<BookSummary>,
    AuthorPage = Page<AuthorSummary>,
    InstancePage = Page<InstanceListing>
)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Total number of rows across all pages
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub num_pages: i64,
    pub is_paginated: bool,
    pub has_next: bool,
    pub has_previous: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, paginator: Paginator, page: i64) -> Self {
        let num_pages = paginator.num_pages();
        Self {
            items,
            total: paginator.total,
            page,
            per_page: paginator.per_page,
            num_pages,
            is_paginated: num_pages > 1,
            has_next: page < num_pages,
            has_previous: page > 1,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
            num_pages: self.num_pages,
            is_paginated: self.is_paginated,
            has_next: self.has_next,
            has_previous: self.has_previous,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nine_authors_five_per_page() {
        let p = Paginator::new(9, 5);
        assert_eq!(p.num_pages(), 2);
        assert_eq!(p.page_len(1), 5);
        assert_eq!(p.page_len(2), 4);
        assert_eq!(p.offset(2), 5);
    }

    #[test]
    fn last_page_is_full_when_divisible() {
        for total in 1..=40 {
            let p = Paginator::new(total, 5);
            let last = p.resolve(Some("last")).unwrap();
            let expected = if total % 5 == 0 { 5 } else { total % 5 };
            assert_eq!(p.page_len(last), expected, "total {}", total);
        }
    }

    #[test]
    fn empty_list_still_has_first_page() {
        let p = Paginator::new(0, 10);
        assert_eq!(p.num_pages(), 1);
        assert_eq!(p.resolve(None).unwrap(), 1);
        assert_eq!(p.page_len(1), 0);
    }

    #[test]
    fn out_of_range_pages_are_not_found() {
        let p = Paginator::new(9, 5);
        assert!(matches!(p.resolve(Some("3")), Err(AppError::NotFound(_))));
        assert!(matches!(p.resolve(Some("0")), Err(AppError::NotFound(_))));
        assert!(matches!(p.resolve(Some("abc")), Err(AppError::NotFound(_))));
        assert_eq!(p.resolve(Some("2")).unwrap(), 2);
    }

    #[test]
    fn page_flags() {
        let p = Paginator::new(9, 5);
        let first: Page<i32> = Page::new(vec![1, 2, 3, 4, 5], p, 1);
        assert!(first.is_paginated && first.has_next && !first.has_previous);
        let single: Page<i32> = Page::new(vec![1], Paginator::new(1, 5), 1);
        assert!(!single.is_paginated && !single.has_next);
    }
}
