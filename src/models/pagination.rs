//! Page requests and the paginated response envelope

use serde::Serialize;
use utoipa::ToSchema;

use super::{author::Author, book::Book, borrow::BorrowRecordView, category::Category};

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

/// A validated page window (page >= 1, 1 <= size <= 100)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub size: i64,
}

impl PageRequest {
    /// Build from already-validated query parameters, applying defaults
    pub fn new(page: Option<i64>, size: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            size: size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Rows to skip; saturates so huge page numbers read past the end
    pub fn offset(&self) -> i64 {
        self.page.saturating_sub(1).saturating_mul(self.size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Paginated response wrapper
#[derive(Debug, Serialize, ToSchema)]
#[aliases(
    PaginatedAuthors = Paginated<Author>,
    PaginatedCategories = Paginated<Category>,
    PaginatedBooks = Paginated<Book>,
    PaginatedBorrows = Paginated<BorrowRecordView>
)]
pub struct Paginated<T>
where
    T: for<'a> ToSchema<'a>,
{
    pub items: Vec<T>,
    /// Total number of matching rows
    pub total: i64,
    pub page: i64,
    pub size: i64,
    pub total_pages: i64,
}

impl<T> Paginated<T>
where
    T: for<'a> ToSchema<'a>,
{
    pub fn new(items: Vec<T>, total: i64, request: PageRequest) -> Self {
        Self {
            items,
            total,
            page: request.page,
            size: request.size,
            total_pages: total_pages(total, request.size),
        }
    }
}

/// ceil(total / size)
pub fn total_pages(total: i64, size: i64) -> i64 {
    if size <= 0 {
        return 0;
    }
    (total + size - 1) / size
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_page_of_twenty_five() {
        let request = PageRequest::new(Some(2), Some(10));
        assert_eq!(request.offset(), 10);
        assert_eq!(total_pages(25, 10), 3);

        let page: Paginated<Category> = Paginated::new(Vec::new(), 25, request);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.page, 2);
        assert_eq!(page.size, 10);
    }

    #[test]
    fn total_pages_edges() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
        assert_eq!(total_pages(1, 100), 1);
    }

    #[test]
    fn defaults_are_first_page_of_ten() {
        let request = PageRequest::default();
        assert_eq!(request, PageRequest { page: 1, size: 10 });
        assert_eq!(request.offset(), 0);
    }

    #[test]
    fn huge_page_number_does_not_overflow_offset() {
        let request = PageRequest::new(Some(i64::MAX), Some(10));
        assert_eq!(request.page, i64::MAX);
        assert_eq!(request.offset(), i64::MAX);
    }
}
