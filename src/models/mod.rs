//! Data models for Shelfkeeper

pub mod author;
pub mod book;
pub mod borrow;
pub mod category;
pub mod pagination;
pub mod user;

use validator::ValidationError;

// Re-export commonly used types
pub use author::Author;
pub use book::Book;
pub use borrow::{BorrowRecord, BorrowRecordView};
pub use category::Category;
pub use pagination::{PageRequest, Paginated};
pub use user::{Role, User};

/// Names and titles must contain something besides whitespace
pub(crate) fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("blank");
        error.message = Some("Must not be blank".into());
        return Err(error);
    }
    Ok(())
}
