//! Borrow records and the rules that guard their lifecycle

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Borrow record from database. `returned_at = None` marks an open borrow.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BorrowRecord {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub borrowed_at: DateTime<Utc>,
    pub due_date: NaiveDate,
    pub returned_at: Option<DateTime<Utc>>,
}

impl BorrowRecord {
    pub fn is_open(&self) -> bool {
        self.returned_at.is_none()
    }

    /// Overdue once the calendar day after `due_date` has started
    pub fn is_overdue_on(&self, today: NaiveDate) -> bool {
        self.is_open() && today > self.due_date
    }
}

/// Borrow record joined with the borrower's username and the book title
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BorrowRecordView {
    pub id: i32,
    pub user_id: i32,
    pub username: String,
    pub book_id: i32,
    pub book_title: String,
    pub borrowed_at: DateTime<Utc>,
    pub due_date: NaiveDate,
    pub returned_at: Option<DateTime<Utc>>,
    pub is_overdue: bool,
}

/// Borrow request (staff acting on behalf of a user)
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateBorrow {
    pub user_id: i32,
    pub book_id: i32,
    /// Last day the book may be returned (YYYY-MM-DD)
    pub due_date: NaiveDate,
}

/// Return request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ReturnBorrow {
    pub user_id: i32,
    pub book_id: i32,
}

#[derive(Debug, Default, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BorrowQuery {
    #[validate(range(min = 1))]
    pub page: Option<i64>,
    #[validate(range(min = 1, max = 100))]
    pub size: Option<i64>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserBorrowsQuery {
    /// Only borrows that have not been returned
    pub open_only: Option<bool>,
}

/// A copy can be lent only while at least one is on the shelf
pub fn ensure_available(book_id: i32, quantity: i32) -> AppResult<()> {
    if quantity < 1 {
        return Err(AppError::BookUnavailable(book_id));
    }
    Ok(())
}

/// Due dates in the past would create a borrow that is overdue on creation
pub fn ensure_due_date(due_date: NaiveDate, today: NaiveDate) -> AppResult<()> {
    if due_date < today {
        return Err(AppError::Validation(format!(
            "Due date {} is before today ({})",
            due_date, today
        )));
    }
    Ok(())
}

/// An open record may be returned only up to and including its due date
pub fn ensure_returnable(record: &BorrowRecord, today: NaiveDate) -> AppResult<()> {
    if record.is_overdue_on(today) {
        return Err(AppError::OverdueReturn(record.id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn open_record(due_date: NaiveDate) -> BorrowRecord {
        BorrowRecord {
            id: 7,
            user_id: 1,
            book_id: 2,
            borrowed_at: Utc::now(),
            due_date,
            returned_at: None,
        }
    }

    #[test]
    fn zero_quantity_is_unavailable() {
        assert!(matches!(ensure_available(4, 0), Err(AppError::BookUnavailable(4))));
        assert!(ensure_available(4, 1).is_ok());
    }

    #[test]
    fn return_allowed_through_the_due_date() {
        let record = open_record(date(2026, 3, 10));
        assert!(ensure_returnable(&record, date(2026, 3, 9)).is_ok());
        assert!(ensure_returnable(&record, date(2026, 3, 10)).is_ok());
    }

    #[test]
    fn return_after_due_date_is_overdue() {
        let record = open_record(date(2026, 3, 10));
        assert!(matches!(
            ensure_returnable(&record, date(2026, 3, 11)),
            Err(AppError::OverdueReturn(7))
        ));
    }

    #[test]
    fn closed_records_are_never_overdue() {
        let mut record = open_record(date(2020, 1, 1));
        record.returned_at = Some(Utc::now());
        assert!(!record.is_open());
        assert!(!record.is_overdue_on(date(2026, 1, 1)));
    }

    #[test]
    fn due_date_must_not_be_in_the_past() {
        let today = date(2026, 5, 1);
        assert!(ensure_due_date(today, today).is_ok());
        assert!(ensure_due_date(date(2026, 5, 30), today).is_ok());
        assert!(matches!(
            ensure_due_date(date(2026, 4, 30), today),
            Err(AppError::Validation(_))
        ));
    }
}
