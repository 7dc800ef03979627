//! Borrow records repository: the transactional half of the borrow engine.
//!
//! Every mutation locks the book row first (`SELECT ... FOR UPDATE`), so all
//! borrows, returns and deletes touching one book are serialized by the
//! database. A transaction dropped before `commit` is rolled back, so an
//! early return below leaves quantity and records untouched.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Pool, Postgres, Transaction};

use crate::{
    error::{AppError, AppResult},
    models::{
        borrow::{ensure_available, ensure_returnable, BorrowRecord, BorrowRecordView},
        pagination::PageRequest,
    },
};

const RECORD_COLUMNS: &str = "id, user_id, book_id, borrowed_at, due_date, returned_at";

const VIEW_SELECT: &str = r#"
    SELECT r.id, r.user_id, u.username, r.book_id, b.title AS book_title,
           r.borrowed_at, r.due_date, r.returned_at,
           (r.returned_at IS NULL AND r.due_date < (NOW() AT TIME ZONE 'UTC')::date) AS is_overdue
    FROM borrow_records r
    JOIN users u ON u.id = r.user_id
    JOIN books b ON b.id = r.book_id
"#;

#[derive(Clone)]
pub struct BorrowsRepository {
    pool: Pool<Postgres>,
}

impl BorrowsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Lock the book row for the rest of the transaction and return its quantity
    async fn lock_book(tx: &mut Transaction<'_, Postgres>, book_id: i32) -> AppResult<Option<i32>> {
        let quantity = sqlx::query_scalar::<_, i32>("SELECT quantity FROM books WHERE id = $1 FOR UPDATE")
            .bind(book_id)
            .fetch_optional(&mut **tx)
            .await?;
        Ok(quantity)
    }

    /// Take one copy off the shelf and open a borrow record
    pub async fn borrow(
        &self,
        user_id: i32,
        book_id: i32,
        due_date: NaiveDate,
        now: DateTime<Utc>,
    ) -> AppResult<BorrowRecord> {
        let mut tx = self.pool.begin().await?;

        let quantity = Self::lock_book(&mut tx, book_id)
            .await?
            .ok_or(AppError::BookUnavailable(book_id))?;
        ensure_available(book_id, quantity)?;

        let already_open: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM borrow_records
                WHERE user_id = $1 AND book_id = $2 AND returned_at IS NULL
            )
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_one(&mut *tx)
        .await?;
        if already_open {
            return Err(AppError::Conflict(format!(
                "User {} already has book {} on loan",
                user_id, book_id
            )));
        }

        sqlx::query("UPDATE books SET quantity = quantity - 1 WHERE id = $1")
            .bind(book_id)
            .execute(&mut *tx)
            .await?;

        let record = sqlx::query_as::<_, BorrowRecord>(&format!(
            r#"
            INSERT INTO borrow_records (user_id, book_id, borrowed_at, due_date, returned_at)
            VALUES ($1, $2, $3, $4, NULL)
            RETURNING {}
            "#,
            RECORD_COLUMNS
        ))
        .bind(user_id)
        .bind(book_id)
        .bind(now)
        .bind(due_date)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            let err = AppError::from(e);
            if err.is_unique_violation() {
                AppError::Conflict(format!(
                    "User {} already has book {} on loan",
                    user_id, book_id
                ))
            } else {
                err
            }
        })?;

        tx.commit().await?;
        Ok(record)
    }

    /// Close the open borrow for (user, book) and put the copy back on the shelf
    pub async fn return_book(
        &self,
        user_id: i32,
        book_id: i32,
        now: DateTime<Utc>,
    ) -> AppResult<BorrowRecord> {
        let not_found = || AppError::RecordNotFound { user_id, book_id };

        let mut tx = self.pool.begin().await?;

        Self::lock_book(&mut tx, book_id).await?.ok_or_else(not_found)?;

        let record = sqlx::query_as::<_, BorrowRecord>(&format!(
            r#"
            SELECT {} FROM borrow_records
            WHERE user_id = $1 AND book_id = $2 AND returned_at IS NULL
            FOR UPDATE
            "#,
            RECORD_COLUMNS
        ))
        .bind(user_id)
        .bind(book_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(not_found)?;

        ensure_returnable(&record, now.date_naive())?;

        sqlx::query("UPDATE books SET quantity = quantity + 1 WHERE id = $1")
            .bind(book_id)
            .execute(&mut *tx)
            .await?;

        let returned = sqlx::query_as::<_, BorrowRecord>(&format!(
            r#"
            UPDATE borrow_records SET returned_at = GREATEST($1, borrowed_at)
            WHERE id = $2
            RETURNING {}
            "#,
            RECORD_COLUMNS
        ))
        .bind(now)
        .bind(record.id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(returned)
    }

    /// Page through all borrow records with borrower and title resolved
    pub async fn list(&self, page: PageRequest) -> AppResult<(Vec<BorrowRecordView>, i64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM borrow_records")
            .fetch_one(&self.pool)
            .await?;

        let records = sqlx::query_as::<_, BorrowRecordView>(&format!(
            "{} ORDER BY r.id LIMIT $1 OFFSET $2",
            VIEW_SELECT
        ))
        .bind(page.size)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((records, total))
    }

    /// All borrow records of one user, oldest first
    pub async fn list_for_user(&self, user_id: i32, open_only: bool) -> AppResult<Vec<BorrowRecordView>> {
        let records = sqlx::query_as::<_, BorrowRecordView>(&format!(
            "{} WHERE r.user_id = $1 AND ($2 = FALSE OR r.returned_at IS NULL) ORDER BY r.id",
            VIEW_SELECT
        ))
        .bind(user_id)
        .bind(open_only)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}
