//! Borrow/return service: the entry point of the borrow engine.
//!
//! Borrowing is staff-initiated: an admin or librarian records a loan on
//! behalf of a target user. Members can only read the catalog.

use chrono::Utc;

use crate::{
    error::{AppError, AppResult},
    models::{
        borrow::{ensure_due_date, BorrowQuery, BorrowRecord, BorrowRecordView, CreateBorrow, ReturnBorrow},
        pagination::{PageRequest, Paginated},
        user::{User, STAFF},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct BorrowsService {
    repository: Repository,
}

impl BorrowsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Lend one copy of a book to a user
    pub async fn borrow(&self, actor: &User, request: &CreateBorrow) -> AppResult<BorrowRecord> {
        actor.authorize(STAFF)?;

        let now = Utc::now();
        ensure_due_date(request.due_date, now.date_naive())?;

        let borrower = self.repository.users.get_by_id(request.user_id).await?;
        if !borrower.is_active {
            return Err(AppError::NotFound(format!(
                "User with id {} is not active",
                request.user_id
            )));
        }

        let result = self
            .repository
            .borrows
            .borrow(request.user_id, request.book_id, request.due_date, now)
            .await;

        match &result {
            Ok(record) => tracing::info!(
                borrow_id = record.id,
                user_id = record.user_id,
                book_id = record.book_id,
                due_date = %record.due_date,
                actor = %actor.username,
                "Book borrowed"
            ),
            Err(e) => tracing::warn!(
                user_id = request.user_id,
                book_id = request.book_id,
                actor = %actor.username,
                "Borrow refused: {}",
                e
            ),
        }

        result
    }

    /// Return the open borrow of a book by a user
    pub async fn return_book(&self, actor: &User, request: &ReturnBorrow) -> AppResult<BorrowRecord> {
        actor.authorize(STAFF)?;

        let result = self
            .repository
            .borrows
            .return_book(request.user_id, request.book_id, Utc::now())
            .await;

        match &result {
            Ok(record) => tracing::info!(
                borrow_id = record.id,
                user_id = record.user_id,
                book_id = record.book_id,
                actor = %actor.username,
                "Book returned"
            ),
            Err(e) => tracing::warn!(
                user_id = request.user_id,
                book_id = request.book_id,
                actor = %actor.username,
                "Return refused: {}",
                e
            ),
        }

        result
    }

    pub async fn list(&self, actor: &User, query: &BorrowQuery) -> AppResult<Paginated<BorrowRecordView>> {
        actor.authorize(STAFF)?;

        let page = PageRequest::new(query.page, query.size);
        let (items, total) = self.repository.borrows.list(page).await?;
        Ok(Paginated::new(items, total, page))
    }

    pub async fn list_for_user(
        &self,
        actor: &User,
        user_id: i32,
        open_only: bool,
    ) -> AppResult<Vec<BorrowRecordView>> {
        actor.authorize(STAFF)?;

        // Verify user exists
        self.repository.users.get_by_id(user_id).await?;
        self.repository.borrows.list_for_user(user_id, open_only).await
    }
}
