//! Books repository for database operations

use sqlx::{Pool, Postgres};

use super::search_term;
use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookQuery, CreateBook, UpdateBook},
        pagination::PageRequest,
    },
};

const BOOK_COLUMNS: &str = "id, title, published_year, quantity, author_id, category_id";

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(&format!("SELECT {} FROM books WHERE id = $1", BOOK_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Search books by title, category and author with pagination
    pub async fn search(&self, query: &BookQuery, page: PageRequest) -> AppResult<(Vec<Book>, i64)> {
        let pattern = search_term(query.q.as_deref());

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM books
            WHERE ($1::text IS NULL OR title ILIKE $1)
              AND ($2::int IS NULL OR category_id = $2)
              AND ($3::int IS NULL OR author_id = $3)
            "#,
        )
        .bind(&pattern)
        .bind(query.category_id)
        .bind(query.author_id)
        .fetch_one(&self.pool)
        .await?;

        let books = sqlx::query_as::<_, Book>(&format!(
            r#"
            SELECT {} FROM books
            WHERE ($1::text IS NULL OR title ILIKE $1)
              AND ($2::int IS NULL OR category_id = $2)
              AND ($3::int IS NULL OR author_id = $3)
            ORDER BY id
            LIMIT $4 OFFSET $5
            "#,
            BOOK_COLUMNS
        ))
        .bind(&pattern)
        .bind(query.category_id)
        .bind(query.author_id)
        .bind(page.size)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((books, total))
    }

    /// Create book
    pub async fn create(&self, data: &CreateBook) -> AppResult<Book> {
        let book = sqlx::query_as::<_, Book>(&format!(
            r#"
            INSERT INTO books (title, published_year, quantity, author_id, category_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            BOOK_COLUMNS
        ))
        .bind(&data.title)
        .bind(data.published_year)
        .bind(data.quantity)
        .bind(data.author_id)
        .bind(data.category_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(book)
    }

    /// Update the provided fields of a book
    pub async fn update(&self, id: i32, data: &UpdateBook) -> AppResult<Book> {
        let mut sets = Vec::new();
        let mut idx = 1;

        macro_rules! add_field {
            ($field:expr, $name:expr) => {
                if $field.is_some() {
                    sets.push(format!("{} = ${}", $name, idx));
                    idx += 1;
                }
            };
        }

        add_field!(data.title, "title");
        add_field!(data.published_year, "published_year");
        add_field!(data.quantity, "quantity");
        add_field!(data.author_id, "author_id");
        add_field!(data.category_id, "category_id");

        if sets.is_empty() {
            return self.get_by_id(id).await;
        }

        let query = format!(
            "UPDATE books SET {} WHERE id = ${} RETURNING {}",
            sets.join(", "),
            idx,
            BOOK_COLUMNS
        );

        let mut builder = sqlx::query_as::<_, Book>(&query);

        macro_rules! bind_field {
            ($field:expr) => {
                if let Some(ref val) = $field {
                    builder = builder.bind(val);
                }
            };
        }

        bind_field!(data.title);
        bind_field!(data.published_year);
        bind_field!(data.quantity);
        bind_field!(data.author_id);
        bind_field!(data.category_id);

        builder
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Delete a book and its closed borrow history.
    ///
    /// Takes the same row lock as the borrow engine so a concurrent borrow
    /// cannot slip in between the open-borrow check and the delete.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let locked: Option<i32> = sqlx::query_scalar("SELECT id FROM books WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }

        let open_borrows: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM borrow_records WHERE book_id = $1 AND returned_at IS NULL",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        if open_borrows > 0 {
            return Err(AppError::Conflict(format!(
                "Book {} has {} open borrow(s)",
                id, open_borrows
            )));
        }

        sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
