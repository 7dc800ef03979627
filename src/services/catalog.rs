//! Catalog management service: authors, categories and books

use crate::{
    error::{AppError, AppResult},
    models::{
        author::{Author, AuthorQuery, CreateAuthor, UpdateAuthor},
        book::{Book, BookQuery, CreateBook, UpdateBook},
        category::{Category, CategoryQuery},
        pagination::{PageRequest, Paginated},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    // --- Authors ---

    pub async fn search_authors(&self, query: &AuthorQuery) -> AppResult<Paginated<Author>> {
        let page = PageRequest::new(query.page, query.size);
        let (items, total) = self.repository.authors.search(query.q.as_deref(), page).await?;
        Ok(Paginated::new(items, total, page))
    }

    pub async fn get_author(&self, id: i32) -> AppResult<Author> {
        self.repository.authors.get_by_id(id).await
    }

    pub async fn create_author(&self, data: &CreateAuthor) -> AppResult<Author> {
        let author = self.repository.authors.create(data).await?;
        tracing::info!(author_id = author.id, "Created author");
        Ok(author)
    }

    pub async fn update_author(&self, id: i32, data: &UpdateAuthor) -> AppResult<Author> {
        self.repository.authors.update(id, data).await
    }

    pub async fn delete_author(&self, id: i32) -> AppResult<()> {
        self.repository.authors.delete(id).await?;
        tracing::info!(author_id = id, "Deleted author");
        Ok(())
    }

    // --- Categories ---

    pub async fn search_categories(&self, query: &CategoryQuery) -> AppResult<Paginated<Category>> {
        let page = PageRequest::new(query.page, query.size);
        let (items, total) = self.repository.categories.search(query.q.as_deref(), page).await?;
        Ok(Paginated::new(items, total, page))
    }

    pub async fn get_category(&self, id: i32) -> AppResult<Category> {
        self.repository.categories.get_by_id(id).await
    }

    pub async fn create_category(&self, name: &str) -> AppResult<Category> {
        self.repository.categories.create(name.trim()).await
    }

    pub async fn rename_category(&self, id: i32, name: &str) -> AppResult<Category> {
        self.repository.categories.rename(id, name.trim()).await
    }

    pub async fn delete_category(&self, id: i32) -> AppResult<()> {
        self.repository.categories.delete(id).await?;
        tracing::info!(category_id = id, "Deleted category");
        Ok(())
    }

    // --- Books ---

    pub async fn search_books(&self, query: &BookQuery) -> AppResult<Paginated<Book>> {
        let page = PageRequest::new(query.page, query.size);
        let (items, total) = self.repository.books.search(query, page).await?;
        Ok(Paginated::new(items, total, page))
    }

    pub async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await
    }

    pub async fn create_book(&self, data: &CreateBook) -> AppResult<Book> {
        self.check_references(data.author_id, data.category_id).await?;
        let book = self.repository.books.create(data).await?;
        tracing::info!(book_id = book.id, quantity = book.quantity, "Created book");
        Ok(book)
    }

    pub async fn update_book(&self, id: i32, data: &UpdateBook) -> AppResult<Book> {
        self.check_references(data.author_id.flatten(), data.category_id.flatten())
            .await?;
        self.repository.books.update(id, data).await
    }

    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        self.repository.books.delete(id).await?;
        tracing::info!(book_id = id, "Deleted book");
        Ok(())
    }

    /// Referenced author and category must exist
    async fn check_references(&self, author_id: Option<i32>, category_id: Option<i32>) -> AppResult<()> {
        if let Some(id) = author_id {
            if !self.repository.authors.exists(id).await? {
                return Err(AppError::NotFound(format!("Author with id {} not found", id)));
            }
        }
        if let Some(id) = category_id {
            if !self.repository.categories.exists(id).await? {
                return Err(AppError::NotFound(format!("Category with id {} not found", id)));
            }
        }
        Ok(())
    }
}
