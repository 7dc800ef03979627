//! Shelfkeeper library management server
//!
//! REST JSON API for a small library: catalog of books, authors and
//! categories, role-based accounts and a borrow/return engine that keeps
//! shelf quantities consistent under concurrent requests.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub services: Arc<services::Services>,
}
