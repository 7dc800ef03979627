//! Integration tests against a live PostgreSQL database.
//!
//! Run with: DATABASE_URL=postgres://... cargo test --test api_tests -- --ignored

use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use chrono::{Duration, Utc};
use sqlx::postgres::PgPoolOptions;
use tokio_test::{assert_err, assert_ok};
use tower::ServiceExt;

use shelfkeeper::{
    api,
    config::AuthConfig,
    error::AppError,
    models::{
        author::CreateAuthor,
        book::{Book, BookQuery, CreateBook, UpdateBook},
        borrow::{BorrowQuery, CreateBorrow, ReturnBorrow},
        user::{RegisterUser, Role, User},
    },
    repository::Repository,
    services::{auth::hash_password, Services},
    AppState,
};

static COUNTER: AtomicU32 = AtomicU32::new(0);

/// Names unique across test runs sharing one database
fn unique(prefix: &str) -> String {
    let n = COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("{}_{}_{}", prefix, Utc::now().timestamp_micros(), n)
}

async fn setup() -> Services {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("Failed to connect to database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    Services::new(Repository::new(pool), AuthConfig::default())
}

async fn create_user(services: &Services, role: Role) -> User {
    let hashed = hash_password("secret123").unwrap();
    services
        .repository
        .users
        .create(&unique("user"), None, role, &hashed)
        .await
        .unwrap()
}

async fn create_book(services: &Services, title: &str, quantity: i32) -> Book {
    services
        .catalog
        .create_book(&CreateBook {
            title: title.to_string(),
            published_year: Some(1965),
            quantity,
            author_id: None,
            category_id: None,
        })
        .await
        .unwrap()
}

fn borrow_request(user: &User, book: &Book, days: i64) -> CreateBorrow {
    CreateBorrow {
        user_id: user.id,
        book_id: book.id,
        due_date: (Utc::now() + Duration::days(days)).date_naive(),
    }
}

#[tokio::test]
#[ignore]
async fn test_register_assigns_member_role_and_rejects_duplicates() {
    let services = setup().await;
    let request = RegisterUser {
        username: unique("reader"),
        password: "secret123".to_string(),
        full_name: Some("Ada Reader".to_string()),
    };

    let user = assert_ok!(services.auth.register(&request).await);
    assert_eq!(user.role, Role::Member);
    assert!(user.is_active);

    let err = assert_err!(services.auth.register(&request).await);
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
#[ignore]
async fn test_login_token_authenticates() {
    let services = setup().await;
    let request = RegisterUser {
        username: unique("login"),
        password: "secret123".to_string(),
        full_name: None,
    };
    services.auth.register(&request).await.unwrap();

    let token = assert_ok!(services.auth.login(&request.username, "secret123").await);
    let user = assert_ok!(services.auth.authenticate(&token).await);
    assert_eq!(user.username, request.username);

    let err = assert_err!(services.auth.login(&request.username, "wrong-password").await);
    assert!(matches!(err, AppError::Authentication(_)));
}

#[tokio::test]
#[ignore]
async fn test_borrow_and_return_round_trip() {
    let services = setup().await;
    let librarian = create_user(&services, Role::Librarian).await;
    let member = create_user(&services, Role::Member).await;
    let book = create_book(&services, &unique("Dune"), 2).await;

    let record = assert_ok!(
        services
            .borrows
            .borrow(&librarian, &borrow_request(&member, &book, 14))
            .await
    );
    assert!(record.is_open());
    assert_eq!(services.catalog.get_book(book.id).await.unwrap().quantity, 1);

    let open = services.borrows.list_for_user(&librarian, member.id, true).await.unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].book_title, book.title);
    assert!(!open[0].is_overdue);

    let returned = assert_ok!(
        services
            .borrows
            .return_book(&librarian, &ReturnBorrow { user_id: member.id, book_id: book.id })
            .await
    );
    assert_eq!(returned.id, record.id);
    assert!(returned.returned_at.unwrap() >= returned.borrowed_at);
    assert_eq!(services.catalog.get_book(book.id).await.unwrap().quantity, 2);

    // Nothing left to return
    let err = assert_err!(
        services
            .borrows
            .return_book(&librarian, &ReturnBorrow { user_id: member.id, book_id: book.id })
            .await
    );
    assert!(matches!(err, AppError::RecordNotFound { .. }));
}

#[tokio::test]
#[ignore]
async fn test_concurrent_borrows_of_last_copy() {
    let services = setup().await;
    let librarian = create_user(&services, Role::Librarian).await;
    let first = create_user(&services, Role::Member).await;
    let second = create_user(&services, Role::Member).await;
    let book = create_book(&services, &unique("Solaris"), 1).await;

    let first_request = borrow_request(&first, &book, 7);
    let second_request = borrow_request(&second, &book, 7);
    let (a, b) = tokio::join!(
        services.borrows.borrow(&librarian, &first_request),
        services.borrows.borrow(&librarian, &second_request),
    );

    assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
    let refused = if a.is_err() { a } else { b };
    assert!(matches!(refused, Err(AppError::BookUnavailable(id)) if id == book.id));
    assert_eq!(services.catalog.get_book(book.id).await.unwrap().quantity, 0);
}

#[tokio::test]
#[ignore]
async fn test_borrow_refused_when_shelf_is_empty() {
    let services = setup().await;
    let librarian = create_user(&services, Role::Librarian).await;
    let member = create_user(&services, Role::Member).await;
    let book = create_book(&services, &unique("Out of print"), 0).await;

    let err = assert_err!(
        services
            .borrows
            .borrow(&librarian, &borrow_request(&member, &book, 7))
            .await
    );
    assert!(matches!(err, AppError::BookUnavailable(_)));
    assert_eq!(services.catalog.get_book(book.id).await.unwrap().quantity, 0);
}

#[tokio::test]
#[ignore]
async fn test_second_open_borrow_of_same_book_conflicts() {
    let services = setup().await;
    let librarian = create_user(&services, Role::Librarian).await;
    let member = create_user(&services, Role::Member).await;
    let book = create_book(&services, &unique("Neuromancer"), 3).await;
    let request = borrow_request(&member, &book, 7);

    assert_ok!(services.borrows.borrow(&librarian, &request).await);
    let err = assert_err!(services.borrows.borrow(&librarian, &request).await);
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(services.catalog.get_book(book.id).await.unwrap().quantity, 2);
}

#[tokio::test]
#[ignore]
async fn test_overdue_return_is_refused_without_side_effects() {
    let services = setup().await;
    let librarian = create_user(&services, Role::Librarian).await;
    let member = create_user(&services, Role::Member).await;
    let book = create_book(&services, &unique("Hyperion"), 1).await;

    let record = services
        .borrows
        .borrow(&librarian, &borrow_request(&member, &book, 7))
        .await
        .unwrap();

    sqlx::query(
        "UPDATE borrow_records SET borrowed_at = NOW() - INTERVAL '10 days', due_date = CURRENT_DATE - 3 WHERE id = $1",
    )
    .bind(record.id)
    .execute(&services.repository.pool)
    .await
    .unwrap();

    let err = assert_err!(
        services
            .borrows
            .return_book(&librarian, &ReturnBorrow { user_id: member.id, book_id: book.id })
            .await
    );
    assert!(matches!(err, AppError::OverdueReturn(id) if id == record.id));

    assert_eq!(services.catalog.get_book(book.id).await.unwrap().quantity, 0);
    let open = services.borrows.list_for_user(&librarian, member.id, true).await.unwrap();
    assert_eq!(open.len(), 1);
    assert!(open[0].is_overdue);
}

#[tokio::test]
#[ignore]
async fn test_past_due_date_is_rejected() {
    let services = setup().await;
    let librarian = create_user(&services, Role::Librarian).await;
    let member = create_user(&services, Role::Member).await;
    let book = create_book(&services, &unique("Ubik"), 1).await;

    let err = assert_err!(
        services
            .borrows
            .borrow(&librarian, &borrow_request(&member, &book, -2))
            .await
    );
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
#[ignore]
async fn test_members_cannot_lend_or_list_borrows() {
    let services = setup().await;
    let member = create_user(&services, Role::Member).await;
    let book = create_book(&services, &unique("Foundation"), 1).await;

    let err = assert_err!(
        services
            .borrows
            .borrow(&member, &borrow_request(&member, &book, 7))
            .await
    );
    assert!(matches!(err, AppError::Authorization(_)));

    let err = assert_err!(services.borrows.list(&member, &BorrowQuery::default()).await);
    assert!(matches!(err, AppError::Authorization(_)));
    assert_eq!(services.catalog.get_book(book.id).await.unwrap().quantity, 1);
}

#[tokio::test]
#[ignore]
async fn test_inactive_borrower_is_not_found() {
    let services = setup().await;
    let librarian = create_user(&services, Role::Librarian).await;
    let member = create_user(&services, Role::Member).await;
    let book = create_book(&services, &unique("Roadside Picnic"), 1).await;

    sqlx::query("UPDATE users SET is_active = FALSE WHERE id = $1")
        .bind(member.id)
        .execute(&services.repository.pool)
        .await
        .unwrap();

    let err = assert_err!(
        services
            .borrows
            .borrow(&librarian, &borrow_request(&member, &book, 7))
            .await
    );
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
#[ignore]
async fn test_book_with_open_borrow_cannot_be_deleted() {
    let services = setup().await;
    let librarian = create_user(&services, Role::Librarian).await;
    let member = create_user(&services, Role::Member).await;
    let book = create_book(&services, &unique("Stand on Zanzibar"), 1).await;

    services
        .borrows
        .borrow(&librarian, &borrow_request(&member, &book, 7))
        .await
        .unwrap();

    let err = assert_err!(services.catalog.delete_book(book.id).await);
    assert!(matches!(err, AppError::Conflict(_)));

    services
        .borrows
        .return_book(&librarian, &ReturnBorrow { user_id: member.id, book_id: book.id })
        .await
        .unwrap();
    assert_ok!(services.catalog.delete_book(book.id).await);

    let err = assert_err!(services.catalog.get_book(book.id).await);
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
#[ignore]
async fn test_book_search_pagination() {
    let services = setup().await;
    let prefix = unique("Series");
    for i in 0..25 {
        create_book(&services, &format!("{} volume {}", prefix, i), 1).await;
    }

    let query = BookQuery {
        q: Some(prefix.clone()),
        page: Some(3),
        size: Some(10),
        ..Default::default()
    };
    let page = assert_ok!(services.catalog.search_books(&query).await);
    assert_eq!(page.total, 25);
    assert_eq!(page.total_pages, 3);
    assert_eq!(page.items.len(), 5);

    let beyond = BookQuery {
        q: Some(prefix),
        page: Some(4),
        size: Some(10),
        ..Default::default()
    };
    let page = services.catalog.search_books(&beyond).await.unwrap();
    assert!(page.items.is_empty());
    assert_eq!(page.total, 25);
}

#[tokio::test]
#[ignore]
async fn test_member_listing_borrows_is_forbidden_before_query_checks() {
    let services = setup().await;
    let member = create_user(&services, Role::Member).await;
    let token = services
        .auth
        .issue_token(&member.username, member.role, None)
        .unwrap();
    let app = api::router(AppState {
        services: Arc::new(services),
    });

    let request = Request::builder()
        .uri("/api/v1/borrows?size=500")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore]
async fn test_null_author_unlinks_book() {
    let services = setup().await;
    let author = services
        .catalog
        .create_author(&CreateAuthor {
            name: unique("Le Guin"),
            biography: None,
            birth_date: None,
            death_date: None,
            nationality: None,
        })
        .await
        .unwrap();
    let book = services
        .catalog
        .create_book(&CreateBook {
            title: unique("The Dispossessed"),
            published_year: Some(1974),
            quantity: 1,
            author_id: Some(author.id),
            category_id: None,
        })
        .await
        .unwrap();
    assert_eq!(book.author_id, Some(author.id));

    // Absent field keeps the link
    let kept = assert_ok!(
        services
            .catalog
            .update_book(book.id, &UpdateBook { quantity: Some(2), ..Default::default() })
            .await
    );
    assert_eq!(kept.author_id, Some(author.id));

    let unlinked = assert_ok!(
        services
            .catalog
            .update_book(book.id, &UpdateBook { author_id: Some(None), ..Default::default() })
            .await
    );
    assert_eq!(unlinked.author_id, None);
    assert_eq!(unlinked.quantity, 2);
}
