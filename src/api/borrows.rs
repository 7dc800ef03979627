//! Borrow and return endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        borrow::{BorrowQuery, BorrowRecord, BorrowRecordView, CreateBorrow, ReturnBorrow, UserBorrowsQuery},
        pagination::{Paginated, PaginatedBorrows},
        user::STAFF,
    },
    AppState,
};

use super::AuthenticatedUser;

/// Lend a book to a user
#[utoipa::path(
    post,
    path = "/borrows",
    tag = "borrows",
    security(("bearer_auth" = [])),
    request_body = CreateBorrow,
    responses(
        (status = 201, description = "Borrow recorded", body = BorrowRecord),
        (status = 400, description = "Due date in the past"),
        (status = 403, description = "Staff only"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Book unavailable or already on loan to this user")
    )
)]
pub async fn create_borrow(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(request): Json<CreateBorrow>,
) -> AppResult<(StatusCode, Json<BorrowRecord>)> {
    let record = state.services.borrows.borrow(&user, &request).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/borrows/return",
    tag = "borrows",
    security(("bearer_auth" = [])),
    request_body = ReturnBorrow,
    responses(
        (status = 200, description = "Book returned", body = BorrowRecord),
        (status = 403, description = "Staff only"),
        (status = 404, description = "No open borrow for this user and book"),
        (status = 422, description = "Borrow is overdue")
    )
)]
pub async fn return_borrow(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(request): Json<ReturnBorrow>,
) -> AppResult<Json<BorrowRecord>> {
    let record = state.services.borrows.return_book(&user, &request).await?;
    Ok(Json(record))
}

/// List all borrow records
#[utoipa::path(
    get,
    path = "/borrows",
    tag = "borrows",
    security(("bearer_auth" = [])),
    params(BorrowQuery),
    responses(
        (status = 200, description = "Page of borrow records", body = PaginatedBorrows),
        (status = 400, description = "Invalid pagination"),
        (status = 403, description = "Staff only")
    )
)]
pub async fn list_borrows(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(query): Query<BorrowQuery>,
) -> AppResult<Json<Paginated<BorrowRecordView>>> {
    user.authorize(STAFF)?;
    query.validate()?;

    let page = state.services.borrows.list(&user, &query).await?;
    Ok(Json(page))
}

/// Borrow history of one user
#[utoipa::path(
    get,
    path = "/users/{id}/borrows",
    tag = "borrows",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "User ID"),
        UserBorrowsQuery
    ),
    responses(
        (status = 200, description = "User's borrow records", body = Vec<BorrowRecordView>),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user_borrows(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(user_id): Path<i32>,
    Query(query): Query<UserBorrowsQuery>,
) -> AppResult<Json<Vec<BorrowRecordView>>> {
    let records = state
        .services
        .borrows
        .list_for_user(&user, user_id, query.open_only.unwrap_or(false))
        .await?;
    Ok(Json(records))
}
