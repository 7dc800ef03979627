//! Category endpoints (staff only)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        category::{Category, CategoryInput, CategoryQuery},
        pagination::{Paginated, PaginatedCategories},
        user::STAFF,
    },
    AppState,
};

use super::AuthenticatedUser;

/// List categories with name search and pagination
#[utoipa::path(
    get,
    path = "/categories",
    tag = "categories",
    security(("bearer_auth" = [])),
    params(CategoryQuery),
    responses(
        (status = 200, description = "Page of categories", body = PaginatedCategories),
        (status = 403, description = "Staff only")
    )
)]
pub async fn list_categories(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(query): Query<CategoryQuery>,
) -> AppResult<Json<Paginated<Category>>> {
    user.authorize(STAFF)?;
    query.validate()?;

    let page = state.services.catalog.search_categories(&query).await?;
    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/categories/{id}",
    tag = "categories",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category", body = Category),
        (status = 404, description = "Category not found")
    )
)]
pub async fn get_category(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Category>> {
    user.authorize(STAFF)?;

    let category = state.services.catalog.get_category(id).await?;
    Ok(Json(category))
}

#[utoipa::path(
    post,
    path = "/categories",
    tag = "categories",
    security(("bearer_auth" = [])),
    request_body = CategoryInput,
    responses(
        (status = 201, description = "Category created", body = Category)
    )
)]
pub async fn create_category(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(data): Json<CategoryInput>,
) -> AppResult<(StatusCode, Json<Category>)> {
    user.authorize(STAFF)?;
    data.validate()?;

    let category = state.services.catalog.create_category(&data.name).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

#[utoipa::path(
    put,
    path = "/categories/{id}",
    tag = "categories",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Category ID")),
    request_body = CategoryInput,
    responses(
        (status = 200, description = "Category renamed", body = Category),
        (status = 404, description = "Category not found")
    )
)]
pub async fn update_category(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<CategoryInput>,
) -> AppResult<Json<Category>> {
    user.authorize(STAFF)?;
    data.validate()?;

    let category = state.services.catalog.rename_category(id, &data.name).await?;
    Ok(Json(category))
}

/// Delete a category; its books become uncategorized
#[utoipa::path(
    delete,
    path = "/categories/{id}",
    tag = "categories",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Category ID")),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 404, description = "Category not found")
    )
)]
pub async fn delete_category(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    user.authorize(STAFF)?;

    state.services.catalog.delete_category(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
