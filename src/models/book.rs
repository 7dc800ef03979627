//! Book (catalog entry) model

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::not_blank;

/// Book model from database.
///
/// `quantity` counts copies currently on the shelf, not copies owned.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub published_year: Option<i32>,
    pub quantity: i32,
    pub author_id: Option<i32>,
    pub category_id: Option<i32>,
}

fn default_quantity() -> i32 {
    1
}

/// Create book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(
        length(min = 1, max = 255, message = "Title must be 1-255 characters"),
        custom(function = "not_blank")
    )]
    pub title: String,
    pub published_year: Option<i32>,
    #[serde(default = "default_quantity")]
    #[validate(range(min = 0, message = "Quantity cannot be negative"))]
    pub quantity: i32,
    pub author_id: Option<i32>,
    pub category_id: Option<i32>,
}

/// Update book request; absent fields are left untouched
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(
        length(min = 1, max = 255, message = "Title must be 1-255 characters"),
        custom(function = "not_blank")
    )]
    pub title: Option<String>,
    pub published_year: Option<i32>,
    #[validate(range(min = 0, message = "Quantity cannot be negative"))]
    pub quantity: Option<i32>,
    /// Absent keeps the author, `null` unlinks it
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<i32>, nullable)]
    pub author_id: Option<Option<i32>>,
    /// Absent keeps the category, `null` unlinks it
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<i32>, nullable)]
    pub category_id: Option<Option<i32>>,
}

/// Book search parameters
#[derive(Debug, Default, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BookQuery {
    /// Case-insensitive substring of the title
    pub q: Option<String>,
    pub category_id: Option<i32>,
    pub author_id: Option<i32>,
    #[validate(range(min = 1))]
    pub page: Option<i64>,
    #[validate(range(min = 1, max = 100))]
    pub size: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantity_defaults_to_one_copy() {
        let book: CreateBook = serde_json::from_str(r#"{"title": "Dune"}"#).unwrap();
        assert_eq!(book.quantity, 1);
        assert!(book.validate().is_ok());
    }

    #[test]
    fn negative_quantity_is_invalid() {
        let book: CreateBook =
            serde_json::from_str(r#"{"title": "Dune", "quantity": -1}"#).unwrap();
        assert!(book.validate().is_err());

        let update = UpdateBook {
            quantity: Some(-3),
            ..Default::default()
        };
        assert!(update.validate().is_err());
    }

    #[test]
    fn empty_title_is_invalid() {
        let book: CreateBook = serde_json::from_str(r#"{"title": ""}"#).unwrap();
        assert!(book.validate().is_err());
    }

    #[test]
    fn blank_title_is_invalid_on_create_and_update() {
        let book: CreateBook = serde_json::from_str(r#"{"title": " \t "}"#).unwrap();
        assert!(book.validate().is_err());

        let update = UpdateBook {
            title: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(update.validate().is_err());
    }

    #[test]
    fn null_reference_unlinks_while_absent_keeps() {
        let update: UpdateBook =
            serde_json::from_str(r#"{"author_id": null, "category_id": 4}"#).unwrap();
        assert_eq!(update.author_id, Some(None));
        assert_eq!(update.category_id, Some(Some(4)));

        let update: UpdateBook = serde_json::from_str(r#"{"title": "Dune"}"#).unwrap();
        assert_eq!(update.author_id, None);
        assert_eq!(update.category_id, None);
    }
}
