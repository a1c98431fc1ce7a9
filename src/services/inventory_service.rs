//! Domain service for tenant-scoped categories and items.
//!
//! Every operation takes the authenticated account and re-checks ownership
//! before touching a row. Successful mutations append to the activity log in
//! the same transaction.

use serde::Serialize;
use thiserror::Error;

use crate::domain::{AccountId, AdjustDirection};
use crate::entities::{categories, items};

/// Errors specific to inventory operations.
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(&'static str),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for InventoryError {
    fn from(err: sea_orm::DbErr) -> Self {
        if crate::db::is_unique_violation(&err) {
            return Self::Conflict("Name already exists");
        }
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for InventoryError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDto {
    pub id: i32,
    pub name: String,
    pub created_at: i64,
}

impl From<categories::Model> for CategoryDto {
    fn from(model: categories::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ItemDto {
    pub id: i32,
    pub category_id: i32,
    pub category_name: String,
    pub name: String,
    pub quantity: f64,
    pub unit: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl ItemDto {
    #[must_use]
    pub fn new(model: items::Model, category_name: String) -> Self {
        Self {
            id: model.id,
            category_id: model.category_id,
            category_name,
            name: model.name,
            quantity: model.quantity,
            unit: model.unit,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// A category with the subset of its items that survived the search filter.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryWithItems {
    #[serde(flatten)]
    pub category: CategoryDto,
    pub items: Vec<ItemDto>,
    /// Presentation hint: a search is active and this category has matches.
    pub is_expanded: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewItem {
    pub category_id: i32,
    pub name: String,
    pub quantity: f64,
    pub unit: String,
}

/// Partial item update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemChanges {
    pub name: Option<String>,
    pub unit: Option<String>,
}

/// Domain service trait for inventory mutations and reads.
#[async_trait::async_trait]
pub trait InventoryService: Send + Sync {
    /// Lists every category of the account with its items. With a search term,
    /// only items whose name or category name contains it (case-insensitive)
    /// are kept; categories are always listed.
    async fn list_inventory(
        &self,
        account: AccountId,
        search: Option<&str>,
    ) -> Result<Vec<CategoryWithItems>, InventoryError>;

    /// # Errors
    ///
    /// Returns [`InventoryError::Conflict`] if the account already has a category with that name.
    async fn create_category(
        &self,
        account: AccountId,
        name: &str,
    ) -> Result<CategoryDto, InventoryError>;

    async fn rename_category(
        &self,
        account: AccountId,
        id: i32,
        name: &str,
    ) -> Result<CategoryDto, InventoryError>;

    /// Deletes the category and every item in it.
    async fn delete_category(&self, account: AccountId, id: i32) -> Result<(), InventoryError>;

    /// # Errors
    ///
    /// Returns [`InventoryError::NotFound`] if the category is not owned by `account`.
    async fn create_item(&self, account: AccountId, item: NewItem)
    -> Result<ItemDto, InventoryError>;

    async fn update_item(
        &self,
        account: AccountId,
        id: i32,
        changes: ItemChanges,
    ) -> Result<ItemDto, InventoryError>;

    /// Adds to or takes from the quantity. Taking more than is on hand leaves zero.
    async fn adjust_quantity(
        &self,
        account: AccountId,
        id: i32,
        direction: AdjustDirection,
        amount: f64,
    ) -> Result<ItemDto, InventoryError>;

    async fn delete_item(&self, account: AccountId, id: i32) -> Result<(), InventoryError>;
}

/// Trims and rejects empty names.
pub fn clean_name(raw: &str, what: &str) -> Result<String, InventoryError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(InventoryError::Validation(format!("{what} name is required")));
    }
    Ok(trimmed.to_string())
}

/// Quantities and amounts must be finite and non-negative.
pub fn check_amount(value: f64, field: &str) -> Result<f64, InventoryError> {
    if !value.is_finite() || value < 0.0 {
        return Err(InventoryError::Validation(format!(
            "{field} must be a non-negative number"
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_trimmed_and_required() {
        assert_eq!(clean_name("  Dry Goods ", "Category").unwrap(), "Dry Goods");
        assert!(matches!(
            clean_name("   ", "Category"),
            Err(InventoryError::Validation(_))
        ));
    }

    #[test]
    fn amounts_must_be_finite_and_non_negative() {
        assert!(check_amount(0.0, "amount").is_ok());
        assert!(check_amount(2.5, "amount").is_ok());
        assert!(check_amount(-1.0, "amount").is_err());
        assert!(check_amount(f64::NAN, "amount").is_err());
        assert!(check_amount(f64::INFINITY, "amount").is_err());
    }

    #[test]
    fn category_with_items_flattens_category_fields() {
        let view = CategoryWithItems {
            category: CategoryDto {
                id: 3,
                name: "Seafood".to_string(),
                created_at: 10,
            },
            items: vec![],
            is_expanded: false,
        };

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["name"], "Seafood");
        assert_eq!(json["createdAt"], 10);
        assert_eq!(json["isExpanded"], false);
        assert!(json["items"].as_array().unwrap().is_empty());
    }
}
