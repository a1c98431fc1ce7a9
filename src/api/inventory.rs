use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;

use super::validation::{validate_amount, validate_entity_id};
use super::{
    AdjustRequest, ApiError, ApiResponse, AppState, CategoryRequest, CreateItemRequest,
    InventoryQuery, MessageResponse, UpdateItemRequest,
};
use crate::domain::AdjustDirection;
use crate::services::{
    AuthenticatedAccount, CategoryDto, CategoryWithItems, ItemChanges, ItemDto, NewItem,
};

const DEFAULT_UNIT: &str = "lbs";

#[derive(serde::Serialize)]
pub struct InventoryResponse {
    pub categories: Vec<CategoryWithItems>,
}

/// GET /inventory?search=
pub async fn list_inventory(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<AuthenticatedAccount>,
    Query(query): Query<InventoryQuery>,
) -> Result<Json<ApiResponse<InventoryResponse>>, ApiError> {
    let categories = state
        .inventory_service()
        .list_inventory(account.id, query.search.as_deref())
        .await?;

    Ok(Json(ApiResponse::success(InventoryResponse { categories })))
}

/// POST /inventory/categories
pub async fn create_category(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<AuthenticatedAccount>,
    Json(payload): Json<CategoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let category = state
        .inventory_service()
        .create_category(account.id, &payload.name)
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(category))))
}

/// PUT /inventory/categories/{id}
pub async fn rename_category(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<AuthenticatedAccount>,
    Path(id): Path<i32>,
    Json(payload): Json<CategoryRequest>,
) -> Result<Json<ApiResponse<CategoryDto>>, ApiError> {
    let id = validate_entity_id(id, "category")?;
    let category = state
        .inventory_service()
        .rename_category(account.id, id, &payload.name)
        .await?;

    Ok(Json(ApiResponse::success(category)))
}

/// DELETE /inventory/categories/{id}
pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<AuthenticatedAccount>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let id = validate_entity_id(id, "category")?;
    state
        .inventory_service()
        .delete_category(account.id, id)
        .await?;

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Category deleted successfully",
    ))))
}

/// POST /inventory/items
pub async fn create_item(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<AuthenticatedAccount>,
    Json(payload): Json<CreateItemRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let category_id = payload
        .category_id
        .ok_or_else(|| ApiError::validation("Category ID and item name are required"))?;
    let category_id = validate_entity_id(category_id, "category")?;

    let item = NewItem {
        category_id,
        name: payload.name,
        quantity: payload.quantity.unwrap_or(0.0),
        unit: payload.unit.unwrap_or_else(|| DEFAULT_UNIT.to_string()),
    };

    let item = state
        .inventory_service()
        .create_item(account.id, item)
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(item))))
}

/// PUT /inventory/items/{id}
pub async fn update_item(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<AuthenticatedAccount>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateItemRequest>,
) -> Result<Json<ApiResponse<ItemDto>>, ApiError> {
    let id = validate_entity_id(id, "item")?;
    let changes = ItemChanges {
        name: payload.name,
        unit: payload.unit,
    };

    let item = state
        .inventory_service()
        .update_item(account.id, id, changes)
        .await?;

    Ok(Json(ApiResponse::success(item)))
}

/// PUT /inventory/items/{id}/add
pub async fn add_quantity(
    state: State<Arc<AppState>>,
    account: Extension<AuthenticatedAccount>,
    id: Path<i32>,
    payload: Option<Json<AdjustRequest>>,
) -> Result<Json<ApiResponse<ItemDto>>, ApiError> {
    adjust(state, account, id, payload, AdjustDirection::Add).await
}

/// PUT /inventory/items/{id}/take
pub async fn take_quantity(
    state: State<Arc<AppState>>,
    account: Extension<AuthenticatedAccount>,
    id: Path<i32>,
    payload: Option<Json<AdjustRequest>>,
) -> Result<Json<ApiResponse<ItemDto>>, ApiError> {
    adjust(state, account, id, payload, AdjustDirection::Take).await
}

async fn adjust(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<AuthenticatedAccount>,
    Path(id): Path<i32>,
    payload: Option<Json<AdjustRequest>>,
    direction: AdjustDirection,
) -> Result<Json<ApiResponse<ItemDto>>, ApiError> {
    let id = validate_entity_id(id, "item")?;
    let amount = validate_amount(payload.and_then(|Json(body)| body.amount))?;

    let item = state
        .inventory_service()
        .adjust_quantity(account.id, id, direction, amount)
        .await?;

    Ok(Json(ApiResponse::success(item)))
}

/// DELETE /inventory/items/{id}
pub async fn delete_item(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<AuthenticatedAccount>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let id = validate_entity_id(id, "item")?;
    state.inventory_service().delete_item(account.id, id).await?;

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Item deleted successfully",
    ))))
}
