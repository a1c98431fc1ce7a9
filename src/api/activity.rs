use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use std::sync::Arc;

use super::validation::{validate_entity_id, validate_limit, validate_timestamp};
use super::{
    ActivityLogsQuery, ActivityLogsResponse, ApiError, ApiResponse, AppState, HistoryQuery,
    ItemHistoryResponse,
};
use crate::domain::EntityType;
use crate::services::{AuthenticatedAccount, HistorySubject, LogQuery};

/// GET /inventory/activity-logs?limit&offset&fromDate&toDate
pub async fn list_activity_logs(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<AuthenticatedAccount>,
    Query(params): Query<ActivityLogsQuery>,
) -> Result<Json<ApiResponse<ActivityLogsResponse>>, ApiError> {
    let limit = validate_limit(params.limit)?;
    let from = validate_timestamp(params.from_date, "fromDate")?;
    let to = validate_timestamp(params.to_date, "toDate")?;

    let page = state
        .audit_service()
        .query_logs(
            account.id,
            LogQuery {
                limit,
                offset: params.offset,
                from,
                to,
            },
        )
        .await?;

    Ok(Json(ApiResponse::success(ActivityLogsResponse {
        logs: page.logs,
        total: page.total,
        limit,
        offset: params.offset,
        from_date: from,
        to_date: to,
    })))
}

/// GET /inventory/items/{id}/history?limit&offset
pub async fn get_item_history(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<AuthenticatedAccount>,
    Path(id): Path<i32>,
    Query(params): Query<HistoryQuery>,
) -> Result<Json<ApiResponse<ItemHistoryResponse>>, ApiError> {
    let id = validate_entity_id(id, "item")?;
    let limit = validate_limit(params.limit)?;

    let history = state
        .audit_service()
        .entity_history(account.id, EntityType::Item, id, limit, params.offset)
        .await?;

    let HistorySubject::Item(item) = history.subject else {
        return Err(ApiError::internal("History subject is not an item"));
    };

    Ok(Json(ApiResponse::success(ItemHistoryResponse {
        logs: history.page.logs,
        item,
        total: history.page.total,
        limit,
        offset: params.offset,
    })))
}
