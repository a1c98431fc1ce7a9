use serde::{Deserialize, Serialize};

use crate::services::{ActivityLogDto, ItemDto};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// ============================================================================
// Inventory
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct InventoryQuery {
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemRequest {
    pub category_id: Option<i32>,
    #[serde(default)]
    pub name: String,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub name: Option<String>,
    pub unit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AdjustRequest {
    pub amount: Option<f64>,
}

// ============================================================================
// Activity
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLogsQuery {
    #[serde(default = "default_logs_limit")]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
    pub from_date: Option<i64>,
    pub to_date: Option<i64>,
}

const fn default_logs_limit() -> u64 {
    50
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_history_limit")]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
}

const fn default_history_limit() -> u64 {
    3
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLogsResponse {
    pub logs: Vec<ActivityLogDto>,
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
    pub from_date: Option<i64>,
    pub to_date: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ItemHistoryResponse {
    pub logs: Vec<ActivityLogDto>,
    pub item: ItemDto,
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
}
