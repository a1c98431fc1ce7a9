//! Domain service for reading and pruning the activity log.

use serde::Serialize;
use thiserror::Error;

use crate::db::ActivityLog;
use crate::domain::{AccountId, EntityType};
use crate::services::inventory_service::{CategoryDto, ItemDto};

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuditError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuditError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLogDto {
    pub id: i64,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<i32>,
    pub entity_name: Option<String>,
    pub details: Option<String>,
    pub created_at: i64,
}

impl From<ActivityLog> for ActivityLogDto {
    fn from(model: ActivityLog) -> Self {
        Self {
            id: model.id,
            action: model.action,
            entity_type: model.entity_type,
            entity_id: model.entity_id,
            entity_name: model.entity_name,
            details: model.details,
            created_at: model.created_at,
        }
    }
}

/// Pagination and inclusive time bounds (unix seconds).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogQuery {
    pub limit: u64,
    pub offset: u64,
    pub from: Option<i64>,
    pub to: Option<i64>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LogPage {
    pub logs: Vec<ActivityLogDto>,
    pub total: u64,
}

/// The entity a history was requested for, as it currently exists.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum HistorySubject {
    Item(ItemDto),
    Category(CategoryDto),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EntityHistory {
    #[serde(flatten)]
    pub page: LogPage,
    pub subject: HistorySubject,
}

#[async_trait::async_trait]
pub trait AuditService: Send + Sync {
    /// Newest-first page of the account's entries, with the total matching count.
    async fn query_logs(&self, account: AccountId, query: LogQuery)
    -> Result<LogPage, AuditError>;

    /// # Errors
    ///
    /// Returns [`AuditError::NotFound`] unless the entity currently belongs to `account`.
    async fn entity_history(
        &self,
        account: AccountId,
        entity_type: EntityType,
        entity_id: i32,
        limit: u64,
        offset: u64,
    ) -> Result<EntityHistory, AuditError>;

    /// Deletes entries of every account older than `now - horizon_seconds`.
    /// Returns the number removed.
    async fn purge_older_than(&self, horizon_seconds: i64) -> Result<u64, AuditError>;
}
