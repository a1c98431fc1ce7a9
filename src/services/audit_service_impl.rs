//! `SeaORM` implementation of the `AuditService` trait.

use async_trait::async_trait;
use tracing::info;

use crate::db::{ActivityFilter, Store};
use crate::domain::{AccountId, EntityType};
use crate::services::audit_service::{
    ActivityLogDto, AuditError, AuditService, EntityHistory, HistorySubject, LogPage, LogQuery,
};
use crate::services::inventory_service::ItemDto;

pub struct SeaOrmAuditService {
    store: Store,
}

impl SeaOrmAuditService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    async fn page(
        &self,
        account: AccountId,
        filter: ActivityFilter,
        limit: u64,
        offset: u64,
    ) -> Result<LogPage, AuditError> {
        let (logs, total) = self
            .store
            .get_activity_page(account, filter, limit, offset)
            .await?;

        Ok(LogPage {
            logs: logs.into_iter().map(ActivityLogDto::from).collect(),
            total,
        })
    }
}

#[async_trait]
impl AuditService for SeaOrmAuditService {
    async fn query_logs(
        &self,
        account: AccountId,
        query: LogQuery,
    ) -> Result<LogPage, AuditError> {
        if let (Some(from), Some(to)) = (query.from, query.to)
            && from > to
        {
            return Err(AuditError::Validation(
                "fromDate must not be after toDate".to_string(),
            ));
        }

        let filter = ActivityFilter {
            from: query.from,
            to: query.to,
            entity: None,
        };
        self.page(account, filter, query.limit, query.offset).await
    }

    async fn entity_history(
        &self,
        account: AccountId,
        entity_type: EntityType,
        entity_id: i32,
        limit: u64,
        offset: u64,
    ) -> Result<EntityHistory, AuditError> {
        let repo = self.store.inventory_repo();

        let subject = match entity_type {
            EntityType::Item => {
                let item = repo
                    .find_item(account, entity_id)
                    .await?
                    .ok_or(AuditError::NotFound("Item"))?;
                let category = repo
                    .find_category(account, item.category_id)
                    .await?
                    .ok_or(AuditError::NotFound("Item"))?;
                HistorySubject::Item(ItemDto::new(item, category.name))
            }
            EntityType::Category => {
                let category = repo
                    .find_category(account, entity_id)
                    .await?
                    .ok_or(AuditError::NotFound("Category"))?;
                HistorySubject::Category(category.into())
            }
        };

        let filter = ActivityFilter {
            entity: Some((entity_type, entity_id)),
            ..ActivityFilter::default()
        };
        let page = self.page(account, filter, limit, offset).await?;

        Ok(EntityHistory { page, subject })
    }

    async fn purge_older_than(&self, horizon_seconds: i64) -> Result<u64, AuditError> {
        let cutoff = chrono::Utc::now().timestamp() - horizon_seconds;
        let deleted = self.store.prune_activity_before(cutoff).await?;

        metrics::counter!("activity_log_entries_purged_total").increment(deleted);
        if deleted > 0 {
            info!(
                event = "activity_logs_purged",
                deleted,
                cutoff,
                "Purged expired activity log entries"
            );
        }

        Ok(deleted)
    }
}
