use crate::domain::{AccountId, ActivityAction, EntityType};
use crate::entities::{activity_logs, prelude::*};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Select, Set,
};

/// A new audit row, before it has an id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewActivity {
    pub account: AccountId,
    pub action: ActivityAction,
    pub entity_type: EntityType,
    pub entity_id: Option<i32>,
    pub entity_name: Option<String>,
    pub details: Option<String>,
}

/// Filters shared by the page query and its total count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivityFilter {
    /// Inclusive lower bound, unix seconds.
    pub from: Option<i64>,
    /// Inclusive upper bound, unix seconds.
    pub to: Option<i64>,
    pub entity: Option<(EntityType, i32)>,
}

pub struct ActivityRepository<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> ActivityRepository<'a, C> {
    pub const fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    pub async fn insert(
        &self,
        entry: NewActivity,
        created_at: i64,
    ) -> Result<activity_logs::Model, DbErr> {
        activity_logs::ActiveModel {
            account_id: Set(entry.account.value()),
            action: Set(entry.action.as_str().to_string()),
            entity_type: Set(entry.entity_type.as_str().to_string()),
            entity_id: Set(entry.entity_id),
            entity_name: Set(entry.entity_name),
            details: Set(entry.details),
            created_at: Set(created_at),
            ..Default::default()
        }
        .insert(self.conn)
        .await
    }

    fn filtered(account: AccountId, filter: ActivityFilter) -> Select<ActivityLogs> {
        let mut query =
            ActivityLogs::find().filter(activity_logs::Column::AccountId.eq(account.value()));

        if let Some(from) = filter.from {
            query = query.filter(activity_logs::Column::CreatedAt.gte(from));
        }

        if let Some(to) = filter.to {
            query = query.filter(activity_logs::Column::CreatedAt.lte(to));
        }

        if let Some((entity_type, entity_id)) = filter.entity {
            query = query
                .filter(activity_logs::Column::EntityType.eq(entity_type.as_str()))
                .filter(activity_logs::Column::EntityId.eq(entity_id));
        }

        query
    }

    /// Newest first; ties within the same second fall back to insertion order.
    pub async fn page(
        &self,
        account: AccountId,
        filter: ActivityFilter,
        limit: u64,
        offset: u64,
    ) -> Result<(Vec<activity_logs::Model>, u64), DbErr> {
        let logs = Self::filtered(account, filter)
            .order_by_desc(activity_logs::Column::CreatedAt)
            .order_by_desc(activity_logs::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(self.conn)
            .await?;

        let total = Self::filtered(account, filter).count(self.conn).await?;

        Ok((logs, total))
    }

    /// Deletes entries from every account created strictly before `cutoff`.
    pub async fn delete_before(&self, cutoff: i64) -> Result<u64, DbErr> {
        let result = ActivityLogs::delete_many()
            .filter(activity_logs::Column::CreatedAt.lt(cutoff))
            .exec(self.conn)
            .await?;

        Ok(result.rows_affected)
    }
}
