use crate::domain::{AccountId, AdjustDirection};
use crate::entities::{categories, items, prelude::*};
use sea_orm::sea_query::{Expr, Func, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};

/// Category and item rows, always filtered by the owning account.
///
/// Borrowing the connection lets the same repository run against the pool or
/// inside a transaction that also carries the audit append.
pub struct InventoryRepository<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> InventoryRepository<'a, C> {
    pub const fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    pub async fn list_categories(
        &self,
        account: AccountId,
    ) -> Result<Vec<categories::Model>, DbErr> {
        Categories::find()
            .filter(categories::Column::AccountId.eq(account.value()))
            .order_by_asc(categories::Column::Name)
            .all(self.conn)
            .await
    }

    pub async fn list_items(&self, account: AccountId) -> Result<Vec<items::Model>, DbErr> {
        Items::find()
            .filter(items::Column::AccountId.eq(account.value()))
            .order_by_asc(items::Column::Name)
            .all(self.conn)
            .await
    }

    pub async fn find_category(
        &self,
        account: AccountId,
        id: i32,
    ) -> Result<Option<categories::Model>, DbErr> {
        Categories::find_by_id(id)
            .filter(categories::Column::AccountId.eq(account.value()))
            .one(self.conn)
            .await
    }

    /// Case-sensitive, matching how the unique index compares names.
    pub async fn category_name_taken(
        &self,
        account: AccountId,
        name: &str,
        excluding: Option<i32>,
    ) -> Result<bool, DbErr> {
        let mut query = Categories::find()
            .filter(categories::Column::AccountId.eq(account.value()))
            .filter(categories::Column::Name.eq(name));

        if let Some(id) = excluding {
            query = query.filter(categories::Column::Id.ne(id));
        }

        Ok(query.count(self.conn).await? > 0)
    }

    pub async fn insert_category(
        &self,
        account: AccountId,
        name: &str,
        now: i64,
    ) -> Result<categories::Model, DbErr> {
        categories::ActiveModel {
            account_id: Set(account.value()),
            name: Set(name.to_string()),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(self.conn)
        .await
    }

    pub async fn rename_category(
        &self,
        category: categories::Model,
        name: &str,
    ) -> Result<categories::Model, DbErr> {
        let mut active: categories::ActiveModel = category.into();
        active.name = Set(name.to_string());
        active.update(self.conn).await
    }

    pub async fn count_items_in_category(&self, category_id: i32) -> Result<u64, DbErr> {
        Items::find()
            .filter(items::Column::CategoryId.eq(category_id))
            .count(self.conn)
            .await
    }

    /// Removes the category and its items. Items are deleted explicitly so the
    /// cascade does not depend on the connection's foreign-key pragma.
    pub async fn delete_category(&self, account: AccountId, id: i32) -> Result<u64, DbErr> {
        Items::delete_many()
            .filter(items::Column::AccountId.eq(account.value()))
            .filter(items::Column::CategoryId.eq(id))
            .exec(self.conn)
            .await?;

        let result = Categories::delete_many()
            .filter(categories::Column::AccountId.eq(account.value()))
            .filter(categories::Column::Id.eq(id))
            .exec(self.conn)
            .await?;

        Ok(result.rows_affected)
    }

    pub async fn find_item(
        &self,
        account: AccountId,
        id: i32,
    ) -> Result<Option<items::Model>, DbErr> {
        Items::find_by_id(id)
            .filter(items::Column::AccountId.eq(account.value()))
            .one(self.conn)
            .await
    }

    pub async fn item_name_taken(
        &self,
        account: AccountId,
        category_id: i32,
        name: &str,
        excluding: Option<i32>,
    ) -> Result<bool, DbErr> {
        let mut query = Items::find()
            .filter(items::Column::AccountId.eq(account.value()))
            .filter(items::Column::CategoryId.eq(category_id))
            .filter(items::Column::Name.eq(name));

        if let Some(id) = excluding {
            query = query.filter(items::Column::Id.ne(id));
        }

        Ok(query.count(self.conn).await? > 0)
    }

    pub async fn insert_item(
        &self,
        account: AccountId,
        category_id: i32,
        name: &str,
        quantity: f64,
        unit: &str,
        now: i64,
    ) -> Result<items::Model, DbErr> {
        items::ActiveModel {
            account_id: Set(account.value()),
            category_id: Set(category_id),
            name: Set(name.to_string()),
            quantity: Set(quantity),
            unit: Set(unit.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(self.conn)
        .await
    }

    pub async fn update_item(
        &self,
        item: items::Model,
        name: Option<&str>,
        unit: Option<&str>,
        now: i64,
    ) -> Result<items::Model, DbErr> {
        let mut active: items::ActiveModel = item.into();
        if let Some(name) = name {
            active.name = Set(name.to_string());
        }
        if let Some(unit) = unit {
            active.unit = Set(unit.to_string());
        }
        active.updated_at = Set(now);
        active.update(self.conn).await
    }

    /// Applies the adjustment in SQL so concurrent adjustments never lose an
    /// update. Returns `false` when no owned item matched.
    pub async fn adjust_quantity(
        &self,
        account: AccountId,
        id: i32,
        direction: AdjustDirection,
        amount: f64,
        now: i64,
    ) -> Result<bool, DbErr> {
        let quantity: SimpleExpr = match direction {
            AdjustDirection::Add => Expr::col(items::Column::Quantity).add(amount),
            AdjustDirection::Take => Func::cust("MAX")
                .arg(Expr::val(0.0_f64))
                .arg(Expr::col(items::Column::Quantity).sub(amount))
                .into(),
        };

        let result = Items::update_many()
            .col_expr(items::Column::Quantity, quantity)
            .col_expr(items::Column::UpdatedAt, Expr::value(now))
            .filter(items::Column::Id.eq(id))
            .filter(items::Column::AccountId.eq(account.value()))
            .exec(self.conn)
            .await?;

        Ok(result.rows_affected == 1)
    }

    pub async fn delete_item(&self, account: AccountId, id: i32) -> Result<u64, DbErr> {
        let result = Items::delete_many()
            .filter(items::Column::Id.eq(id))
            .filter(items::Column::AccountId.eq(account.value()))
            .exec(self.conn)
            .await?;

        Ok(result.rows_affected)
    }
}
