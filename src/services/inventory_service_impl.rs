//! `SeaORM` implementation of the `InventoryService` trait.

use async_trait::async_trait;
use sea_orm::ConnectionTrait;
use std::collections::HashMap;
use tracing::info;

use crate::db::repositories::inventory::InventoryRepository;
use crate::db::{NewActivity, Store, WriteTransaction};
use crate::domain::{AccountId, ActivityAction, AdjustDirection, EntityType};
use crate::entities::items;
use crate::services::activity::ActivityRecorder;
use crate::services::inventory_service::{
    CategoryDto, CategoryWithItems, InventoryError, InventoryService, ItemChanges, ItemDto,
    NewItem, check_amount, clean_name,
};

pub struct SeaOrmInventoryService {
    store: Store,
    recorder: ActivityRecorder,
}

impl SeaOrmInventoryService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self {
            store,
            recorder: ActivityRecorder,
        }
    }

    /// Every mutation reads before it writes, so it runs under the store's
    /// write gate.
    async fn begin(&self) -> Result<WriteTransaction, InventoryError> {
        Ok(self.store.begin_write().await?)
    }

    async fn item_dto<C: ConnectionTrait>(
        repo: &InventoryRepository<'_, C>,
        account: AccountId,
        item: items::Model,
    ) -> Result<ItemDto, InventoryError> {
        let category = repo
            .find_category(account, item.category_id)
            .await?
            .ok_or(InventoryError::NotFound("Category"))?;
        Ok(ItemDto::new(item, category.name))
    }
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn item_entry(
    account: AccountId,
    action: ActivityAction,
    item: &items::Model,
    details: String,
) -> NewActivity {
    NewActivity {
        account,
        action,
        entity_type: EntityType::Item,
        entity_id: Some(item.id),
        entity_name: Some(item.name.clone()),
        details: Some(details),
    }
}

#[async_trait]
impl InventoryService for SeaOrmInventoryService {
    async fn list_inventory(
        &self,
        account: AccountId,
        search: Option<&str>,
    ) -> Result<Vec<CategoryWithItems>, InventoryError> {
        let repo = self.store.inventory_repo();
        let categories = repo.list_categories(account).await?;
        let items = repo.list_items(account).await?;

        let term = search
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        let names: HashMap<i32, String> = categories
            .iter()
            .map(|c| (c.id, c.name.to_lowercase()))
            .collect();

        let mut grouped: HashMap<i32, Vec<items::Model>> = HashMap::new();
        for item in items {
            if let Some(term) = &term {
                let category_matches = names
                    .get(&item.category_id)
                    .is_some_and(|name| name.contains(term.as_str()));
                if !category_matches && !item.name.to_lowercase().contains(term.as_str()) {
                    continue;
                }
            }
            grouped.entry(item.category_id).or_default().push(item);
        }

        Ok(categories
            .into_iter()
            .map(|category| {
                let items: Vec<ItemDto> = grouped
                    .remove(&category.id)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|item| ItemDto::new(item, category.name.clone()))
                    .collect();
                CategoryWithItems {
                    is_expanded: term.is_some() && !items.is_empty(),
                    category: category.into(),
                    items,
                }
            })
            .collect())
    }

    async fn create_category(
        &self,
        account: AccountId,
        name: &str,
    ) -> Result<CategoryDto, InventoryError> {
        let name = clean_name(name, "Category")?;

        let txn = self.begin().await?;
        let repo = InventoryRepository::new(&*txn);

        if repo.category_name_taken(account, &name, None).await? {
            return Err(InventoryError::Conflict("Category already exists"));
        }

        let category = repo.insert_category(account, &name, now()).await?;

        self.recorder
            .record(
                &*txn,
                NewActivity {
                    account,
                    action: ActivityAction::Created,
                    entity_type: EntityType::Category,
                    entity_id: Some(category.id),
                    entity_name: Some(category.name.clone()),
                    details: None,
                },
            )
            .await;
        txn.commit().await?;

        info!(
            event = "category_created",
            account_id = account.value(),
            category_id = category.id,
            "Category created"
        );

        Ok(category.into())
    }

    async fn rename_category(
        &self,
        account: AccountId,
        id: i32,
        name: &str,
    ) -> Result<CategoryDto, InventoryError> {
        let name = clean_name(name, "Category")?;

        let txn = self.begin().await?;
        let repo = InventoryRepository::new(&*txn);

        let category = repo
            .find_category(account, id)
            .await?
            .ok_or(InventoryError::NotFound("Category"))?;

        if repo.category_name_taken(account, &name, Some(id)).await? {
            return Err(InventoryError::Conflict("Category name already exists"));
        }

        let old_name = category.name.clone();
        let category = repo.rename_category(category, &name).await?;

        self.recorder
            .record(
                &*txn,
                NewActivity {
                    account,
                    action: ActivityAction::Updated,
                    entity_type: EntityType::Category,
                    entity_id: Some(category.id),
                    entity_name: Some(category.name.clone()),
                    details: Some(format!(
                        "Name changed from \"{old_name}\" to \"{}\"",
                        category.name
                    )),
                },
            )
            .await;
        txn.commit().await?;

        Ok(category.into())
    }

    async fn delete_category(&self, account: AccountId, id: i32) -> Result<(), InventoryError> {
        let txn = self.begin().await?;
        let repo = InventoryRepository::new(&*txn);

        let category = repo
            .find_category(account, id)
            .await?
            .ok_or(InventoryError::NotFound("Category"))?;
        let item_count = repo.count_items_in_category(category.id).await?;

        // Recorded first so the entry still names the category.
        self.recorder
            .record(
                &*txn,
                NewActivity {
                    account,
                    action: ActivityAction::Deleted,
                    entity_type: EntityType::Category,
                    entity_id: Some(category.id),
                    entity_name: Some(category.name.clone()),
                    details: Some(format!("Deleted with {item_count} items")),
                },
            )
            .await;

        if repo.delete_category(account, id).await? == 0 {
            return Err(InventoryError::NotFound("Category"));
        }
        txn.commit().await?;

        info!(
            event = "category_deleted",
            account_id = account.value(),
            category_id = id,
            items_removed = item_count,
            "Category deleted"
        );

        Ok(())
    }

    async fn create_item(
        &self,
        account: AccountId,
        item: NewItem,
    ) -> Result<ItemDto, InventoryError> {
        let name = clean_name(&item.name, "Item")?;
        let quantity = check_amount(item.quantity, "quantity")?;
        let unit = item.unit.trim();
        if unit.is_empty() {
            return Err(InventoryError::Validation("Unit cannot be empty".to_string()));
        }

        let txn = self.begin().await?;
        let repo = InventoryRepository::new(&*txn);

        let category = repo
            .find_category(account, item.category_id)
            .await?
            .ok_or(InventoryError::NotFound("Category"))?;

        if repo
            .item_name_taken(account, category.id, &name, None)
            .await?
        {
            return Err(InventoryError::Conflict("Item already exists in this category"));
        }

        let created = repo
            .insert_item(account, category.id, &name, quantity, unit, now())
            .await?;

        self.recorder
            .record(
                &*txn,
                item_entry(
                    account,
                    ActivityAction::Created,
                    &created,
                    format!("Quantity: {}{}", created.quantity, created.unit),
                ),
            )
            .await;
        txn.commit().await?;

        Ok(ItemDto::new(created, category.name))
    }

    async fn update_item(
        &self,
        account: AccountId,
        id: i32,
        changes: ItemChanges,
    ) -> Result<ItemDto, InventoryError> {
        let name = changes
            .name
            .as_deref()
            .map(|n| clean_name(n, "Item"))
            .transpose()?;
        let unit = match changes.unit.as_deref().map(str::trim) {
            Some("") => {
                return Err(InventoryError::Validation("Unit cannot be empty".to_string()));
            }
            other => other.map(str::to_string),
        };
        if name.is_none() && unit.is_none() {
            return Err(InventoryError::Validation(
                "No valid fields to update".to_string(),
            ));
        }

        let txn = self.begin().await?;
        let repo = InventoryRepository::new(&*txn);

        let item = repo
            .find_item(account, id)
            .await?
            .ok_or(InventoryError::NotFound("Item"))?;

        if let Some(name) = &name
            && repo
                .item_name_taken(account, item.category_id, name, Some(id))
                .await?
        {
            return Err(InventoryError::Conflict(
                "Item name already exists in this category",
            ));
        }

        let mut changed = Vec::new();
        if let Some(name) = name.as_deref().filter(|n| *n != item.name) {
            changed.push(format!("name: \"{}\" → \"{name}\"", item.name));
        }
        if let Some(unit) = unit.as_deref().filter(|u| *u != item.unit) {
            changed.push(format!("unit: \"{}\" → \"{unit}\"", item.unit));
        }

        let updated = repo
            .update_item(item, name.as_deref(), unit.as_deref(), now())
            .await?;

        if !changed.is_empty() {
            self.recorder
                .record(
                    &*txn,
                    item_entry(account, ActivityAction::Updated, &updated, changed.join(", ")),
                )
                .await;
        }

        let dto = Self::item_dto(&repo, account, updated).await?;
        txn.commit().await?;

        Ok(dto)
    }

    async fn adjust_quantity(
        &self,
        account: AccountId,
        id: i32,
        direction: AdjustDirection,
        amount: f64,
    ) -> Result<ItemDto, InventoryError> {
        let amount = check_amount(amount, "amount")?;

        let txn = self.begin().await?;
        let repo = InventoryRepository::new(&*txn);

        if !repo
            .adjust_quantity(account, id, direction, amount, now())
            .await?
        {
            return Err(InventoryError::NotFound("Item"));
        }

        let item = repo
            .find_item(account, id)
            .await?
            .ok_or(InventoryError::NotFound("Item"))?;

        let verb = match direction {
            AdjustDirection::Add => "Added",
            AdjustDirection::Take => "Took",
        };
        self.recorder
            .record(
                &*txn,
                item_entry(
                    account,
                    direction.action(),
                    &item,
                    format!("{verb} {amount}, new quantity: {}{}", item.quantity, item.unit),
                ),
            )
            .await;

        let dto = Self::item_dto(&repo, account, item).await?;
        txn.commit().await?;

        Ok(dto)
    }

    async fn delete_item(&self, account: AccountId, id: i32) -> Result<(), InventoryError> {
        let txn = self.begin().await?;
        let repo = InventoryRepository::new(&*txn);

        let item = repo
            .find_item(account, id)
            .await?
            .ok_or(InventoryError::NotFound("Item"))?;

        self.recorder
            .record(
                &*txn,
                item_entry(
                    account,
                    ActivityAction::Deleted,
                    &item,
                    format!("Quantity was: {}{}", item.quantity, item.unit),
                ),
            )
            .await;

        if repo.delete_item(account, id).await? == 0 {
            return Err(InventoryError::NotFound("Item"));
        }
        txn.commit().await?;

        Ok(())
    }
}
