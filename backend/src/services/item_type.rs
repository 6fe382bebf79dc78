//! Item type catalogue

use shared::validation::{CreateItemTypeInput, UpdateItemTypeInput};
use shared::{ItemType, SystemMode};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::repositories::ItemTypeRepository;

#[derive(Clone)]
pub struct ItemTypeService {
    db: PgPool,
}

impl ItemTypeService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(&self, mode: SystemMode, include_inactive: bool) -> AppResult<Vec<ItemType>> {
        ItemTypeRepository::list(&self.db, mode, include_inactive).await
    }

    /// New item types belong to the mode of the request that creates them
    pub async fn create(&self, mode: SystemMode, input: CreateItemTypeInput) -> AppResult<ItemType> {
        let item_type = ItemTypeRepository::insert(&self.db, &input.name, &input.code, mode).await?;
        tracing::info!(
            "Created item type {} ({}) in {} mode",
            item_type.code,
            item_type.id,
            mode
        );
        Ok(item_type)
    }

    /// Rename or soft-disable; item types are never deleted
    pub async fn update(&self, id: Uuid, input: UpdateItemTypeInput) -> AppResult<ItemType> {
        let item_type = ItemTypeRepository::update(&self.db, id, input.name.as_deref(), input.is_active)
            .await?
            .ok_or_else(|| AppError::NotFound("Item type".to_string()))?;
        tracing::info!(
            "Updated item type {} (active: {})",
            item_type.id,
            item_type.is_active
        );
        Ok(item_type)
    }
}
