//! HTTP handlers for item types

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use shared::validation::{
    validate_create_item_type, validate_update_item_type, CreateItemTypeInput, UpdateItemTypeInput,
};
use shared::ItemType;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{CurrentUser, RequestMode};
use crate::services::ItemTypeService;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemTypeQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

/// List item types of the request's mode
pub async fn list_item_types(
    State(state): State<AppState>,
    RequestMode(mode): RequestMode,
    Query(query): Query<ItemTypeQuery>,
) -> AppResult<Json<Vec<ItemType>>> {
    let service = ItemTypeService::new(state.db);
    let item_types = service.list(mode, query.include_inactive).await?;
    Ok(Json(item_types))
}

pub async fn create_item_type(
    State(state): State<AppState>,
    RequestMode(mode): RequestMode,
    _user: CurrentUser,
    Json(input): Json<CreateItemTypeInput>,
) -> AppResult<(StatusCode, Json<ItemType>)> {
    let input = validate_create_item_type(&input)?;
    let service = ItemTypeService::new(state.db);
    let item_type = service.create(mode, input).await?;
    Ok((StatusCode::CREATED, Json(item_type)))
}

/// Rename or soft-disable an item type
pub async fn update_item_type(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateItemTypeInput>,
) -> AppResult<Json<ItemType>> {
    let input = validate_update_item_type(&input)?;
    let service = ItemTypeService::new(state.db);
    let item_type = service.update(id, input).await?;
    Ok(Json(item_type))
}
