//! HTTP handlers for the transaction ledger

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use shared::validation::{validate_amend, AmendTransactionInput};
use shared::{normalize_pagination, PaginatedResponse, TransactionDetail, TransactionType};
use uuid::Uuid;

use super::date_range;
use crate::error::{AppError, AppResult};
use crate::middleware::{CurrentUser, RequestMode};
use crate::repositories::TransactionFilter;
use crate::services::TransactionService;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionQuery {
    #[serde(rename = "type")]
    pub transaction_type: Option<String>,
    pub item_type_id: Option<Uuid>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

fn parse_type(raw: Option<&str>) -> AppResult<Option<TransactionType>> {
    match raw.map(str::trim).filter(|t| !t.is_empty()) {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|e: String| AppError::field("type", e)),
        None => Ok(None),
    }
}

/// Paginated transaction list, newest first
pub async fn list_transactions(
    State(state): State<AppState>,
    RequestMode(mode): RequestMode,
    Query(query): Query<TransactionQuery>,
) -> AppResult<Json<PaginatedResponse<TransactionDetail>>> {
    let filter = TransactionFilter {
        mode,
        transaction_type: parse_type(query.transaction_type.as_deref())?,
        item_type_id: query.item_type_id,
        range: date_range(query.start_date.as_deref(), query.end_date.as_deref())?,
    };
    let page = normalize_pagination(query.page, query.limit);

    let service = TransactionService::new(state.db);
    let transactions = service.list(&filter, page).await?;
    Ok(Json(transactions))
}

pub async fn get_transaction(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<TransactionDetail>> {
    let service = TransactionService::new(state.db);
    let transaction = service.get(id).await?;
    Ok(Json(transaction))
}

/// Amend a POSTED transaction
pub async fn amend_transaction(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<AmendTransactionInput>,
) -> AppResult<Json<TransactionDetail>> {
    let command = validate_amend(&input)?;
    let service = TransactionService::new(state.db);
    let transaction = service.amend(id, &user, command).await?;
    Ok(Json(transaction))
}

/// Reverse a POSTED receive or issue; returns the REVERSAL entry
pub async fn reverse_transaction(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<TransactionDetail>> {
    let service = TransactionService::new(state.db);
    let reversal = service.reverse(id, &user).await?;
    Ok(Json(reversal))
}
