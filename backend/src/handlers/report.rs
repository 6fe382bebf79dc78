//! HTTP handlers for reports

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use super::date_range;
use crate::error::AppResult;
use crate::middleware::RequestMode;
use crate::repositories::TransactionFilter;
use crate::services::report::{
    DashboardReport, IssuesReport, ReceiptsReport, StockBalanceReport, UserActivityReport,
};
use crate::services::ReportService;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportQuery {
    pub item_type_id: Option<Uuid>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl ReportQuery {
    fn filter(&self, RequestMode(mode): RequestMode) -> AppResult<TransactionFilter> {
        Ok(TransactionFilter {
            mode,
            transaction_type: None,
            item_type_id: self.item_type_id,
            range: date_range(self.start_date.as_deref(), self.end_date.as_deref())?,
        })
    }
}

pub async fn dashboard(
    State(state): State<AppState>,
    mode: RequestMode,
    Query(query): Query<ReportQuery>,
) -> AppResult<Json<DashboardReport>> {
    let service = ReportService::new(state.db);
    Ok(Json(service.dashboard(&query.filter(mode)?).await?))
}

pub async fn stock_balance(
    State(state): State<AppState>,
    mode: RequestMode,
    Query(query): Query<ReportQuery>,
) -> AppResult<Json<StockBalanceReport>> {
    let service = ReportService::new(state.db);
    Ok(Json(service.stock_balance(&query.filter(mode)?).await?))
}

pub async fn issues_report(
    State(state): State<AppState>,
    mode: RequestMode,
    Query(query): Query<ReportQuery>,
) -> AppResult<Json<IssuesReport>> {
    let service = ReportService::new(state.db);
    Ok(Json(service.issues(&query.filter(mode)?).await?))
}

pub async fn receipts_report(
    State(state): State<AppState>,
    mode: RequestMode,
    Query(query): Query<ReportQuery>,
) -> AppResult<Json<ReceiptsReport>> {
    let service = ReportService::new(state.db);
    Ok(Json(service.receipts(&query.filter(mode)?).await?))
}

pub async fn user_activity(
    State(state): State<AppState>,
    mode: RequestMode,
    Query(query): Query<ReportQuery>,
) -> AppResult<Json<UserActivityReport>> {
    let service = ReportService::new(state.db);
    Ok(Json(service.user_activity(&query.filter(mode)?).await?))
}
