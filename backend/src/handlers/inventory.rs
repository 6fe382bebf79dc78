//! HTTP handlers for receiving and issuing stock

use std::collections::HashMap;

use axum::{
    extract::{multipart::MultipartError, Multipart, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use shared::validation::{validate_issue, validate_receive, IssueForm, ReceiveForm};
use shared::{BatchView, TransactionDetail};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::{CurrentUser, RequestMode};
use crate::repositories::{BatchFilter, NewAttachment};
use crate::services::{InventoryService, UploadStorage};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchQuery {
    pub item_type_id: Option<Uuid>,
    /// Item type code
    #[serde(rename = "itemtype")]
    pub item_type: Option<String>,
    #[serde(default)]
    pub available_only: bool,
}

/// List batches with their available quantity
pub async fn list_batches(
    State(state): State<AppState>,
    RequestMode(mode): RequestMode,
    Query(query): Query<BatchQuery>,
) -> AppResult<Json<Vec<BatchView>>> {
    let filter = BatchFilter {
        item_type_id: query.item_type_id,
        item_type_code: query
            .item_type
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty()),
        available_only: query.available_only,
    };
    let service = InventoryService::new(state.db, state.storage);
    let batches = service.list_batches(mode, &filter).await?;
    Ok(Json(batches))
}

/// Receive stock into a new batch (multipart form with optional files)
pub async fn receive_stock(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<TransactionDetail>)> {
    let mut upload = read_upload(&state.storage, multipart).await?;
    let form = ReceiveForm {
        item_type_id: upload.take("itemTypeId"),
        batch_code: upload.take("batchCode"),
        qty_received: upload.take("qtyReceived"),
        received_at: upload.take("receivedAt"),
        notes: upload.take("notes"),
        unit_cost: upload.take("unitCost"),
        total_cost: upload.take("totalCost"),
    };
    let command = match validate_receive(&form) {
        Ok(command) => command,
        Err(errors) => {
            state.storage.discard(&upload.files).await;
            return Err(errors.into());
        }
    };

    let service = InventoryService::new(state.db, state.storage);
    let transaction = service.receive(&user, command, upload.files).await?;
    Ok((StatusCode::CREATED, Json(transaction)))
}

/// Issue stock out of a batch (multipart form with optional files)
pub async fn issue_stock(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<TransactionDetail>)> {
    let mut upload = read_upload(&state.storage, multipart).await?;
    let form = IssueForm {
        item_type_id: upload.take("itemTypeId"),
        batch_id: upload.take("batchId"),
        qty: upload.take("qty"),
        issued_to_type: upload.take("issuedToType"),
        issued_to_name: upload.take("issuedToName"),
        notes: upload.take("notes"),
        unit_price: upload.take("unitPrice"),
        total_price: upload.take("totalPrice"),
    };
    let command = match validate_issue(&form) {
        Ok(command) => command,
        Err(errors) => {
            state.storage.discard(&upload.files).await;
            return Err(errors.into());
        }
    };

    let service = InventoryService::new(state.db, state.storage);
    let transaction = service.issue(&user, command, upload.files).await?;
    Ok((StatusCode::CREATED, Json(transaction)))
}

/// Text fields and stored files of a multipart request
struct Upload {
    fields: HashMap<String, String>,
    files: Vec<NewAttachment>,
}

impl Upload {
    fn take(&mut self, name: &str) -> Option<String> {
        self.fields.remove(name)
    }
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::invalid(format!("Invalid multipart body: {}", err.body_text()))
    }
}

/// Store every file part and collect the text parts. Files stored before a
/// failure are removed again.
async fn read_upload(storage: &UploadStorage, mut multipart: Multipart) -> AppResult<Upload> {
    let mut upload = Upload {
        fields: HashMap::new(),
        files: Vec::new(),
    };
    match read_parts(storage, &mut multipart, &mut upload).await {
        Ok(()) => Ok(upload),
        Err(e) => {
            storage.discard(&upload.files).await;
            Err(e)
        }
    }
}

async fn read_parts(storage: &UploadStorage, multipart: &mut Multipart, upload: &mut Upload) -> AppResult<()> {
    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();

        let Some(original_name) = field.file_name().map(str::to_string) else {
            let value = field.text().await.map_err(multipart_error)?;
            upload.fields.entry(name).or_insert(value);
            continue;
        };

        let mime_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();

        let mut bytes = Vec::new();
        while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
            bytes.extend_from_slice(&chunk);
            storage.check_size(bytes.len() as u64)?;
        }

        // Browsers send an empty part when no file was chosen
        if original_name.is_empty() && bytes.is_empty() {
            continue;
        }

        upload.files.push(storage.save(&original_name, &mime_type, &bytes).await?);
    }
    Ok(())
}
