//! Receiving and issuing stock
//!
//! Each operation runs in one database transaction: the batch counters, the
//! ledger entry and its attachment rows commit together or not at all. Files
//! already written for a failed request are removed again.

use chrono::Utc;
use shared::ledger::{plan_issue, plan_receive, IssueRequest};
use shared::validation::{IssueCommand, ReceiveCommand};
use shared::{
    generate_batch_code, Attachment, BatchView, ItemType, SystemMode, Transaction,
    TransactionDetail, TransactionType, User,
};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::repositories::{
    AttachmentRepository, BatchFilter, BatchRepository, ItemTypeRepository, NewAttachment,
    NewBatch, NewTransaction, TransactionRepository,
};
use crate::services::storage::UploadStorage;

#[derive(Clone)]
pub struct InventoryService {
    db: PgPool,
    storage: UploadStorage,
}

impl InventoryService {
    pub fn new(db: PgPool, storage: UploadStorage) -> Self {
        Self { db, storage }
    }

    pub async fn list_batches(&self, mode: SystemMode, filter: &BatchFilter) -> AppResult<Vec<BatchView>> {
        BatchRepository::list(&self.db, mode, filter).await
    }

    /// Create a batch and its RECEIVE transaction
    pub async fn receive(
        &self,
        user: &User,
        command: ReceiveCommand,
        files: Vec<NewAttachment>,
    ) -> AppResult<TransactionDetail> {
        let result = self.receive_in_transaction(user, command, &files).await;
        if result.is_err() {
            self.storage.discard(&files).await;
        }
        result
    }

    async fn receive_in_transaction(
        &self,
        user: &User,
        command: ReceiveCommand,
        files: &[NewAttachment],
    ) -> AppResult<TransactionDetail> {
        let mut tx = self.db.begin().await?;

        let item_type = find_item_type(&mut tx, command.item_type_id).await?;
        if !item_type.is_active {
            return Err(AppError::field("itemTypeId", "Item type is inactive"));
        }

        let plan = plan_receive(command.qty_received, command.unit_cost, command.total_cost)?;
        let received_at = command.received_at.unwrap_or_else(Utc::now);
        let batch_code = command
            .batch_code
            .unwrap_or_else(|| generate_batch_code(received_at, Uuid::new_v4()));

        let batch = BatchRepository::insert(
            &mut *tx,
            &NewBatch {
                item_type_id: item_type.id,
                batch_code,
                counters: plan.counters,
                received_at,
                notes: command.notes.clone(),
            },
        )
        .await?;

        let mut entry = NewTransaction::new(TransactionType::Receive, item_type.id, plan.counters.qty_received, user.id);
        entry.batch_id = Some(batch.id);
        entry.unit_cost = plan.cost.unit;
        entry.total_cost = plan.cost.total;
        entry.notes = command.notes;
        let transaction = TransactionRepository::insert(&mut *tx, &entry).await?;

        let attachments = attach_files(&mut tx, transaction.id, files).await?;

        tx.commit().await?;

        tracing::info!(
            "Received {} x {} into batch {} (transaction {}, by {})",
            transaction.qty,
            item_type.code,
            batch.batch_code,
            transaction.id,
            user.username
        );

        Ok(detail(transaction, &item_type, Some(batch.batch_code), user, attachments))
    }

    /// Take stock out of a batch with an ISSUE transaction
    pub async fn issue(
        &self,
        user: &User,
        command: IssueCommand,
        files: Vec<NewAttachment>,
    ) -> AppResult<TransactionDetail> {
        let result = self.issue_in_transaction(user, command, &files).await;
        if result.is_err() {
            self.storage.discard(&files).await;
        }
        result
    }

    async fn issue_in_transaction(
        &self,
        user: &User,
        command: IssueCommand,
        files: &[NewAttachment],
    ) -> AppResult<TransactionDetail> {
        let mut tx = self.db.begin().await?;

        let item_type = find_item_type(&mut tx, command.item_type_id).await?;

        // Lock the batch so concurrent issues see each other's counters
        let batch = BatchRepository::find_for_update(&mut *tx, command.batch_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Batch".to_string()))?;

        let plan = plan_issue(
            batch.counters(),
            batch.item_type_id,
            &IssueRequest {
                item_type_id: item_type.id,
                qty: command.qty,
                unit_price: command.unit_price,
                total_price: command.total_price,
            },
        )?;

        BatchRepository::update_counters(&mut *tx, batch.id, plan.counters).await?;

        let mut entry = NewTransaction::new(TransactionType::Issue, item_type.id, command.qty, user.id);
        entry.batch_id = Some(batch.id);
        entry.unit_price = plan.price.unit;
        entry.total_price = plan.price.total;
        entry.issued_to_type = Some(command.issued_to_type);
        entry.issued_to_name = Some(command.issued_to_name);
        entry.notes = command.notes;
        let transaction = TransactionRepository::insert(&mut *tx, &entry).await?;

        let attachments = attach_files(&mut tx, transaction.id, files).await?;

        tx.commit().await?;

        tracing::info!(
            "Issued {} x {} from batch {} to {} (transaction {}, {} left, by {})",
            transaction.qty,
            item_type.code,
            batch.batch_code,
            transaction.issued_to_name.as_deref().unwrap_or_default(),
            transaction.id,
            plan.counters.available(),
            user.username
        );

        Ok(detail(transaction, &item_type, Some(batch.batch_code), user, attachments))
    }
}

async fn find_item_type(conn: &mut PgConnection, id: Uuid) -> AppResult<ItemType> {
    ItemTypeRepository::find(conn, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Item type".to_string()))
}

async fn attach_files(
    conn: &mut PgConnection,
    transaction_id: Uuid,
    files: &[NewAttachment],
) -> AppResult<Vec<Attachment>> {
    let mut attachments = Vec::with_capacity(files.len());
    for file in files {
        attachments.push(AttachmentRepository::insert(&mut *conn, transaction_id, file).await?);
    }
    Ok(attachments)
}

fn detail(
    transaction: Transaction,
    item_type: &ItemType,
    batch_code: Option<String>,
    user: &User,
    attachments: Vec<Attachment>,
) -> TransactionDetail {
    TransactionDetail {
        transaction,
        item_type_name: item_type.name.clone(),
        item_type_code: item_type.code.clone(),
        batch_code,
        created_by: user.username.clone(),
        attachments,
    }
}
