//! Transaction ledger: listing, amendments and reversals

use std::collections::HashMap;

use shared::ledger::{check_recipient_change, plan_amendment, plan_reversal};
use shared::validation::AmendCommand;
use shared::{
    Attachment, PageRequest, PaginatedResponse, Transaction, TransactionDetail, TransactionType,
    User,
};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::repositories::{
    AttachmentRepository, BatchRepository, NewTransaction, TransactionFilter, TransactionRepository,
    TransactionUpdate,
};

#[derive(Clone)]
pub struct TransactionService {
    db: PgPool,
}

impl TransactionService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(
        &self,
        filter: &TransactionFilter,
        page: PageRequest,
    ) -> AppResult<PaginatedResponse<TransactionDetail>> {
        let mut transactions = TransactionRepository::list(&self.db, filter, page).await?;
        let total = TransactionRepository::count(&self.db, filter).await?;

        let ids: Vec<Uuid> = transactions.iter().map(|t| t.transaction.id).collect();
        let mut by_transaction: HashMap<Uuid, Vec<Attachment>> = HashMap::new();
        for attachment in AttachmentRepository::list_for(&self.db, &ids).await? {
            by_transaction
                .entry(attachment.transaction_id)
                .or_default()
                .push(attachment);
        }
        for t in &mut transactions {
            t.attachments = by_transaction.remove(&t.transaction.id).unwrap_or_default();
        }

        Ok(PaginatedResponse::new(transactions, page, total))
    }

    pub async fn get(&self, id: Uuid) -> AppResult<TransactionDetail> {
        let mut detail = TransactionRepository::find_detail(&self.db, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Transaction".to_string()))?;
        detail.attachments = AttachmentRepository::list_for(&self.db, &[id]).await?;
        Ok(detail)
    }

    /// Change qty, money or descriptive fields of a POSTED transaction
    pub async fn amend(&self, id: Uuid, user: &User, command: AmendCommand) -> AppResult<TransactionDetail> {
        let mut tx = self.db.begin().await?;

        let current = find_for_update(&mut tx, id).await?;
        check_recipient_change(
            &current,
            command.issued_to_type.is_some(),
            command.issued_to_name.is_some(),
        )?;

        let batch = match current.batch_id {
            Some(batch_id) => BatchRepository::find_for_update(&mut *tx, batch_id)
                .await?
                .map(|b| b.counters()),
            None => None,
        };

        let plan = plan_amendment(&current, batch, &command.amendment)?;

        if let (Some(batch_id), Some(counters)) = (current.batch_id, plan.batch) {
            BatchRepository::update_counters(&mut *tx, batch_id, counters).await?;
        }

        let update = TransactionUpdate {
            qty: plan.qty,
            unit_cost: plan.cost.unit,
            total_cost: plan.cost.total,
            unit_price: plan.price.unit,
            total_price: plan.price.total,
            issued_to_type: command.issued_to_type.or(current.issued_to_type),
            issued_to_name: command.issued_to_name.or(current.issued_to_name),
            notes: command.notes.or(current.notes),
        };
        TransactionRepository::update(&mut *tx, id, &update).await?;

        tx.commit().await?;

        tracing::info!(
            "Amended {} transaction {} (qty {} -> {}, by {})",
            current.transaction_type,
            id,
            current.qty,
            plan.qty,
            user.username
        );

        self.get(id).await
    }

    /// Undo a POSTED RECEIVE or ISSUE with a REVERSAL entry
    pub async fn reverse(&self, id: Uuid, user: &User) -> AppResult<TransactionDetail> {
        let mut tx = self.db.begin().await?;

        let original = find_for_update(&mut tx, id).await?;
        let batch = match original.batch_id {
            Some(batch_id) => BatchRepository::find_for_update(&mut *tx, batch_id)
                .await?
                .map(|b| b.counters()),
            None => None,
        };

        let counters = plan_reversal(&original, batch)?;
        if let (Some(batch_id), Some(counters)) = (original.batch_id, counters) {
            BatchRepository::update_counters(&mut *tx, batch_id, counters).await?;
        }

        TransactionRepository::mark_reversed(&mut *tx, id).await?;

        let mut entry = NewTransaction::new(TransactionType::Reversal, original.item_type_id, original.qty, user.id);
        entry.batch_id = original.batch_id;
        entry.reversal_of = Some(original.id);
        entry.notes = Some(format!("Reversal of {} {}", original.transaction_type, original.id));
        let reversal = TransactionRepository::insert(&mut *tx, &entry).await?;

        tx.commit().await?;

        tracing::info!(
            "Reversed {} transaction {} with {} (qty {}, by {})",
            original.transaction_type,
            original.id,
            reversal.id,
            original.qty,
            user.username
        );

        self.get(reversal.id).await
    }
}

async fn find_for_update(conn: &mut PgConnection, id: Uuid) -> AppResult<Transaction> {
    TransactionRepository::find_for_update(conn, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Transaction".to_string()))
}
