//! Route definitions for the card stock API

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes, mounted under `/api`
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Item type catalogue
        .nest("/item-types", item_type_routes())
        // Receiving and issuing
        .nest("/inventory", inventory_routes())
        // Ledger
        .nest("/transactions", transaction_routes())
        // Reports
        .nest("/reports", report_routes())
        // Attachment files
        .route("/uploads/:filename", get(handlers::get_upload))
}

fn item_type_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_item_types).post(handlers::create_item_type))
        .route("/:id", patch(handlers::update_item_type))
}

fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route("/batches", get(handlers::list_batches))
        .route("/receive", post(handlers::receive_stock))
        .route("/issue", post(handlers::issue_stock))
}

fn transaction_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_transactions))
        .route(
            "/:id",
            get(handlers::get_transaction).patch(handlers::amend_transaction),
        )
        .route("/:id/reverse", post(handlers::reverse_transaction))
}

fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(handlers::dashboard))
        .route("/stock-balance", get(handlers::stock_balance))
        .route("/issues", get(handlers::issues_report))
        .route("/receipts", get(handlers::receipts_report))
        .route("/user-activity", get(handlers::user_activity))
}
