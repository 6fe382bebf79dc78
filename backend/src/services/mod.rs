//! Business logic services for the card stock tracker

pub mod inventory;
pub mod item_type;
pub mod report;
pub mod storage;
pub mod transaction;

pub use inventory::InventoryService;
pub use item_type::ItemTypeService;
pub use report::ReportService;
pub use storage::UploadStorage;
pub use transaction::TransactionService;
