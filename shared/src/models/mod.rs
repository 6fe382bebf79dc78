//! Domain models for the card stock tracker

mod batch;
mod item_type;
mod mode;
mod transaction;
mod user;

pub use batch::*;
pub use item_type::*;
pub use mode::*;
pub use transaction::*;
pub use user::*;
