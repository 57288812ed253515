pub mod enums;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::{OrderDuration, OrderSide, OrderType};
pub use structs::{Account, Holding, OrderRequest, OrderReceipt, Transaction};
