//! Domain layer for the order service.
//!
//! This crate provides:
//! - `OrderRequest` parsing and validation of inbound order bodies
//! - `OrderRecord`, the immutable result of a successful order
//! - `OrderStore` trait and its in-memory implementation

pub mod error;
pub mod order;
pub mod store;

pub use error::ValidationError;
pub use order::{OrderId, OrderRecord, OrderRequest, OrderStatus};
pub use store::{InMemoryOrderStore, OrderStore};
