//! Order request and record types.

mod record;
mod request;

pub use record::{OrderId, OrderRecord, OrderStatus};
pub use request::OrderRequest;
