//! Request and response shapes of the inventory and payment services.

pub mod inventory;
pub mod payment;

pub use payment::{PaymentReceipt, PaymentRequest};
