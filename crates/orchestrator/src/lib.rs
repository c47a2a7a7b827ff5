//! Order creation pipeline and downstream service clients.
//!
//! An order is created in four steps:
//! 1. Validate the request body
//! 2. Check inventory
//! 3. Process payment
//! 4. Store the order record
//!
//! Any failure ends the pipeline. Steps that already succeeded are not
//! compensated: a payment taken before a later failure stays taken.

pub mod client;
pub mod coordinator;
pub mod error;
pub mod ids;
pub mod services;
pub mod state;

pub use client::{
    DownstreamClient, DownstreamRequest, DownstreamResponse, ErrorBody, HttpDownstreamClient,
};
#[cfg(any(test, feature = "test-util"))]
pub use client::{RecordedCall, ScriptedDownstreamClient};
pub use coordinator::OrderOrchestrator;
pub use error::{DownstreamError, OrderError};
pub use ids::{FixedOrderIds, ORDER_ID_BOUND, OrderIdSource, RandomOrderIds};
pub use services::{PaymentReceipt, PaymentRequest};
pub use state::OrderState;
