//! Inventory service contract.

use reqwest::Method;

use crate::client::DownstreamRequest;

/// Service name used for endpoint lookup, span and metric labels.
pub const SERVICE: &str = "inventory";

/// Path of the read-only availability check.
pub const CHECK_PATH: &str = "/inventory";

/// Builds the availability check: a `GET` with no body. Any 2xx answer
/// counts as available; the body is not inspected.
pub fn check_request() -> DownstreamRequest {
    DownstreamRequest::new(SERVICE, Method::GET, CHECK_PATH)
}
