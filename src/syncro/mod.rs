//! Syncro MSP API surface: customer/invoice reads and the quick-pay payment
//! write. Authentication is a bearer API key; list endpoints are paginated
//! through a `meta` envelope.

pub mod client;
pub mod customer;
pub mod invoice;
pub mod payment;

pub use client::Client;

use serde::Deserialize;

/// Pagination envelope returned by Syncro list endpoints.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Meta {
    pub total_pages: u32,
    pub page: u32,
}
