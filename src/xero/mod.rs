//! Minimal Xero accounting API surface: just enough to create the invoices
//! this tool produces.

pub mod client;
pub mod invoice;
pub mod line_item;

pub use client::Client;
