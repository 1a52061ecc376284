//! # xerosync
//!
//! Batch sync of unpaid Syncro MSP invoices into Xero.
//!
//! Each run reads the customer list from Syncro, keeps the customers whose
//! `xero_contact_id` custom property links them to a Xero contact, and pulls
//! the unpaid invoices updated since the first of the current month. Line
//! items are translated through a CSV product-mapping table, consolidated,
//! and submitted as a new Xero invoice; unless `--skip-payments` is set, the
//! source invoice is then flagged paid with a synthetic quick payment.
//!
//! The interesting parts live in [`translate`] (the pure mapping and
//! consolidation engine) and [`oauth`] (the token lifecycle manager).
//! Everything else is typed plumbing around the two vendor APIs.

#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

#[macro_use]
extern crate tracing;

pub mod config;
pub mod error;
pub mod mapping;
pub mod oauth;
pub mod sync;
pub mod syncro;
pub mod translate;
pub mod utils;
pub mod xero;

pub use config::{Settings, SettingsStore};
pub use error::{Error, Result};
pub use mapping::{MappingTable, ProductMapping};
pub use oauth::{CodeProvider, StdinCodeProvider, TokenManager, TokenPhase};
pub use sync::{CustomerLink, Orchestrator, SyncCounters, SyncOptions};
pub use translate::{SourceLineItem, TargetLineItem, translate};
