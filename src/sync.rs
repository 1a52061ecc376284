//! The per-run sync orchestrator.
//!
//! One run: build the customer link set, list unpaid source invoices updated
//! since the first of the current month, and for each linked customer sync
//! the first matching invoice into the accounting platform. Failures are
//! isolated per customer; the run always continues to the next link.
//!
//! Known limitations: the unpaid window resets at each month boundary, so an
//! invoice that stays unpaid across the boundary falls out of scope until
//! touched again; and at most one invoice per customer is processed per run
//! (first match).

use std::fmt;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::mapping::MappingTable;
use crate::syncro::customer::{Customer, XERO_LINK_PROPERTY};
use crate::syncro::invoice::InvoiceSummary;
use crate::syncro::payment::{NewPayment, PAYMENT_METHOD};
use crate::translate::{SourceLineItem, translate};
use crate::{syncro, xero};

/// Payment terms applied to every created invoice.
const NET_TERMS_DAYS: i64 = 30;

/// A source customer paired with its accounting-platform contact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerLink {
    pub source_id: i64,
    pub contact_id: Uuid,
    pub business_name: String,
}

/// Outcome counters for one run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncCounters {
    pub invoices_processed: u32,
    pub invoices_created: u32,
    pub invoices_failed: u32,
    pub payments_created: u32,
    pub payments_failed: u32,
}

impl fmt::Display for SyncCounters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "invoices processed: {}", self.invoices_processed)?;
        writeln!(f, "invoices created:   {}", self.invoices_created)?;
        writeln!(f, "invoices failed:    {}", self.invoices_failed)?;
        writeln!(f, "payments created:   {}", self.payments_created)?;
        write!(f, "payments failed:    {}", self.payments_failed)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SyncOptions {
    /// Create invoices but never submit quick-pay payment records.
    pub skip_payments: bool,
}

pub struct Orchestrator {
    source: syncro::Client,
    books: xero::Client,
    mapping: MappingTable,
    options: SyncOptions,
}

/// First day of `now`'s month; the unpaid-invoice window opens here.
#[must_use]
pub fn month_start(now: OffsetDateTime) -> Date {
    now.date()
        .replace_day(1)
        .expect("day 1 is valid in every month")
}

impl Orchestrator {
    #[must_use]
    pub fn new(
        source: syncro::Client,
        books: xero::Client,
        mapping: MappingTable,
        options: SyncOptions,
    ) -> Self {
        Self {
            source,
            books,
            mapping,
            options,
        }
    }

    /// Drives one complete run and returns the counters for the summary.
    ///
    /// Only the bootstrap listings can fail the run from here; everything
    /// after the first per-customer step is caught, logged, and counted.
    pub async fn run(&self) -> Result<SyncCounters> {
        let now = OffsetDateTime::now_utc();
        self.run_at(now).await
    }

    /// As [`Self::run`], with an injectable clock.
    pub async fn run_at(&self, now: OffsetDateTime) -> Result<SyncCounters> {
        let links = self.customer_links().await?;
        info!(linked_customers = links.len(), "customer link set built");

        let since = month_start(now);
        let invoices = self.source.invoices().list_unpaid_since(since).await?;
        info!(unpaid_invoices = invoices.len(), %since, "unpaid invoice window fetched");

        let mut counters = SyncCounters::default();
        for link in &links {
            // First match only; additional unpaid invoices for the same
            // customer wait for a later run.
            let Some(summary) = invoices.iter().find(|i| i.customer_id == link.source_id)
            else {
                continue;
            };

            counters.invoices_processed += 1;
            self.sync_invoice(link, summary, &mut counters).await;
        }

        info!(?counters, "run complete");
        Ok(counters)
    }

    /// Filters the full customer list down to those carrying a parseable
    /// link property. Customers without the property are intentionally
    /// silent; a malformed value gets a warning.
    async fn customer_links(&self) -> Result<Vec<CustomerLink>> {
        let customers = self.source.customers().list_all().await?;
        let links = customers
            .iter()
            .filter_map(|customer| self.link_of(customer))
            .collect();
        Ok(links)
    }

    fn link_of(&self, customer: &Customer) -> Option<CustomerLink> {
        let raw = customer.property(XERO_LINK_PROPERTY)?;
        match Uuid::parse_str(raw) {
            Ok(contact_id) => Some(CustomerLink {
                source_id: customer.id,
                contact_id,
                business_name: customer.display_name().to_string(),
            }),
            Err(_) => {
                warn!(
                    customer_id = customer.id,
                    customer = customer.display_name(),
                    value = raw,
                    "link property is not a valid contact id; skipping customer"
                );
                None
            }
        }
    }

    /// Syncs one invoice end to end. Never returns an error: every failure
    /// is logged with its ids and folded into the counters.
    async fn sync_invoice(
        &self,
        link: &CustomerLink,
        summary: &InvoiceSummary,
        counters: &mut SyncCounters,
    ) {
        info!(
            customer_id = link.source_id,
            customer = %link.business_name,
            invoice_id = summary.id,
            invoice_number = %summary.number,
            "syncing invoice"
        );

        let created = match self.create_invoice(link, summary).await {
            Ok(invoice) => invoice,
            Err(err) => {
                counters.invoices_failed += 1;
                error!(
                    customer_id = link.source_id,
                    invoice_id = summary.id,
                    error = %err,
                    "invoice creation failed; continuing with next customer"
                );
                return;
            }
        };

        counters.invoices_created += 1;
        info!(
            invoice_id = summary.id,
            xero_invoice_id = %created.invoice_id,
            "invoice created"
        );

        if self.options.skip_payments {
            debug!(invoice_id = summary.id, "quick-pay disabled; leaving source invoice unpaid");
            return;
        }

        match self.create_payment(link, summary).await {
            Ok(payment) => {
                counters.payments_created += 1;
                info!(invoice_id = summary.id, payment_id = payment.id, "quick payment recorded");
            }
            Err(err) => {
                // The invoice stays created in the target and unpaid at the
                // source; reconciliation is manual.
                counters.payments_failed += 1;
                error!(
                    customer_id = link.source_id,
                    invoice_id = summary.id,
                    error = %err,
                    "quick payment failed; source invoice remains unpaid"
                );
            }
        }
    }

    async fn create_invoice(
        &self,
        link: &CustomerLink,
        summary: &InvoiceSummary,
    ) -> Result<xero::invoice::Invoice> {
        let wrap = |source: Error| Error::InvoiceCreate {
            customer_id: link.source_id,
            source: Box::new(source),
        };

        let detail = self.source.invoices().get(summary.id).await.map_err(wrap)?;
        let source_items: Vec<SourceLineItem> =
            detail.line_items.iter().map(SourceLineItem::from).collect();
        let line_items = translate(&source_items, &self.mapping);
        debug!(
            invoice_id = summary.id,
            source_lines = source_items.len(),
            consolidated_lines = line_items.len(),
            "line items translated"
        );

        let today = OffsetDateTime::now_utc().date();
        let builder = xero::invoice::Builder {
            r#type: xero::invoice::Type::AccountsReceivable,
            contact: xero::invoice::ContactRef {
                contact_id: link.contact_id,
            },
            date: today,
            due_date: today + time::Duration::days(NET_TERMS_DAYS),
            status: xero::invoice::Status::Authorised,
            line_amount_types: xero::invoice::LineAmountType::Exclusive,
            line_items: line_items.into_iter().map(Into::into).collect(),
            reference: Some(detail.number.clone()),
        };

        self.books.invoices().create(&builder).await.map_err(wrap)
    }

    async fn create_payment(
        &self,
        link: &CustomerLink,
        summary: &InvoiceSummary,
    ) -> Result<syncro::payment::Payment> {
        let wrap = |source: Error| Error::PaymentCreate {
            invoice_id: summary.id,
            source: Box::new(source),
        };

        let amount_cents = to_minor_units(summary.total).ok_or_else(|| {
            wrap(Error::Config(format!(
                "invoice total {} cannot be expressed in cents",
                summary.total
            )))
        })?;

        let new_payment = NewPayment {
            customer_id: link.source_id,
            invoice_id: summary.id,
            amount_cents,
            payment_method: PAYMENT_METHOD.to_string(),
        };
        self.source.payments().create(&new_payment).await.map_err(wrap)
    }
}

/// Converts a decimal currency amount to minor units without passing through
/// binary floating point.
fn to_minor_units(amount: Decimal) -> Option<i64> {
    (amount * Decimal::ONE_HUNDRED).round().to_i64()
}
