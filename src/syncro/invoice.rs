use rust_decimal::Decimal;
use serde::Deserialize;

use super::Meta;
use crate::translate::SourceLineItem;

/// An invoice as returned by the list endpoint. Line items are only present
/// on the detail endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceSummary {
    pub id: i64,
    pub customer_id: i64,
    pub number: String,
    pub total: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Invoice {
    pub id: i64,
    pub customer_id: i64,
    pub number: String,
    pub total: Decimal,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LineItem {
    pub id: i64,
    /// Absent for ad-hoc lines typed straight into the invoice.
    pub product_id: Option<i64>,
    pub name: String,
    pub quantity: Decimal,
    pub price: Decimal,
}

impl From<&LineItem> for SourceLineItem {
    fn from(item: &LineItem) -> Self {
        Self {
            // Ad-hoc lines carry no product id and resolve to the DEFAULT
            // mapping downstream.
            product_id: item.product_id.map(|id| id.to_string()).unwrap_or_default(),
            quantity: item.quantity,
            unit_price: item.price,
            display_name: item.name.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListResponse {
    pub invoices: Vec<InvoiceSummary>,
    pub meta: Meta,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DetailResponse {
    pub invoice: Invoice,
}
