use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::Date;
use uuid::Uuid;

use crate::utils::date_format::iso_date;
use crate::xero::line_item::LineItem;

pub const ENDPOINT: &str = "Invoices";

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum Type {
    #[serde(rename = "ACCPAY")]
    AccountsPayable,

    #[serde(rename = "ACCREC")]
    AccountsReceivable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Draft,
    Submitted,
    Authorised,
    Paid,
    Voided,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum LineAmountType {
    Exclusive,
    Inclusive,
    NoTax,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContactRef {
    #[serde(rename = "ContactID")]
    pub contact_id: Uuid,
}

/// Payload for invoice creation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Builder {
    pub r#type: Type,
    pub contact: ContactRef,
    #[serde(with = "iso_date")]
    pub date: Date,
    #[serde(with = "iso_date")]
    pub due_date: Date,
    pub status: Status,
    pub line_amount_types: LineAmountType,
    pub line_items: Vec<LineItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

/// An invoice as returned by the API after creation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Invoice {
    #[serde(rename = "InvoiceID")]
    pub invoice_id: Uuid,
    pub invoice_number: Option<String>,
    pub status: Option<Status>,
    pub total: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ListResponse {
    pub invoices: Vec<Invoice>,
}
