use serde::{Deserialize, Serialize};

/// Fixed method sentinel distinguishing synced quick-pays from payments
/// recorded by a human.
pub const PAYMENT_METHOD: &str = "Xero Sync";

/// Payload for recording a quick payment against a source invoice.
#[derive(Debug, Clone, Serialize)]
pub struct NewPayment {
    pub customer_id: i64,
    pub invoice_id: i64,
    pub amount_cents: i64,
    pub payment_method: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Payment {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateResponse {
    pub payment: Payment,
}
