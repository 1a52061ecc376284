use rust_decimal::Decimal;
use serde::Serialize;

use crate::translate::TargetLineItem;

/// A line item on an invoice creation payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LineItem {
    pub item_code: String,
    pub quantity: Decimal,
    pub unit_amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl From<TargetLineItem> for LineItem {
    fn from(item: TargetLineItem) -> Self {
        Self {
            item_code: item.item_code,
            quantity: item.quantity,
            unit_amount: item.rate,
            description: item.description,
        }
    }
}
