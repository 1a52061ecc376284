use serde::Deserialize;
use serde_json::{Map, Value};

use super::Meta;

/// The customer custom property holding the linked Xero contact id.
pub const XERO_LINK_PROPERTY: &str = "xero_contact_id";

#[derive(Debug, Clone, Deserialize)]
pub struct Customer {
    pub id: i64,
    pub business_name: Option<String>,
    pub fullname: Option<String>,
    pub email: Option<String>,
    /// Free-form custom fields configured per Syncro account.
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl Customer {
    /// Returns a custom property value, if present and a string.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        self.business_name
            .as_deref()
            .or(self.fullname.as_deref())
            .unwrap_or("(unnamed customer)")
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListResponse {
    pub customers: Vec<Customer>,
    pub meta: Meta,
}
