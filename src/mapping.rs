//! Product mapping table.
//!
//! Loaded once at startup from `product_mappings.csv` and read-only for the
//! rest of the run. Each row maps a Syncro product id to the Xero item code
//! that should appear on the created invoice. The row whose `SourceProductID`
//! is the literal `DEFAULT` catches every product with no exact match; a file
//! without one fails the run at load time so no partially-mapped invoice can
//! slip through.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Reserved `SourceProductID` for the fallback row.
pub const DEFAULT_PRODUCT_ID: &str = "DEFAULT";

#[derive(Debug, Clone, Deserialize)]
struct Row {
    #[serde(rename = "SourceProductID")]
    source_product_id: String,
    #[serde(rename = "TargetItemID")]
    target_item_id: String,
    #[serde(rename = "DisplayName")]
    display_name: String,
    #[serde(rename = "IncludeDescription")]
    include_description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductMapping {
    pub source_product: String,
    pub item_code: String,
    pub display_name: String,
    pub include_description: bool,
}

impl From<Row> for ProductMapping {
    fn from(row: Row) -> Self {
        Self {
            source_product: row.source_product_id,
            item_code: row.target_item_id,
            display_name: row.display_name,
            // Exact, case-sensitive literal. "yes"/"YES"/"true" all mean No.
            include_description: row.include_description == "Yes",
        }
    }
}

#[derive(Debug, Clone)]
pub struct MappingTable {
    entries: HashMap<String, ProductMapping>,
    default: ProductMapping,
}

impl MappingTable {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_reader(file)
    }

    pub fn from_reader(reader: impl Read) -> Result<Self> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut entries: HashMap<String, ProductMapping> = HashMap::new();
        let mut default: Option<ProductMapping> = None;

        for record in csv_reader.deserialize() {
            let row: Row =
                record.map_err(|e| Error::Config(format!("invalid mapping row: {e}")))?;
            let mapping = ProductMapping::from(row);

            if mapping.source_product == DEFAULT_PRODUCT_ID {
                if default.is_some() {
                    warn!(item_code = %mapping.item_code, "duplicate DEFAULT mapping row ignored; first row wins");
                } else {
                    default = Some(mapping);
                }
                continue;
            }

            if entries.contains_key(&mapping.source_product) {
                warn!(
                    source_product = %mapping.source_product,
                    "duplicate mapping row ignored; first row wins"
                );
                continue;
            }
            entries.insert(mapping.source_product.clone(), mapping);
        }

        let default = default.ok_or_else(|| {
            Error::Config("mapping file has no DEFAULT row; refusing to run".to_string())
        })?;

        info!(
            mappings = entries.len(),
            default_item = %default.item_code,
            "product mapping table loaded"
        );
        Ok(Self { entries, default })
    }

    /// Resolves a source product id to its mapping. Exact match wins,
    /// otherwise the DEFAULT row is returned.
    #[must_use]
    pub fn resolve(&self, source_product_id: &str) -> &ProductMapping {
        self.entries
            .get(source_product_id)
            .unwrap_or(&self.default)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
SourceProductID,TargetItemID,DisplayName,IncludeDescription
42,I1,Labor,Yes
99,I2,Parts,No
DEFAULT,I0,Misc,No
";

    #[test]
    fn resolve_prefers_exact_match_over_default() {
        let table = MappingTable::from_reader(CSV.as_bytes()).unwrap();
        assert_eq!(table.resolve("42").item_code, "I1");
        assert_eq!(table.resolve("unknown").item_code, "I0");
    }

    #[test]
    fn missing_default_is_a_config_error() {
        let csv = "\
SourceProductID,TargetItemID,DisplayName,IncludeDescription
42,I1,Labor,Yes
";
        let err = MappingTable::from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn duplicate_rows_first_wins() {
        let csv = "\
SourceProductID,TargetItemID,DisplayName,IncludeDescription
42,I1,Labor,Yes
42,I9,Shadowed,No
DEFAULT,I0,Misc,No
DEFAULT,I8,Shadowed,Yes
";
        let table = MappingTable::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(table.resolve("42").item_code, "I1");
        assert_eq!(table.resolve("nope").item_code, "I0");
    }

    #[test]
    fn include_description_requires_exact_yes() {
        let csv = "\
SourceProductID,TargetItemID,DisplayName,IncludeDescription
1,A,One,Yes
2,B,Two,yes
3,C,Three,YES
4,D,Four,No
DEFAULT,I0,Misc,No
";
        let table = MappingTable::from_reader(csv.as_bytes()).unwrap();
        assert!(table.resolve("1").include_description);
        assert!(!table.resolve("2").include_description);
        assert!(!table.resolve("3").include_description);
        assert!(!table.resolve("4").include_description);
    }
}
