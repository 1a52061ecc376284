//! Invoice line-item translation and consolidation.
//!
//! [`translate`] is a pure function over its inputs: each call builds its own
//! working set, so no state leaks between invoices. Translation happens in
//! two passes. First every source line item is mapped through the
//! [`MappingTable`](crate::mapping::MappingTable) into a [`TargetLineItem`].
//! Second, items that agree on item code, description, and rate are merged
//! into a single line with summed quantity. Output preserves the order in
//! which each group first appeared.

use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::mapping::MappingTable;

/// A line item as retrieved from the source invoice.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceLineItem {
    pub product_id: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub display_name: String,
}

/// A line item in the shape the accounting platform expects.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetLineItem {
    pub item_code: String,
    pub quantity: Decimal,
    pub rate: Decimal,
    pub description: Option<String>,
}

/// Identity under which translated line items are merged. An absent
/// description collapses to the empty string, so `None` and `Some("")`
/// consolidate together.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ConsolidationKey {
    item_code: String,
    description: String,
    rate: Decimal,
}

impl ConsolidationKey {
    fn of(item: &TargetLineItem) -> Self {
        Self {
            item_code: item.item_code.clone(),
            description: item.description.clone().unwrap_or_default(),
            rate: item.rate,
        }
    }
}

/// Maps and consolidates one invoice's line items.
#[must_use]
pub fn translate(items: &[SourceLineItem], table: &MappingTable) -> Vec<TargetLineItem> {
    let mut consolidated: Vec<TargetLineItem> = Vec::new();
    let mut positions: HashMap<ConsolidationKey, usize> = HashMap::new();

    for item in items {
        let mapping = table.resolve(&item.product_id);
        let target = TargetLineItem {
            item_code: mapping.item_code.clone(),
            quantity: item.quantity,
            rate: item.unit_price,
            description: mapping
                .include_description
                .then(|| item.display_name.clone()),
        };

        let key = ConsolidationKey::of(&target);
        match positions.get(&key) {
            Some(&index) => {
                consolidated[index].quantity += target.quantity;
            }
            None => {
                positions.insert(key, consolidated.len());
                consolidated.push(target);
            }
        }
    }

    consolidated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::MappingTable;
    use rust_decimal_macros::dec;

    fn table() -> MappingTable {
        let csv = "\
SourceProductID,TargetItemID,DisplayName,IncludeDescription
42,I1,Labor,Yes
99,I2,Parts,No
DEFAULT,I0,Misc,No
";
        MappingTable::from_reader(csv.as_bytes()).unwrap()
    }

    fn item(product_id: &str, qty: Decimal, price: Decimal, name: &str) -> SourceLineItem {
        SourceLineItem {
            product_id: product_id.to_string(),
            quantity: qty,
            unit_price: price,
            display_name: name.to_string(),
        }
    }

    #[test]
    fn maps_and_consolidates_duplicate_lines() {
        let items = vec![
            item("42", dec!(2), dec!(50), "Labor"),
            item("42", dec!(3), dec!(50), "Labor"),
            item("99", dec!(1), dec!(10), "Part"),
        ];

        let out = translate(&items, &table());

        assert_eq!(
            out,
            vec![
                TargetLineItem {
                    item_code: "I1".to_string(),
                    quantity: dec!(5),
                    rate: dec!(50),
                    description: Some("Labor".to_string()),
                },
                TargetLineItem {
                    item_code: "I2".to_string(),
                    quantity: dec!(1),
                    rate: dec!(10),
                    description: None,
                },
            ]
        );
    }

    #[test]
    fn unknown_products_fall_back_to_default() {
        let items = vec![item("555", dec!(4), dec!(25), "Widget")];
        let out = translate(&items, &table());

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].item_code, "I0");
        assert_eq!(out[0].description, None);
    }

    #[test]
    fn same_item_different_rate_stays_separate() {
        let items = vec![
            item("42", dec!(1), dec!(50), "Labor"),
            item("42", dec!(1), dec!(75), "Labor"),
        ];
        let out = translate(&items, &table());

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].rate, dec!(50));
        assert_eq!(out[1].rate, dec!(75));
    }

    #[test]
    fn consolidation_is_permutation_invariant() {
        let items = vec![
            item("42", dec!(2), dec!(50), "Labor"),
            item("99", dec!(1), dec!(10), "Part"),
            item("42", dec!(3), dec!(50), "Labor"),
            item("555", dec!(7), dec!(1.25), "Widget"),
        ];

        let baseline = {
            let mut out = translate(&items, &table());
            out.sort_by(|a, b| (&a.item_code, a.rate).cmp(&(&b.item_code, b.rate)));
            out
        };
        let input_total: Decimal = items.iter().map(|i| i.quantity).sum();

        // Rotate through every cyclic permutation; the consolidated set and
        // its total quantity must not depend on input order.
        let mut rotated = items.clone();
        for _ in 0..rotated.len() {
            rotated.rotate_left(1);
            let mut out = translate(&rotated, &table());
            let output_total: Decimal = out.iter().map(|i| i.quantity).sum();
            assert_eq!(output_total, input_total);
            out.sort_by(|a, b| (&a.item_code, a.rate).cmp(&(&b.item_code, b.rate)));
            assert_eq!(out, baseline);
        }
    }

    #[test]
    fn fractional_quantities_sum_without_drift() {
        // 0.1 added ten times is exactly 1 in decimal arithmetic.
        let items: Vec<_> = (0..10)
            .map(|_| item("42", dec!(0.1), dec!(19.99), "Labor"))
            .collect();
        let out = translate(&items, &table());

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].quantity, dec!(1.0));
    }

    #[test]
    fn empty_description_consolidates_with_absent() {
        // Product 99 maps with the description suppressed; an explicit empty
        // display name on a Yes-mapping collapses to the same key.
        let csv = "\
SourceProductID,TargetItemID,DisplayName,IncludeDescription
7,I2,Parts,Yes
99,I2,Parts,No
DEFAULT,I0,Misc,No
";
        let table = MappingTable::from_reader(csv.as_bytes()).unwrap();
        let items = vec![
            item("99", dec!(1), dec!(10), "ignored"),
            item("7", dec!(2), dec!(10), ""),
        ];

        let out = translate(&items, &table);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].quantity, dec!(3));
    }

    #[test]
    fn consecutive_calls_share_no_state() {
        let first = translate(&[item("42", dec!(2), dec!(50), "Labor")], &table());
        let second = translate(&[item("42", dec!(3), dec!(50), "Labor")], &table());

        assert_eq!(first[0].quantity, dec!(2));
        assert_eq!(second[0].quantity, dec!(3));
    }
}
