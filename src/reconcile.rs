//! The reconciliation join: pending PAP-PIN lines against delivered POD
//! items, keyed on (order number, derived product code).
//!
//! Inputs are assumed normalized. A missing join key here is a data error
//! and stops the run — unlike the extractor, there is no per-row skip.

use crate::catalog::ProductCatalog;
use crate::records::{DeliveredItem, OpenOrderLine, SelectableItem};
use std::collections::HashSet;
use tracing::info;

/// Merge delivered items with pending order lines into the final ordered
/// Selectable Items table, unique per (order number, product code).
///
/// Steps, in the order that downstream compatibility requires:
/// left-join on (order number, product code main), drop lines without a
/// confirmed delivery, append headgear lines unconditionally, deduplicate
/// keep-first, sort by (order number, product code) as text, then backfill
/// headgear fields from the next sorted row.
pub fn select_items(
    delivered: &[DeliveredItem],
    pap_pin: &[OpenOrderLine],
    headgear: &[OpenOrderLine],
    catalog: &ProductCatalog,
) -> Result<Vec<SelectableItem>, Box<dyn std::error::Error>> {
    for line in pap_pin.iter().chain(headgear) {
        if line.order_number.is_empty() || line.product_code_main.is_empty() {
            return Err(format!(
                "open order line for {:?} has an empty join key",
                line.patient_name
            )
            .into());
        }
    }
    for item in delivered {
        if item.order_number.is_empty() || item.product_code_main.is_empty() {
            return Err(format!(
                "delivered item {:?} has an empty join key",
                item.item_number
            )
            .into());
        }
    }

    // Left join; a pending line matching several delivered rows yields one
    // candidate per match. Unmatched lines have no delivery date and are
    // not selectable, so they drop out here.
    let mut items: Vec<SelectableItem> = Vec::new();
    for line in pap_pin {
        for delivery in delivered.iter().filter(|d| {
            d.order_number == line.order_number && d.product_code_main == line.product_code_main
        }) {
            items.push(SelectableItem {
                order_number: line.order_number.clone(),
                product_code: line.product_code.clone(),
                ship_date: Some(delivery.ship_date),
                delivery_date: Some(delivery.delivery_date),
                quantity: Some(delivery.quantity),
                customer_number: line.customer_number.clone(),
                patient_name: line.patient_name.clone(),
            });
        }
    }

    // Headgear lines ride along without delivery confirmation; their
    // delivery fields are filled from a sibling after sorting.
    for line in headgear {
        items.push(SelectableItem {
            order_number: line.order_number.clone(),
            product_code: line.product_code.clone(),
            ship_date: None,
            delivery_date: None,
            quantity: None,
            customer_number: line.customer_number.clone(),
            patient_name: line.patient_name.clone(),
        });
    }

    // Deduplicate keep-first in pre-sort order, then the text sort. Order
    // numbers compare lexicographically on purpose — the downstream
    // consumer has always seen them that way.
    let mut seen = HashSet::new();
    items.retain(|item| seen.insert((item.order_number.clone(), item.product_code.clone())));
    items.sort_by(|a, b| {
        (&a.order_number, &a.product_code).cmp(&(&b.order_number, &b.product_code))
    });

    backfill_headgear(&mut items, catalog);

    info!(selectable = items.len(), "Reconciliation complete");
    Ok(items)
}

/// Fill a headgear row's missing quantity/ship/delivery from the next row
/// in sort order. Lookahead is exactly one row and there is no lookbehind:
/// a headgear row that sorts last keeps its nulls.
fn backfill_headgear(items: &mut [SelectableItem], catalog: &ProductCatalog) {
    for i in 0..items.len() {
        if !catalog.is_headgear(&items[i].product_code) {
            continue;
        }
        let Some(next) = items.get(i + 1).cloned() else {
            continue;
        };
        let item = &mut items[i];
        item.quantity = item.quantity.or(next.quantity);
        item.ship_date = item.ship_date.or(next.ship_date);
        item.delivery_date = item.delivery_date.or(next.delivery_date);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn open_line(order: &str, code: &str, main: &str) -> OpenOrderLine {
        OpenOrderLine {
            customer_number: "20871".into(),
            patient_name: "Doe, Jane".into(),
            order_number: order.into(),
            product_category: "RESPIRATORY".into(),
            product_code: code.into(),
            inventory_location: "104".into(),
            initials: "PIN".into(),
            line_selection_status: "No".into(),
            create_date: d(2),
            product_code_main: main.into(),
        }
    }

    fn delivered_item(order: &str, main: &str, qty: i64) -> DeliveredItem {
        DeliveredItem {
            customer_name: "Jane Doe".into(),
            order_number: order.into(),
            item_number: format!("VND-{main}"),
            quantity: qty,
            ship_date: d(5),
            delivery_date: d(8),
            product_code_main: main.into(),
        }
    }

    #[test]
    fn confirmed_delivery_becomes_selectable() {
        let catalog = ProductCatalog::default();
        let items = select_items(
            &[delivered_item("100", "63801", 2)],
            &[open_line("100", "RES 63801", "63801")],
            &[],
            &catalog,
        )
        .unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].order_number, "100");
        assert_eq!(items[0].product_code, "RES 63801");
        assert_eq!(items[0].quantity, Some(2));
        assert_eq!(items[0].ship_date, Some(d(5)));
        assert_eq!(items[0].delivery_date, Some(d(8)));
    }

    #[test]
    fn unconfirmed_lines_drop_out() {
        let catalog = ProductCatalog::default();
        let items = select_items(&[], &[open_line("100", "RES 63801", "63801")], &[], &catalog)
            .unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn duplicate_keys_keep_the_first_row() {
        let catalog = ProductCatalog::default();
        let items = select_items(
            &[
                delivered_item("100", "63801", 2),
                delivered_item("100", "63801", 9),
            ],
            &[open_line("100", "RES 63801", "63801")],
            &[],
            &catalog,
        )
        .unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, Some(2));
    }

    #[test]
    fn headgear_joins_without_delivery_and_backfills_from_next_row() {
        let catalog = ProductCatalog::default();
        let headgear = open_line("100", "HCS A7035", "A7035");
        let items = select_items(
            &[delivered_item("100", "63801", 2)],
            &[open_line("100", "RES 63801", "63801"), headgear.clone()],
            &[headgear],
            &catalog,
        )
        .unwrap();

        assert_eq!(items.len(), 2);
        // "HCS A7035" sorts before "RES 63801", so the headgear row sits
        // first and fills from its confirmed sibling
        assert_eq!(items[0].product_code, "HCS A7035");
        assert_eq!(items[0].quantity, Some(2));
        assert_eq!(items[0].ship_date, Some(d(5)));
        assert_eq!(items[0].delivery_date, Some(d(8)));
    }

    #[test]
    fn trailing_headgear_keeps_nulls() {
        // Lookahead is one row forward only; a headgear line with nothing
        // after it stays unfilled even when a populated row sits before it.
        let catalog = ProductCatalog::default();
        let headgear = open_line("200", "HCS HEADGEAR", "DGEAR");
        let items = select_items(
            &[delivered_item("100", "63801", 2)],
            &[open_line("100", "RES 63801", "63801")],
            &[headgear],
            &catalog,
        )
        .unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[1].product_code, "HCS HEADGEAR");
        assert_eq!(items[1].quantity, None);
        assert_eq!(items[1].ship_date, None);
        assert_eq!(items[1].delivery_date, None);
    }

    #[test]
    fn headgear_with_confirmed_delivery_is_not_overwritten() {
        let catalog = ProductCatalog::default();
        let headgear = open_line("100", "HCS A7035", "A7035");
        let items = select_items(
            &[
                delivered_item("100", "A7035", 1),
                delivered_item("100", "63801", 7),
            ],
            &[headgear.clone(), open_line("100", "RES 63801", "63801")],
            &[headgear],
            &catalog,
        )
        .unwrap();

        // The headgear line matched its own delivery; dedup kept that row
        // and backfill had nothing to do
        assert_eq!(items[0].product_code, "HCS A7035");
        assert_eq!(items[0].quantity, Some(1));
    }

    #[test]
    fn order_numbers_sort_as_text() {
        let catalog = ProductCatalog::default();
        let items = select_items(
            &[
                delivered_item("99998", "63801", 1),
                delivered_item("100002", "63801", 1),
            ],
            &[
                open_line("99998", "RES 63801", "63801"),
                open_line("100002", "RES 63801", "63801"),
            ],
            &[],
            &catalog,
        )
        .unwrap();

        assert_eq!(items[0].order_number, "100002");
        assert_eq!(items[1].order_number, "99998");
    }

    #[test]
    fn empty_join_key_is_fatal() {
        let catalog = ProductCatalog::default();
        let mut line = open_line("100", "RES 63801", "63801");
        line.product_code_main = String::new();
        assert!(select_items(&[], &[line], &[], &catalog).is_err());
    }
}
