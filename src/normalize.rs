//! Typing and keying of raw tabular rows, delivered and pending alike.
//!
//! The Open Orders export arrives with numeric noise (order numbers stored
//! as spreadsheet floats) and vendor product names that don't match ours;
//! this module cleans both sides into the typed records the joiner expects.

use crate::catalog::{ProductCatalog, last_chars};
use crate::records::{DeliveredItem, DeliveredRow, OpenOrderLine};
use chrono::NaiveDate;
use regex::Regex;

/// Inventory location for PAP resupply stock.
const PAP_LOCATION: &str = "104";
/// Product categories eligible for reconciliation.
const PAP_CATEGORIES: [&str; 2] = ["CPAP BIPAP ACC", "RESPIRATORY"];
/// The initials flag marking a pending PAP-PIN line.
const PIN_INITIALS: &str = "PIN";
/// Only lines not yet selected are candidates.
const UNSELECTED: &str = "No";

/// One raw cell from the Open Orders export, before typing.
#[derive(Debug, Clone, PartialEq)]
pub enum RawCell {
    Text(String),
    Number(f64),
    Date(NaiveDate),
    Empty,
}

impl RawCell {
    /// Text cast: numbers render without fractional noise when whole.
    fn to_text(&self) -> String {
        match self {
            RawCell::Text(s) => s.trim().to_string(),
            RawCell::Number(n) => {
                if n.fract() == 0.0 {
                    format!("{}", *n as i64)
                } else {
                    format!("{n}")
                }
            }
            RawCell::Date(d) => d.format("%m/%d/%Y").to_string(),
            RawCell::Empty => String::new(),
        }
    }

    /// Integer truncation toward zero — spreadsheet floats like 12345.0
    /// (and the occasional 12345.7 of export noise) become 12345.
    fn to_truncated_text(&self) -> String {
        match self {
            RawCell::Number(n) => format!("{}", n.trunc() as i64),
            other => other.to_text(),
        }
    }
}

/// An Open Orders row as read from the spreadsheet, columns resolved by
/// name but cells still untyped.
#[derive(Debug, Clone)]
pub struct RawOpenOrderRow {
    pub customer_number: RawCell,
    pub patient_name: RawCell,
    pub order_number: RawCell,
    pub product_category: RawCell,
    pub product_code: RawCell,
    pub inventory_location: RawCell,
    pub initials: RawCell,
    pub line_selection_status: RawCell,
    pub create_date: RawCell,
}

/// Type and key the Open Orders rows. A create date that won't parse is
/// fatal — the joiner and the date-range clusterer both assume it.
pub fn normalize_open_orders(
    rows: &[RawOpenOrderRow],
    catalog: &ProductCatalog,
) -> Result<Vec<OpenOrderLine>, Box<dyn std::error::Error>> {
    let mut lines = Vec::with_capacity(rows.len());

    for (i, row) in rows.iter().enumerate() {
        let create_date = match &row.create_date {
            RawCell::Date(d) => *d,
            other => parse_date(&other.to_text())
                .ok_or_else(|| format!("open orders row {i}: unparseable create date {other:?}"))?,
        };

        let product_code = row.product_code.to_text();
        let product_code_main = catalog.derive_main_code(&product_code);

        lines.push(OpenOrderLine {
            customer_number: row.customer_number.to_text(),
            patient_name: row.patient_name.to_text(),
            order_number: row.order_number.to_truncated_text(),
            product_category: row.product_category.to_text(),
            product_code,
            inventory_location: row.inventory_location.to_truncated_text(),
            initials: row.initials.to_text(),
            line_selection_status: row.line_selection_status.to_text(),
            create_date,
            product_code_main,
        });
    }

    Ok(lines)
}

/// Filter down to pending 104 PAP-PIN lines, and split out the headgear
/// subset within them. Headgear lines appear in both returned sets.
pub fn filter_pap_pin(
    lines: &[OpenOrderLine],
    catalog: &ProductCatalog,
) -> (Vec<OpenOrderLine>, Vec<OpenOrderLine>) {
    let pap_pin: Vec<OpenOrderLine> = lines
        .iter()
        .filter(|line| {
            line.inventory_location == PAP_LOCATION
                && PAP_CATEGORIES.contains(&line.product_category.as_str())
                && line.initials == PIN_INITIALS
                && line.line_selection_status == UNSELECTED
        })
        .cloned()
        .collect();

    let headgear = pap_pin
        .iter()
        .filter(|line| catalog.is_headgear(&line.product_code))
        .cloned()
        .collect();

    (pap_pin, headgear)
}

/// Type the flattened POD rows: integer quantity, calendar dates, and the
/// suffix join key straight off the vendor item number — no alias pass on
/// this side.
pub fn normalize_delivered(
    rows: &[DeliveredRow],
) -> Result<Vec<DeliveredItem>, Box<dyn std::error::Error>> {
    let mut items = Vec::with_capacity(rows.len());

    for (i, row) in rows.iter().enumerate() {
        let quantity = row
            .quantity
            .trim()
            .parse::<f64>()
            .map(|q| q.trunc() as i64)
            .map_err(|_| format!("delivered row {i}: bad quantity {:?}", row.quantity))?;
        let ship_date = parse_date(&row.ship_date)
            .ok_or_else(|| format!("delivered row {i}: bad ship date {:?}", row.ship_date))?;
        let delivery_date = parse_date(&row.delivery_date).ok_or_else(|| {
            format!("delivered row {i}: bad delivery date {:?}", row.delivery_date)
        })?;

        items.push(DeliveredItem {
            customer_name: row.customer_name.clone(),
            order_number: row.order_number.trim().to_string(),
            item_number: row.item_number.clone(),
            quantity,
            ship_date,
            delivery_date,
            product_code_main: last_chars(row.item_number.trim(), 5),
        });
    }

    Ok(items)
}

/// Pull a calendar date out of a cell's text. PODs print `%m/%d/%Y`; the
/// checkpoint and export files sometimes carry ISO dates or a trailing
/// time component.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let token_re = Regex::new(r"(\d{4}-\d{2}-\d{2}|\d{1,2}/\d{1,2}/\d{2,4})").ok()?;
    let token = token_re.find(text.trim())?.as_str();

    let format = if token.contains('-') {
        "%Y-%m-%d"
    } else if token.rsplit('/').next().is_some_and(|year| year.len() == 4) {
        "%m/%d/%Y"
    } else {
        "%m/%d/%y"
    };
    NaiveDate::parse_from_str(token, format).ok()
}
