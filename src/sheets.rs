//! Spreadsheet edges of the pipeline: the Open Orders export comes in
//! through `calamine`, the Delivered Items checkpoint and the Selectable
//! Items output go out through `rust_xlsxwriter`.
//!
//! Each output file is fully overwritten per run; the Delivered Items
//! workbook doubles as the checkpoint that lets the reconcile stage run
//! without re-parsing PDFs.

use crate::normalize::{RawCell, RawOpenOrderRow};
use crate::records::{DeliveredRow, SelectableItem};
use calamine::{Data, DataType, Reader, open_workbook_auto};
use rust_xlsxwriter::{Format, Workbook};
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Open Orders export column headers, in the vendor's spelling (the order
/// column really does carry a trailing space).
const OPEN_ORDER_COLUMNS: [&str; 9] = [
    "CusNo",
    "Patient Name",
    "Order ",
    "Product Category",
    "Product Code",
    "Invy Loc",
    "Initials",
    "Line Selection Status",
    "Create Date",
];

const DELIVERED_COLUMNS: [&str; 6] = [
    "Customer Name",
    "Order Number",
    "Item Number",
    "Quantity",
    "Ship Date",
    "Delivery Date",
];

const SELECTABLE_COLUMNS: [&str; 7] = [
    "Order Number",
    "Product Code",
    "Ship Date",
    "Delivery Date",
    "Quantity",
    "Customer Number",
    "Patient Name",
];

const DATE_FORMAT: &str = "%m/%d/%Y";

/// Find the most recently modified spreadsheet in `dir` whose name
/// contains `marker` (the report download lands with a timestamped name).
/// No match is fatal — there is nothing to reconcile against.
pub fn find_report_file(dir: &Path, marker: &str) -> Result<PathBuf, Box<dyn Error>> {
    let mut newest: Option<(std::time::SystemTime, PathBuf)> = None;

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        let is_sheet = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx") || ext.eq_ignore_ascii_case("xls"));
        if !is_sheet || !name.contains(marker) {
            continue;
        }

        let modified = entry.metadata()?.modified()?;
        if newest.as_ref().is_none_or(|(t, _)| modified > *t) {
            newest = Some((modified, path));
        }
    }

    newest
        .map(|(_, path)| path)
        .ok_or_else(|| format!("no \"{marker}\" spreadsheet found in {}", dir.display()).into())
}

fn to_raw(cell: &Data) -> RawCell {
    match cell {
        Data::Empty => RawCell::Empty,
        Data::String(s) => RawCell::Text(s.clone()),
        Data::Float(f) => RawCell::Number(*f),
        Data::Int(i) => RawCell::Number(*i as f64),
        Data::DateTime(_) | Data::DateTimeIso(_) => {
            cell.as_date().map(RawCell::Date).unwrap_or(RawCell::Empty)
        }
        other => RawCell::Text(other.to_string()),
    }
}

/// Cell to display text, the way the checkpoint reader wants it: whole
/// numbers without the float tail, date cells in report format.
fn cell_text(cell: &Data) -> String {
    match to_raw(cell) {
        RawCell::Empty => String::new(),
        RawCell::Text(s) => s.trim().to_string(),
        RawCell::Number(n) if n.fract() == 0.0 => format!("{}", n as i64),
        RawCell::Number(n) => format!("{n}"),
        RawCell::Date(d) => d.format(DATE_FORMAT).to_string(),
    }
}

/// Resolve required column headers (trimmed comparison) to indexes.
fn resolve_columns(
    header_row: &[Data],
    required: &[&str],
    context: &str,
) -> Result<Vec<usize>, Box<dyn Error>> {
    required
        .iter()
        .map(|name| {
            header_row
                .iter()
                .position(|cell| cell_text(cell) == name.trim())
                .ok_or_else(|| format!("{context}: missing column {name:?}").into())
        })
        .collect()
}

/// Read the Open Orders export into raw rows, columns resolved by name.
/// Rows whose cells are all empty (the report's footer padding) are
/// dropped.
pub fn read_open_orders(
    path: &Path,
    sheet_name: &str,
) -> Result<Vec<RawOpenOrderRow>, Box<dyn Error>> {
    info!(file = %path.display(), sheet = sheet_name, "Reading open orders report");
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook.worksheet_range(sheet_name)?;

    let mut rows_iter = range.rows();
    let header_row = rows_iter
        .next()
        .ok_or_else(|| format!("{}: sheet {sheet_name:?} is empty", path.display()))?;
    let cols = resolve_columns(header_row, &OPEN_ORDER_COLUMNS, "open orders report")?;

    let cell = |row: &[Data], i: usize| row.get(cols[i]).map(to_raw).unwrap_or(RawCell::Empty);

    let mut rows = Vec::new();
    for row in rows_iter {
        if row.iter().all(|c| c.is_empty()) {
            continue;
        }
        rows.push(RawOpenOrderRow {
            customer_number: cell(row, 0),
            patient_name: cell(row, 1),
            order_number: cell(row, 2),
            product_category: cell(row, 3),
            product_code: cell(row, 4),
            inventory_location: cell(row, 5),
            initials: cell(row, 6),
            line_selection_status: cell(row, 7),
            create_date: cell(row, 8),
        });
    }

    info!(rows = rows.len(), "Open orders report loaded");
    Ok(rows)
}

/// Read the Delivered Items checkpoint back into extraction rows.
pub fn read_delivered(path: &Path) -> Result<Vec<DeliveredRow>, Box<dyn Error>> {
    info!(file = %path.display(), "Reading delivered items checkpoint");
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| format!("{}: workbook has no sheets", path.display()))??;

    let mut rows_iter = range.rows();
    let header_row = rows_iter
        .next()
        .ok_or_else(|| format!("{}: checkpoint is empty", path.display()))?;
    let cols = resolve_columns(header_row, &DELIVERED_COLUMNS, "delivered items checkpoint")?;

    let mut rows = Vec::new();
    for row in rows_iter {
        if row.iter().all(|c| c.is_empty()) {
            continue;
        }
        let text = |i: usize| row.get(cols[i]).map(cell_text).unwrap_or_default();
        rows.push(DeliveredRow {
            customer_name: text(0),
            order_number: text(1),
            item_number: text(2),
            quantity: text(3),
            ship_date: text(4),
            delivery_date: text(5),
        });
    }

    Ok(rows)
}

fn header_format() -> Format {
    Format::new().set_bold()
}

/// Write the Delivered Items table (and stage checkpoint). Quantities are
/// written as numbers when they parse; everything else stays text.
pub fn write_delivered(path: &Path, rows: &[DeliveredRow]) -> Result<(), Box<dyn Error>> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet().set_name("Delivered Items")?;

    let bold = header_format();
    for (col, name) in DELIVERED_COLUMNS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *name, &bold)?;
    }

    for (i, row) in rows.iter().enumerate() {
        let r = (i + 1) as u32;
        worksheet.write_string(r, 0, row.customer_name.as_str())?;
        worksheet.write_string(r, 1, row.order_number.as_str())?;
        worksheet.write_string(r, 2, row.item_number.as_str())?;
        match row.quantity.trim().parse::<f64>() {
            Ok(qty) => worksheet.write_number(r, 3, qty)?,
            Err(_) => worksheet.write_string(r, 3, row.quantity.as_str())?,
        };
        worksheet.write_string(r, 4, row.ship_date.as_str())?;
        worksheet.write_string(r, 5, row.delivery_date.as_str())?;
    }

    workbook.save(path)?;
    info!(file = %path.display(), rows = rows.len(), "Delivered items written");
    Ok(())
}

/// Write the Selectable Items table, keyed by its two leading columns and
/// already sorted, so the selection consumer can group by order number
/// with a linear scan.
pub fn write_selectables(path: &Path, items: &[SelectableItem]) -> Result<(), Box<dyn Error>> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet().set_name("Selectable Items")?;

    let bold = header_format();
    for (col, name) in SELECTABLE_COLUMNS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *name, &bold)?;
    }

    for (i, item) in items.iter().enumerate() {
        let r = (i + 1) as u32;
        worksheet.write_string(r, 0, item.order_number.as_str())?;
        worksheet.write_string(r, 1, item.product_code.as_str())?;
        if let Some(date) = item.ship_date {
            worksheet.write_string(r, 2, date.format(DATE_FORMAT).to_string())?;
        }
        if let Some(date) = item.delivery_date {
            worksheet.write_string(r, 3, date.format(DATE_FORMAT).to_string())?;
        }
        if let Some(qty) = item.quantity {
            worksheet.write_number(r, 4, qty as f64)?;
        }
        worksheet.write_string(r, 5, item.customer_number.as_str())?;
        worksheet.write_string(r, 6, item.patient_name.as_str())?;
    }

    workbook.save(path)?;
    info!(file = %path.display(), rows = items.len(), "Selectable items written");
    Ok(())
}
