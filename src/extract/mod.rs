//! Proof-of-delivery (POD) document extraction.
//!
//! Each POD is a 1-2 page PDF: a free-text header block on the first page
//! (order number, dates, customer) and a whitespace-aligned item table on
//! each page. A document either yields one complete order or is skipped
//! whole, with a named reason — partial extractions never leave this
//! module.

pub mod tables;

use crate::records::DeliveredRow;
use lopdf::Document;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use tables::{RowExpansion, StandardPodLayout};

/// Minimum number of non-whitespace characters we expect from a
/// machine-generated POD. Below this the file is a scan.
const MIN_TEXT_CHARS: usize = 30;

/// Share of image-only pages at which the whole document is treated as
/// scanned.
const SCANNED_PAGE_RATIO: f64 = 0.8;

/// Item-table schema: Item Number, Manufacturer Item Number, Manufacturer,
/// Item Description, Quantity. Only the first and last survive.
const ITEM_TABLE_COLUMNS: usize = 5;

/// Header fields left after dropping the package weight.
const HEADER_FIELDS: usize = 4;

/// The header key that carries no order information.
const DROPPED_HEADER_KEY: &str = "Package Weight";

/// One row of a POD item table, reduced to the retained columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PodItem {
    pub item_number: String,
    pub quantity: String,
}

/// A fully parsed POD: one header joined with every item row found across
/// the document's pages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PodOrder {
    pub order_number: String,
    pub ship_date: String,
    pub delivery_date: String,
    pub customer_name: String,
    pub items: Vec<PodItem>,
}

impl PodOrder {
    /// Flatten to Delivered Items rows: the header repeated once per item,
    /// in document order.
    pub fn rows(&self) -> Vec<DeliveredRow> {
        self.items
            .iter()
            .map(|item| DeliveredRow {
                customer_name: self.customer_name.clone(),
                order_number: self.order_number.clone(),
                item_number: item.item_number.clone(),
                quantity: item.quantity.clone(),
                ship_date: self.ship_date.clone(),
                delivery_date: self.delivery_date.clone(),
            })
            .collect()
    }
}

/// Why a document was dropped. The batch driver reports these per file and
/// in aggregate instead of masking every failure class identically.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// The file could not be opened or read as a PDF.
    Unreadable(String),
    /// Image-only pages or no extractable text — a scan-generated export.
    ScannedImage,
    /// A page contributed no detectable table.
    NoTable,
    /// An item row did not have the expected five columns.
    MalformedTable { cells: usize },
    /// The free-text header did not reduce to the expected four fields.
    MalformedHeader { fields: usize },
    /// Header parsed but no item rows were found.
    NoItems,
    /// More pages than the supported 1-2 page layout.
    TooManyPages(usize),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Unreadable(e) => write!(f, "unreadable: {e}"),
            SkipReason::ScannedImage => write!(f, "scanned image, no extractable text"),
            SkipReason::NoTable => write!(f, "no item table found"),
            SkipReason::MalformedTable { cells } => {
                write!(f, "item row with {cells} cells, expected {ITEM_TABLE_COLUMNS}")
            }
            SkipReason::MalformedHeader { fields } => {
                write!(f, "header with {fields} fields, expected {HEADER_FIELDS}")
            }
            SkipReason::NoItems => write!(f, "header without item rows"),
            SkipReason::TooManyPages(n) => write!(f, "{n} pages, layout supports at most 2"),
        }
    }
}

/// Result of attempting to extract one POD document.
#[derive(Debug, Clone, PartialEq)]
pub enum PodOutcome {
    Order(PodOrder),
    Skipped(SkipReason),
}

/// Extract a POD from per-page text. Pure over the page strings, so tests
/// can drive layouts without PDF fixtures.
pub fn extract_pod(pages: &[String]) -> PodOutcome {
    let layout = StandardPodLayout;
    extract_pod_with_layout(pages, &layout)
}

pub fn extract_pod_with_layout(pages: &[String], layout: &dyn RowExpansion) -> PodOutcome {
    if pages.is_empty() {
        return PodOutcome::Skipped(SkipReason::Unreadable("document has no pages".into()));
    }
    if pages.len() > 2 {
        return PodOutcome::Skipped(SkipReason::TooManyPages(pages.len()));
    }

    let page0_lines: Vec<&str> = pages[0].lines().collect();
    let header = match parse_header(&page0_lines) {
        Ok(h) => h,
        Err(reason) => return PodOutcome::Skipped(reason),
    };

    let mut items = Vec::new();
    let mut page_item_counts = Vec::new();
    for page in pages {
        let lines: Vec<&str> = page.lines().collect();
        match parse_item_rows(&lines) {
            Ok(rows) => {
                page_item_counts.push(rows.len());
                items.extend(rows);
            }
            Err(reason) => return PodOutcome::Skipped(reason),
        }
    }

    // Header copies must line up with the item rows; the layout strategy
    // owns that arithmetic.
    match layout.header_copies(&page_item_counts) {
        Some(0) | None => return PodOutcome::Skipped(SkipReason::NoItems),
        Some(n) => debug_assert_eq!(n, items.len()),
    }

    let [order_number, ship_date, delivery_date, customer_name] = header;
    PodOutcome::Order(PodOrder {
        order_number,
        ship_date,
        delivery_date,
        customer_name,
        items,
    })
}

/// Parse the page-0 free-text header: keep lines with a `": "` separator,
/// take positions [3, 8), drop the package weight, and require exactly the
/// four order fields, renamed positionally.
fn parse_header(page0_lines: &[&str]) -> Result<[String; 4], SkipReason> {
    let pairs: Vec<(&str, &str)> = page0_lines
        .iter()
        .filter_map(|line| line.split_once(": "))
        .collect();

    let fields: Vec<String> = pairs
        .iter()
        .skip(3)
        .take(5)
        .filter(|(key, _)| key.trim() != DROPPED_HEADER_KEY)
        .map(|(_, value)| value.trim().to_string())
        .collect();

    match <[String; 4]>::try_from(fields) {
        Ok(fields) => Ok(fields),
        Err(fields) => Err(SkipReason::MalformedHeader {
            fields: fields.len(),
        }),
    }
}

/// Parse one page's item rows from its first table block. A leading
/// "Order / Details" marker row is promoted out of the data; every data
/// row must carry the fixed five-column schema.
fn parse_item_rows(lines: &[&str]) -> Result<Vec<PodItem>, SkipReason> {
    let table = tables::first_table(lines).ok_or(SkipReason::NoTable)?;

    let mut rows = table.rows.as_slice();
    if let Some(first) = rows.first() {
        if first[0].contains("Order") && first[1].contains("Details") {
            rows = &rows[1..];
        }
    }

    rows.iter()
        .map(|cells| {
            if cells.len() != ITEM_TABLE_COLUMNS {
                return Err(SkipReason::MalformedTable { cells: cells.len() });
            }
            Ok(PodItem {
                item_number: cells[0].clone(),
                quantity: cells[ITEM_TABLE_COLUMNS - 1].clone(),
            })
        })
        .collect()
}

/// Load a PDF from disk, screen out scans, and extract its order.
pub fn extract_pod_file(path: &Path) -> PodOutcome {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) => return PodOutcome::Skipped(SkipReason::Unreadable(e.to_string())),
    };

    let doc = match Document::load_mem(&bytes) {
        Ok(d) => d,
        Err(e) => return PodOutcome::Skipped(SkipReason::Unreadable(e.to_string())),
    };

    if looks_like_scanned(&doc) {
        return PodOutcome::Skipped(SkipReason::ScannedImage);
    }

    // Whole-document text pass: a POD with almost no extractable text is a
    // scan regardless of what the object tree claims.
    match pdf_extract::extract_text_from_mem(&bytes) {
        Ok(text) => {
            let meaningful = text.chars().filter(|c| !c.is_whitespace()).count();
            if meaningful < MIN_TEXT_CHARS {
                return PodOutcome::Skipped(SkipReason::ScannedImage);
            }
        }
        Err(_) => return PodOutcome::Skipped(SkipReason::ScannedImage),
    }

    let mut pages = Vec::new();
    for (page_num, _) in doc.get_pages() {
        match doc.extract_text(&[page_num]) {
            Ok(text) => pages.push(text),
            Err(e) => return PodOutcome::Skipped(SkipReason::Unreadable(e.to_string())),
        }
    }

    extract_pod(&pages)
}

/// Inspect the PDF object tree for pages that carry XObject images but no
/// Font resources — the signature of a scanned page.
fn looks_like_scanned(doc: &Document) -> bool {
    let pages = doc.get_pages();
    if pages.is_empty() {
        return false;
    }

    let image_only = pages
        .values()
        .filter(|object_id| {
            let Ok(page_dict) = doc.get_object(**object_id).and_then(|o| o.as_dict()) else {
                return false;
            };
            let has_fonts = resource_dict_nonempty(doc, page_dict, b"Font");
            let has_images = resource_dict_nonempty(doc, page_dict, b"XObject");
            has_images && !has_fonts
        })
        .count();

    image_only as f64 / pages.len() as f64 >= SCANNED_PAGE_RATIO
}

fn resource_dict_nonempty(doc: &Document, page_dict: &lopdf::Dictionary, key: &[u8]) -> bool {
    page_dict
        .get(b"Resources")
        .ok()
        .and_then(|r| doc.dereference(r).ok())
        .and_then(|(_, resolved)| resolved.as_dict().ok())
        .and_then(|res| res.get(key).ok())
        .and_then(|entry| doc.dereference(entry).ok())
        .and_then(|(_, resolved)| resolved.as_dict().ok())
        .is_some_and(|dict| !dict.is_empty())
}

/// The outcome of a batch run over a POD directory.
#[derive(Debug, Default)]
pub struct PodBatch {
    pub orders: Vec<PodOrder>,
    pub skipped: Vec<(String, SkipReason)>,
    /// Files without the `.pdf` extension, ignored before extraction.
    pub ignored: usize,
}

impl PodBatch {
    /// All extracted orders flattened to Delivered Items rows, in the order
    /// the files were processed.
    pub fn rows(&self) -> Vec<DeliveredRow> {
        self.orders.iter().flat_map(PodOrder::rows).collect()
    }
}

/// Process every file in `dir` in directory-listing order. Per-document
/// failures land in the skip ledger; only an unreadable directory is fatal.
pub fn read_pods(dir: &Path) -> Result<PodBatch, Box<dyn std::error::Error>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }

    let total = files.len();
    info!(dir = %dir.display(), files = total, "Reading POD directory");

    let mut batch = PodBatch::default();
    for (i, path) in files.iter().enumerate() {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let span = tracing::info_span!("pod", file = %name);
        let _guard = span.enter();

        let is_pdf = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if !is_pdf {
            batch.ignored += 1;
            continue;
        }

        match extract_pod_file(path) {
            PodOutcome::Order(order) => {
                info!(
                    order = %order.order_number,
                    items = order.items.len(),
                    percent = ((i + 1) * 100) / total,
                    "Extracted"
                );
                batch.orders.push(order);
            }
            PodOutcome::Skipped(reason) => {
                warn!(reason = %reason, percent = ((i + 1) * 100) / total, "Skipped");
                batch.skipped.push((name, reason));
            }
        }
    }

    info!(
        extracted = batch.orders.len(),
        skipped = batch.skipped.len(),
        ignored = batch.ignored,
        "POD extraction complete"
    );
    Ok(batch)
}
