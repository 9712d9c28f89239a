use chrono::NaiveDate;

/// One flattened row of the "Delivered Items" table: the POD header repeated
/// against a single item row. Fields are kept as extracted text; typing
/// happens in `normalize`.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveredRow {
    pub customer_name: String,
    pub order_number: String,
    pub item_number: String,
    pub quantity: String,
    pub ship_date: String,
    pub delivery_date: String,
}

/// A delivered item after normalization: typed fields plus the derived
/// join key (trailing suffix of the vendor item number, no alias pass).
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveredItem {
    pub customer_name: String,
    pub order_number: String,
    pub item_number: String,
    pub quantity: i64,
    pub ship_date: NaiveDate,
    pub delivery_date: NaiveDate,
    pub product_code_main: String,
}

/// A pending-order line from the Open Orders export, normalized and keyed.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenOrderLine {
    pub customer_number: String,
    pub patient_name: String,
    pub order_number: String,
    pub product_category: String,
    pub product_code: String,
    pub inventory_location: String,
    pub initials: String,
    pub line_selection_status: String,
    pub create_date: NaiveDate,
    pub product_code_main: String,
}

/// The reconciled output unit, unique per (order_number, product_code).
/// Delivery fields stay optional: headgear lines enter without a confirmed
/// delivery and are backfilled from their sorted sibling.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectableItem {
    pub order_number: String,
    pub product_code: String,
    pub ship_date: Option<NaiveDate>,
    pub delivery_date: Option<NaiveDate>,
    pub quantity: Option<i64>,
    pub customer_number: String,
    pub patient_name: String,
}
