//! Table-block detection in extracted page text.
//!
//! The vendor's PODs render their item table with whitespace-aligned
//! columns, so in plain text a table row is a line whose cells are
//! separated by runs of two or more spaces. A table block is the first
//! maximal run of consecutive such lines on a page.

/// Minimum cells for a line to count as tabular.
const MIN_TABLE_CELLS: usize = 2;

/// The rows of one detected table, cells trimmed, in reading order.
#[derive(Debug, Clone, PartialEq)]
pub struct TableBlock {
    pub rows: Vec<Vec<String>>,
}

/// Split a line into cells on runs of 2+ spaces (or tabs). A single-cell
/// line is not tabular.
fn split_cells(line: &str) -> Option<Vec<String>> {
    let cells: Vec<String> = line
        .split(|c: char| c == '\t')
        .flat_map(|part| part.split("  "))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();

    (cells.len() >= MIN_TABLE_CELLS).then_some(cells)
}

/// Find the first table block on a page: the first run of consecutive
/// lines that each split into at least two cells.
pub fn first_table(lines: &[&str]) -> Option<TableBlock> {
    let mut rows = Vec::new();

    for line in lines {
        match split_cells(line) {
            Some(cells) => rows.push(cells),
            None if rows.is_empty() => continue,
            None => break,
        }
    }

    (!rows.is_empty()).then_some(TableBlock { rows })
}

/// Strategy for reconciling the single POD header against the item rows
/// found across pages. The observed layout repeats the header once per
/// item row; alternate layouts can plug in a different expansion without
/// touching the joiner.
pub trait RowExpansion {
    /// How many header copies a document with the given per-page item-row
    /// counts needs, or `None` when the layout is unsupported.
    fn header_copies(&self, page_item_counts: &[usize]) -> Option<usize>;
}

/// The vendor layout seen in the wild: one header block on page 0, item
/// rows on one or two pages, one header copy per item row.
pub struct StandardPodLayout;

impl RowExpansion for StandardPodLayout {
    fn header_copies(&self, page_item_counts: &[usize]) -> Option<usize> {
        match page_item_counts {
            [first] => Some(*first),
            [first, second] => Some(first + second),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_double_space_runs() {
        let cells = split_cells("ABCDE-12345  MFR-1  ResMed  Full Face Mask  2").unwrap();
        assert_eq!(cells, vec!["ABCDE-12345", "MFR-1", "ResMed", "Full Face Mask", "2"]);
    }

    #[test]
    fn single_cell_lines_are_not_tabular() {
        assert!(split_cells("Order Number: 12345").is_none());
        assert!(split_cells("").is_none());
    }

    #[test]
    fn first_table_takes_first_consecutive_block() {
        let lines = vec![
            "Proof of Delivery",
            "",
            "A  B  C",
            "D  E  F",
            "",
            "X  Y  Z",
        ];
        let table = first_table(&lines).unwrap();
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0], vec!["A", "B", "C"]);
    }

    #[test]
    fn page_without_table_yields_none() {
        let lines = vec!["just prose", "more prose"];
        assert!(first_table(&lines).is_none());
    }

    #[test]
    fn standard_layout_supports_one_or_two_pages() {
        let layout = StandardPodLayout;
        assert_eq!(layout.header_copies(&[3]), Some(3));
        assert_eq!(layout.header_copies(&[3, 2]), Some(5));
        assert_eq!(layout.header_copies(&[]), None);
        assert_eq!(layout.header_copies(&[1, 1, 1]), None);
    }
}
