//! Text-layout table detection.
//!
//! Works on extracted page text only, so it is independent of whichever
//! backend produced that text. A table is a run of consecutive lines that
//! split into the same number (at least two) of cells.

use crate::types::TableData;
use anyhow::{Context, Result};
use regex::Regex;

/// Tabs, or two or more spaces, separate cells.
pub const DEFAULT_CELL_SEPARATOR: &str = r"\t| {2,}";

pub struct TableExtractor {
    separator: String,
}

impl Default for TableExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_CELL_SEPARATOR)
    }
}

impl TableExtractor {
    pub fn new(separator: &str) -> Self {
        Self {
            separator: separator.to_string(),
        }
    }

    /// Detect tables on every page. Page numbers are 1-based.
    pub fn extract(&self, pages_text: &[String]) -> Result<Vec<TableData>> {
        let separator = Regex::new(&self.separator)
            .with_context(|| format!("invalid cell separator pattern {:?}", self.separator))?;

        let mut tables = Vec::new();
        for (index, text) in pages_text.iter().enumerate() {
            let page_number = (index + 1) as u32;
            tables.extend(detect_page_tables(&separator, text, page_number));
        }
        Ok(tables)
    }
}

fn detect_page_tables(separator: &Regex, text: &str, page_number: u32) -> Vec<TableData> {
    let mut tables = Vec::new();
    let mut run: Vec<Vec<String>> = Vec::new();

    for line in text.lines() {
        let cells = split_cells(separator, line);
        let continues_run = cells.len() >= 2 && run.first().is_some_and(|row| row.len() == cells.len());

        if !continues_run {
            flush(&mut run, page_number, &mut tables);
        }
        if cells.len() >= 2 {
            run.push(cells);
        }
    }
    flush(&mut run, page_number, &mut tables);

    tables
}

fn split_cells(separator: &Regex, line: &str) -> Vec<String> {
    separator
        .split(line.trim())
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
        .map(str::to_string)
        .collect()
}

/// Single-row runs are noise and are dropped.
fn flush(run: &mut Vec<Vec<String>>, page_number: u32, tables: &mut Vec<TableData>) {
    let rows = std::mem::take(run);
    if rows.len() > 1 {
        tables.push(TableData::from_rows(rows, page_number));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pages(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_detects_fee_table() {
        let text = "Filing fees\nForm    Fee\nI-130    $535\nI-485    $1140\n\nSignature";
        let tables = TableExtractor::default().extract(&pages(&[text])).unwrap();

        assert_eq!(tables.len(), 1);
        let table = &tables[0];
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.table_data[1], vec!["I-130", "$535"]);
        assert_eq!(table.table_text, "Form\tFee\nI-130\t$535\nI-485\t$1140");
        assert_eq!(table.page_number, 1);
        assert!(table.coordinates.is_none());
    }

    #[test]
    fn test_single_row_is_discarded() {
        let text = "Name:  ____________\nPlease print clearly.";
        let tables = TableExtractor::default().extract(&pages(&[text])).unwrap();
        assert!(tables.is_empty());
    }

    #[test]
    fn test_column_count_change_splits_tables() {
        let text = "a\tb\nc\td\ne\tf\tg\nh\ti\tj";
        let tables = TableExtractor::default().extract(&pages(&[text])).unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].table_data[0].len(), 2);
        assert_eq!(tables[1].table_data[0].len(), 3);
    }

    #[test]
    fn test_page_numbers_follow_input_order() {
        let tables = TableExtractor::default()
            .extract(&pages(&["no table here", "x  y\n1  2"]))
            .unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].page_number, 2);
    }

    #[test]
    fn test_single_spaces_do_not_split_cells() {
        let text = "Part 1. Information About You\nPart 2. Information About Your Relative";
        assert!(TableExtractor::default()
            .extract(&pages(&[text]))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_invalid_separator_is_an_error() {
        let extractor = TableExtractor::new("(unclosed");
        assert!(extractor.extract(&pages(&["a  b\nc  d"])).is_err());
    }
}
