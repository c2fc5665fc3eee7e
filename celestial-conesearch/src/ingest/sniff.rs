//! Header detection for delimited input.
//!
//! Each column is classified from the data rows below the first line
//! (integer, float, or text of a fixed length). Columns whose rows disagree
//! are ignored. Every remaining column then votes: a first-row cell that
//! does not look like the rest of its column counts for a header, one that
//! does counts against. A positive total means the first line is a header.

use crate::row::split_row;

/// Data rows examined below the candidate header.
const MAX_CHECKED_ROWS: usize = 20;

/// How to decide whether the first input line is a header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderMode {
    /// Guess from a sample of the input.
    #[default]
    Detect,
    Present,
    Absent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnClass {
    Integer,
    Float,
    Length(usize),
}

fn is_float(cell: &str) -> bool {
    cell.parse::<f64>().is_ok_and(f64::is_finite)
}

fn classify(cell: &str) -> ColumnClass {
    if cell.parse::<i64>().is_ok() {
        ColumnClass::Integer
    } else if is_float(cell) {
        ColumnClass::Float
    } else {
        ColumnClass::Length(cell.chars().count())
    }
}

fn fits(cell: &str, class: ColumnClass) -> bool {
    match class {
        ColumnClass::Integer => cell.parse::<i64>().is_ok(),
        ColumnClass::Float => is_float(cell),
        ColumnClass::Length(n) => cell.chars().count() == n,
    }
}

/// Guess whether the first of `lines` is a header row.
pub fn has_header<S: AsRef<str>>(lines: &[S], delimiter: u8) -> bool {
    let Some((first, rest)) = lines.split_first() else {
        return false;
    };
    let header = split_row(first.as_ref(), delimiter);
    let columns = header.len();

    // None once a column turns out inconsistent.
    let mut classes: Vec<Option<Option<ColumnClass>>> = vec![Some(None); columns];

    for line in rest.iter().take(MAX_CHECKED_ROWS) {
        let row = split_row(line.as_ref(), delimiter);
        if row.len() != columns {
            continue;
        }
        for (col, cell) in row.iter().enumerate() {
            let class = classify(cell);
            classes[col] = match classes[col] {
                Some(None) => Some(Some(class)),
                Some(Some(seen)) if seen == class => Some(Some(seen)),
                _ => None,
            };
        }
    }

    let votes: i64 = classes
        .iter()
        .zip(&header)
        .filter_map(|(class, cell)| class.flatten().map(|c| (c, cell)))
        .map(|(class, cell)| if fits(cell, class) { -1 } else { 1 })
        .sum();
    votes > 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_named_header() {
        let lines = ["name,ra,dec", "star1,10.5,20.25", "star2,11.5,-3.75", "star3,12.0,4.5"];
        assert!(has_header(&lines, b','));
    }

    #[test]
    fn test_numeric_first_row_is_data() {
        let lines = ["1,10.5,20.25", "2,11.5,-3.75", "3,12.0,4.5"];
        assert!(!has_header(&lines, b','));
    }

    #[test]
    fn test_fixed_length_text_columns() {
        let lines = ["id;ra;dec", "AB12;1.5;2.5", "CD34;3.5;4.5"];
        assert!(has_header(&lines, b';'));

        let lines = ["XY99;1.5;2.5", "AB12;1.5;2.5", "CD34;3.5;4.5"];
        assert!(!has_header(&lines, b';'));
    }

    #[test]
    fn test_inconsistent_columns_are_ignored() {
        // Column 0 mixes text lengths and integers; only ra/dec vote.
        let lines = ["obj,ra,dec", "M31,10.68,41.27", "42,83.8,-5.4"];
        assert!(has_header(&lines, b','));
    }

    #[test]
    fn test_non_finite_words_are_text() {
        assert_eq!(classify("inf"), ColumnClass::Length(3));
        assert_eq!(classify("NaN"), ColumnClass::Length(3));
        assert_eq!(classify("-2.5e3"), ColumnClass::Float);

        let lines = ["nan", "1.5", "2.5", "3.25"];
        assert!(has_header(&lines, b','));
    }

    #[test]
    fn test_header_only_or_empty() {
        assert!(!has_header(&["ra,dec"], b','));
        let empty: [&str; 0] = [];
        assert!(!has_header(&empty, b','));
    }
}
