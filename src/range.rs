//! A1-notation cell and range codec.
//!
//! Converts between the textual references tools accept ("B5", "A1:C10",
//! "Sheet1!A1:B2") and zero-based `(row, col)` coordinates. Column letters
//! are bijective base-26 (A=1 .. Z=26, AA=27); rows are 1-based on the wire
//! and 0-based here. Parsing is deliberately permissive about character
//! interleaving: all letters form the column token and all digits form the
//! row token, whatever order they appear in.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RangeError {
    #[error("invalid cell reference: {0:?}")]
    InvalidReference(String),
    #[error("negative cell coordinates not allowed: row={row}, col={col}")]
    InvalidAddress { row: i64, col: i64 },
}

/// A single cell position, zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellAddress {
    pub row: u32,
    pub col: u32,
}

impl CellAddress {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// 1-based `(col, row)` pair in the layout umya-spreadsheet expects.
    pub fn to_coordinate(self) -> (u32, u32) {
        (self.col + 1, self.row + 1)
    }

    pub fn to_label(self) -> String {
        format!("{}{}", column_label(self.col), self.row + 1)
    }
}

/// A rectangular block given by two corners. The corners keep the order the
/// caller supplied; nothing reorders them implicitly (see `normalized`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub start: CellAddress,
    pub end: CellAddress,
}

impl CellRange {
    pub fn new(start: CellAddress, end: CellAddress) -> Self {
        Self { start, end }
    }

    pub fn single(cell: CellAddress) -> Self {
        Self {
            start: cell,
            end: cell,
        }
    }

    /// Corner-ordered copy with `start <= end` on both axes. Consumers that
    /// iterate the rectangle call this; parsing never does.
    pub fn normalized(self) -> Self {
        Self {
            start: CellAddress {
                row: self.start.row.min(self.end.row),
                col: self.start.col.min(self.end.col),
            },
            end: CellAddress {
                row: self.start.row.max(self.end.row),
                col: self.start.col.max(self.end.col),
            },
        }
    }

    pub fn row_count(&self) -> u32 {
        let n = self.normalized();
        n.end.row - n.start.row + 1
    }

    pub fn column_count(&self) -> u32 {
        let n = self.normalized();
        n.end.col - n.start.col + 1
    }

    pub fn to_label(&self) -> String {
        range_to_label(self)
    }
}

/// Parse an A1-style cell reference into a zero-based address.
///
/// Letters are collected into the column token and digits into the row token
/// regardless of their relative order ("1A" parses the same as "A1"); any
/// other characters are discarded. Fails with `InvalidReference` when either
/// token is missing or the row token does not parse as a positive decimal.
pub fn parse_cell(cell_ref: &str) -> Result<CellAddress, RangeError> {
    let invalid = || RangeError::InvalidReference(cell_ref.to_string());

    let mut col_token = String::new();
    let mut row_token = String::new();
    for ch in cell_ref.chars() {
        if ch.is_ascii_alphabetic() {
            col_token.push(ch.to_ascii_uppercase());
        } else if ch.is_ascii_digit() {
            row_token.push(ch);
        }
    }

    if col_token.is_empty() || row_token.is_empty() {
        return Err(invalid());
    }

    let mut col_index: u64 = 0;
    for ch in col_token.chars() {
        let value = (ch as u64) - ('A' as u64) + 1;
        col_index = col_index
            .checked_mul(26)
            .and_then(|acc| acc.checked_add(value))
            .filter(|acc| *acc <= u32::MAX as u64 + 1)
            .ok_or_else(invalid)?;
    }

    let row_1based: u32 = row_token.parse().map_err(|_| invalid())?;
    if row_1based == 0 {
        // Rows are 1-based on the wire; "A0" has no zero-based counterpart.
        return Err(invalid());
    }

    Ok(CellAddress {
        row: row_1based - 1,
        col: (col_index - 1) as u32,
    })
}

/// Parse a range reference, stripping an optional `Sheet!` qualifier.
///
/// A reference without `:` yields a degenerate single-cell range. Corner
/// order is preserved as given ("B5:A1" keeps start=B5, end=A1).
pub fn parse_range(range_ref: &str) -> Result<CellRange, RangeError> {
    let (_, range) = parse_range_with_sheet(range_ref)?;
    Ok(range)
}

/// Like `parse_range`, but also returns the sheet qualifier when present
/// (surrounding single quotes removed).
pub fn parse_range_with_sheet(
    range_ref: &str,
) -> Result<(Option<String>, CellRange), RangeError> {
    if range_ref.is_empty() {
        return Err(RangeError::InvalidReference(range_ref.to_string()));
    }

    let (sheet, pure) = if range_ref.contains('!') {
        let parts: Vec<&str> = range_ref.split('!').collect();
        if parts.len() != 2 {
            return Err(RangeError::InvalidReference(range_ref.to_string()));
        }
        let sheet = parts[0].trim_matches('\'').to_string();
        (Some(sheet), parts[1])
    } else {
        (None, range_ref)
    };

    let range = match pure.split_once(':') {
        Some((start, end)) => CellRange::new(parse_cell(start)?, parse_cell(end)?),
        None => CellRange::single(parse_cell(pure)?),
    };

    Ok((sheet, range))
}

/// Render zero-based coordinates as an A1 label. The signed parameters exist
/// so out-of-domain input surfaces as `InvalidAddress` instead of silently
/// wrapping.
pub fn cell_to_label(row: i64, col: i64) -> Result<String, RangeError> {
    if row < 0 || col < 0 {
        return Err(RangeError::InvalidAddress { row, col });
    }
    Ok(CellAddress::new(row as u32, col as u32).to_label())
}

/// Render a range as an A1 label; a degenerate range renders as one cell.
pub fn range_to_label(range: &CellRange) -> String {
    let start = range.start.to_label();
    let end = range.end.to_label();
    if start == end { start } else { format!("{start}:{end}") }
}

/// Zero-based column index to bijective base-26 letters (0 -> "A").
pub fn column_label(col: u32) -> String {
    let mut value = col as u64 + 1;
    let mut label = String::new();
    while value > 0 {
        let rem = ((value - 1) % 26) as u8;
        label.insert(0, (b'A' + rem) as char);
        value = (value - 1) / 26;
    }
    label
}

/// Letters to a zero-based column index; `None` for non-alphabetic input.
pub fn column_index(label: &str) -> Option<u32> {
    if label.is_empty() {
        return None;
    }
    let mut index: u64 = 0;
    for ch in label.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        index = index * 26 + ((ch.to_ascii_uppercase() as u64) - ('A' as u64) + 1);
        if index > u32::MAX as u64 {
            return None;
        }
    }
    Some((index - 1) as u32)
}
