use proptest::prelude::*;
use workbook_mcp::range::{
    CellAddress, CellRange, cell_to_label, column_index, column_label, parse_cell, parse_range,
    parse_range_with_sheet, range_to_label,
};
use workbook_mcp::RangeError;

#[test]
fn known_value_labels_match_excel_lettering() {
    let cases = [
        ((0, 0), "A1"),
        ((0, 25), "Z1"),
        ((0, 26), "AA1"),
        ((0, 27), "AB1"),
        ((0, 701), "ZZ1"),
        ((0, 702), "AAA1"),
        ((99, 0), "A100"),
    ];
    for ((row, col), expected) in cases {
        assert_eq!(cell_to_label(row, col).unwrap(), expected);
    }
}

#[test]
fn parse_cell_known_values() {
    assert_eq!(parse_cell("A1").unwrap(), CellAddress::new(0, 0));
    assert_eq!(parse_cell("Z1").unwrap(), CellAddress::new(0, 25));
    assert_eq!(parse_cell("AA1").unwrap(), CellAddress::new(0, 26));
    assert_eq!(parse_cell("AAA1").unwrap(), CellAddress::new(0, 702));
    assert_eq!(parse_cell("B5").unwrap(), CellAddress::new(4, 1));
}

#[test]
fn parse_cell_is_case_insensitive() {
    assert_eq!(parse_cell("a1").unwrap(), parse_cell("A1").unwrap());
    assert_eq!(parse_cell("aa100").unwrap(), parse_cell("AA100").unwrap());
}

#[test]
fn parse_cell_extraction_is_order_independent() {
    // Letters and digits are collected wherever they appear.
    assert_eq!(parse_cell("1A").unwrap(), parse_cell("A1").unwrap());
    assert_eq!(parse_cell("$A$1").unwrap(), parse_cell("A1").unwrap());
    assert_eq!(parse_cell("1A2B").unwrap(), parse_cell("AB12").unwrap());
}

#[test]
fn parse_cell_rejects_malformed_input() {
    for input in ["", "123", "ABC", "$$", "A0"] {
        assert!(
            matches!(parse_cell(input), Err(RangeError::InvalidReference(_))),
            "expected InvalidReference for {input:?}"
        );
    }
}

#[test]
fn single_reference_is_degenerate_range() {
    let range = parse_range("C3").unwrap();
    assert_eq!(range.start, CellAddress::new(2, 2));
    assert_eq!(range.end, CellAddress::new(2, 2));
}

#[test]
fn sheet_qualifier_is_stripped() {
    assert_eq!(
        parse_range("Sheet1!A1:B2").unwrap(),
        parse_range("A1:B2").unwrap()
    );
    let (sheet, range) = parse_range_with_sheet("'My Sheet'!B2:C4").unwrap();
    assert_eq!(sheet.as_deref(), Some("My Sheet"));
    assert_eq!(range, parse_range("B2:C4").unwrap());
}

#[test]
fn malformed_sheet_qualifier_is_rejected() {
    assert!(matches!(
        parse_range("A!B!C1"),
        Err(RangeError::InvalidReference(_))
    ));
    assert!(matches!(
        parse_range(""),
        Err(RangeError::InvalidReference(_))
    ));
}

#[test]
fn corner_order_is_preserved() {
    let range = parse_range("B5:A1").unwrap();
    assert_eq!(range.start, CellAddress::new(4, 1));
    assert_eq!(range.end, CellAddress::new(0, 0));

    let normalized = range.normalized();
    assert_eq!(normalized.start, CellAddress::new(0, 0));
    assert_eq!(normalized.end, CellAddress::new(4, 1));
}

#[test]
fn negative_coordinates_are_rejected() {
    assert!(matches!(
        cell_to_label(-1, 0),
        Err(RangeError::InvalidAddress { .. })
    ));
    assert!(matches!(
        cell_to_label(0, -1),
        Err(RangeError::InvalidAddress { .. })
    ));
}

#[test]
fn range_label_round_trips() {
    let range = parse_range("A1:B5").unwrap();
    assert_eq!(range_to_label(&range), "A1:B5");

    // Degenerate ranges render as a single cell.
    let single = parse_range("D4").unwrap();
    assert_eq!(range_to_label(&single), "D4");
}

#[test]
fn column_label_and_index_are_inverses() {
    for col in [0u32, 1, 25, 26, 27, 51, 52, 701, 702, 16_383] {
        assert_eq!(column_index(&column_label(col)), Some(col));
    }
    assert_eq!(column_index("a"), Some(0));
    assert_eq!(column_index(""), None);
    assert_eq!(column_index("A1"), None);
}

#[test]
fn normalized_counts_cover_the_rectangle() {
    let range = CellRange::new(CellAddress::new(4, 1), CellAddress::new(0, 0));
    assert_eq!(range.row_count(), 5);
    assert_eq!(range.column_count(), 2);
}

proptest! {
    #[test]
    fn parse_round_trips_with_label(row in 0u32..1_000_000, col in 0u32..20_000) {
        let label = cell_to_label(row as i64, col as i64).unwrap();
        let parsed = parse_cell(&label).unwrap();
        prop_assert_eq!(parsed, CellAddress::new(row, col));
    }

    #[test]
    fn range_labels_round_trip(
        r1 in 0u32..10_000, c1 in 0u32..500,
        r2 in 0u32..10_000, c2 in 0u32..500,
    ) {
        let range = CellRange::new(CellAddress::new(r1, c1), CellAddress::new(r2, c2));
        let label = range_to_label(&range);
        let reparsed = parse_range(&label).unwrap();
        // A degenerate label collapses to one cell; both corners still match.
        prop_assert_eq!(reparsed.start, range.start);
        prop_assert_eq!(reparsed.end, range.end);
    }
}
