mod support;

use serde_json::json;
use support::{TestWorkspace, cell_text, fill_block};
use workbook_mcp::model::CellValue;
use workbook_mcp::tools::{
    self, AppendRowsParams, FilterDataParams, FilterOp, FilterSpec, FindReplaceParams,
    ReadSheetDataParams, SetFormulaParams, SortKeySpec, SortRangeParams, UpdateCellParams,
    WriteSheetDataParams,
};

#[tokio::test]
async fn write_then_read_round_trips_values() {
    let ws = TestWorkspace::new();
    ws.create_workbook("book.xlsx", |_| {});
    let state = ws.app_state();

    tools::write_sheet_data(
        state.clone(),
        WriteSheetDataParams {
            file_path: "book.xlsx".to_string(),
            sheet_name: "Sheet1".to_string(),
            start_cell: "B2".to_string(),
            data: vec![
                vec![json!("Name"), json!("Score")],
                vec![json!("ada"), json!(92.5)],
                vec![json!("grace"), json!(88)],
            ],
        },
    )
    .await
    .unwrap();

    let response = tools::read_sheet_data(
        state,
        ReadSheetDataParams {
            file_path: "book.xlsx".to_string(),
            sheet_name: "Sheet1".to_string(),
            range: Some("B2:C4".to_string()),
            include_formulas: false,
        },
    )
    .await
    .unwrap();

    assert_eq!(response.range, "B2:C4");
    assert_eq!(response.rows.len(), 3);
    assert_eq!(
        response.rows[0][0],
        Some(CellValue::Text("Name".to_string()))
    );
    assert_eq!(response.rows[1][1], Some(CellValue::Number(92.5)));
}

#[tokio::test]
async fn write_sheet_data_treats_equals_prefix_as_formula() {
    let ws = TestWorkspace::new();
    ws.create_workbook("book.xlsx", |_| {});
    let state = ws.app_state();

    let response = tools::write_sheet_data(
        state.clone(),
        WriteSheetDataParams {
            file_path: "book.xlsx".to_string(),
            sheet_name: "Sheet1".to_string(),
            start_cell: "A1".to_string(),
            data: vec![vec![json!(1), json!(2), json!("=SUM(A1:B1)")]],
        },
    )
    .await
    .unwrap();
    assert!(response.message.contains("1 formula"));

    let read = tools::read_sheet_data(
        state,
        ReadSheetDataParams {
            file_path: "book.xlsx".to_string(),
            sheet_name: "Sheet1".to_string(),
            range: Some("A1:C1".to_string()),
            include_formulas: true,
        },
    )
    .await
    .unwrap();
    let formulas = read.formulas.unwrap();
    assert_eq!(formulas.len(), 1);
    assert_eq!(formulas[0].address, "C1");
    assert_eq!(formulas[0].formula, "SUM(A1:B1)");
}

#[tokio::test]
async fn append_rows_lands_after_existing_data() {
    let ws = TestWorkspace::new();
    ws.create_workbook("book.xlsx", |book| {
        fill_block(book, "Sheet1", 0, 0, &[&["a"], &["b"]]);
    });
    let state = ws.app_state();

    let response = tools::append_rows(
        state,
        AppendRowsParams {
            file_path: "book.xlsx".to_string(),
            sheet_name: "Sheet1".to_string(),
            data: vec![vec![json!("c")], vec![json!("d")]],
        },
    )
    .await
    .unwrap();
    assert_eq!(response.affected, Some(2));

    let book = ws.read_workbook("book.xlsx");
    assert_eq!(cell_text(&book, "Sheet1", 2, 0), "c");
    assert_eq!(cell_text(&book, "Sheet1", 3, 0), "d");
}

#[tokio::test]
async fn update_cell_and_set_formula() {
    let ws = TestWorkspace::new();
    ws.create_workbook("book.xlsx", |_| {});
    let state = ws.app_state();

    tools::update_cell(
        state.clone(),
        UpdateCellParams {
            file_path: "book.xlsx".to_string(),
            sheet_name: "Sheet1".to_string(),
            cell: "A1".to_string(),
            value: json!(41),
        },
    )
    .await
    .unwrap();

    tools::set_formula(
        state.clone(),
        SetFormulaParams {
            file_path: "book.xlsx".to_string(),
            sheet_name: "Sheet1".to_string(),
            cell: "A2".to_string(),
            formula: "=A1+1".to_string(),
        },
    )
    .await
    .unwrap();

    let book = ws.read_workbook("book.xlsx");
    assert_eq!(cell_text(&book, "Sheet1", 0, 0), "41");
    let sheet = book.get_sheet_by_name("Sheet1").unwrap();
    let cell = sheet.get_cell((1u32, 2u32)).unwrap();
    assert!(cell.is_formula());
    assert_eq!(cell.get_formula(), "A1+1");
}

#[tokio::test]
async fn find_and_replace_counts_occurrences() {
    let ws = TestWorkspace::new();
    ws.create_workbook("book.xlsx", |book| {
        fill_block(
            book,
            "Sheet1",
            0,
            0,
            &[&["draft report", "final"], &["draft", "draft draft"]],
        );
    });
    let state = ws.app_state();

    let response = tools::find_and_replace(
        state,
        FindReplaceParams {
            file_path: "book.xlsx".to_string(),
            sheet_name: "Sheet1".to_string(),
            find_text: "draft".to_string(),
            replace_text: "FINAL".to_string(),
            range: None,
            case_sensitive: false,
        },
    )
    .await
    .unwrap();

    assert!(response.message.contains("4 occurrence(s)"));
    assert_eq!(response.affected, Some(3));
    let book = ws.read_workbook("book.xlsx");
    assert_eq!(cell_text(&book, "Sheet1", 0, 0), "FINAL report");
    assert_eq!(cell_text(&book, "Sheet1", 1, 1), "FINAL FINAL");
}

#[tokio::test]
async fn find_and_replace_respects_case_and_scope() {
    let ws = TestWorkspace::new();
    ws.create_workbook("book.xlsx", |book| {
        fill_block(book, "Sheet1", 0, 0, &[&["Alpha", "alpha"], &["alpha", "x"]]);
    });
    let state = ws.app_state();

    let response = tools::find_and_replace(
        state,
        FindReplaceParams {
            file_path: "book.xlsx".to_string(),
            sheet_name: "Sheet1".to_string(),
            find_text: "alpha".to_string(),
            replace_text: "beta".to_string(),
            range: Some("A1:B1".to_string()),
            case_sensitive: true,
        },
    )
    .await
    .unwrap();

    // Only the lowercase hit inside A1:B1 changes.
    assert_eq!(response.affected, Some(1));
    let book = ws.read_workbook("book.xlsx");
    assert_eq!(cell_text(&book, "Sheet1", 0, 0), "Alpha");
    assert_eq!(cell_text(&book, "Sheet1", 0, 1), "beta");
    assert_eq!(cell_text(&book, "Sheet1", 1, 0), "alpha");
}

#[tokio::test]
async fn sort_range_orders_rows_by_key() {
    let ws = TestWorkspace::new();
    ws.create_workbook("book.xlsx", |book| {
        fill_block(
            book,
            "Sheet1",
            0,
            0,
            &[
                &["name", "score"],
                &["carol", "70"],
                &["alice", "90"],
                &["bob", "80"],
            ],
        );
    });
    let state = ws.app_state();

    let response = tools::sort_range(
        state,
        SortRangeParams {
            file_path: "book.xlsx".to_string(),
            sheet_name: "Sheet1".to_string(),
            range: "A1:B4".to_string(),
            sort_by: vec![SortKeySpec {
                column: "B".to_string(),
                ascending: false,
            }],
            has_header: true,
        },
    )
    .await
    .unwrap();
    assert_eq!(response.affected, Some(3));

    let book = ws.read_workbook("book.xlsx");
    assert_eq!(cell_text(&book, "Sheet1", 0, 0), "name");
    assert_eq!(cell_text(&book, "Sheet1", 1, 0), "alice");
    assert_eq!(cell_text(&book, "Sheet1", 2, 0), "bob");
    assert_eq!(cell_text(&book, "Sheet1", 3, 0), "carol");
}

#[tokio::test]
async fn sort_range_rejects_key_outside_range() {
    let ws = TestWorkspace::new();
    ws.create_workbook("book.xlsx", |book| {
        fill_block(book, "Sheet1", 0, 0, &[&["a"], &["b"]]);
    });
    let state = ws.app_state();

    let err = tools::sort_range(
        state,
        SortRangeParams {
            file_path: "book.xlsx".to_string(),
            sheet_name: "Sheet1".to_string(),
            range: "A1:A2".to_string(),
            sort_by: vec![SortKeySpec {
                column: "D".to_string(),
                ascending: true,
            }],
            has_header: false,
        },
    )
    .await
    .unwrap_err();
    assert!(err.to_string().contains("outside the range"));
}

#[tokio::test]
async fn filter_data_matches_column_predicates() {
    let ws = TestWorkspace::new();
    ws.create_workbook("book.xlsx", |book| {
        fill_block(
            book,
            "Sheet1",
            0,
            0,
            &[
                &["city", "population"],
                &["oslo", "700000"],
                &["bergen", "280000"],
                &["tromso", "77000"],
            ],
        );
    });
    let state = ws.app_state();

    let response = tools::filter_data(
        state,
        FilterDataParams {
            file_path: "book.xlsx".to_string(),
            sheet_name: "Sheet1".to_string(),
            range: Some("A1:B4".to_string()),
            table_name: None,
            filters: vec![FilterSpec {
                column: "population".to_string(),
                op: FilterOp::GreaterThan,
                value: json!(100000),
            }],
        },
    )
    .await
    .unwrap();

    assert_eq!(response.scanned, 3);
    assert_eq!(response.matched, 2);
    assert_eq!(response.records[0]["city"], json!("oslo"));
    assert_eq!(response.records[1]["city"], json!("bergen"));
}
