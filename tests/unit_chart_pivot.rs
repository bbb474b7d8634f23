mod support;

use serde_json::json;
use support::{TestWorkspace, cell_text, fill_block};
use workbook_mcp::tools::{
    self, AddChartParams, AddPivotTableParams, Aggregation, ChartKind, CreateChartFromDataParams,
    ValueFieldSpec,
};

fn seed_chart_data(ws: &TestWorkspace) {
    ws.create_workbook("book.xlsx", |book| {
        fill_block(
            book,
            "Sheet1",
            0,
            0,
            &[
                &["month", "sales"],
                &["jan", "10"],
                &["feb", "20"],
                &["mar", "15"],
            ],
        );
    });
}

#[tokio::test]
async fn add_chart_echoes_resolved_styling() {
    let ws = TestWorkspace::new();
    seed_chart_data(&ws);
    let state = ws.app_state();

    let response = tools::add_chart(
        state,
        AddChartParams {
            file_path: "book.xlsx".to_string(),
            sheet_name: "Sheet1".to_string(),
            chart_type: ChartKind::Column,
            data_range: "A1:B4".to_string(),
            title: Some("Sales".to_string()),
            position: Some("D2".to_string()),
            style: Some("dark-blue".to_string()),
            theme: None,
            custom_palette: None,
        },
    )
    .await
    .unwrap();

    assert!(response.success);
    assert_eq!(response.chart_type, "column");
    assert_eq!(response.data_range, "A1:B4");
    assert_eq!(response.style_id, 7);
    assert_eq!(response.palette, "dark-blue");
    assert_eq!(response.colors.len(), 8);
    assert!(response.warnings.is_empty());
    // Single-cell anchors grow to the default footprint.
    assert_eq!(response.position, "D2:L17");
}

#[tokio::test]
async fn add_chart_unknown_style_warns_but_succeeds() {
    let ws = TestWorkspace::new();
    seed_chart_data(&ws);
    let state = ws.app_state();

    let response = tools::add_chart(
        state,
        AddChartParams {
            file_path: "book.xlsx".to_string(),
            sheet_name: "Sheet1".to_string(),
            chart_type: ChartKind::Pie,
            data_range: "B1:B4".to_string(),
            title: None,
            position: None,
            style: Some("glitter".to_string()),
            theme: None,
            custom_palette: None,
        },
    )
    .await
    .unwrap();

    assert!(response.success);
    assert_eq!(response.style_id, 2);
    assert_eq!(response.warnings.len(), 1);
}

#[tokio::test]
async fn add_chart_rejects_bad_range() {
    let ws = TestWorkspace::new();
    seed_chart_data(&ws);
    let state = ws.app_state();

    let err = tools::add_chart(
        state,
        AddChartParams {
            file_path: "book.xlsx".to_string(),
            sheet_name: "Sheet1".to_string(),
            chart_type: ChartKind::Line,
            data_range: "!!".to_string(),
            title: None,
            position: None,
            style: None,
            theme: None,
            custom_palette: None,
        },
    )
    .await
    .unwrap_err();
    assert!(err.to_string().contains("invalid cell reference"));
}

#[tokio::test]
async fn create_chart_from_data_writes_then_charts() {
    let ws = TestWorkspace::new();
    ws.create_workbook("book.xlsx", |_| {});
    let state = ws.app_state();

    let response = tools::create_chart_from_data(
        state,
        CreateChartFromDataParams {
            file_path: "book.xlsx".to_string(),
            sheet_name: "Sheet1".to_string(),
            data: vec![
                vec![json!("quarter"), json!("revenue")],
                vec![json!("q1"), json!(100)],
                vec![json!("q2"), json!(140)],
            ],
            chart_type: ChartKind::Line,
            start_cell: None,
            title: None,
            position: None,
            style: None,
        },
    )
    .await
    .unwrap();

    assert_eq!(response.data_range, "A1:B3");
    let book = ws.read_workbook("book.xlsx");
    assert_eq!(cell_text(&book, "Sheet1", 0, 0), "quarter");
    assert_eq!(cell_text(&book, "Sheet1", 2, 1), "140");
}

#[tokio::test]
async fn pivot_table_materializes_a_cross_tab() {
    let ws = TestWorkspace::new();
    ws.create_workbook("book.xlsx", |book| {
        book.new_sheet("Pivot").unwrap();
        fill_block(
            book,
            "Sheet1",
            0,
            0,
            &[
                &["region", "quarter", "amount"],
                &["north", "q1", "10"],
                &["north", "q2", "20"],
                &["south", "q1", "5"],
                &["south", "q1", "7"],
            ],
        );
    });
    let state = ws.app_state();

    let response = tools::add_pivot_table(
        state,
        AddPivotTableParams {
            file_path: "book.xlsx".to_string(),
            source_sheet: "Sheet1".to_string(),
            source_range: "A1:C5".to_string(),
            target_sheet: "Pivot".to_string(),
            target_cell: "A1".to_string(),
            rows: vec!["region".to_string()],
            columns: vec!["quarter".to_string()],
            values: vec![ValueFieldSpec {
                field: "amount".to_string(),
                agg: Aggregation::Sum,
            }],
        },
    )
    .await
    .unwrap();

    assert_eq!(response.row_keys, 2);
    assert_eq!(response.column_keys, 2);

    let book = ws.read_workbook("book.xlsx");
    // Header row: row field label, then one column per (col group, value).
    assert_eq!(cell_text(&book, "Pivot", 0, 0), "region");
    assert_eq!(cell_text(&book, "Pivot", 0, 1), "q1 - amount (sum)");
    assert_eq!(cell_text(&book, "Pivot", 0, 2), "q2 - amount (sum)");
    // Row groups keep first-seen source order.
    assert_eq!(cell_text(&book, "Pivot", 1, 0), "north");
    assert_eq!(cell_text(&book, "Pivot", 1, 1), "10");
    assert_eq!(cell_text(&book, "Pivot", 1, 2), "20");
    assert_eq!(cell_text(&book, "Pivot", 2, 0), "south");
    assert_eq!(cell_text(&book, "Pivot", 2, 1), "12");
    assert_eq!(cell_text(&book, "Pivot", 2, 2), "");
}

#[tokio::test]
async fn pivot_average_and_count_aggregations() {
    let ws = TestWorkspace::new();
    ws.create_workbook("book.xlsx", |book| {
        book.new_sheet("Pivot").unwrap();
        fill_block(
            book,
            "Sheet1",
            0,
            0,
            &[
                &["team", "points"],
                &["red", "10"],
                &["red", "20"],
                &["blue", "30"],
            ],
        );
    });
    let state = ws.app_state();

    let response = tools::add_pivot_table(
        state,
        AddPivotTableParams {
            file_path: "book.xlsx".to_string(),
            source_sheet: "Sheet1".to_string(),
            source_range: "A1:B4".to_string(),
            target_sheet: "Pivot".to_string(),
            target_cell: "A1".to_string(),
            rows: vec!["team".to_string()],
            columns: Vec::new(),
            values: vec![
                ValueFieldSpec {
                    field: "points".to_string(),
                    agg: Aggregation::Average,
                },
                ValueFieldSpec {
                    field: "points".to_string(),
                    agg: Aggregation::Count,
                },
            ],
        },
    )
    .await
    .unwrap();
    assert_eq!(response.row_keys, 2);

    let book = ws.read_workbook("book.xlsx");
    assert_eq!(cell_text(&book, "Pivot", 0, 1), "points (avg)");
    assert_eq!(cell_text(&book, "Pivot", 0, 2), "points (count)");
    assert_eq!(cell_text(&book, "Pivot", 1, 0), "red");
    assert_eq!(cell_text(&book, "Pivot", 1, 1), "15");
    assert_eq!(cell_text(&book, "Pivot", 1, 2), "2");
    assert_eq!(cell_text(&book, "Pivot", 2, 1), "30");
}

#[tokio::test]
async fn pivot_unknown_field_is_rejected() {
    let ws = TestWorkspace::new();
    ws.create_workbook("book.xlsx", |book| {
        fill_block(book, "Sheet1", 0, 0, &[&["a", "b"], &["1", "2"]]);
    });
    let state = ws.app_state();

    let err = tools::add_pivot_table(
        state,
        AddPivotTableParams {
            file_path: "book.xlsx".to_string(),
            source_sheet: "Sheet1".to_string(),
            source_range: "A1:B2".to_string(),
            target_sheet: "Sheet1".to_string(),
            target_cell: "E1".to_string(),
            rows: vec!["missing".to_string()],
            columns: Vec::new(),
            values: vec![ValueFieldSpec {
                field: "b".to_string(),
                agg: Aggregation::Sum,
            }],
        },
    )
    .await
    .unwrap_err();
    assert!(err.to_string().contains("not found in source header row"));
}
