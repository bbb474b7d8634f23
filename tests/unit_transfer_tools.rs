mod support;

use support::{TestWorkspace, cell_text, fill_block};
use workbook_mcp::tools::{
    self, ExportDataParams, ExportPdfParams, ExportTarget, ImportDataParams, ImportSource,
    TransferFormat,
};

#[tokio::test]
async fn csv_import_lands_at_the_anchor() {
    let ws = TestWorkspace::new();
    ws.create_workbook("book.xlsx", |_| {});
    std::fs::write(ws.path("people.csv"), "name,age\nada,36\ngrace,45\n").unwrap();
    let state = ws.app_state();

    let response = tools::import_data(
        state,
        ImportDataParams {
            file_path: "book.xlsx".to_string(),
            sources: vec![ImportSource {
                kind: TransferFormat::Csv,
                path: "people.csv".to_string(),
                sheet_name: "People".to_string(),
                start_cell: Some("B2".to_string()),
                delimiter: None,
                create_table: false,
            }],
        },
    )
    .await
    .unwrap();

    assert_eq!(response.sources_imported, 1);
    assert_eq!(response.rows_written, 3);
    let book = ws.read_workbook("book.xlsx");
    assert_eq!(cell_text(&book, "People", 1, 1), "name");
    assert_eq!(cell_text(&book, "People", 2, 1), "ada");
    assert_eq!(cell_text(&book, "People", 2, 2), "36");
}

#[tokio::test]
async fn json_object_import_derives_a_header_row() {
    let ws = TestWorkspace::new();
    ws.create_workbook("book.xlsx", |_| {});
    std::fs::write(
        ws.path("items.json"),
        r#"[{"sku":"a-1","qty":3},{"sku":"b-2","qty":5}]"#,
    )
    .unwrap();
    let state = ws.app_state();

    let response = tools::import_data(
        state,
        ImportDataParams {
            file_path: "book.xlsx".to_string(),
            sources: vec![ImportSource {
                kind: TransferFormat::Json,
                path: "items.json".to_string(),
                sheet_name: "Items".to_string(),
                start_cell: None,
                delimiter: None,
                create_table: true,
            }],
        },
    )
    .await
    .unwrap();

    assert_eq!(response.rows_written, 3);
    assert_eq!(response.tables_created.len(), 1);
    let book = ws.read_workbook("book.xlsx");
    assert_eq!(cell_text(&book, "Items", 0, 0), "sku");
    assert_eq!(cell_text(&book, "Items", 1, 0), "a-1");
    assert_eq!(cell_text(&book, "Items", 1, 1), "3");
    let tables = book.get_sheet_by_name("Items").unwrap().get_tables();
    assert_eq!(tables.len(), 1);
}

#[tokio::test]
async fn missing_import_source_is_rejected() {
    let ws = TestWorkspace::new();
    ws.create_workbook("book.xlsx", |_| {});
    let state = ws.app_state();

    let err = tools::import_data(
        state,
        ImportDataParams {
            file_path: "book.xlsx".to_string(),
            sources: vec![ImportSource {
                kind: TransferFormat::Csv,
                path: "missing.csv".to_string(),
                sheet_name: "X".to_string(),
                start_cell: None,
                delimiter: None,
                create_table: false,
            }],
        },
    )
    .await
    .unwrap_err();
    assert!(err.to_string().contains("does not exist"));
}

#[tokio::test]
async fn csv_export_round_trips_sheet_content() {
    let ws = TestWorkspace::new();
    ws.create_workbook("book.xlsx", |book| {
        fill_block(
            book,
            "Sheet1",
            0,
            0,
            &[&["name", "score"], &["ada", "92"], &["grace", "88"]],
        );
    });
    let state = ws.app_state();

    let response = tools::export_data(
        state,
        ExportDataParams {
            file_path: "book.xlsx".to_string(),
            targets: vec![ExportTarget {
                kind: TransferFormat::Csv,
                sheet_name: "Sheet1".to_string(),
                output_path: "out/scores.csv".to_string(),
                delimiter: None,
            }],
        },
    )
    .await
    .unwrap();
    assert_eq!(response.outputs.len(), 1);

    let contents = std::fs::read_to_string(ws.path("out/scores.csv")).unwrap();
    assert_eq!(contents, "name,score\nada,92\ngrace,88\n");
}

#[tokio::test]
async fn json_export_keys_records_by_header() {
    let ws = TestWorkspace::new();
    ws.create_workbook("book.xlsx", |book| {
        fill_block(book, "Sheet1", 0, 0, &[&["city", "pop"], &["oslo", "700000"]]);
    });
    let state = ws.app_state();

    tools::export_data(
        state,
        ExportDataParams {
            file_path: "book.xlsx".to_string(),
            targets: vec![ExportTarget {
                kind: TransferFormat::Json,
                sheet_name: "Sheet1".to_string(),
                output_path: "out/cities.json".to_string(),
                delimiter: None,
            }],
        },
    )
    .await
    .unwrap();

    let contents = std::fs::read_to_string(ws.path("out/cities.json")).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&contents).unwrap();
    assert_eq!(parsed[0]["city"], serde_json::json!("oslo"));
    assert_eq!(parsed[0]["pop"], serde_json::json!(700000.0));
}

#[tokio::test]
async fn export_pdf_without_a_bridge_reports_bridge_unavailable() {
    let ws = TestWorkspace::new();
    ws.create_workbook("book.xlsx", |_| {});
    // Point the config at a soffice binary that does not exist; discovery
    // also finds nothing in a sandboxed test environment.
    let state = support::app_state_with_config(ws.config_with(|config| {
        config.soffice_path = Some(ws.path("missing-soffice"));
    }));

    if state.bridge().is_some() {
        // A real LibreOffice install is present; nothing to assert here.
        return;
    }

    let err = tools::export_pdf(
        state,
        ExportPdfParams {
            file_path: "book.xlsx".to_string(),
            output_path: None,
            sheets: None,
        },
    )
    .await
    .unwrap_err();
    assert!(err.to_string().contains("bridge unavailable"));
}
