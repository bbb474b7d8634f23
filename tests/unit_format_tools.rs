mod support;

use support::{TestWorkspace, fill_block};
use workbook_mcp::styles::CellStyleSpec;
use workbook_mcp::tools::{
    self, AddConditionalFormattingParams, AddDataValidationParams, ApplyNumberFormatParams,
    ApplyStyleParams, AutofitColumnsParams, ClearConditionalFormattingParams, ConditionalOperator,
    ConditionalRule, PageMarginsSpec, PageOrientation, RemoveDataValidationParams,
    SetAutoFilterParams, SetColumnWidthParams, SetPageSetupParams, ValidationKind,
};

#[tokio::test]
async fn apply_style_touches_every_cell_in_range() {
    let ws = TestWorkspace::new();
    ws.create_workbook("book.xlsx", |book| {
        fill_block(book, "Sheet1", 0, 0, &[&["a", "b"], &["c", "d"]]);
    });
    let state = ws.app_state();

    let response = tools::apply_style(
        state,
        ApplyStyleParams {
            file_path: "book.xlsx".to_string(),
            sheet_name: "Sheet1".to_string(),
            range: "A1:B2".to_string(),
            style: CellStyleSpec {
                bold: Some(true),
                fill_color: Some("#FFFF00".to_string()),
                ..Default::default()
            },
        },
    )
    .await
    .unwrap();
    assert_eq!(response.affected, Some(4));

    let book = ws.read_workbook("book.xlsx");
    let sheet = book.get_sheet_by_name("Sheet1").unwrap();
    let cell = sheet.get_cell((1u32, 1u32)).unwrap();
    let font = cell.get_style().get_font().cloned().unwrap();
    assert!(*font.get_bold());
}

#[tokio::test]
async fn apply_style_rejects_an_empty_spec() {
    let ws = TestWorkspace::new();
    ws.create_workbook("book.xlsx", |_| {});
    let state = ws.app_state();

    let err = tools::apply_style(
        state,
        ApplyStyleParams {
            file_path: "book.xlsx".to_string(),
            sheet_name: "Sheet1".to_string(),
            range: "A1".to_string(),
            style: CellStyleSpec::default(),
        },
    )
    .await
    .unwrap_err();
    assert!(err.to_string().contains("must not be empty"));
}

#[tokio::test]
async fn number_format_is_persisted() {
    let ws = TestWorkspace::new();
    ws.create_workbook("book.xlsx", |book| {
        fill_block(book, "Sheet1", 0, 0, &[&["1234.5"]]);
    });
    let state = ws.app_state();

    tools::apply_number_format(
        state,
        ApplyNumberFormatParams {
            file_path: "book.xlsx".to_string(),
            sheet_name: "Sheet1".to_string(),
            range: "A1".to_string(),
            format_code: "#,##0.00".to_string(),
        },
    )
    .await
    .unwrap();

    let book = ws.read_workbook("book.xlsx");
    let sheet = book.get_sheet_by_name("Sheet1").unwrap();
    let cell = sheet.get_cell((1u32, 1u32)).unwrap();
    let format_code = cell
        .get_style()
        .get_number_format()
        .map(|fmt| fmt.get_format_code().to_string());
    assert_eq!(format_code.as_deref(), Some("#,##0.00"));
}

#[tokio::test]
async fn column_widths_are_set() {
    let ws = TestWorkspace::new();
    ws.create_workbook("book.xlsx", |book| {
        fill_block(
            book,
            "Sheet1",
            0,
            0,
            &[&["short", "a much longer header value"]],
        );
    });
    let state = ws.app_state();

    tools::set_column_width(
        state.clone(),
        SetColumnWidthParams {
            file_path: "book.xlsx".to_string(),
            sheet_name: "Sheet1".to_string(),
            column: "A".to_string(),
            width: 25.0,
        },
    )
    .await
    .unwrap();

    tools::autofit_columns(
        state,
        AutofitColumnsParams {
            file_path: "book.xlsx".to_string(),
            sheet_name: "Sheet1".to_string(),
            range: "A1:B1".to_string(),
        },
    )
    .await
    .unwrap();

    let book = ws.read_workbook("book.xlsx");
    let sheet = book.get_sheet_by_name("Sheet1").unwrap();
    let width_b = *sheet.get_column_dimension("B").unwrap().get_width();
    assert!(width_b > 8.0, "autofit should widen column B, got {width_b}");
}

#[tokio::test]
async fn data_validation_lifecycle() {
    let ws = TestWorkspace::new();
    ws.create_workbook("book.xlsx", |_| {});
    let state = ws.app_state();

    tools::add_data_validation(
        state.clone(),
        AddDataValidationParams {
            file_path: "book.xlsx".to_string(),
            sheet_name: "Sheet1".to_string(),
            range: "A1:A10".to_string(),
            kind: ValidationKind::List,
            formula1: "\"red,green,blue\"".to_string(),
            formula2: None,
            allow_blank: Some(true),
            prompt: Some("pick a color".to_string()),
            error_message: Some("must be a color".to_string()),
        },
    )
    .await
    .unwrap();

    {
        let book = ws.read_workbook("book.xlsx");
        let sheet = book.get_sheet_by_name("Sheet1").unwrap();
        let validations = sheet.get_data_validations().unwrap();
        assert_eq!(validations.get_data_validation_list().len(), 1);
    }

    let response = tools::remove_data_validation(
        state,
        RemoveDataValidationParams {
            file_path: "book.xlsx".to_string(),
            sheet_name: "Sheet1".to_string(),
            range: "A1:A10".to_string(),
        },
    )
    .await
    .unwrap();
    assert_eq!(response.affected, Some(1));
}

#[tokio::test]
async fn conditional_formatting_lifecycle() {
    let ws = TestWorkspace::new();
    ws.create_workbook("book.xlsx", |book| {
        fill_block(book, "Sheet1", 0, 0, &[&["5"], &["50"], &["500"]]);
    });
    let state = ws.app_state();

    tools::add_conditional_formatting(
        state.clone(),
        AddConditionalFormattingParams {
            file_path: "book.xlsx".to_string(),
            sheet_name: "Sheet1".to_string(),
            range: "A1:A3".to_string(),
            rule: ConditionalRule::CellIs {
                operator: ConditionalOperator::GreaterThan,
                formula: "100".to_string(),
            },
            fill_color: Some("FFC7CE".to_string()),
            font_color: Some("9C0006".to_string()),
            bold: true,
        },
    )
    .await
    .unwrap();

    {
        let book = ws.read_workbook("book.xlsx");
        let sheet = book.get_sheet_by_name("Sheet1").unwrap();
        assert_eq!(sheet.get_conditional_formatting_collection().len(), 1);
    }

    let response = tools::clear_conditional_formatting(
        state,
        ClearConditionalFormattingParams {
            file_path: "book.xlsx".to_string(),
            sheet_name: "Sheet1".to_string(),
            range: "A1:A3".to_string(),
        },
    )
    .await
    .unwrap();
    assert_eq!(response.affected, Some(1));

    let book = ws.read_workbook("book.xlsx");
    let sheet = book.get_sheet_by_name("Sheet1").unwrap();
    assert!(sheet.get_conditional_formatting_collection().is_empty());
}

#[tokio::test]
async fn auto_filter_covers_the_range() {
    let ws = TestWorkspace::new();
    ws.create_workbook("book.xlsx", |book| {
        fill_block(book, "Sheet1", 0, 0, &[&["h1", "h2"], &["1", "2"]]);
    });
    let state = ws.app_state();

    let response = tools::set_auto_filter(
        state,
        SetAutoFilterParams {
            file_path: "book.xlsx".to_string(),
            sheet_name: "Sheet1".to_string(),
            range: "A1:B2".to_string(),
        },
    )
    .await
    .unwrap();
    assert_eq!(response.target.as_deref(), Some("A1:B2"));

    let book = ws.read_workbook("book.xlsx");
    let sheet = book.get_sheet_by_name("Sheet1").unwrap();
    assert!(sheet.get_auto_filter().is_some());
}

#[tokio::test]
async fn page_setup_applies_orientation_and_margins() {
    let ws = TestWorkspace::new();
    ws.create_workbook("book.xlsx", |_| {});
    let state = ws.app_state();

    tools::set_page_setup(
        state,
        SetPageSetupParams {
            file_path: "book.xlsx".to_string(),
            sheet_name: "Sheet1".to_string(),
            orientation: Some(PageOrientation::Landscape),
            paper_size: Some("a4".to_string()),
            margins: Some(PageMarginsSpec {
                top: Some(1.5),
                bottom: None,
                left: Some(0.5),
                right: None,
                header: None,
                footer: None,
            }),
        },
    )
    .await
    .unwrap();

    let book = ws.read_workbook("book.xlsx");
    let sheet = book.get_sheet_by_name("Sheet1").unwrap();
    assert_eq!(sheet.get_page_setup().get_paper_size(), &9u32);
    assert_eq!(sheet.get_page_margins().get_top(), &1.5);
    assert_eq!(sheet.get_page_margins().get_left(), &0.5);
}

#[tokio::test]
async fn unknown_paper_size_is_rejected() {
    let ws = TestWorkspace::new();
    ws.create_workbook("book.xlsx", |_| {});
    let state = ws.app_state();

    let err = tools::set_page_setup(
        state,
        SetPageSetupParams {
            file_path: "book.xlsx".to_string(),
            sheet_name: "Sheet1".to_string(),
            orientation: None,
            paper_size: Some("a2-plus".to_string()),
            margins: None,
        },
    )
    .await
    .unwrap_err();
    assert!(err.to_string().contains("unknown paper size"));
}
