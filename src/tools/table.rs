//! Table adapters: lifecycle, record extraction, and the one-step
//! formatted-table composite.

use crate::model::{
    OperationResponse, TableDataResponse, TableInfo, TableListResponse,
};
use crate::range::{self, CellAddress, CellRange};
use crate::state::AppState;
use crate::styles::{CellStyleSpec, apply_cell_style};
use crate::tools::data::write_block;
use crate::workbook::{self, cell_to_value, load_workbook, save_workbook};
use anyhow::{Result, anyhow};
use schemars::JsonSchema;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task;
use umya_spreadsheet::{Table, TableColumn, Worksheet};

fn table_area_label(table: &Table) -> String {
    format!(
        "{}:{}",
        table.get_area().0.get_coordinate(),
        table.get_area().1.get_coordinate()
    )
}

/// Header fill colors for the built-in table style families. Applied as
/// plain cell styles; the library has no native table-style part.
fn style_header_fill(style_name: &str) -> Option<&'static str> {
    let lower = style_name.to_ascii_lowercase();
    if lower.contains("dark") {
        Some("FF404040")
    } else if lower.contains("medium") {
        Some("FF4472C4")
    } else if lower.contains("light") {
        Some("FFD9E1F2")
    } else {
        None
    }
}

/// Build a Table object from the header row of `rect` and register it.
pub(crate) fn insert_table(
    sheet: &mut Worksheet,
    table_name: &str,
    rect: CellRange,
    style_name: Option<&str>,
) -> Result<Vec<String>> {
    let exists = sheet.get_tables().iter().any(|t| {
        t.get_name().eq_ignore_ascii_case(table_name)
            || t.get_display_name().eq_ignore_ascii_case(table_name)
    });
    if exists {
        return Err(anyhow!("table '{}' already exists on this sheet", table_name));
    }

    let mut headers = Vec::with_capacity(rect.column_count() as usize);
    for col in rect.start.col..=rect.end.col {
        let header = sheet
            .get_cell((col + 1, rect.start.row + 1))
            .map(|cell| cell.get_value().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| format!("Column{}", col - rect.start.col + 1));
        headers.push(header);
    }

    let start_label = rect.start.to_label();
    let end_label = rect.end.to_label();
    let mut table = Table::new(table_name, (start_label.as_str(), end_label.as_str()));
    table.set_display_name(table_name);
    for header in &headers {
        table.add_column(TableColumn::new(header));
    }
    sheet.add_table(table);

    if let Some(style_name) = style_name
        && let Some(fill) = style_header_fill(style_name)
    {
        let header_style = CellStyleSpec {
            bold: Some(true),
            fill_color: Some(fill.to_string()),
            font_color: if fill.starts_with("FF4") || fill.starts_with("FF40") {
                Some("FFFFFFFF".to_string())
            } else {
                None
            },
            ..Default::default()
        };
        for col in rect.start.col..=rect.end.col {
            apply_cell_style(sheet.get_style_mut((col + 1, rect.start.row + 1)), &header_style);
        }
    }

    Ok(headers)
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AddTableParams {
    pub file_path: String,
    pub sheet_name: String,
    pub table_name: String,
    /// Range including the header row, e.g. "A1:D20".
    pub range: String,
    /// Built-in style family name, e.g. "TableStyleMedium9".
    pub style: Option<String>,
}

pub async fn add_table(state: Arc<AppState>, params: AddTableParams) -> Result<OperationResponse> {
    anyhow::ensure!(!params.table_name.is_empty(), "table_name must not be empty");
    let path = state.resolve_existing(&params.file_path)?;
    let rect = range::parse_range(&params.range)?.normalized();
    let file_path = params.file_path.clone();
    let sheet_name = params.sheet_name.clone();
    let table_name = params.table_name.clone();
    let style = params.style.clone();

    let columns = task::spawn_blocking(move || -> Result<usize> {
        let mut book = load_workbook(&path)?;
        let sheet = workbook::sheet_mut(&mut book, &sheet_name)?;
        let headers = insert_table(sheet, &table_name, rect, style.as_deref())?;
        save_workbook(&book, &path)?;
        Ok(headers.len())
    })
    .await??;

    Ok(OperationResponse::ok(
        file_path,
        format!("added table '{}' with {columns} column(s)", params.table_name),
    )
    .with_sheet(params.sheet_name)
    .with_target(rect.to_label())
    .with_affected(columns as u64))
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RemoveTableParams {
    pub file_path: String,
    pub sheet_name: String,
    pub table_name: String,
}

pub async fn remove_table(
    state: Arc<AppState>,
    params: RemoveTableParams,
) -> Result<OperationResponse> {
    let path = state.resolve_existing(&params.file_path)?;
    let file_path = params.file_path.clone();
    let sheet_name = params.sheet_name.clone();
    let table_name = params.table_name.clone();

    task::spawn_blocking(move || -> Result<()> {
        let mut book = load_workbook(&path)?;
        let sheet = workbook::sheet_mut(&mut book, &sheet_name)?;
        let tables = sheet.get_tables_mut();
        let before = tables.len();
        tables.retain(|t| {
            !t.get_name().eq_ignore_ascii_case(&table_name)
                && !t.get_display_name().eq_ignore_ascii_case(&table_name)
        });
        if tables.len() == before {
            return Err(crate::error::WorkbookError::TableNotFound(table_name.clone()).into());
        }
        save_workbook(&book, &path)
    })
    .await??;

    Ok(OperationResponse::ok(
        file_path,
        format!("removed table '{}'", params.table_name),
    )
    .with_sheet(params.sheet_name)
    .with_affected(1))
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RefreshTableParams {
    pub file_path: String,
    pub sheet_name: String,
    pub table_name: String,
    /// New range including the header row.
    pub new_range: String,
}

pub async fn refresh_table(
    state: Arc<AppState>,
    params: RefreshTableParams,
) -> Result<OperationResponse> {
    let path = state.resolve_existing(&params.file_path)?;
    let rect = range::parse_range(&params.new_range)?.normalized();
    let file_path = params.file_path.clone();
    let sheet_name = params.sheet_name.clone();
    let table_name = params.table_name.clone();

    task::spawn_blocking(move || -> Result<()> {
        let mut book = load_workbook(&path)?;
        let sheet = workbook::sheet_mut(&mut book, &sheet_name)?;
        let table = sheet
            .get_tables_mut()
            .iter_mut()
            .find(|t| {
                t.get_name().eq_ignore_ascii_case(&table_name)
                    || t.get_display_name().eq_ignore_ascii_case(&table_name)
            })
            .ok_or_else(|| crate::error::WorkbookError::TableNotFound(table_name.clone()))?;
        table.set_area((
            (rect.start.col + 1, rect.start.row + 1),
            (rect.end.col + 1, rect.end.row + 1),
        ));
        save_workbook(&book, &path)
    })
    .await??;

    Ok(OperationResponse::ok(
        file_path,
        format!("re-ranged table '{}'", params.table_name),
    )
    .with_sheet(params.sheet_name)
    .with_target(rect.to_label()))
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListTablesParams {
    pub file_path: String,
    pub sheet_name: String,
}

pub async fn list_tables(
    state: Arc<AppState>,
    params: ListTablesParams,
) -> Result<TableListResponse> {
    let path = state.resolve_existing(&params.file_path)?;
    let file_path = params.file_path.clone();
    let sheet_name = params.sheet_name.clone();

    task::spawn_blocking(move || -> Result<TableListResponse> {
        let book = load_workbook(&path)?;
        let sheet = workbook::sheet(&book, &sheet_name)?;
        let tables: Vec<TableInfo> = sheet
            .get_tables()
            .iter()
            .map(|table| TableInfo {
                name: table.get_name().to_string(),
                display_name: table.get_display_name().to_string(),
                range: table_area_label(table),
                columns: table
                    .get_columns()
                    .iter()
                    .map(|col| col.get_name().to_string())
                    .collect(),
            })
            .collect();
        let message = format!("{} table(s)", tables.len());
        Ok(TableListResponse {
            success: true,
            file_path,
            sheet_name,
            tables,
            message,
        })
    })
    .await?
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetTableDataParams {
    pub file_path: String,
    pub sheet_name: String,
    pub table_name: String,
}

pub async fn get_table_data(
    state: Arc<AppState>,
    params: GetTableDataParams,
) -> Result<TableDataResponse> {
    let path = state.resolve_existing(&params.file_path)?;
    let file_path = params.file_path.clone();
    let sheet_name = params.sheet_name.clone();
    let table_name = params.table_name.clone();

    task::spawn_blocking(move || -> Result<TableDataResponse> {
        let book = load_workbook(&path)?;
        let rect = {
            let table = workbook::find_table(&book, &sheet_name, &table_name)?;
            range::parse_range(&table_area_label(table))?.normalized()
        };
        let sheet = workbook::sheet(&book, &sheet_name)?;

        let mut headers = Vec::with_capacity(rect.column_count() as usize);
        for col in rect.start.col..=rect.end.col {
            let header = sheet
                .get_cell((col + 1, rect.start.row + 1))
                .map(|cell| cell.get_value().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| range::column_label(col));
            headers.push(header);
        }

        let mut records = Vec::new();
        for row in (rect.start.row + 1)..=rect.end.row {
            let mut record = serde_json::Map::new();
            let mut any = false;
            for (offset, col) in (rect.start.col..=rect.end.col).enumerate() {
                let value = sheet
                    .get_cell((col + 1, row + 1))
                    .and_then(|cell| cell_to_value(&cell.get_value()))
                    .map(|v| match v {
                        crate::model::CellValue::Text(s) => serde_json::Value::String(s),
                        crate::model::CellValue::Number(n) => serde_json::Number::from_f64(n)
                            .map(serde_json::Value::Number)
                            .unwrap_or(serde_json::Value::Null),
                        crate::model::CellValue::Bool(b) => serde_json::Value::Bool(b),
                        crate::model::CellValue::Error(e) | crate::model::CellValue::Date(e) => {
                            serde_json::Value::String(e)
                        }
                    })
                    .unwrap_or(serde_json::Value::Null);
                if !value.is_null() {
                    any = true;
                }
                record.insert(headers[offset].clone(), value);
            }
            if any {
                records.push(serde_json::Value::Object(record));
            }
        }

        let message = format!("{} record(s)", records.len());
        Ok(TableDataResponse {
            success: true,
            file_path,
            sheet_name,
            table_name,
            records,
            message,
        })
    })
    .await?
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateFormattedTableParams {
    pub file_path: String,
    pub sheet_name: String,
    pub start_cell: String,
    /// Row-major data; the first row is the header row.
    pub data: Vec<Vec<serde_json::Value>>,
    pub table_name: String,
    /// Built-in style family name, e.g. "TableStyleMedium9".
    #[serde(default)]
    pub style: Option<String>,
    /// Number-format codes keyed by column letter (absolute) or header name.
    #[serde(default)]
    pub formats: Option<HashMap<String, String>>,
}

pub async fn create_formatted_table(
    state: Arc<AppState>,
    params: CreateFormattedTableParams,
) -> Result<OperationResponse> {
    anyhow::ensure!(!params.data.is_empty(), "data must contain a header row");
    let path = state.resolve_existing(&params.file_path)?;
    let start = range::parse_cell(&params.start_cell)?;
    let file_path = params.file_path.clone();
    let sheet_name = params.sheet_name.clone();
    let table_name = params.table_name.clone();
    let style = params.style.clone();
    let formats = params.formats.clone().unwrap_or_default();
    let data = params.data;

    let target = task::spawn_blocking(move || -> Result<String> {
        let mut book = load_workbook(&path)?;
        let sheet = workbook::sheet_mut(&mut book, &sheet_name)?;

        let width = data.iter().map(|row| row.len()).max().unwrap_or(0).max(1);
        let rect = CellRange::new(
            start,
            CellAddress::new(start.row + data.len() as u32 - 1, start.col + width as u32 - 1),
        );

        write_block(sheet, start, &data);
        let headers = insert_table(sheet, &table_name, rect, style.as_deref())?;

        // Column formats address data rows only, not the header.
        for (key, code) in &formats {
            let offset = headers
                .iter()
                .position(|h| h.eq_ignore_ascii_case(key))
                .or_else(|| {
                    range::column_index(key)
                        .filter(|col| *col >= rect.start.col && *col <= rect.end.col)
                        .map(|col| (col - rect.start.col) as usize)
                })
                .ok_or_else(|| anyhow!("format column '{}' not found", key))?;
            let col = rect.start.col + offset as u32;
            for row in (rect.start.row + 1)..=rect.end.row {
                sheet
                    .get_style_mut((col + 1, row + 1))
                    .get_number_format_mut()
                    .set_format_code(code.clone());
            }
        }

        save_workbook(&book, &path)?;
        Ok(rect.to_label())
    })
    .await??;

    Ok(OperationResponse::ok(
        file_path,
        format!("created formatted table '{}'", params.table_name),
    )
    .with_sheet(params.sheet_name)
    .with_target(target))
}
