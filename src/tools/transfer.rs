//! Data transfer adapters: CSV/JSON import and export, and PDF export
//! through the automation bridge.

use crate::bridge::{AutomationBridge, LibreOfficeBridge, attempt_with_fallback};
use crate::error::WorkbookError;
use crate::model::{ExportDataResponse, ExportPdfResponse, ImportDataResponse};
use crate::range::{self, CellAddress, CellRange};
use crate::state::AppState;
use crate::utils::make_short_random_id;
use crate::workbook::{self, load_workbook, save_workbook};
use anyhow::{Context, Result, anyhow};
use schemars::JsonSchema;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TransferFormat {
    Csv,
    Json,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ImportSource {
    pub kind: TransferFormat,
    /// Source file, resolved inside the workspace root.
    pub path: String,
    pub sheet_name: String,
    /// Anchor for the imported block; defaults to "A1".
    pub start_cell: Option<String>,
    /// CSV delimiter; defaults to ','.
    pub delimiter: Option<String>,
    /// Register the imported block as a table.
    #[serde(default)]
    pub create_table: bool,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ImportDataParams {
    pub file_path: String,
    pub sources: Vec<ImportSource>,
}

fn csv_delimiter(raw: Option<&str>) -> Result<u8> {
    match raw {
        None => Ok(b','),
        Some(s) if s.len() == 1 && s.is_ascii() => Ok(s.as_bytes()[0]),
        Some(other) => Err(anyhow!("delimiter must be a single ASCII character, got '{other}'")),
    }
}

fn read_csv_rows(path: &Path, delimiter: u8) -> Result<Vec<Vec<serde_json::Value>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_path(path)
        .with_context(|| format!("failed to open CSV {:?}", path))?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row = record
            .iter()
            .map(|field| match field.parse::<f64>() {
                Ok(number) if !field.is_empty() => serde_json::Value::from(number),
                _ => serde_json::Value::String(field.to_string()),
            })
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

/// JSON sources accept an array of objects (keys become the header row) or
/// an array of arrays.
fn read_json_rows(path: &Path) -> Result<Vec<Vec<serde_json::Value>>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read JSON {:?}", path))?;
    let parsed: serde_json::Value = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse JSON {:?}", path))?;

    let serde_json::Value::Array(items) = parsed else {
        return Err(anyhow!("JSON import expects a top-level array"));
    };

    let mut rows = Vec::new();
    match items.first() {
        Some(serde_json::Value::Object(first)) => {
            let headers: Vec<String> = first.keys().cloned().collect();
            rows.push(
                headers
                    .iter()
                    .map(|h| serde_json::Value::String(h.clone()))
                    .collect(),
            );
            for item in &items {
                let serde_json::Value::Object(record) = item else {
                    return Err(anyhow!("JSON import rows must all be objects"));
                };
                rows.push(
                    headers
                        .iter()
                        .map(|h| record.get(h).cloned().unwrap_or(serde_json::Value::Null))
                        .collect(),
                );
            }
        }
        Some(serde_json::Value::Array(_)) => {
            for item in items {
                let serde_json::Value::Array(record) = item else {
                    return Err(anyhow!("JSON import rows must all be arrays"));
                };
                rows.push(record);
            }
        }
        Some(_) => return Err(anyhow!("JSON import expects objects or arrays")),
        None => {}
    }
    Ok(rows)
}

pub async fn import_data(
    state: Arc<AppState>,
    params: ImportDataParams,
) -> Result<ImportDataResponse> {
    anyhow::ensure!(!params.sources.is_empty(), "at least one source is required");
    let workbook_path = state.resolve_existing(&params.file_path)?;
    let config = state.config();

    // Resolve and validate every source before touching the workbook.
    let mut prepared: Vec<(ImportSource, PathBuf, CellAddress, u8)> = Vec::new();
    for source in &params.sources {
        let source_path = workbook::resolve_workspace_path(&config, &source.path)?;
        if !source_path.is_file() {
            return Err(anyhow!("import source {:?} does not exist", source.path));
        }
        let start = range::parse_cell(source.start_cell.as_deref().unwrap_or("A1"))?;
        let delimiter = csv_delimiter(source.delimiter.as_deref())?;
        prepared.push((source.clone(), source_path, start, delimiter));
    }

    let file_path = params.file_path.clone();
    task::spawn_blocking(move || -> Result<ImportDataResponse> {
        let mut book = load_workbook(&workbook_path)?;
        let mut rows_written = 0u64;
        let mut tables_created = Vec::new();

        for (source, source_path, start, delimiter) in &prepared {
            let rows = match source.kind {
                TransferFormat::Csv => read_csv_rows(source_path, *delimiter)?,
                TransferFormat::Json => read_json_rows(source_path)?,
            };
            if rows.is_empty() {
                continue;
            }

            if book.get_sheet_by_name(&source.sheet_name).is_none() {
                book.new_sheet(&source.sheet_name)
                    .map_err(|e| anyhow!("cannot add sheet '{}': {}", source.sheet_name, e))?;
            }
            let sheet = workbook::sheet_mut(&mut book, &source.sheet_name)?;

            let width = rows.iter().map(|r| r.len()).max().unwrap_or(0).max(1);
            let rect = CellRange::new(
                *start,
                CellAddress::new(
                    start.row + rows.len() as u32 - 1,
                    start.col + width as u32 - 1,
                ),
            );
            crate::tools::data::write_block(sheet, *start, &rows);
            rows_written += rows.len() as u64;

            if source.create_table {
                let table_name = make_short_random_id("tbl", 6);
                crate::tools::table::insert_table(sheet, &table_name, rect, None)?;
                tables_created.push(table_name);
            }
        }

        save_workbook(&book, &workbook_path)?;
        let sources_imported = prepared.len() as u64;
        Ok(ImportDataResponse {
            success: true,
            file_path,
            sources_imported,
            rows_written,
            tables_created,
            message: format!("imported {sources_imported} source(s), {rows_written} row(s)"),
        })
    })
    .await?
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ExportTarget {
    pub kind: TransferFormat,
    pub sheet_name: String,
    /// Output file, resolved inside the workspace root.
    pub output_path: String,
    pub delimiter: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ExportDataParams {
    pub file_path: String,
    pub targets: Vec<ExportTarget>,
}

pub async fn export_data(
    state: Arc<AppState>,
    params: ExportDataParams,
) -> Result<ExportDataResponse> {
    anyhow::ensure!(!params.targets.is_empty(), "at least one target is required");
    let workbook_path = state.resolve_existing(&params.file_path)?;
    let config = state.config();

    let mut prepared: Vec<(ExportTarget, PathBuf, u8)> = Vec::new();
    for target in &params.targets {
        let output = workbook::resolve_workspace_path(&config, &target.output_path)?;
        let delimiter = csv_delimiter(target.delimiter.as_deref())?;
        prepared.push((target.clone(), output, delimiter));
    }

    let file_path = params.file_path.clone();
    task::spawn_blocking(move || -> Result<ExportDataResponse> {
        let book = load_workbook(&workbook_path)?;
        let mut outputs = Vec::new();

        for (target, output, delimiter) in &prepared {
            let sheet = workbook::sheet(&book, &target.sheet_name)?;
            let (max_col, max_row) = sheet.get_highest_column_and_row();

            let mut grid: Vec<Vec<String>> = Vec::with_capacity(max_row as usize);
            for row in 1..=max_row {
                let mut cells = Vec::with_capacity(max_col as usize);
                for col in 1..=max_col {
                    cells.push(
                        sheet
                            .get_cell((col, row))
                            .map(|cell| cell.get_value().to_string())
                            .unwrap_or_default(),
                    );
                }
                grid.push(cells);
            }

            if let Some(parent) = output.parent()
                && !parent.exists()
            {
                std::fs::create_dir_all(parent)?;
            }

            match target.kind {
                TransferFormat::Csv => {
                    let mut writer = csv::WriterBuilder::new()
                        .delimiter(*delimiter)
                        .from_path(output)
                        .with_context(|| format!("failed to create CSV {:?}", output))?;
                    for row in &grid {
                        writer.write_record(row)?;
                    }
                    writer.flush()?;
                }
                TransferFormat::Json => {
                    // First row becomes the record keys.
                    let mut records = Vec::new();
                    if let Some((headers, data_rows)) = grid.split_first() {
                        for row in data_rows {
                            let mut record = serde_json::Map::new();
                            for (idx, header) in headers.iter().enumerate() {
                                let key = if header.is_empty() {
                                    range::column_label(idx as u32)
                                } else {
                                    header.clone()
                                };
                                let value = row.get(idx).cloned().unwrap_or_default();
                                let json_value = match value.parse::<f64>() {
                                    Ok(number) if !value.is_empty() => {
                                        serde_json::Value::from(number)
                                    }
                                    _ => serde_json::Value::String(value),
                                };
                                record.insert(key, json_value);
                            }
                            records.push(serde_json::Value::Object(record));
                        }
                    }
                    let payload = serde_json::to_string_pretty(&records)?;
                    std::fs::write(output, payload)
                        .with_context(|| format!("failed to write JSON {:?}", output))?;
                }
            }
            outputs.push(crate::utils::path_to_forward_slashes(output));
        }

        let message = format!("exported {} target(s)", outputs.len());
        Ok(ExportDataResponse {
            success: true,
            file_path,
            outputs,
            message,
        })
    })
    .await?
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ExportPdfParams {
    pub file_path: String,
    /// Output PDF path; defaults to the workbook path with a .pdf extension.
    pub output_path: Option<String>,
    /// Restrict the export to these sheets (a trimmed copy is converted).
    pub sheets: Option<Vec<String>>,
}

pub async fn export_pdf(state: Arc<AppState>, params: ExportPdfParams) -> Result<ExportPdfResponse> {
    let workbook_path = state.resolve_existing(&params.file_path)?;
    let config = state.config();

    let bridge = state
        .bridge()
        .cloned()
        .ok_or_else(|| WorkbookError::BridgeUnavailable("no soffice binary found".to_string()))?;

    let output_path = match &params.output_path {
        Some(p) => workbook::resolve_workspace_path(&config, p)?,
        None => workbook_path.with_extension("pdf"),
    };

    let staging = tempfile::tempdir().context("failed to create staging directory")?;

    // A sheet subset is exported by converting a trimmed copy.
    let convert_source = match &params.sheets {
        Some(sheets) if !sheets.is_empty() => {
            let sheets = sheets.clone();
            let source = workbook_path.clone();
            let trimmed = staging.path().join(
                workbook_path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| "workbook.xlsx".to_string()),
            );
            let trimmed_clone = trimmed.clone();
            task::spawn_blocking(move || -> Result<()> {
                let mut book = load_workbook(&source)?;
                for name in &sheets {
                    if book.get_sheet_by_name(name).is_none() {
                        return Err(WorkbookError::SheetNotFound(name.clone()).into());
                    }
                }
                let keep: Vec<String> = sheets.clone();
                let all: Vec<String> = book
                    .get_sheet_collection()
                    .iter()
                    .map(|s| s.get_name().to_string())
                    .collect();
                for name in all {
                    if !keep.iter().any(|k| k.eq_ignore_ascii_case(&name)) {
                        book.remove_sheet_by_name(&name)
                            .map_err(|e| anyhow!("cannot trim sheet '{}': {}", name, e))?;
                    }
                }
                save_workbook(&book, &trimmed_clone)
            })
            .await??;
            trimmed
        }
        _ => workbook_path.clone(),
    };

    // Ordered attempts: the discovered bridge first, then any alternate
    // install. The first error wins when every attempt fails.
    let timeout = Duration::from_secs(config.bridge_timeout_secs);
    let alternate = state
        .bridge_binary()
        .and_then(|primary| LibreOfficeBridge::discover_alternate(primary, timeout));

    let staging_path = staging.path().to_path_buf();
    let generated = {
        let primary_source = convert_source.clone();
        let primary_staging = staging_path.clone();
        let primary = async { bridge.convert_to_pdf(&primary_source, &primary_staging).await };
        match alternate {
            Some(second) => {
                let fallback_source = convert_source.clone();
                let fallback_staging = staging_path.clone();
                attempt_with_fallback(
                    "export_pdf",
                    primary,
                    Some(async move {
                        second
                            .convert_to_pdf(&fallback_source, &fallback_staging)
                            .await
                    }),
                )
                .await?
            }
            None => {
                attempt_with_fallback(
                    "export_pdf",
                    primary,
                    None::<std::future::Ready<Result<PathBuf>>>,
                )
                .await?
            }
        }
    };

    if let Some(parent) = output_path.parent()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::rename(&generated, &output_path)
        .or_else(|_| std::fs::copy(&generated, &output_path).map(|_| ()))
        .with_context(|| format!("failed to place PDF at {:?}", output_path))?;

    Ok(ExportPdfResponse {
        success: true,
        file_path: params.file_path,
        pdf_file: crate::utils::path_to_forward_slashes(&output_path),
        method: "libreoffice".to_string(),
        message: format!(
            "exported PDF to {}",
            crate::utils::path_to_forward_slashes(&output_path)
        ),
    })
}
