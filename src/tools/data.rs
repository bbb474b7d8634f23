//! Cell data adapters: reading, writing, searching, sorting, filtering.

use crate::model::{
    CellValue, FilterDataResponse, FormulaCell, OperationResponse, ReadSheetDataResponse,
};
use crate::range::{self, CellRange};
use crate::state::AppState;
use crate::workbook::{self, cell_to_value, load_workbook, save_workbook, write_cell_value};
use anyhow::{Result, anyhow};
use regex::RegexBuilder;
use schemars::JsonSchema;
use serde::Deserialize;
use std::cmp::Ordering;
use std::sync::Arc;
use tokio::task;
use umya_spreadsheet::Worksheet;

fn default_true() -> bool {
    true
}

/// Effective rectangle for a sheet-level operation: the explicit range when
/// given, otherwise the occupied extent.
fn effective_range(sheet: &Worksheet, range: Option<&str>) -> Result<CellRange> {
    match range {
        Some(r) => Ok(range::parse_range(r)?.normalized()),
        None => {
            let (max_col, max_row) = sheet.get_highest_column_and_row();
            Ok(CellRange::new(
                range::CellAddress::new(0, 0),
                range::CellAddress::new(max_row.saturating_sub(1), max_col.saturating_sub(1)),
            ))
        }
    }
}

fn value_to_json(value: &CellValue) -> serde_json::Value {
    match value {
        CellValue::Text(s) => serde_json::Value::String(s.clone()),
        CellValue::Number(n) => serde_json::Number::from_f64(*n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        CellValue::Bool(b) => serde_json::Value::Bool(*b),
        CellValue::Error(e) | CellValue::Date(e) => serde_json::Value::String(e.clone()),
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ReadSheetDataParams {
    pub file_path: String,
    pub sheet_name: String,
    /// A1-style range; omitted means the occupied extent.
    pub range: Option<String>,
    #[serde(default)]
    pub include_formulas: bool,
}

pub async fn read_sheet_data(
    state: Arc<AppState>,
    params: ReadSheetDataParams,
) -> Result<ReadSheetDataResponse> {
    let path = state.resolve_existing(&params.file_path)?;
    let file_path = params.file_path.clone();
    let sheet_name = params.sheet_name.clone();
    let range_param = params.range.clone();
    let include_formulas = params.include_formulas;

    task::spawn_blocking(move || -> Result<ReadSheetDataResponse> {
        let book = load_workbook(&path)?;
        let sheet = workbook::sheet(&book, &sheet_name)?;
        let rect = effective_range(sheet, range_param.as_deref())?;

        let mut rows = Vec::with_capacity(rect.row_count() as usize);
        let mut formulas = Vec::new();
        for row in rect.start.row..=rect.end.row {
            let mut cells = Vec::with_capacity(rect.column_count() as usize);
            for col in rect.start.col..=rect.end.col {
                let coordinate = (col + 1, row + 1);
                match sheet.get_cell(coordinate) {
                    Some(cell) => {
                        if include_formulas && cell.is_formula() {
                            formulas.push(FormulaCell {
                                address: range::CellAddress::new(row, col).to_label(),
                                formula: cell.get_formula().to_string(),
                            });
                        }
                        cells.push(cell_to_value(&cell.get_value()));
                    }
                    None => cells.push(None),
                }
            }
            rows.push(cells);
        }

        let range_label = rect.to_label();
        let message = format!("read {} row(s) from {}", rows.len(), range_label);
        Ok(ReadSheetDataResponse {
            success: true,
            file_path,
            sheet_name,
            range: range_label,
            rows,
            formulas: include_formulas.then_some(formulas),
            message,
        })
    })
    .await?
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct WriteSheetDataParams {
    pub file_path: String,
    pub sheet_name: String,
    /// Anchor cell for the top-left of the block, e.g. "A1".
    pub start_cell: String,
    /// Row-major values; strings with a leading '=' are written as formulas.
    pub data: Vec<Vec<serde_json::Value>>,
}

pub async fn write_sheet_data(
    state: Arc<AppState>,
    params: WriteSheetDataParams,
) -> Result<OperationResponse> {
    let path = state.resolve_existing(&params.file_path)?;
    let start = range::parse_cell(&params.start_cell)?;
    let file_path = params.file_path.clone();
    let sheet_name = params.sheet_name.clone();
    let data = params.data;

    let (cells, formulas, target) = task::spawn_blocking(move || -> Result<(u64, u64, String)> {
        let mut book = load_workbook(&path)?;
        let sheet = workbook::sheet_mut(&mut book, &sheet_name)?;
        let (cells, formulas, extent) = write_block(sheet, start, &data);
        save_workbook(&book, &path)?;
        Ok((cells, formulas, extent))
    })
    .await??;

    Ok(OperationResponse::ok(
        file_path,
        format!("wrote {cells} cell(s) ({formulas} formula(s))"),
    )
    .with_sheet(params.sheet_name)
    .with_target(target)
    .with_affected(cells))
}

/// Write a row-major block anchored at `start`; returns (cells, formulas,
/// written range label).
pub(crate) fn write_block(
    sheet: &mut Worksheet,
    start: range::CellAddress,
    data: &[Vec<serde_json::Value>],
) -> (u64, u64, String) {
    let mut cells = 0u64;
    let mut formulas = 0u64;
    let mut max_row = start.row;
    let mut max_col = start.col;

    for (r, row) in data.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            let row_idx = start.row + r as u32;
            let col_idx = start.col + c as u32;
            if write_cell_value(sheet, (col_idx + 1, row_idx + 1), value) {
                formulas += 1;
            }
            cells += 1;
            max_row = max_row.max(row_idx);
            max_col = max_col.max(col_idx);
        }
    }

    let extent = CellRange::new(start, range::CellAddress::new(max_row, max_col)).to_label();
    (cells, formulas, extent)
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AppendRowsParams {
    pub file_path: String,
    pub sheet_name: String,
    pub data: Vec<Vec<serde_json::Value>>,
}

pub async fn append_rows(
    state: Arc<AppState>,
    params: AppendRowsParams,
) -> Result<OperationResponse> {
    let path = state.resolve_existing(&params.file_path)?;
    let file_path = params.file_path.clone();
    let sheet_name = params.sheet_name.clone();
    let data = params.data;

    let (rows, target) = task::spawn_blocking(move || -> Result<(u64, String)> {
        let mut book = load_workbook(&path)?;
        let sheet = workbook::sheet_mut(&mut book, &sheet_name)?;
        let next_row = workbook::last_occupied_row(sheet);
        let start = range::CellAddress::new(next_row, 0);
        let rows = data.len() as u64;
        let (_, _, extent) = write_block(sheet, start, &data);
        save_workbook(&book, &path)?;
        Ok((rows, extent))
    })
    .await??;

    Ok(OperationResponse::ok(file_path, format!("appended {rows} row(s)"))
        .with_sheet(params.sheet_name)
        .with_target(target)
        .with_affected(rows))
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateCellParams {
    pub file_path: String,
    pub sheet_name: String,
    pub cell: String,
    /// Value or formula; strings with a leading '=' become formulas.
    pub value: serde_json::Value,
}

pub async fn update_cell(
    state: Arc<AppState>,
    params: UpdateCellParams,
) -> Result<OperationResponse> {
    let path = state.resolve_existing(&params.file_path)?;
    let address = range::parse_cell(&params.cell)?;
    let file_path = params.file_path.clone();
    let sheet_name = params.sheet_name.clone();
    let value = params.value;

    let is_formula = task::spawn_blocking(move || -> Result<bool> {
        let mut book = load_workbook(&path)?;
        let sheet = workbook::sheet_mut(&mut book, &sheet_name)?;
        let is_formula = write_cell_value(sheet, address.to_coordinate(), &value);
        save_workbook(&book, &path)?;
        Ok(is_formula)
    })
    .await??;

    let label = address.to_label();
    Ok(OperationResponse::ok(
        file_path,
        format!(
            "updated {} with a {}",
            label,
            if is_formula { "formula" } else { "value" }
        ),
    )
    .with_sheet(params.sheet_name)
    .with_target(label)
    .with_affected(1))
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SetFormulaParams {
    pub file_path: String,
    pub sheet_name: String,
    pub cell: String,
    /// Formula text, with or without the leading '='.
    pub formula: String,
}

pub async fn set_formula(
    state: Arc<AppState>,
    params: SetFormulaParams,
) -> Result<OperationResponse> {
    let path = state.resolve_existing(&params.file_path)?;
    let address = range::parse_cell(&params.cell)?;
    let file_path = params.file_path.clone();
    let sheet_name = params.sheet_name.clone();
    let formula = params
        .formula
        .trim()
        .trim_start_matches('=')
        .to_string();
    anyhow::ensure!(!formula.is_empty(), "formula must not be empty");

    task::spawn_blocking(move || -> Result<()> {
        let mut book = load_workbook(&path)?;
        let sheet = workbook::sheet_mut(&mut book, &sheet_name)?;
        sheet
            .get_cell_mut(address.to_coordinate())
            .set_formula(formula);
        save_workbook(&book, &path)
    })
    .await??;

    let label = address.to_label();
    Ok(OperationResponse::ok(file_path, format!("set formula in {label}"))
        .with_sheet(params.sheet_name)
        .with_target(label)
        .with_affected(1))
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct FindReplaceParams {
    pub file_path: String,
    pub sheet_name: String,
    pub find_text: String,
    pub replace_text: String,
    /// Optional A1 range limiting the scope.
    pub range: Option<String>,
    #[serde(default)]
    pub case_sensitive: bool,
}

pub async fn find_and_replace(
    state: Arc<AppState>,
    params: FindReplaceParams,
) -> Result<OperationResponse> {
    anyhow::ensure!(!params.find_text.is_empty(), "find_text must not be empty");
    let path = state.resolve_existing(&params.file_path)?;
    let file_path = params.file_path.clone();
    let sheet_name = params.sheet_name.clone();
    let scope = params.range.clone();
    let pattern = RegexBuilder::new(&regex::escape(&params.find_text))
        .case_insensitive(!params.case_sensitive)
        .build()?;
    let replacement = params.replace_text.clone();

    let (cells_changed, occurrences) = task::spawn_blocking(move || -> Result<(u64, u64)> {
        let mut book = load_workbook(&path)?;
        let rect = {
            let sheet = workbook::sheet(&book, &sheet_name)?;
            scope
                .as_deref()
                .map(|r| range::parse_range(r).map(CellRange::normalized))
                .transpose()?
                .unwrap_or_else(|| effective_range(sheet, None).unwrap_or(CellRange::single(range::CellAddress::new(0, 0))))
        };

        // Collect first, mutate second; formula cells are left untouched.
        let mut replacements: Vec<((u32, u32), String, u64)> = Vec::new();
        {
            let sheet = workbook::sheet(&book, &sheet_name)?;
            for cell in sheet.get_cell_collection() {
                let coordinate = cell.get_coordinate();
                let col = *coordinate.get_col_num();
                let row = *coordinate.get_row_num();
                if row < rect.start.row + 1
                    || row > rect.end.row + 1
                    || col < rect.start.col + 1
                    || col > rect.end.col + 1
                    || cell.is_formula()
                {
                    continue;
                }
                let value = cell.get_value();
                let hits = pattern.find_iter(&value).count() as u64;
                if hits > 0 {
                    let replaced = pattern.replace_all(&value, replacement.as_str()).to_string();
                    replacements.push(((col, row), replaced, hits));
                }
            }
        }

        let mut cells_changed = 0u64;
        let mut occurrences = 0u64;
        if !replacements.is_empty() {
            let sheet = workbook::sheet_mut(&mut book, &sheet_name)?;
            for ((col, row), replaced, hits) in replacements {
                sheet.get_cell_mut((col, row)).set_value(replaced);
                cells_changed += 1;
                occurrences += hits;
            }
            save_workbook(&book, &path)?;
        }

        Ok((cells_changed, occurrences))
    })
    .await??;

    Ok(OperationResponse::ok(
        file_path,
        format!("replaced {occurrences} occurrence(s) in {cells_changed} cell(s)"),
    )
    .with_sheet(params.sheet_name)
    .with_affected(cells_changed))
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SortKeySpec {
    /// Column letter ("A") or header-relative letter inside the range.
    pub column: String,
    #[serde(default = "default_true")]
    pub ascending: bool,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SortRangeParams {
    pub file_path: String,
    pub sheet_name: String,
    pub range: String,
    pub sort_by: Vec<SortKeySpec>,
    /// Exclude the first row of the range from sorting.
    #[serde(default)]
    pub has_header: bool,
}

#[derive(Clone)]
struct CellSnapshot {
    text: String,
    is_formula: bool,
}

fn compare_cells(a: &str, b: &str) -> Ordering {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => return Ordering::Equal,
        // Empty cells always sort last, as spreadsheet UIs do.
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        _ => {}
    }
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(na), Ok(nb)) => na.partial_cmp(&nb).unwrap_or(Ordering::Equal),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.to_lowercase().cmp(&b.to_lowercase()),
    }
}

pub async fn sort_range(state: Arc<AppState>, params: SortRangeParams) -> Result<OperationResponse> {
    anyhow::ensure!(!params.sort_by.is_empty(), "sort_by must not be empty");
    let path = state.resolve_existing(&params.file_path)?;
    let rect = range::parse_range(&params.range)?.normalized();
    let file_path = params.file_path.clone();
    let sheet_name = params.sheet_name.clone();
    let sort_by = params.sort_by.clone();
    let has_header = params.has_header;

    let rows_sorted = task::spawn_blocking(move || -> Result<u64> {
        // Keys are absolute column letters that must fall inside the range.
        let mut keys: Vec<(u32, bool)> = Vec::with_capacity(sort_by.len());
        for spec in &sort_by {
            let col = range::column_index(&spec.column)
                .ok_or_else(|| anyhow!("invalid sort column '{}'", spec.column))?;
            anyhow::ensure!(
                col >= rect.start.col && col <= rect.end.col,
                "sort column '{}' is outside the range",
                spec.column
            );
            keys.push((col - rect.start.col, spec.ascending));
        }

        let mut book = load_workbook(&path)?;
        let data_start = rect.start.row + u32::from(has_header);
        if data_start > rect.end.row {
            return Ok(0);
        }

        let mut grid: Vec<Vec<CellSnapshot>> = Vec::new();
        {
            let sheet = workbook::sheet(&book, &sheet_name)?;
            for row in data_start..=rect.end.row {
                let mut snapshot_row = Vec::with_capacity(rect.column_count() as usize);
                for col in rect.start.col..=rect.end.col {
                    let snapshot = match sheet.get_cell((col + 1, row + 1)) {
                        Some(cell) if cell.is_formula() => CellSnapshot {
                            text: cell.get_formula().to_string(),
                            is_formula: true,
                        },
                        Some(cell) => CellSnapshot {
                            text: cell.get_value().to_string(),
                            is_formula: false,
                        },
                        None => CellSnapshot {
                            text: String::new(),
                            is_formula: false,
                        },
                    };
                    snapshot_row.push(snapshot);
                }
                grid.push(snapshot_row);
            }
        }

        grid.sort_by(|a, b| {
            for (offset, ascending) in &keys {
                let ordering = compare_cells(&a[*offset as usize].text, &b[*offset as usize].text);
                let ordering = if *ascending { ordering } else { ordering.reverse() };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });

        let rows_sorted = grid.len() as u64;
        let sheet = workbook::sheet_mut(&mut book, &sheet_name)?;
        for (r, snapshot_row) in grid.iter().enumerate() {
            let row = data_start + r as u32;
            for (c, snapshot) in snapshot_row.iter().enumerate() {
                let col = rect.start.col + c as u32;
                let cell = sheet.get_cell_mut((col + 1, row + 1));
                if snapshot.is_formula {
                    // Formula text moves verbatim; references are not rewritten.
                    cell.set_formula(snapshot.text.clone());
                } else {
                    cell.set_value(snapshot.text.clone());
                }
            }
        }
        save_workbook(&book, &path)?;
        Ok(rows_sorted)
    })
    .await??;

    Ok(OperationResponse::ok(file_path, format!("sorted {rows_sorted} row(s)"))
        .with_sheet(params.sheet_name)
        .with_target(rect.to_label())
        .with_affected(rows_sorted))
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Equals,
    NotEquals,
    Contains,
    GreaterThan,
    LessThan,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct FilterSpec {
    /// Header name or column letter.
    pub column: String,
    pub op: FilterOp,
    pub value: serde_json::Value,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct FilterDataParams {
    pub file_path: String,
    pub sheet_name: String,
    /// Explicit range, or omitted to use a named table / the occupied extent.
    pub range: Option<String>,
    pub table_name: Option<String>,
    #[serde(default)]
    pub filters: Vec<FilterSpec>,
}

fn matches_filter(value: &serde_json::Value, spec: &FilterSpec) -> bool {
    use serde_json::Value;
    match spec.op {
        FilterOp::Equals | FilterOp::NotEquals => {
            let equal = match (value, &spec.value) {
                (Value::Number(a), Value::Number(b)) => {
                    a.as_f64().unwrap_or(f64::NAN) == b.as_f64().unwrap_or(f64::NAN)
                }
                (Value::String(a), Value::String(b)) => a.eq_ignore_ascii_case(b),
                (a, b) => a == b,
            };
            if matches!(spec.op, FilterOp::Equals) { equal } else { !equal }
        }
        FilterOp::Contains => {
            let needle = match &spec.value {
                Value::String(s) => s.to_lowercase(),
                other => other.to_string().to_lowercase(),
            };
            match value {
                Value::String(s) => s.to_lowercase().contains(&needle),
                other => other.to_string().to_lowercase().contains(&needle),
            }
        }
        FilterOp::GreaterThan | FilterOp::LessThan => {
            let (Some(a), Some(b)) = (value.as_f64(), spec.value.as_f64()) else {
                return false;
            };
            if matches!(spec.op, FilterOp::GreaterThan) { a > b } else { a < b }
        }
    }
}

pub async fn filter_data(
    state: Arc<AppState>,
    params: FilterDataParams,
) -> Result<FilterDataResponse> {
    let path = state.resolve_existing(&params.file_path)?;
    let file_path = params.file_path.clone();
    let sheet_name = params.sheet_name.clone();
    let range_param = params.range.clone();
    let table_name = params.table_name.clone();
    let filters = params.filters.clone();

    task::spawn_blocking(move || -> Result<FilterDataResponse> {
        let book = load_workbook(&path)?;
        let rect = if let Some(table) = table_name.as_deref() {
            let table = workbook::find_table(&book, &sheet_name, table)?;
            let area = format!(
                "{}:{}",
                table.get_area().0.get_coordinate(),
                table.get_area().1.get_coordinate()
            );
            range::parse_range(&area)?.normalized()
        } else {
            let sheet = workbook::sheet(&book, &sheet_name)?;
            effective_range(sheet, range_param.as_deref())?
        };

        let sheet = workbook::sheet(&book, &sheet_name)?;

        // First row of the rectangle provides the record keys.
        let mut headers = Vec::with_capacity(rect.column_count() as usize);
        for col in rect.start.col..=rect.end.col {
            let header = sheet
                .get_cell((col + 1, rect.start.row + 1))
                .map(|cell| cell.get_value().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| range::column_label(col));
            headers.push(header);
        }

        // Map each filter column (header name or letter) to an offset.
        let mut resolved: Vec<(usize, &FilterSpec)> = Vec::with_capacity(filters.len());
        for spec in &filters {
            let offset = headers
                .iter()
                .position(|h| h.eq_ignore_ascii_case(&spec.column))
                .or_else(|| {
                    range::column_index(&spec.column)
                        .filter(|col| *col >= rect.start.col && *col <= rect.end.col)
                        .map(|col| (col - rect.start.col) as usize)
                })
                .ok_or_else(|| anyhow!("filter column '{}' not found", spec.column))?;
            resolved.push((offset, spec));
        }

        let mut records = Vec::new();
        let mut scanned = 0u64;
        for row in (rect.start.row + 1)..=rect.end.row {
            let mut values = Vec::with_capacity(headers.len());
            let mut any = false;
            for col in rect.start.col..=rect.end.col {
                let value = sheet
                    .get_cell((col + 1, row + 1))
                    .and_then(|cell| cell_to_value(&cell.get_value()))
                    .map(|v| value_to_json(&v))
                    .unwrap_or(serde_json::Value::Null);
                if !value.is_null() {
                    any = true;
                }
                values.push(value);
            }
            if !any {
                continue;
            }
            scanned += 1;

            if resolved
                .iter()
                .all(|(offset, spec)| matches_filter(&values[*offset], spec))
            {
                let mut record = serde_json::Map::new();
                for (header, value) in headers.iter().zip(values) {
                    record.insert(header.clone(), value);
                }
                records.push(serde_json::Value::Object(record));
            }
        }

        let matched = records.len() as u64;
        let message = format!("{matched} of {scanned} record(s) matched");
        Ok(FilterDataResponse {
            success: true,
            file_path,
            sheet_name,
            records,
            matched,
            scanned,
            message,
        })
    })
    .await?
}
