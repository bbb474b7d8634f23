//! Static pivot materialization.
//!
//! The library has no pivot-cache object, so this adapter aggregates the
//! source range directly and writes the resulting cross-tab at the target
//! anchor. Row groups keep first-seen source order; column groups are
//! sorted.

use crate::error::WorkbookError;
use crate::model::PivotTableResponse;
use crate::range::{self, CellAddress, CellRange};
use crate::state::AppState;
use crate::workbook::{self, load_workbook, save_workbook};
use anyhow::{Result, anyhow};
use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::task;
use umya_spreadsheet::Worksheet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    Sum,
    Count,
    Average,
    Min,
    Max,
}

impl Aggregation {
    fn label(self) -> &'static str {
        match self {
            Aggregation::Sum => "sum",
            Aggregation::Count => "count",
            Aggregation::Average => "avg",
            Aggregation::Min => "min",
            Aggregation::Max => "max",
        }
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ValueFieldSpec {
    /// Header name in the source range.
    pub field: String,
    #[serde(default = "default_agg")]
    pub agg: Aggregation,
}

fn default_agg() -> Aggregation {
    Aggregation::Sum
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AddPivotTableParams {
    pub file_path: String,
    pub source_sheet: String,
    /// Source range including the header row.
    pub source_range: String,
    pub target_sheet: String,
    pub target_cell: String,
    /// Fields whose distinct values become output rows.
    pub rows: Vec<String>,
    /// Fields whose distinct values become output column groups.
    #[serde(default)]
    pub columns: Vec<String>,
    /// Fields aggregated in the body.
    pub values: Vec<ValueFieldSpec>,
}

#[derive(Default, Clone, Copy)]
struct Accumulator {
    sum: f64,
    count: u64,
    min: f64,
    max: f64,
}

impl Accumulator {
    fn push(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.sum += value;
        self.count += 1;
    }

    fn finish(&self, agg: Aggregation) -> Option<f64> {
        if self.count == 0 {
            return None;
        }
        Some(match agg {
            Aggregation::Sum => self.sum,
            Aggregation::Count => self.count as f64,
            Aggregation::Average => self.sum / self.count as f64,
            Aggregation::Min => self.min,
            Aggregation::Max => self.max,
        })
    }
}

fn cell_text(sheet: &Worksheet, row: u32, col: u32) -> String {
    sheet
        .get_cell((col + 1, row + 1))
        .map(|cell| cell.get_value().to_string())
        .unwrap_or_default()
}

pub async fn add_pivot_table(
    state: Arc<AppState>,
    params: AddPivotTableParams,
) -> Result<PivotTableResponse> {
    anyhow::ensure!(!params.rows.is_empty(), "at least one row field is required");
    anyhow::ensure!(!params.values.is_empty(), "at least one value field is required");
    let path = state.resolve_existing(&params.file_path)?;
    let source_rect = range::parse_range(&params.source_range)?.normalized();
    let target = range::parse_cell(&params.target_cell)?;

    let file_path = params.file_path.clone();
    let source_sheet = params.source_sheet.clone();
    let target_sheet = params.target_sheet.clone();
    let row_fields = params.rows.clone();
    let col_fields = params.columns.clone();
    let value_fields = params.values.clone();

    let (target_range, row_keys, column_keys) =
        task::spawn_blocking(move || -> Result<(String, u64, u64)> {
            let mut book = load_workbook(&path)?;

            // Resolve every referenced field against the source header row.
            let (row_offsets, col_offsets, value_offsets, data) = {
                let sheet = workbook::sheet(&book, &source_sheet)?;
                let mut header_index: HashMap<String, u32> = HashMap::new();
                for col in source_rect.start.col..=source_rect.end.col {
                    let header = cell_text(sheet, source_rect.start.row, col);
                    if !header.is_empty() {
                        header_index.insert(header.to_ascii_lowercase(), col);
                    }
                }
                let resolve = |field: &str| -> Result<u32> {
                    header_index
                        .get(&field.to_ascii_lowercase())
                        .copied()
                        .ok_or_else(|| {
                            anyhow!(WorkbookError::Pivot(format!(
                                "field '{field}' not found in source header row"
                            )))
                        })
                };

                let row_offsets: Vec<u32> =
                    row_fields.iter().map(|f| resolve(f)).collect::<Result<_>>()?;
                let col_offsets: Vec<u32> =
                    col_fields.iter().map(|f| resolve(f)).collect::<Result<_>>()?;
                let value_offsets: Vec<u32> = value_fields
                    .iter()
                    .map(|v| resolve(&v.field))
                    .collect::<Result<_>>()?;

                // Snapshot the data rows before mutating the book.
                let mut data: Vec<Vec<String>> = Vec::new();
                for row in (source_rect.start.row + 1)..=source_rect.end.row {
                    let mut cells = Vec::with_capacity(source_rect.column_count() as usize);
                    for col in source_rect.start.col..=source_rect.end.col {
                        cells.push(cell_text(sheet, row, col));
                    }
                    data.push(cells);
                }
                (row_offsets, col_offsets, value_offsets, data)
            };

            let base = source_rect.start.col;
            let mut row_groups: IndexMap<Vec<String>, ()> = IndexMap::new();
            let mut col_groups: BTreeSet<Vec<String>> = BTreeSet::new();
            let mut cells: HashMap<(Vec<String>, Vec<String>, usize), Accumulator> =
                HashMap::new();

            for record in &data {
                if record.iter().all(|c| c.is_empty()) {
                    continue;
                }
                let row_key: Vec<String> = row_offsets
                    .iter()
                    .map(|col| record[(col - base) as usize].clone())
                    .collect();
                let col_key: Vec<String> = col_offsets
                    .iter()
                    .map(|col| record[(col - base) as usize].clone())
                    .collect();
                row_groups.entry(row_key.clone()).or_insert(());
                col_groups.insert(col_key.clone());

                for (idx, value_col) in value_offsets.iter().enumerate() {
                    let raw = &record[(value_col - base) as usize];
                    if raw.is_empty() {
                        continue;
                    }
                    let entry = cells
                        .entry((row_key.clone(), col_key.clone(), idx))
                        .or_default();
                    match raw.parse::<f64>() {
                        Ok(value) => entry.push(value),
                        // Non-numeric values still participate in counts.
                        Err(_) => entry.count += 1,
                    }
                }
            }

            // Lay out the cross-tab.
            let sheet = workbook::sheet_mut(&mut book, &target_sheet)?;
            let row_label_width = row_fields.len() as u32;

            for (offset, field) in row_fields.iter().enumerate() {
                sheet
                    .get_cell_mut((target.col + 1 + offset as u32, target.row + 1))
                    .set_value(field.clone());
            }
            let mut value_columns: Vec<(Vec<String>, usize)> = Vec::new();
            for col_key in &col_groups {
                for (idx, value_field) in value_fields.iter().enumerate() {
                    value_columns.push((col_key.clone(), idx));
                    let mut title = String::new();
                    if !col_key.is_empty() && col_key.iter().any(|part| !part.is_empty()) {
                        title.push_str(&col_key.join(" / "));
                        title.push_str(" - ");
                    }
                    title.push_str(&format!(
                        "{} ({})",
                        value_field.field,
                        value_field.agg.label()
                    ));
                    let col = target.col + row_label_width + value_columns.len() as u32 - 1;
                    sheet
                        .get_cell_mut((col + 1, target.row + 1))
                        .set_value(title);
                }
            }

            for (r, (row_key, _)) in row_groups.iter().enumerate() {
                let out_row = target.row + 1 + r as u32;
                for (offset, part) in row_key.iter().enumerate() {
                    sheet
                        .get_cell_mut((target.col + 1 + offset as u32, out_row + 1))
                        .set_value(part.clone());
                }
                for (c, (col_key, value_idx)) in value_columns.iter().enumerate() {
                    let out_col = target.col + row_label_width + c as u32;
                    if let Some(acc) = cells.get(&(row_key.clone(), col_key.clone(), *value_idx))
                        && let Some(value) = acc.finish(value_fields[*value_idx].agg)
                    {
                        sheet
                            .get_cell_mut((out_col + 1, out_row + 1))
                            .set_value_number(value);
                    }
                }
            }

            let extent = CellRange::new(
                target,
                CellAddress::new(
                    target.row + row_groups.len() as u32,
                    target.col + row_label_width + value_columns.len().max(1) as u32 - 1,
                ),
            );
            save_workbook(&book, &path)?;
            Ok((
                extent.to_label(),
                row_groups.len() as u64,
                col_groups.len() as u64,
            ))
        })
        .await??;

    Ok(PivotTableResponse {
        success: true,
        file_path,
        source_sheet: params.source_sheet,
        source_range: source_rect.to_label(),
        target_sheet: params.target_sheet,
        target_range,
        row_keys,
        column_keys,
        message: format!("materialized pivot with {row_keys} row group(s)"),
    })
}
