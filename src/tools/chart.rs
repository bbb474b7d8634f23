//! Chart adapters. Chart objects are created through the library's anchor
//! API; styling resolves through the static style/palette tables and the
//! resolved choice is echoed in the response.

use crate::chartstyle;
use crate::error::WorkbookError;
use crate::model::AddChartResponse;
use crate::range::{self, CellAddress, CellRange};
use crate::state::AppState;
use crate::tools::data::write_block;
use crate::workbook::{self, load_workbook, save_workbook};
use anyhow::{Result, anyhow};
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use strum::EnumString;
use tokio::task;
use umya_spreadsheet::structs::drawing::spreadsheet::MarkerType;
use umya_spreadsheet::{Chart, ChartType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, JsonSchema, EnumString, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ChartKind {
    Column,
    Bar,
    Line,
    Pie,
    Doughnut,
    Area,
    Scatter,
    Radar,
    Bubble,
}

impl ChartKind {
    fn to_umya(self) -> ChartType {
        match self {
            ChartKind::Column | ChartKind::Bar => ChartType::BarChart,
            ChartKind::Line => ChartType::LineChart,
            ChartKind::Pie => ChartType::PieChart,
            ChartKind::Doughnut => ChartType::DoughnutChart,
            ChartKind::Area => ChartType::AreaChart,
            ChartKind::Scatter => ChartType::ScatterChart,
            ChartKind::Radar => ChartType::RadarChart,
            ChartKind::Bubble => ChartType::BubbleChart,
        }
    }
}

/// Default chart footprint when the caller gives a single anchor cell.
const DEFAULT_CHART_COLUMNS: u32 = 8;
const DEFAULT_CHART_ROWS: u32 = 15;

fn anchor_markers(position: &str) -> Result<(MarkerType, MarkerType, String)> {
    let rect = match range::parse_range(position) {
        Ok(rect) if rect.start != rect.end => rect.normalized(),
        Ok(single) => {
            let start = single.start;
            CellRange::new(
                start,
                CellAddress::new(
                    start.row + DEFAULT_CHART_ROWS,
                    start.col + DEFAULT_CHART_COLUMNS,
                ),
            )
        }
        Err(err) => return Err(err.into()),
    };

    let mut from_marker = MarkerType::default();
    from_marker.set_coordinate(rect.start.to_label());
    let mut to_marker = MarkerType::default();
    to_marker.set_coordinate(rect.end.to_label());
    Ok((from_marker, to_marker, rect.to_label()))
}

/// One absolute, sheet-qualified series reference per column of the range.
fn series_references(sheet_name: &str, rect: CellRange) -> Vec<String> {
    let mut series = Vec::with_capacity(rect.column_count() as usize);
    for col in rect.start.col..=rect.end.col {
        let letter = range::column_label(col);
        series.push(format!(
            "{}!${}${}:${}${}",
            sheet_name,
            letter,
            rect.start.row + 1,
            letter,
            rect.end.row + 1
        ));
    }
    series
}

fn insert_chart(
    sheet: &mut umya_spreadsheet::Worksheet,
    sheet_name: &str,
    kind: ChartKind,
    data_rect: CellRange,
    position: &str,
) -> Result<String> {
    let (from_marker, to_marker, anchor_label) = anchor_markers(position)?;
    let series = series_references(sheet_name, data_rect);
    if series.is_empty() {
        return Err(WorkbookError::Chart("data range has no columns".to_string()).into());
    }
    let series_refs: Vec<&str> = series.iter().map(String::as_str).collect();

    let mut chart = Chart::default();
    chart.new_chart(kind.to_umya(), from_marker, to_marker, series_refs);
    sheet.add_chart(chart);
    Ok(anchor_label)
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AddChartParams {
    pub file_path: String,
    pub sheet_name: String,
    pub chart_type: ChartKind,
    /// Range holding the series columns, e.g. "A1:B10".
    pub data_range: String,
    pub title: Option<String>,
    /// Anchor cell ("E2") or explicit footprint range ("E2:L18").
    pub position: Option<String>,
    /// Style token: 1-48, "styleN", or a name like "dark-blue".
    pub style: Option<String>,
    /// Palette override by scheme name.
    pub theme: Option<String>,
    /// Explicit series colors (hex), overriding style and theme.
    pub custom_palette: Option<Vec<String>>,
}

pub async fn add_chart(state: Arc<AppState>, params: AddChartParams) -> Result<AddChartResponse> {
    let path = state.resolve_existing(&params.file_path)?;
    let data_rect = range::parse_range(&params.data_range)?.normalized();
    let position = params.position.clone().unwrap_or_else(|| "E2".to_string());
    let styling = chartstyle::resolve(
        params.style.as_deref(),
        params.theme.as_deref(),
        params.custom_palette.as_deref(),
    );

    let file_path = params.file_path.clone();
    let sheet_name = params.sheet_name.clone();
    let chart_type = params.chart_type;
    let position_clone = position.clone();

    let anchor = task::spawn_blocking(move || -> Result<String> {
        let mut book = load_workbook(&path)?;
        let sheet = workbook::sheet_mut(&mut book, &sheet_name)?;
        let anchor = insert_chart(sheet, &sheet_name, chart_type, data_rect, &position_clone)?;
        save_workbook(&book, &path)?;
        Ok(anchor)
    })
    .await??;

    let message = match &params.title {
        Some(title) => format!("added {} chart '{}' at {}", params.chart_type, title, anchor),
        None => format!("added {} chart at {}", params.chart_type, anchor),
    };

    Ok(AddChartResponse {
        success: true,
        file_path,
        sheet_name: params.sheet_name,
        chart_type: params.chart_type.to_string(),
        data_range: data_rect.to_label(),
        position: anchor,
        style_id: styling.style_id,
        palette: styling.palette,
        colors: styling.colors,
        warnings: styling.warnings,
        message,
    })
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateChartFromDataParams {
    pub file_path: String,
    pub sheet_name: String,
    /// Row-major data written before charting; first row is headers.
    pub data: Vec<Vec<serde_json::Value>>,
    pub chart_type: ChartKind,
    /// Anchor for the written data block; defaults to "A1".
    pub start_cell: Option<String>,
    pub title: Option<String>,
    pub position: Option<String>,
    pub style: Option<String>,
}

pub async fn create_chart_from_data(
    state: Arc<AppState>,
    params: CreateChartFromDataParams,
) -> Result<AddChartResponse> {
    anyhow::ensure!(!params.data.is_empty(), "data must not be empty");
    let path = state.resolve_existing(&params.file_path)?;
    let start = range::parse_cell(params.start_cell.as_deref().unwrap_or("A1"))?;
    let width = params
        .data
        .iter()
        .map(|row| row.len())
        .max()
        .unwrap_or(0)
        .max(1);
    let data_rect = CellRange::new(
        start,
        CellAddress::new(
            start.row + params.data.len() as u32 - 1,
            start.col + width as u32 - 1,
        ),
    );

    // Anchor the chart just right of the written block unless told otherwise.
    let position = params.position.clone().unwrap_or_else(|| {
        CellAddress::new(start.row, data_rect.end.col + 2).to_label()
    });
    let styling = chartstyle::resolve(params.style.as_deref(), None, None);

    let file_path = params.file_path.clone();
    let sheet_name = params.sheet_name.clone();
    let chart_type = params.chart_type;
    let position_clone = position.clone();
    let data = params.data;

    let anchor = task::spawn_blocking(move || -> Result<String> {
        let mut book = load_workbook(&path)?;
        let sheet = workbook::sheet_mut(&mut book, &sheet_name)?;
        write_block(sheet, start, &data);
        let anchor = insert_chart(sheet, &sheet_name, chart_type, data_rect, &position_clone)?;
        save_workbook(&book, &path)?;
        Ok(anchor)
    })
    .await??;

    let message = match &params.title {
        Some(title) => format!(
            "wrote {} and added {} chart '{}'",
            data_rect.to_label(),
            params.chart_type,
            title
        ),
        None => format!(
            "wrote {} and added {} chart",
            data_rect.to_label(),
            params.chart_type
        ),
    };

    Ok(AddChartResponse {
        success: true,
        file_path,
        sheet_name: params.sheet_name,
        chart_type: params.chart_type.to_string(),
        data_range: data_rect.to_label(),
        position: anchor,
        style_id: styling.style_id,
        palette: styling.palette,
        colors: styling.colors,
        warnings: styling.warnings,
        message,
    })
}
