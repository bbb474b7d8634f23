//! Formatting adapters: styles, number formats, dimensions, validation,
//! conditional formatting, filters, and page setup.

use crate::error::WorkbookError;
use crate::model::OperationResponse;
use crate::range::{self, CellRange, column_label};
use crate::state::AppState;
use crate::styles::{CellStyleSpec, apply_cell_style, normalize_argb};
use crate::workbook::{self, load_workbook, save_workbook};
use anyhow::{Result, anyhow};
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use tokio::task;
use umya_spreadsheet::{
    ConditionalFormatValues, ConditionalFormatting, ConditionalFormattingOperatorValues,
    ConditionalFormattingRule, DataValidation, DataValidationOperatorValues, DataValidationValues,
    DataValidations, Formula, PatternValues, Style,
};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ApplyStyleParams {
    pub file_path: String,
    pub sheet_name: String,
    pub range: String,
    pub style: CellStyleSpec,
}

pub async fn apply_style(
    state: Arc<AppState>,
    params: ApplyStyleParams,
) -> Result<OperationResponse> {
    anyhow::ensure!(!params.style.is_empty(), "style spec must not be empty");
    let path = state.resolve_existing(&params.file_path)?;
    let rect = range::parse_range(&params.range)?.normalized();
    let file_path = params.file_path.clone();
    let sheet_name = params.sheet_name.clone();
    let spec = params.style.clone();

    let cells = task::spawn_blocking(move || -> Result<u64> {
        let mut book = load_workbook(&path)?;
        let sheet = workbook::sheet_mut(&mut book, &sheet_name)?;
        let mut cells = 0u64;
        for row in rect.start.row..=rect.end.row {
            for col in rect.start.col..=rect.end.col {
                let style = sheet.get_style_mut((col + 1, row + 1));
                apply_cell_style(style, &spec);
                cells += 1;
            }
        }
        save_workbook(&book, &path)?;
        Ok(cells)
    })
    .await??;

    Ok(OperationResponse::ok(file_path, format!("styled {cells} cell(s)"))
        .with_sheet(params.sheet_name)
        .with_target(rect.to_label())
        .with_affected(cells))
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ApplyNumberFormatParams {
    pub file_path: String,
    pub sheet_name: String,
    pub range: String,
    /// Excel format code, e.g. "#,##0.00", "0.0%", "yyyy-mm-dd".
    pub format_code: String,
}

pub async fn apply_number_format(
    state: Arc<AppState>,
    params: ApplyNumberFormatParams,
) -> Result<OperationResponse> {
    anyhow::ensure!(!params.format_code.is_empty(), "format_code must not be empty");
    let path = state.resolve_existing(&params.file_path)?;
    let rect = range::parse_range(&params.range)?.normalized();
    let file_path = params.file_path.clone();
    let sheet_name = params.sheet_name.clone();
    let format_code = params.format_code.clone();

    let cells = task::spawn_blocking(move || -> Result<u64> {
        let mut book = load_workbook(&path)?;
        let sheet = workbook::sheet_mut(&mut book, &sheet_name)?;
        let mut cells = 0u64;
        for row in rect.start.row..=rect.end.row {
            for col in rect.start.col..=rect.end.col {
                sheet
                    .get_style_mut((col + 1, row + 1))
                    .get_number_format_mut()
                    .set_format_code(format_code.clone());
                cells += 1;
            }
        }
        save_workbook(&book, &path)?;
        Ok(cells)
    })
    .await??;

    Ok(OperationResponse::ok(
        file_path,
        format!("applied format '{}' to {cells} cell(s)", params.format_code),
    )
    .with_sheet(params.sheet_name)
    .with_target(rect.to_label())
    .with_affected(cells))
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AutofitColumnsParams {
    pub file_path: String,
    pub sheet_name: String,
    pub range: String,
}

pub async fn autofit_columns(
    state: Arc<AppState>,
    params: AutofitColumnsParams,
) -> Result<OperationResponse> {
    let path = state.resolve_existing(&params.file_path)?;
    let rect = range::parse_range(&params.range)?.normalized();
    let file_path = params.file_path.clone();
    let sheet_name = params.sheet_name.clone();

    let columns = task::spawn_blocking(move || -> Result<u64> {
        let mut book = load_workbook(&path)?;

        // Content-length heuristic, clamped to spreadsheet-typical widths.
        let mut widths: Vec<f64> = Vec::with_capacity(rect.column_count() as usize);
        {
            let sheet = workbook::sheet(&book, &sheet_name)?;
            for col in rect.start.col..=rect.end.col {
                let mut longest = 0usize;
                for row in rect.start.row..=rect.end.row {
                    if let Some(cell) = sheet.get_cell((col + 1, row + 1)) {
                        longest = longest.max(cell.get_value().chars().count());
                    }
                }
                widths.push(((longest as f64) * 1.2).clamp(8.0, 60.0));
            }
        }

        let sheet = workbook::sheet_mut(&mut book, &sheet_name)?;
        for (offset, width) in widths.iter().enumerate() {
            let letter = column_label(rect.start.col + offset as u32);
            sheet.get_column_dimension_mut(&letter).set_width(*width);
        }
        save_workbook(&book, &path)?;
        Ok(widths.len() as u64)
    })
    .await??;

    Ok(OperationResponse::ok(file_path, format!("autofitted {columns} column(s)"))
        .with_sheet(params.sheet_name)
        .with_target(rect.to_label())
        .with_affected(columns))
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SetColumnWidthParams {
    pub file_path: String,
    pub sheet_name: String,
    /// Column letter, e.g. "B".
    pub column: String,
    pub width: f64,
}

pub async fn set_column_width(
    state: Arc<AppState>,
    params: SetColumnWidthParams,
) -> Result<OperationResponse> {
    anyhow::ensure!(params.width > 0.0, "width must be positive");
    range::column_index(&params.column)
        .ok_or_else(|| anyhow!("invalid column '{}'", params.column))?;
    let path = state.resolve_existing(&params.file_path)?;
    let file_path = params.file_path.clone();
    let sheet_name = params.sheet_name.clone();
    let column = params.column.to_ascii_uppercase();
    let width = params.width;

    task::spawn_blocking(move || -> Result<()> {
        let mut book = load_workbook(&path)?;
        let sheet = workbook::sheet_mut(&mut book, &sheet_name)?;
        sheet.get_column_dimension_mut(&column).set_width(width);
        save_workbook(&book, &path)
    })
    .await??;

    Ok(OperationResponse::ok(
        file_path,
        format!("set column {} width to {}", params.column, params.width),
    )
    .with_sheet(params.sheet_name)
    .with_target(params.column.to_ascii_uppercase()))
}

#[derive(Debug, Clone, Copy, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ValidationKind {
    List,
    Whole,
    Decimal,
    Date,
    Custom,
}

impl ValidationKind {
    fn to_umya(self) -> DataValidationValues {
        match self {
            ValidationKind::List => DataValidationValues::List,
            ValidationKind::Whole => DataValidationValues::Whole,
            ValidationKind::Decimal => DataValidationValues::Decimal,
            ValidationKind::Date => DataValidationValues::Date,
            ValidationKind::Custom => DataValidationValues::Custom,
        }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AddDataValidationParams {
    pub file_path: String,
    pub sheet_name: String,
    pub range: String,
    pub kind: ValidationKind,
    /// First constraint formula: a list ("\"a,b,c\"" or a range) or a bound.
    pub formula1: String,
    /// Second bound for between-style constraints.
    pub formula2: Option<String>,
    #[serde(default)]
    pub allow_blank: Option<bool>,
    pub prompt: Option<String>,
    pub error_message: Option<String>,
}

fn normalize_sqref(range: &str) -> Result<String> {
    // Validate through the codec, then store the label Excel expects.
    let rect = range::parse_range(range)?;
    Ok(rect.to_label())
}

pub async fn add_data_validation(
    state: Arc<AppState>,
    params: AddDataValidationParams,
) -> Result<OperationResponse> {
    anyhow::ensure!(!params.formula1.is_empty(), "formula1 must not be empty");
    let path = state.resolve_existing(&params.file_path)?;
    let sqref = normalize_sqref(&params.range)?;
    let file_path = params.file_path.clone();
    let sheet_name = params.sheet_name.clone();
    let sqref_clone = sqref.clone();
    let kind = params.kind;
    let formula1 = params.formula1.trim().trim_start_matches('=').to_string();
    let formula2 = params
        .formula2
        .as_deref()
        .map(|f| f.trim().trim_start_matches('=').to_string())
        .filter(|f| !f.is_empty());
    let allow_blank = params.allow_blank;
    let prompt = params.prompt.clone();
    let error_message = params.error_message.clone();

    task::spawn_blocking(move || -> Result<()> {
        let mut book = load_workbook(&path)?;
        let sheet = workbook::sheet_mut(&mut book, &sheet_name)?;

        if sheet.get_data_validations_mut().is_none() {
            sheet.set_data_validations(DataValidations::default());
        }
        let validations = sheet
            .get_data_validations_mut()
            .ok_or_else(|| WorkbookError::ValidationRule("failed to initialize".to_string()))?;

        // One rule per target range; replace any previous rule on the same sqref.
        validations
            .get_data_validation_list_mut()
            .retain(|dv| dv.get_sequence_of_references().get_sqref().to_string() != sqref_clone);

        let mut validation = DataValidation::default();
        validation.set_type(kind.to_umya());
        validation
            .get_sequence_of_references_mut()
            .set_sqref(sqref_clone.clone());
        validation.set_formula1(formula1);
        let has_second = formula2.is_some();
        if let Some(second) = formula2 {
            validation.set_formula2(second);
        }
        if let Some(blank) = allow_blank {
            validation.set_allow_blank(blank);
        }
        if matches!(
            kind,
            ValidationKind::Whole | ValidationKind::Decimal | ValidationKind::Date
        ) {
            validation.set_operator(if has_second {
                DataValidationOperatorValues::Between
            } else {
                DataValidationOperatorValues::GreaterThanOrEqual
            });
        }
        if let Some(text) = prompt {
            validation.set_show_input_message(true);
            validation.set_prompt(text);
        }
        if let Some(text) = error_message {
            validation.set_show_error_message(true);
            validation.set_error_message(text);
        }

        validations.add_data_validation_list(validation);
        save_workbook(&book, &path)
    })
    .await??;

    Ok(OperationResponse::ok(file_path, "data validation added".to_string())
        .with_sheet(params.sheet_name)
        .with_target(sqref)
        .with_affected(1))
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RemoveDataValidationParams {
    pub file_path: String,
    pub sheet_name: String,
    pub range: String,
}

pub async fn remove_data_validation(
    state: Arc<AppState>,
    params: RemoveDataValidationParams,
) -> Result<OperationResponse> {
    let path = state.resolve_existing(&params.file_path)?;
    let sqref = normalize_sqref(&params.range)?;
    let file_path = params.file_path.clone();
    let sheet_name = params.sheet_name.clone();
    let sqref_clone = sqref.clone();

    let removed = task::spawn_blocking(move || -> Result<u64> {
        let mut book = load_workbook(&path)?;
        let sheet = workbook::sheet_mut(&mut book, &sheet_name)?;
        let mut removed = 0u64;
        if let Some(validations) = sheet.get_data_validations_mut() {
            let list = validations.get_data_validation_list_mut();
            let before = list.len();
            list.retain(|dv| dv.get_sequence_of_references().get_sqref().to_string() != sqref_clone);
            removed = (before - list.len()) as u64;
        }
        if removed > 0 {
            save_workbook(&book, &path)?;
        }
        Ok(removed)
    })
    .await??;

    Ok(OperationResponse::ok(
        file_path,
        format!("removed {removed} validation rule(s)"),
    )
    .with_sheet(params.sheet_name)
    .with_target(sqref)
    .with_affected(removed))
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConditionalOperator {
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Equal,
    NotEqual,
    Between,
    NotBetween,
}

impl ConditionalOperator {
    fn to_umya(&self) -> ConditionalFormattingOperatorValues {
        match self {
            Self::LessThan => ConditionalFormattingOperatorValues::LessThan,
            Self::LessThanOrEqual => ConditionalFormattingOperatorValues::LessThanOrEqual,
            Self::GreaterThan => ConditionalFormattingOperatorValues::GreaterThan,
            Self::GreaterThanOrEqual => ConditionalFormattingOperatorValues::GreaterThanOrEqual,
            Self::Equal => ConditionalFormattingOperatorValues::Equal,
            Self::NotEqual => ConditionalFormattingOperatorValues::NotEqual,
            Self::Between => ConditionalFormattingOperatorValues::Between,
            Self::NotBetween => ConditionalFormattingOperatorValues::NotBetween,
        }
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConditionalRule {
    /// Compare each cell against the formula, e.g. greater_than 100.
    CellIs {
        operator: ConditionalOperator,
        formula: String,
    },
    /// Arbitrary boolean expression evaluated per cell.
    Expression { formula: String },
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AddConditionalFormattingParams {
    pub file_path: String,
    pub sheet_name: String,
    pub range: String,
    pub rule: ConditionalRule,
    /// Differential fill color, ARGB or RGB hex. Defaults to a light red.
    pub fill_color: Option<String>,
    pub font_color: Option<String>,
    #[serde(default)]
    pub bold: bool,
}

fn build_differential_style(fill_argb: &str, font_argb: Option<&str>, bold: bool) -> Style {
    let mut style = Style::default();
    let pattern = style.get_fill_mut().get_pattern_fill_mut();
    pattern.set_pattern_type(PatternValues::Solid);
    pattern.get_foreground_color_mut().set_argb(fill_argb);
    if bold {
        style.get_font_mut().set_bold(true);
    }
    if let Some(font) = font_argb {
        style.get_font_mut().get_color_mut().set_argb(font);
    }
    style
}

pub async fn add_conditional_formatting(
    state: Arc<AppState>,
    params: AddConditionalFormattingParams,
) -> Result<OperationResponse> {
    let path = state.resolve_existing(&params.file_path)?;
    let sqref = normalize_sqref(&params.range)?;
    let fill = params
        .fill_color
        .as_deref()
        .map(|c| normalize_argb(c).ok_or_else(|| anyhow!("invalid fill_color '{c}'")))
        .transpose()?
        .unwrap_or_else(|| "FFFFE0E0".to_string());
    let font = params
        .font_color
        .as_deref()
        .map(|c| normalize_argb(c).ok_or_else(|| anyhow!("invalid font_color '{c}'")))
        .transpose()?;

    let file_path = params.file_path.clone();
    let sheet_name = params.sheet_name.clone();
    let sqref_clone = sqref.clone();
    let rule = params.rule.clone();
    let bold = params.bold;

    task::spawn_blocking(move || -> Result<()> {
        let mut book = load_workbook(&path)?;
        let sheet = workbook::sheet_mut(&mut book, &sheet_name)?;

        let mut formatting = ConditionalFormatting::default();
        formatting
            .get_sequence_of_references_mut()
            .set_sqref(sqref_clone.clone());

        let mut cf_rule = ConditionalFormattingRule::default();
        cf_rule.set_priority(
            sheet
                .get_conditional_formatting_collection()
                .iter()
                .map(|cf| cf.get_conditional_collection().len())
                .sum::<usize>() as i32
                + 1,
        );

        let formula_text = match &rule {
            ConditionalRule::CellIs { operator, formula } => {
                cf_rule.set_type(ConditionalFormatValues::CellIs);
                cf_rule.set_operator(operator.to_umya());
                formula
            }
            ConditionalRule::Expression { formula } => {
                cf_rule.set_type(ConditionalFormatValues::Expression);
                formula
            }
        };
        // Excel stores CF formulas without a leading '='.
        let mut formula = Formula::default();
        formula.set_address_str(formula_text.trim().trim_start_matches('='));
        cf_rule.set_formula(formula);
        cf_rule.set_style(build_differential_style(&fill, font.as_deref(), bold));

        formatting.add_conditional_collection(cf_rule);
        sheet.add_conditional_formatting_collection(formatting);
        save_workbook(&book, &path)
    })
    .await??;

    Ok(OperationResponse::ok(file_path, "conditional formatting added".to_string())
        .with_sheet(params.sheet_name)
        .with_target(sqref)
        .with_affected(1))
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ClearConditionalFormattingParams {
    pub file_path: String,
    pub sheet_name: String,
    pub range: String,
}

pub async fn clear_conditional_formatting(
    state: Arc<AppState>,
    params: ClearConditionalFormattingParams,
) -> Result<OperationResponse> {
    let path = state.resolve_existing(&params.file_path)?;
    let sqref = normalize_sqref(&params.range)?;
    let file_path = params.file_path.clone();
    let sheet_name = params.sheet_name.clone();
    let sqref_clone = sqref.clone();

    let removed = task::spawn_blocking(move || -> Result<u64> {
        let mut book = load_workbook(&path)?;
        let sheet = workbook::sheet_mut(&mut book, &sheet_name)?;
        let before = sheet.get_conditional_formatting_collection().len();
        if before == 0 {
            return Ok(0);
        }

        let kept: Vec<ConditionalFormatting> = sheet
            .get_conditional_formatting_collection()
            .iter()
            .filter(|cf| cf.get_sequence_of_references().get_sqref().to_string() != sqref_clone)
            .cloned()
            .collect();

        let removed = (before - kept.len()) as u64;
        if removed > 0 {
            sheet.set_conditional_formatting_collection(kept);
            save_workbook(&book, &path)?;
        }
        Ok(removed)
    })
    .await??;

    Ok(OperationResponse::ok(
        file_path,
        format!("cleared {removed} conditional format block(s)"),
    )
    .with_sheet(params.sheet_name)
    .with_target(sqref)
    .with_affected(removed))
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SetAutoFilterParams {
    pub file_path: String,
    pub sheet_name: String,
    pub range: String,
}

pub async fn set_auto_filter(
    state: Arc<AppState>,
    params: SetAutoFilterParams,
) -> Result<OperationResponse> {
    let path = state.resolve_existing(&params.file_path)?;
    let target = normalize_sqref(&params.range)?;
    let file_path = params.file_path.clone();
    let sheet_name = params.sheet_name.clone();
    let target_clone = target.clone();

    task::spawn_blocking(move || -> Result<()> {
        let mut book = load_workbook(&path)?;
        let sheet = workbook::sheet_mut(&mut book, &sheet_name)?;
        sheet.set_auto_filter(target_clone);
        save_workbook(&book, &path)
    })
    .await??;

    Ok(OperationResponse::ok(file_path, "auto filter enabled".to_string())
        .with_sheet(params.sheet_name)
        .with_target(target))
}

#[derive(Debug, Clone, Copy, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PageOrientation {
    Portrait,
    Landscape,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct PageMarginsSpec {
    pub top: Option<f64>,
    pub bottom: Option<f64>,
    pub left: Option<f64>,
    pub right: Option<f64>,
    pub header: Option<f64>,
    pub footer: Option<f64>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SetPageSetupParams {
    pub file_path: String,
    pub sheet_name: String,
    pub orientation: Option<PageOrientation>,
    /// Paper size name ("a4", "letter", "legal", "a3", "a5", "tabloid") or
    /// a numeric OOXML paper-size index.
    pub paper_size: Option<String>,
    pub margins: Option<PageMarginsSpec>,
}

fn paper_size_index(name: &str) -> Result<u32> {
    if let Ok(index) = name.parse::<u32>() {
        return Ok(index);
    }
    match name.to_ascii_lowercase().as_str() {
        "letter" => Ok(1),
        "tabloid" => Ok(3),
        "legal" => Ok(5),
        "a3" => Ok(8),
        "a4" => Ok(9),
        "a5" => Ok(11),
        other => Err(anyhow!("unknown paper size '{other}'")),
    }
}

pub async fn set_page_setup(
    state: Arc<AppState>,
    params: SetPageSetupParams,
) -> Result<OperationResponse> {
    anyhow::ensure!(
        params.orientation.is_some() || params.paper_size.is_some() || params.margins.is_some(),
        "nothing to change: provide orientation, paper_size, or margins"
    );
    let path = state.resolve_existing(&params.file_path)?;
    let paper_index = params.paper_size.as_deref().map(paper_size_index).transpose()?;
    let file_path = params.file_path.clone();
    let sheet_name = params.sheet_name.clone();
    let orientation = params.orientation;
    let margins = params.margins.clone();

    task::spawn_blocking(move || -> Result<()> {
        use umya_spreadsheet::OrientationValues;

        let mut book = load_workbook(&path)?;
        let sheet = workbook::sheet_mut(&mut book, &sheet_name)?;

        if let Some(orientation) = orientation {
            sheet.get_page_setup_mut().set_orientation(match orientation {
                PageOrientation::Portrait => OrientationValues::Portrait,
                PageOrientation::Landscape => OrientationValues::Landscape,
            });
        }
        if let Some(index) = paper_index {
            sheet.get_page_setup_mut().set_paper_size(index);
        }
        if let Some(margins) = margins {
            let page_margins = sheet.get_page_margins_mut();
            if let Some(v) = margins.top {
                page_margins.set_top(v);
            }
            if let Some(v) = margins.bottom {
                page_margins.set_bottom(v);
            }
            if let Some(v) = margins.left {
                page_margins.set_left(v);
            }
            if let Some(v) = margins.right {
                page_margins.set_right(v);
            }
            if let Some(v) = margins.header {
                page_margins.set_header(v);
            }
            if let Some(v) = margins.footer {
                page_margins.set_footer(v);
            }
        }

        save_workbook(&book, &path)
    })
    .await??;

    Ok(OperationResponse::ok(file_path, "page setup updated".to_string())
        .with_sheet(params.sheet_name))
}
