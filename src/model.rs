//! Serializable response types for the tool surface.
//!
//! Every adapter response carries a `success` flag, an echo of the salient
//! inputs, and a human-readable message; failures never surface as response
//! bodies (they map to tagged MCP errors at the boundary).

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(transparent)]
pub struct WorkbookId(pub String);

impl WorkbookId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WorkbookId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkbookDescriptor {
    pub workbook_id: WorkbookId,
    pub short_id: String,
    pub slug: String,
    pub folder: Option<String>,
    pub path: String,
    pub bytes: u64,
    pub last_modified: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkbookListResponse {
    pub workbooks: Vec<WorkbookDescriptor>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkbookDescription {
    pub success: bool,
    pub file_path: String,
    pub workbook_id: WorkbookId,
    pub bytes: u64,
    pub sheet_count: usize,
    pub sheet_names: Vec<String>,
    pub defined_names: usize,
    pub tables: usize,
    pub macros_present: bool,
    pub last_modified: Option<String>,
    pub message: String,
}

/// Generic acknowledgement for a mutating adapter: the file it touched, the
/// sheet/range it targeted, and how many cells/rows/objects were affected.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OperationResponse {
    pub success: bool,
    pub file_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affected: Option<u64>,
    pub message: String,
}

impl OperationResponse {
    pub fn ok(file_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: true,
            file_path: file_path.into(),
            sheet_name: None,
            target: None,
            affected: None,
            message: message.into(),
        }
    }

    pub fn with_sheet(mut self, sheet_name: impl Into<String>) -> Self {
        self.sheet_name = Some(sheet_name.into());
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_affected(mut self, affected: u64) -> Self {
        self.affected = Some(affected);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SheetInfo {
    pub name: String,
    pub index: usize,
    pub visible: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SheetListResponse {
    pub success: bool,
    pub file_path: String,
    pub sheets: Vec<SheetInfo>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", content = "value")]
pub enum CellValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Error(String),
    Date(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FormulaCell {
    pub address: String,
    pub formula: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReadSheetDataResponse {
    pub success: bool,
    pub file_path: String,
    pub sheet_name: String,
    pub range: String,
    /// Row-major values; `null` marks an empty cell.
    pub rows: Vec<Vec<Option<CellValue>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formulas: Option<Vec<FormulaCell>>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TableInfo {
    pub name: String,
    pub display_name: String,
    pub range: String,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TableListResponse {
    pub success: bool,
    pub file_path: String,
    pub sheet_name: String,
    pub tables: Vec<TableInfo>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TableDataResponse {
    pub success: bool,
    pub file_path: String,
    pub sheet_name: String,
    pub table_name: String,
    /// One JSON object per data row, keyed by header.
    pub records: Vec<serde_json::Value>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FilterDataResponse {
    pub success: bool,
    pub file_path: String,
    pub sheet_name: String,
    pub records: Vec<serde_json::Value>,
    pub matched: u64,
    pub scanned: u64,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AddChartResponse {
    pub success: bool,
    pub file_path: String,
    pub sheet_name: String,
    pub chart_type: String,
    pub data_range: String,
    pub position: String,
    pub style_id: u32,
    pub palette: String,
    pub colors: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub warnings: Vec<String>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PivotTableResponse {
    pub success: bool,
    pub file_path: String,
    pub source_sheet: String,
    pub source_range: String,
    pub target_sheet: String,
    pub target_range: String,
    pub row_keys: u64,
    pub column_keys: u64,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ImportDataResponse {
    pub success: bool,
    pub file_path: String,
    pub sources_imported: u64,
    pub rows_written: u64,
    pub tables_created: Vec<String>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExportDataResponse {
    pub success: bool,
    pub file_path: String,
    pub outputs: Vec<String>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExportPdfResponse {
    pub success: bool,
    pub file_path: String,
    pub pdf_file: String,
    pub method: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VbaModuleDescriptor {
    pub name: String,
    pub stream_name: String,
    pub module_type: String,
    pub read_only: bool,
    pub private: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VbaProjectSummaryResponse {
    pub success: bool,
    pub file_path: String,
    pub has_vba: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_page: Option<u16>,
    pub modules: Vec<VbaModuleDescriptor>,
    pub modules_truncated: bool,
    pub references: Vec<String>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VbaModuleSourceResponse {
    pub success: bool,
    pub file_path: String,
    pub module_name: String,
    pub offset_lines: u32,
    pub limit_lines: u32,
    pub total_lines: u32,
    pub truncated: bool,
    pub source: String,
    pub message: String,
}
