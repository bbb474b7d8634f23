use crate::config::ServerConfig;
use crate::error::{ToolDisabledError, to_mcp_error};
use crate::metrics::METRICS;
use crate::model::{
    AddChartResponse, ExportDataResponse, ExportPdfResponse, FilterDataResponse,
    ImportDataResponse, OperationResponse, PivotTableResponse, ReadSheetDataResponse,
    SheetListResponse, TableDataResponse, TableListResponse, VbaModuleSourceResponse,
    VbaProjectSummaryResponse, WorkbookDescription, WorkbookListResponse,
};
use crate::state::AppState;
use crate::tools;
use anyhow::Result;
use rmcp::{
    ErrorData as McpError, Json, ServerHandler, ServiceExt,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{Implementation, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
    transport::stdio,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

const INSTRUCTIONS: &str = "\
Workbook MCP: read, edit, and format Excel workbooks in the workspace.

WORKFLOW:
1) list_workbooks to discover files; describe_workbook / list_sheets for orientation.
2) read_sheet_data (with a tight range) before editing; write_sheet_data / update_cell /
   set_formula / append_rows to change cells.
3) Formatting: apply_style, apply_number_format, set_column_width, autofit_columns,
   add_data_validation, add_conditional_formatting, set_auto_filter, set_page_setup.
4) Structure: add_table / create_formatted_table for tabular data, add_chart /
   create_chart_from_data for visuals, add_pivot_table for cross-tab summaries.
5) import_data / export_data move CSV and JSON in and out; export_pdf renders
   through LibreOffice when it is installed.

RANGES: A1 notation (e.g. A1:C10), optionally sheet-qualified (Sheet1!A1:C10).
Formulas are plain strings with a leading '='.

Every mutating tool opens the file, applies one edit, and saves before returning.
There is no transaction across calls; concurrent edits to the same file race with
last-save-wins semantics.";

#[derive(Clone)]
pub struct WorkbookServer {
    state: Arc<AppState>,
    tool_router: ToolRouter<WorkbookServer>,
}

impl WorkbookServer {
    pub async fn new(config: Arc<ServerConfig>) -> Result<Self> {
        config.ensure_workspace_root()?;
        let state = Arc::new(AppState::new(config));
        Ok(Self::from_state(state))
    }

    pub fn from_state(state: Arc<AppState>) -> Self {
        Self {
            state,
            tool_router: Self::tool_router(),
        }
    }

    pub async fn run_stdio(self) -> Result<()> {
        let service = self
            .serve(stdio())
            .await
            .inspect_err(|error| tracing::error!("serving error: {:?}", error))?;
        service.waiting().await?;
        Ok(())
    }

    fn ensure_tool_enabled(&self, tool: &str) -> Result<()> {
        tracing::info!(tool = tool, "tool invocation requested");
        if self.state.config().is_tool_enabled(tool) {
            Ok(())
        } else {
            Err(ToolDisabledError::new(tool).into())
        }
    }

    /// Gate, run, time, and wrap one adapter call.
    async fn dispatch<T, Fut>(
        &self,
        tool: &str,
        call: impl FnOnce(Arc<AppState>) -> Fut,
    ) -> Result<Json<T>, McpError>
    where
        T: serde::Serialize,
        Fut: Future<Output = Result<T>>,
    {
        self.ensure_tool_enabled(tool).map_err(to_mcp_error)?;
        let start = Instant::now();
        let result = call(self.state.clone()).await;
        METRICS.record_request(tool, result.is_ok(), start.elapsed());
        result.map(Json).map_err(to_mcp_error)
    }
}

#[tool_router]
impl WorkbookServer {
    #[tool(
        name = "list_workbooks",
        description = "List workbook files in the workspace"
    )]
    pub async fn list_workbooks(
        &self,
        Parameters(params): Parameters<tools::ListWorkbooksParams>,
    ) -> Result<Json<WorkbookListResponse>, McpError> {
        self.dispatch("list_workbooks", |state| tools::list_workbooks(state, params))
            .await
    }

    #[tool(
        name = "create_workbook",
        description = "Create a new empty workbook file"
    )]
    pub async fn create_workbook(
        &self,
        Parameters(params): Parameters<tools::CreateWorkbookParams>,
    ) -> Result<Json<OperationResponse>, McpError> {
        self.dispatch("create_workbook", |state| {
            tools::create_workbook(state, params)
        })
        .await
    }

    #[tool(
        name = "describe_workbook",
        description = "Describe workbook metadata: sheets, tables, defined names, macros"
    )]
    pub async fn describe_workbook(
        &self,
        Parameters(params): Parameters<tools::DescribeWorkbookParams>,
    ) -> Result<Json<WorkbookDescription>, McpError> {
        self.dispatch("describe_workbook", |state| {
            tools::describe_workbook(state, params)
        })
        .await
    }

    #[tool(
        name = "save_workbook_as",
        description = "Save a copy of a workbook to a new path"
    )]
    pub async fn save_workbook_as(
        &self,
        Parameters(params): Parameters<tools::SaveWorkbookAsParams>,
    ) -> Result<Json<OperationResponse>, McpError> {
        self.dispatch("save_workbook_as", |state| {
            tools::save_workbook_as(state, params)
        })
        .await
    }

    #[tool(name = "list_sheets", description = "List sheets in a workbook")]
    pub async fn list_sheets(
        &self,
        Parameters(params): Parameters<tools::ListSheetsParams>,
    ) -> Result<Json<SheetListResponse>, McpError> {
        self.dispatch("list_sheets", |state| tools::list_sheets(state, params))
            .await
    }

    #[tool(name = "add_sheet", description = "Add a new sheet to a workbook")]
    pub async fn add_sheet(
        &self,
        Parameters(params): Parameters<tools::AddSheetParams>,
    ) -> Result<Json<OperationResponse>, McpError> {
        self.dispatch("add_sheet", |state| tools::add_sheet(state, params))
            .await
    }

    #[tool(
        name = "delete_sheet",
        description = "Delete a sheet (refuses to remove the last one)"
    )]
    pub async fn delete_sheet(
        &self,
        Parameters(params): Parameters<tools::DeleteSheetParams>,
    ) -> Result<Json<OperationResponse>, McpError> {
        self.dispatch("delete_sheet", |state| tools::delete_sheet(state, params))
            .await
    }

    #[tool(name = "rename_sheet", description = "Rename a sheet")]
    pub async fn rename_sheet(
        &self,
        Parameters(params): Parameters<tools::RenameSheetParams>,
    ) -> Result<Json<OperationResponse>, McpError> {
        self.dispatch("rename_sheet", |state| tools::rename_sheet(state, params))
            .await
    }

    #[tool(
        name = "copy_sheet",
        description = "Copy a sheet within the same workbook"
    )]
    pub async fn copy_sheet(
        &self,
        Parameters(params): Parameters<tools::CopySheetParams>,
    ) -> Result<Json<OperationResponse>, McpError> {
        self.dispatch("copy_sheet", |state| tools::copy_sheet(state, params))
            .await
    }

    #[tool(
        name = "read_sheet_data",
        description = "Read cell values (optionally formulas) from a sheet or range"
    )]
    pub async fn read_sheet_data(
        &self,
        Parameters(params): Parameters<tools::ReadSheetDataParams>,
    ) -> Result<Json<ReadSheetDataResponse>, McpError> {
        self.dispatch("read_sheet_data", |state| {
            tools::read_sheet_data(state, params)
        })
        .await
    }

    #[tool(
        name = "write_sheet_data",
        description = "Write a 2-D array of values anchored at a start cell; '='-prefixed strings become formulas"
    )]
    pub async fn write_sheet_data(
        &self,
        Parameters(params): Parameters<tools::WriteSheetDataParams>,
    ) -> Result<Json<OperationResponse>, McpError> {
        self.dispatch("write_sheet_data", |state| {
            tools::write_sheet_data(state, params)
        })
        .await
    }

    #[tool(
        name = "append_rows",
        description = "Append rows after the last occupied row of a sheet"
    )]
    pub async fn append_rows(
        &self,
        Parameters(params): Parameters<tools::AppendRowsParams>,
    ) -> Result<Json<OperationResponse>, McpError> {
        self.dispatch("append_rows", |state| tools::append_rows(state, params))
            .await
    }

    #[tool(name = "update_cell", description = "Update a single cell value")]
    pub async fn update_cell(
        &self,
        Parameters(params): Parameters<tools::UpdateCellParams>,
    ) -> Result<Json<OperationResponse>, McpError> {
        self.dispatch("update_cell", |state| tools::update_cell(state, params))
            .await
    }

    #[tool(
        name = "set_formula",
        description = "Set a formula on a cell (leading '=' optional)"
    )]
    pub async fn set_formula(
        &self,
        Parameters(params): Parameters<tools::SetFormulaParams>,
    ) -> Result<Json<OperationResponse>, McpError> {
        self.dispatch("set_formula", |state| tools::set_formula(state, params))
            .await
    }

    #[tool(
        name = "find_and_replace",
        description = "Find and replace text across a sheet or range"
    )]
    pub async fn find_and_replace(
        &self,
        Parameters(params): Parameters<tools::FindReplaceParams>,
    ) -> Result<Json<OperationResponse>, McpError> {
        self.dispatch("find_and_replace", |state| {
            tools::find_and_replace(state, params)
        })
        .await
    }

    #[tool(
        name = "sort_range",
        description = "Sort a range in place by one or more key columns"
    )]
    pub async fn sort_range(
        &self,
        Parameters(params): Parameters<tools::SortRangeParams>,
    ) -> Result<Json<OperationResponse>, McpError> {
        self.dispatch("sort_range", |state| tools::sort_range(state, params))
            .await
    }

    #[tool(
        name = "filter_data",
        description = "Extract records from a range or table matching column predicates"
    )]
    pub async fn filter_data(
        &self,
        Parameters(params): Parameters<tools::FilterDataParams>,
    ) -> Result<Json<FilterDataResponse>, McpError> {
        self.dispatch("filter_data", |state| tools::filter_data(state, params))
            .await
    }

    #[tool(
        name = "apply_style",
        description = "Apply font/fill/border/alignment styling across a range"
    )]
    pub async fn apply_style(
        &self,
        Parameters(params): Parameters<tools::ApplyStyleParams>,
    ) -> Result<Json<OperationResponse>, McpError> {
        self.dispatch("apply_style", |state| tools::apply_style(state, params))
            .await
    }

    #[tool(
        name = "apply_number_format",
        description = "Apply a number format code across a range"
    )]
    pub async fn apply_number_format(
        &self,
        Parameters(params): Parameters<tools::ApplyNumberFormatParams>,
    ) -> Result<Json<OperationResponse>, McpError> {
        self.dispatch("apply_number_format", |state| {
            tools::apply_number_format(state, params)
        })
        .await
    }

    #[tool(
        name = "autofit_columns",
        description = "Size columns to their content width"
    )]
    pub async fn autofit_columns(
        &self,
        Parameters(params): Parameters<tools::AutofitColumnsParams>,
    ) -> Result<Json<OperationResponse>, McpError> {
        self.dispatch("autofit_columns", |state| {
            tools::autofit_columns(state, params)
        })
        .await
    }

    #[tool(name = "set_column_width", description = "Set explicit column widths")]
    pub async fn set_column_width(
        &self,
        Parameters(params): Parameters<tools::SetColumnWidthParams>,
    ) -> Result<Json<OperationResponse>, McpError> {
        self.dispatch("set_column_width", |state| {
            tools::set_column_width(state, params)
        })
        .await
    }

    #[tool(
        name = "add_data_validation",
        description = "Add a data validation rule (list/whole/decimal/date/custom) to a range"
    )]
    pub async fn add_data_validation(
        &self,
        Parameters(params): Parameters<tools::AddDataValidationParams>,
    ) -> Result<Json<OperationResponse>, McpError> {
        self.dispatch("add_data_validation", |state| {
            tools::add_data_validation(state, params)
        })
        .await
    }

    #[tool(
        name = "remove_data_validation",
        description = "Remove data validation rules from a range"
    )]
    pub async fn remove_data_validation(
        &self,
        Parameters(params): Parameters<tools::RemoveDataValidationParams>,
    ) -> Result<Json<OperationResponse>, McpError> {
        self.dispatch("remove_data_validation", |state| {
            tools::remove_data_validation(state, params)
        })
        .await
    }

    #[tool(
        name = "add_conditional_formatting",
        description = "Add a cell-is or expression conditional formatting rule to a range"
    )]
    pub async fn add_conditional_formatting(
        &self,
        Parameters(params): Parameters<tools::AddConditionalFormattingParams>,
    ) -> Result<Json<OperationResponse>, McpError> {
        self.dispatch("add_conditional_formatting", |state| {
            tools::add_conditional_formatting(state, params)
        })
        .await
    }

    #[tool(
        name = "clear_conditional_formatting",
        description = "Clear conditional formatting rules from a sheet or range"
    )]
    pub async fn clear_conditional_formatting(
        &self,
        Parameters(params): Parameters<tools::ClearConditionalFormattingParams>,
    ) -> Result<Json<OperationResponse>, McpError> {
        self.dispatch("clear_conditional_formatting", |state| {
            tools::clear_conditional_formatting(state, params)
        })
        .await
    }

    #[tool(
        name = "set_auto_filter",
        description = "Set the auto-filter region for a sheet"
    )]
    pub async fn set_auto_filter(
        &self,
        Parameters(params): Parameters<tools::SetAutoFilterParams>,
    ) -> Result<Json<OperationResponse>, McpError> {
        self.dispatch("set_auto_filter", |state| {
            tools::set_auto_filter(state, params)
        })
        .await
    }

    #[tool(
        name = "set_page_setup",
        description = "Configure page orientation, paper size, and margins"
    )]
    pub async fn set_page_setup(
        &self,
        Parameters(params): Parameters<tools::SetPageSetupParams>,
    ) -> Result<Json<OperationResponse>, McpError> {
        self.dispatch("set_page_setup", |state| {
            tools::set_page_setup(state, params)
        })
        .await
    }

    #[tool(
        name = "add_table",
        description = "Register a range as a native table with headers"
    )]
    pub async fn add_table(
        &self,
        Parameters(params): Parameters<tools::AddTableParams>,
    ) -> Result<Json<OperationResponse>, McpError> {
        self.dispatch("add_table", |state| tools::add_table(state, params))
            .await
    }

    #[tool(name = "remove_table", description = "Remove a table definition")]
    pub async fn remove_table(
        &self,
        Parameters(params): Parameters<tools::RemoveTableParams>,
    ) -> Result<Json<OperationResponse>, McpError> {
        self.dispatch("remove_table", |state| tools::remove_table(state, params))
            .await
    }

    #[tool(
        name = "refresh_table",
        description = "Re-range a table over its current data extent"
    )]
    pub async fn refresh_table(
        &self,
        Parameters(params): Parameters<tools::RefreshTableParams>,
    ) -> Result<Json<OperationResponse>, McpError> {
        self.dispatch("refresh_table", |state| tools::refresh_table(state, params))
            .await
    }

    #[tool(name = "list_tables", description = "List tables on a sheet")]
    pub async fn list_tables(
        &self,
        Parameters(params): Parameters<tools::ListTablesParams>,
    ) -> Result<Json<TableListResponse>, McpError> {
        self.dispatch("list_tables", |state| tools::list_tables(state, params))
            .await
    }

    #[tool(
        name = "get_table_data",
        description = "Read a table's rows as records keyed by header"
    )]
    pub async fn get_table_data(
        &self,
        Parameters(params): Parameters<tools::GetTableDataParams>,
    ) -> Result<Json<TableDataResponse>, McpError> {
        self.dispatch("get_table_data", |state| {
            tools::get_table_data(state, params)
        })
        .await
    }

    #[tool(
        name = "create_formatted_table",
        description = "One step: write data, register it as a table, and apply column formats"
    )]
    pub async fn create_formatted_table(
        &self,
        Parameters(params): Parameters<tools::CreateFormattedTableParams>,
    ) -> Result<Json<OperationResponse>, McpError> {
        self.dispatch("create_formatted_table", |state| {
            tools::create_formatted_table(state, params)
        })
        .await
    }

    #[tool(
        name = "add_chart",
        description = "Insert a chart (column/bar/line/pie/doughnut/area/scatter/radar/bubble) over a data range"
    )]
    pub async fn add_chart(
        &self,
        Parameters(params): Parameters<tools::AddChartParams>,
    ) -> Result<Json<AddChartResponse>, McpError> {
        self.dispatch("add_chart", |state| tools::add_chart(state, params))
            .await
    }

    #[tool(
        name = "create_chart_from_data",
        description = "One step: write data to a sheet and chart it"
    )]
    pub async fn create_chart_from_data(
        &self,
        Parameters(params): Parameters<tools::CreateChartFromDataParams>,
    ) -> Result<Json<AddChartResponse>, McpError> {
        self.dispatch("create_chart_from_data", |state| {
            tools::create_chart_from_data(state, params)
        })
        .await
    }

    #[tool(
        name = "add_pivot_table",
        description = "Aggregate a source range by row/column fields and write the cross-tab at a target anchor"
    )]
    pub async fn add_pivot_table(
        &self,
        Parameters(params): Parameters<tools::AddPivotTableParams>,
    ) -> Result<Json<PivotTableResponse>, McpError> {
        self.dispatch("add_pivot_table", |state| {
            tools::add_pivot_table(state, params)
        })
        .await
    }

    #[tool(
        name = "import_data",
        description = "Import CSV or JSON sources into workbook sheets"
    )]
    pub async fn import_data(
        &self,
        Parameters(params): Parameters<tools::ImportDataParams>,
    ) -> Result<Json<ImportDataResponse>, McpError> {
        self.dispatch("import_data", |state| tools::import_data(state, params))
            .await
    }

    #[tool(
        name = "export_data",
        description = "Export sheets to CSV or JSON files"
    )]
    pub async fn export_data(
        &self,
        Parameters(params): Parameters<tools::ExportDataParams>,
    ) -> Result<Json<ExportDataResponse>, McpError> {
        self.dispatch("export_data", |state| tools::export_data(state, params))
            .await
    }

    #[tool(
        name = "export_pdf",
        description = "Export a workbook to PDF through the LibreOffice bridge"
    )]
    pub async fn export_pdf(
        &self,
        Parameters(params): Parameters<tools::ExportPdfParams>,
    ) -> Result<Json<ExportPdfResponse>, McpError> {
        self.dispatch("export_pdf", |state| tools::export_pdf(state, params))
            .await
    }

    #[tool(
        name = "vba_project_summary",
        description = "Summarize the VBA project embedded in a workbook"
    )]
    pub async fn vba_project_summary(
        &self,
        Parameters(params): Parameters<tools::VbaProjectSummaryParams>,
    ) -> Result<Json<VbaProjectSummaryResponse>, McpError> {
        self.dispatch("vba_project_summary", |state| {
            tools::vba_project_summary(state, params)
        })
        .await
    }

    #[tool(
        name = "vba_module_source",
        description = "Read the source of one VBA module, paged by line"
    )]
    pub async fn vba_module_source(
        &self,
        Parameters(params): Parameters<tools::VbaModuleSourceParams>,
    ) -> Result<Json<VbaModuleSourceResponse>, McpError> {
        self.dispatch("vba_module_source", |state| {
            tools::vba_module_source(state, params)
        })
        .await
    }

    #[tool(
        name = "add_vba_project",
        description = "Inject a vbaProject.bin payload and save as a macro-enabled workbook"
    )]
    pub async fn add_vba_project(
        &self,
        Parameters(params): Parameters<tools::AddVbaProjectParams>,
    ) -> Result<Json<OperationResponse>, McpError> {
        self.dispatch("add_vba_project", |state| {
            tools::add_vba_project(state, params)
        })
        .await
    }
}

#[tool_handler(router = self.tool_router)]
impl ServerHandler for WorkbookServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(INSTRUCTIONS.to_string()),
            ..ServerInfo::default()
        }
    }
}
