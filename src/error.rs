//! Error classification for the workbook MCP server.
//!
//! Adapter internals use `anyhow` with typed kinds underneath; exactly one
//! boundary function (`to_mcp_error`) turns any failure into an MCP error
//! with a JSON-RPC style code, so nothing else in the tree needs to care
//! about wire representation.

use crate::range::RangeError;
use rmcp::ErrorData;
use thiserror::Error;

/// JSON-RPC standard codes plus custom application codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorCode {
    InvalidRequest = -32600,
    InvalidParams = -32602,
    InternalError = -32603,

    WorkbookNotFound = -32001,
    SheetNotFound = -32002,
    InvalidRange = -32003,
    TableNotFound = -32004,
    ChartError = -32005,
    PivotError = -32006,
    ValidationRuleError = -32007,
    BridgeUnavailable = -32008,
    OverwriteRefused = -32009,
    PathOutsideWorkspace = -32010,
    VbaError = -32011,
    IoError = -32012,
    ToolDisabled = -32013,
}

impl ErrorCode {
    pub fn code(&self) -> i32 {
        *self as i32
    }

    pub fn category(&self) -> &'static str {
        match self {
            ErrorCode::InvalidRequest | ErrorCode::InvalidParams => "client_error",
            ErrorCode::InternalError => "server_error",
            ErrorCode::WorkbookNotFound
            | ErrorCode::SheetNotFound
            | ErrorCode::TableNotFound => "resource_not_found",
            ErrorCode::InvalidRange | ErrorCode::ValidationRuleError => "validation_error",
            ErrorCode::ChartError | ErrorCode::PivotError | ErrorCode::VbaError => {
                "subsystem_error"
            }
            ErrorCode::BridgeUnavailable => "bridge_error",
            ErrorCode::OverwriteRefused | ErrorCode::PathOutsideWorkspace => "refused",
            ErrorCode::IoError => "io_error",
            ErrorCode::ToolDisabled => "not_found",
        }
    }
}

/// Typed failures raised inside adapters.
#[derive(Debug, Error)]
pub enum WorkbookError {
    #[error("workbook not found: {0}")]
    WorkbookNotFound(String),
    #[error("sheet '{0}' not found")]
    SheetNotFound(String),
    #[error("table '{0}' not found")]
    TableNotFound(String),
    #[error(transparent)]
    Range(#[from] RangeError),
    #[error("chart error: {0}")]
    Chart(String),
    #[error("pivot table error: {0}")]
    Pivot(String),
    #[error("data validation error: {0}")]
    ValidationRule(String),
    #[error("automation bridge unavailable: {0}")]
    BridgeUnavailable(String),
    #[error("refusing to overwrite existing file {0} (pass overwrite=true)")]
    OverwriteRefused(String),
    #[error("path {0} escapes the workspace root")]
    PathOutsideWorkspace(String),
    #[error("vba project error: {0}")]
    Vba(String),
}

impl WorkbookError {
    pub fn code(&self) -> ErrorCode {
        match self {
            WorkbookError::WorkbookNotFound(_) => ErrorCode::WorkbookNotFound,
            WorkbookError::SheetNotFound(_) => ErrorCode::SheetNotFound,
            WorkbookError::TableNotFound(_) => ErrorCode::TableNotFound,
            WorkbookError::Range(_) => ErrorCode::InvalidRange,
            WorkbookError::Chart(_) => ErrorCode::ChartError,
            WorkbookError::Pivot(_) => ErrorCode::PivotError,
            WorkbookError::ValidationRule(_) => ErrorCode::ValidationRuleError,
            WorkbookError::BridgeUnavailable(_) => ErrorCode::BridgeUnavailable,
            WorkbookError::OverwriteRefused(_) => ErrorCode::OverwriteRefused,
            WorkbookError::PathOutsideWorkspace(_) => ErrorCode::PathOutsideWorkspace,
            WorkbookError::Vba(_) => ErrorCode::VbaError,
        }
    }
}

#[derive(Debug, Error)]
#[error("tool '{tool_name}' is disabled by server configuration")]
pub struct ToolDisabledError {
    pub tool_name: String,
}

impl ToolDisabledError {
    pub fn new(tool_name: &str) -> Self {
        Self {
            tool_name: tool_name.to_ascii_lowercase(),
        }
    }
}

/// Classify an adapter failure for metrics and the wire.
pub fn classify(error: &anyhow::Error) -> ErrorCode {
    if error.downcast_ref::<ToolDisabledError>().is_some() {
        return ErrorCode::ToolDisabled;
    }
    if let Some(err) = error.downcast_ref::<WorkbookError>() {
        return err.code();
    }
    if error.downcast_ref::<RangeError>().is_some() {
        return ErrorCode::InvalidRange;
    }
    if error.downcast_ref::<std::io::Error>().is_some() {
        return ErrorCode::IoError;
    }
    ErrorCode::InternalError
}

/// Boundary mapping: no exception crosses an adapter; everything becomes a
/// tagged MCP error here.
pub fn to_mcp_error(error: anyhow::Error) -> ErrorData {
    let code = classify(&error);
    crate::metrics::METRICS.record_error("adapter", code.category());
    match code {
        ErrorCode::ToolDisabled | ErrorCode::InvalidRequest => {
            ErrorData::invalid_request(error.to_string(), None)
        }
        ErrorCode::InvalidParams
        | ErrorCode::InvalidRange
        | ErrorCode::ValidationRuleError
        | ErrorCode::OverwriteRefused
        | ErrorCode::PathOutsideWorkspace => ErrorData::invalid_params(error.to_string(), None),
        _ => ErrorData::internal_error(error.to_string(), None),
    }
}
