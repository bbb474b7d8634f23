//! Workbook file access helpers shared by every adapter.
//!
//! Adapters never hold workbooks across calls: each one resolves a path,
//! reads the file, applies its single logical edit, and saves. These helpers
//! keep that sequence uniform and keep every resolved path inside the
//! configured workspace root.

use crate::config::ServerConfig;
use crate::error::WorkbookError;
use crate::model::{CellValue, WorkbookDescriptor, WorkbookId};
use crate::tools::filters::WorkbookFilter;
use crate::utils::{
    hash_path_metadata, make_short_workbook_id, path_to_forward_slashes, system_time_to_datetime,
};
use anyhow::{Context, Result, anyhow};
use std::fs;
use std::path::{Component, Path, PathBuf};
use umya_spreadsheet::{Spreadsheet, Worksheet};
use walkdir::WalkDir;

/// Resolve a user-supplied path against the workspace root, rejecting
/// anything that would land outside it.
pub fn resolve_workspace_path(config: &ServerConfig, file_path: &str) -> Result<PathBuf> {
    let candidate = PathBuf::from(file_path);

    let resolved = if candidate.is_absolute() {
        candidate
    } else {
        if candidate
            .components()
            .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(WorkbookError::PathOutsideWorkspace(file_path.to_string()).into());
        }
        config.workspace_root.join(candidate)
    };

    let root = config
        .workspace_root
        .canonicalize()
        .unwrap_or_else(|_| config.workspace_root.clone());
    // The file itself may not exist yet (create_workbook); check its parent.
    let check = if resolved.exists() {
        resolved.canonicalize().ok()
    } else {
        resolved
            .parent()
            .and_then(|p| p.canonicalize().ok())
            .map(|p| p.join(resolved.file_name().unwrap_or_default()))
    };

    if let Some(checked) = check
        && !checked.starts_with(&root)
    {
        return Err(WorkbookError::PathOutsideWorkspace(file_path.to_string()).into());
    }

    Ok(resolved)
}

/// Resolve a path that must already exist as a workbook file.
pub fn resolve_existing_workbook(config: &ServerConfig, file_path: &str) -> Result<PathBuf> {
    let path = resolve_workspace_path(config, file_path)?;
    if !path.is_file() {
        return Err(WorkbookError::WorkbookNotFound(file_path.to_string()).into());
    }
    Ok(path)
}

pub fn load_workbook(path: &Path) -> Result<Spreadsheet> {
    umya_spreadsheet::reader::xlsx::read(path)
        .with_context(|| format!("failed to parse workbook {:?}", path))
}

pub fn save_workbook(book: &Spreadsheet, path: &Path) -> Result<()> {
    umya_spreadsheet::writer::xlsx::write(book, path)
        .with_context(|| format!("failed to save workbook {:?}", path))
}

/// Create a fresh workbook file with the default "Sheet1".
pub fn create_workbook_file(path: &Path, overwrite: bool) -> Result<()> {
    if path.exists() && !overwrite {
        return Err(WorkbookError::OverwriteRefused(path.display().to_string()).into());
    }
    if let Some(parent) = path.parent()
        && !parent.exists()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create parent directory for {:?}", path))?;
    }
    let book = umya_spreadsheet::new_file();
    save_workbook(&book, path)
}

pub fn sheet<'a>(book: &'a Spreadsheet, name: &str) -> Result<&'a Worksheet> {
    book.get_sheet_by_name(name)
        .ok_or_else(|| WorkbookError::SheetNotFound(name.to_string()).into())
}

pub fn sheet_mut<'a>(book: &'a mut Spreadsheet, name: &str) -> Result<&'a mut Worksheet> {
    book.get_sheet_by_name_mut(name)
        .ok_or_else(|| WorkbookError::SheetNotFound(name.to_string()).into())
}

/// Interpret a raw cell string the way spreadsheet UIs do: numbers and
/// booleans become typed values, everything else stays text.
pub fn cell_to_value(raw: &str) -> Option<CellValue> {
    if raw.is_empty() {
        return None;
    }
    if let Ok(number) = raw.parse::<f64>() {
        return Some(CellValue::Number(number));
    }
    let lower = raw.to_ascii_lowercase();
    if lower == "true" {
        return Some(CellValue::Bool(true));
    }
    if lower == "false" {
        return Some(CellValue::Bool(false));
    }
    Some(CellValue::Text(raw.to_string()))
}

/// Write one JSON value into a cell. Strings with a leading '=' are applied
/// as formulas (the '=' is stripped; umya stores bare formula text).
pub fn write_cell_value(
    sheet: &mut Worksheet,
    coordinate: (u32, u32),
    value: &serde_json::Value,
) -> bool {
    let cell = sheet.get_cell_mut(coordinate);
    match value {
        serde_json::Value::Null => {
            cell.set_value("");
            false
        }
        serde_json::Value::Bool(b) => {
            cell.set_value_bool(*b);
            false
        }
        serde_json::Value::Number(n) => {
            cell.set_value_number(n.as_f64().unwrap_or(0.0));
            false
        }
        serde_json::Value::String(s) => {
            if let Some(formula) = s.strip_prefix('=') {
                cell.set_formula(formula.to_string());
                true
            } else {
                cell.set_value(s.clone());
                false
            }
        }
        other => {
            cell.set_value(other.to_string());
            false
        }
    }
}

/// Descriptor for a single workbook file on disk.
pub fn describe_file(config: &ServerConfig, path: &Path) -> Result<WorkbookDescriptor> {
    let metadata =
        fs::metadata(path).with_context(|| format!("unable to read metadata for {:?}", path))?;
    let id = WorkbookId(hash_path_metadata(path, &metadata));
    let slug = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "workbook".to_string());
    let folder = derive_folder(config, path);
    let short_id = make_short_workbook_id(id.as_str());
    let relative = path.strip_prefix(&config.workspace_root).unwrap_or(path);

    Ok(WorkbookDescriptor {
        workbook_id: id,
        short_id,
        slug,
        folder,
        path: path_to_forward_slashes(relative),
        bytes: metadata.len(),
        last_modified: metadata
            .modified()
            .ok()
            .and_then(system_time_to_datetime)
            .map(|dt| dt.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)),
    })
}

/// Scan the workspace for workbook files matching the filter.
pub fn build_workbook_list(
    config: &ServerConfig,
    filter: &WorkbookFilter,
) -> Result<Vec<WorkbookDescriptor>> {
    let mut descriptors = Vec::new();

    for entry in WalkDir::new(&config.workspace_root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if !config.has_supported_extension(path) {
            continue;
        }
        let descriptor = describe_file(config, path)?;
        if !filter.matches(&descriptor.slug, descriptor.folder.as_deref(), path) {
            continue;
        }
        descriptors.push(descriptor);
    }

    descriptors.sort_by(|a, b| a.slug.cmp(&b.slug));
    Ok(descriptors)
}

fn derive_folder(config: &ServerConfig, path: &Path) -> Option<String> {
    path.strip_prefix(&config.workspace_root)
        .ok()
        .and_then(|relative| relative.parent())
        .and_then(|parent| parent.file_name())
        .map(|os| os.to_string_lossy().to_string())
}

/// Last occupied row index (1-based), 0 for an empty sheet.
pub fn last_occupied_row(sheet: &Worksheet) -> u32 {
    let (_, max_row) = sheet.get_highest_column_and_row();
    max_row
}

/// Locate a named table and the sheet carrying it.
pub fn find_table<'a>(
    book: &'a Spreadsheet,
    sheet_name: &str,
    table_name: &str,
) -> Result<&'a umya_spreadsheet::Table> {
    let ws = sheet(book, sheet_name)?;
    ws.get_tables()
        .iter()
        .find(|t| {
            t.get_name().eq_ignore_ascii_case(table_name)
                || t.get_display_name().eq_ignore_ascii_case(table_name)
        })
        .ok_or_else(|| anyhow!(WorkbookError::TableNotFound(table_name.to_string())))
}
