//! Workbook lifecycle and sheet management adapters.

use crate::error::WorkbookError;
use crate::model::{
    OperationResponse, SheetInfo, SheetListResponse, WorkbookDescription, WorkbookListResponse,
};
use crate::state::AppState;
use crate::tools::filters::WorkbookFilter;
use crate::utils::path_to_forward_slashes;
use crate::workbook::{self, describe_file, load_workbook, save_workbook};
use anyhow::{Result, anyhow};
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use tokio::task;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListWorkbooksParams {
    pub slug_prefix: Option<String>,
    pub folder: Option<String>,
    pub path_glob: Option<String>,
}

pub async fn list_workbooks(
    state: Arc<AppState>,
    params: ListWorkbooksParams,
) -> Result<WorkbookListResponse> {
    let filter = WorkbookFilter::new(params.slug_prefix, params.folder, params.path_glob)?;
    let config = state.config();
    let workbooks =
        task::spawn_blocking(move || workbook::build_workbook_list(&config, &filter)).await??;
    Ok(WorkbookListResponse { workbooks })
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateWorkbookParams {
    pub file_path: String,
    #[serde(default)]
    pub overwrite: bool,
}

pub async fn create_workbook(
    state: Arc<AppState>,
    params: CreateWorkbookParams,
) -> Result<OperationResponse> {
    let path = state.resolve_target(&params.file_path)?;
    let overwrite = params.overwrite && state.config().allow_overwrite;
    if params.overwrite && !state.config().allow_overwrite {
        tracing::warn!("overwrite requested but the server runs without --allow-overwrite");
    }

    let created = path.clone();
    task::spawn_blocking(move || workbook::create_workbook_file(&created, overwrite)).await??;

    Ok(OperationResponse::ok(
        params.file_path,
        format!("created workbook {}", path_to_forward_slashes(&path)),
    ))
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DescribeWorkbookParams {
    pub file_path: String,
}

pub async fn describe_workbook(
    state: Arc<AppState>,
    params: DescribeWorkbookParams,
) -> Result<WorkbookDescription> {
    let path = state.resolve_existing(&params.file_path)?;
    let config = state.config();
    let file_path = params.file_path.clone();

    task::spawn_blocking(move || -> Result<WorkbookDescription> {
        let descriptor = describe_file(&config, &path)?;
        let book = load_workbook(&path)?;
        let sheet_names: Vec<String> = book
            .get_sheet_collection()
            .iter()
            .map(|sheet| sheet.get_name().to_string())
            .collect();
        let tables: usize = book
            .get_sheet_collection()
            .iter()
            .map(|sheet| sheet.get_tables().len())
            .sum();
        let macros_present = crate::tools::vba::has_vba_project(&path)?;

        Ok(WorkbookDescription {
            success: true,
            file_path,
            workbook_id: descriptor.workbook_id,
            bytes: descriptor.bytes,
            sheet_count: sheet_names.len(),
            sheet_names,
            defined_names: book.get_defined_names().len(),
            tables,
            macros_present,
            last_modified: descriptor.last_modified,
            message: "workbook metadata read".to_string(),
        })
    })
    .await?
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListSheetsParams {
    pub file_path: String,
}

pub async fn list_sheets(
    state: Arc<AppState>,
    params: ListSheetsParams,
) -> Result<SheetListResponse> {
    let path = state.resolve_existing(&params.file_path)?;
    let file_path = params.file_path.clone();

    task::spawn_blocking(move || -> Result<SheetListResponse> {
        let book = load_workbook(&path)?;
        let sheets: Vec<SheetInfo> = book
            .get_sheet_collection()
            .iter()
            .enumerate()
            .map(|(index, sheet)| SheetInfo {
                name: sheet.get_name().to_string(),
                index,
                visible: sheet.get_sheet_state() != "hidden",
            })
            .collect();
        let message = format!("{} sheet(s)", sheets.len());
        Ok(SheetListResponse {
            success: true,
            file_path,
            sheets,
            message,
        })
    })
    .await?
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AddSheetParams {
    pub file_path: String,
    pub sheet_name: String,
    /// Insertion index; omitted appends after the existing sheets.
    pub position: Option<u32>,
}

pub async fn add_sheet(state: Arc<AppState>, params: AddSheetParams) -> Result<OperationResponse> {
    let path = state.resolve_existing(&params.file_path)?;
    let sheet_name = params.sheet_name.clone();
    let position = params.position;

    task::spawn_blocking(move || -> Result<()> {
        let mut book = load_workbook(&path)?;
        book.new_sheet(&sheet_name)
            .map_err(|e| anyhow!("cannot add sheet '{}': {}", sheet_name, e))?;
        if let Some(index) = position {
            let sheets = book.get_sheet_collection_mut();
            let added = sheets.remove(sheets.len() - 1);
            let index = (index as usize).min(sheets.len());
            sheets.insert(index, added);
        }
        save_workbook(&book, &path)
    })
    .await??;

    Ok(OperationResponse::ok(
        params.file_path,
        format!("added sheet '{}'", params.sheet_name),
    )
    .with_sheet(params.sheet_name))
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DeleteSheetParams {
    pub file_path: String,
    pub sheet_name: String,
}

pub async fn delete_sheet(
    state: Arc<AppState>,
    params: DeleteSheetParams,
) -> Result<OperationResponse> {
    let path = state.resolve_existing(&params.file_path)?;
    let sheet_name = params.sheet_name.clone();

    task::spawn_blocking(move || -> Result<()> {
        let mut book = load_workbook(&path)?;
        if book.get_sheet_by_name(&sheet_name).is_none() {
            return Err(WorkbookError::SheetNotFound(sheet_name.clone()).into());
        }
        if book.get_sheet_collection().len() == 1 {
            return Err(anyhow!("cannot delete the only sheet in the workbook"));
        }
        book.remove_sheet_by_name(&sheet_name)
            .map_err(|e| anyhow!("cannot delete sheet '{}': {}", sheet_name, e))?;
        save_workbook(&book, &path)
    })
    .await??;

    Ok(OperationResponse::ok(
        params.file_path,
        format!("deleted sheet '{}'", params.sheet_name),
    )
    .with_sheet(params.sheet_name))
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RenameSheetParams {
    pub file_path: String,
    pub old_name: String,
    pub new_name: String,
}

pub async fn rename_sheet(
    state: Arc<AppState>,
    params: RenameSheetParams,
) -> Result<OperationResponse> {
    let path = state.resolve_existing(&params.file_path)?;
    let old_name = params.old_name.clone();
    let new_name = params.new_name.clone();

    task::spawn_blocking(move || -> Result<()> {
        let mut book = load_workbook(&path)?;
        if book.get_sheet_by_name(&new_name).is_some() {
            return Err(anyhow!("a sheet named '{}' already exists", new_name));
        }
        let sheet = book
            .get_sheet_by_name_mut(&old_name)
            .ok_or_else(|| WorkbookError::SheetNotFound(old_name.clone()))?;
        sheet.set_name(new_name.clone());
        save_workbook(&book, &path)
    })
    .await??;

    Ok(OperationResponse::ok(
        params.file_path,
        format!("renamed sheet '{}' to '{}'", params.old_name, params.new_name),
    )
    .with_sheet(params.new_name))
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CopySheetParams {
    pub file_path: String,
    pub source_sheet: String,
    pub new_name: String,
}

pub async fn copy_sheet(
    state: Arc<AppState>,
    params: CopySheetParams,
) -> Result<OperationResponse> {
    let path = state.resolve_existing(&params.file_path)?;
    let source = params.source_sheet.clone();
    let new_name = params.new_name.clone();

    task::spawn_blocking(move || -> Result<()> {
        let mut book = load_workbook(&path)?;
        if book.get_sheet_by_name(&new_name).is_some() {
            return Err(anyhow!("a sheet named '{}' already exists", new_name));
        }
        let mut cloned = book
            .get_sheet_by_name(&source)
            .ok_or_else(|| WorkbookError::SheetNotFound(source.clone()))?
            .clone();
        cloned.set_name(new_name.clone());
        book.add_sheet(cloned)
            .map_err(|e| anyhow!("cannot add copied sheet '{}': {}", new_name, e))?;
        save_workbook(&book, &path)
    })
    .await??;

    Ok(OperationResponse::ok(
        params.file_path,
        format!(
            "copied sheet '{}' to '{}'",
            params.source_sheet, params.new_name
        ),
    )
    .with_sheet(params.new_name))
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SaveWorkbookAsParams {
    pub file_path: String,
    pub target_path: String,
    #[serde(default)]
    pub overwrite: bool,
}

pub async fn save_workbook_as(
    state: Arc<AppState>,
    params: SaveWorkbookAsParams,
) -> Result<OperationResponse> {
    let source = state.resolve_existing(&params.file_path)?;
    let target = state.resolve_target(&params.target_path)?;

    if target.exists() && !(params.overwrite && state.config().allow_overwrite) {
        return Err(WorkbookError::OverwriteRefused(target.display().to_string()).into());
    }

    let target_clone = target.clone();
    task::spawn_blocking(move || -> Result<()> {
        if let Some(parent) = target_clone.parent()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(&source, &target_clone)?;
        Ok(())
    })
    .await??;

    Ok(OperationResponse::ok(
        params.file_path,
        format!("saved copy to {}", path_to_forward_slashes(&target)),
    )
    .with_target(params.target_path))
}
