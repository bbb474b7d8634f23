//! VBA project adapters: read a workbook's `xl/vbaProject.bin` through the
//! OPC container, and inject an existing project payload to produce a
//! macro-enabled workbook.

use crate::error::WorkbookError;
use crate::model::{
    OperationResponse, VbaModuleDescriptor, VbaModuleSourceResponse, VbaProjectSummaryResponse,
};
use crate::state::AppState;
use crate::utils::path_to_forward_slashes;
use anyhow::{Context, Result, anyhow, bail};
use base64::Engine;
use schemars::JsonSchema;
use serde::Deserialize;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;
use tokio::task;
use zip::result::ZipError;

const MAX_VBA_PROJECT_BYTES: u64 = 20 * 1024 * 1024;
const DEFAULT_MAX_MODULES: u32 = 200;

const DEFAULT_OFFSET_LINES: u32 = 0;
const DEFAULT_LIMIT_LINES: u32 = 200;
const MAX_LIMIT_LINES: u32 = 5_000;

const VBA_PART_NAME: &str = "xl/vbaProject.bin";
const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
const WORKBOOK_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml";
const MACRO_WORKBOOK_CONTENT_TYPE: &str = "application/vnd.ms-excel.sheet.macroEnabled.main+xml";
const VBA_DEFAULT_DECL: &str =
    "<Default Extension=\"bin\" ContentType=\"application/vnd.ms-office.vbaProject\"/>";

#[derive(Debug, Deserialize, JsonSchema)]
pub struct VbaProjectSummaryParams {
    pub file_path: String,
    #[serde(default)]
    pub max_modules: Option<u32>,
    #[serde(default)]
    pub include_references: Option<bool>,
}

pub async fn vba_project_summary(
    state: Arc<AppState>,
    params: VbaProjectSummaryParams,
) -> Result<VbaProjectSummaryResponse> {
    let path = state.resolve_existing(&params.file_path)?;
    let file_path = params.file_path.clone();
    let max_modules = params.max_modules.unwrap_or(DEFAULT_MAX_MODULES).max(1);
    let include_references = params.include_references.unwrap_or(true);

    task::spawn_blocking(move || -> Result<VbaProjectSummaryResponse> {
        let raw = extract_vba_project_bin(&path)?;

        let Some(raw) = raw else {
            return Ok(VbaProjectSummaryResponse {
                success: true,
                file_path,
                has_vba: false,
                code_page: None,
                modules: Vec::new(),
                modules_truncated: false,
                references: Vec::new(),
                message: "no xl/vbaProject.bin found in workbook".to_string(),
            });
        };

        let project = ovba::open_project(raw).map_err(|e| {
            anyhow!(WorkbookError::Vba(format!("failed to parse VBA project: {e}")))
        })?;

        let mut modules: Vec<VbaModuleDescriptor> = Vec::new();
        for module in project.modules.iter().take(max_modules as usize) {
            let module_type = match module.module_type {
                ovba::ModuleType::Procedural => "procedural",
                ovba::ModuleType::DocClsDesigner => "doc_cls_designer",
            }
            .to_string();

            modules.push(VbaModuleDescriptor {
                name: module.name.clone(),
                stream_name: module.stream_name.clone(),
                module_type,
                read_only: module.read_only,
                private: module.private,
            });
        }
        let modules_truncated = project.modules.len() > max_modules as usize;

        let references: Vec<String> = if include_references {
            project
                .references
                .iter()
                .take(200)
                .map(|reference| {
                    match reference {
                        ovba::Reference::Control(_) => "control",
                        ovba::Reference::Original(_) => "original",
                        ovba::Reference::Registered(_) => "registered",
                        ovba::Reference::Project(_) => "project",
                    }
                    .to_string()
                })
                .collect()
        } else {
            Vec::new()
        };

        let message = format!("{} module(s)", modules.len());
        Ok(VbaProjectSummaryResponse {
            success: true,
            file_path,
            has_vba: true,
            code_page: Some(project.information.code_page),
            modules,
            modules_truncated,
            references,
            message,
        })
    })
    .await?
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct VbaModuleSourceParams {
    pub file_path: String,
    pub module_name: String,
    #[serde(default = "default_offset_lines")]
    pub offset_lines: u32,
    #[serde(default = "default_limit_lines")]
    pub limit_lines: u32,
}

fn default_offset_lines() -> u32 {
    DEFAULT_OFFSET_LINES
}

fn default_limit_lines() -> u32 {
    DEFAULT_LIMIT_LINES
}

pub async fn vba_module_source(
    state: Arc<AppState>,
    params: VbaModuleSourceParams,
) -> Result<VbaModuleSourceResponse> {
    let path = state.resolve_existing(&params.file_path)?;
    let file_path = params.file_path.clone();
    let module_name = params.module_name.clone();
    let offset = params.offset_lines;
    let limit = params.limit_lines.clamp(1, MAX_LIMIT_LINES);

    task::spawn_blocking(move || -> Result<VbaModuleSourceResponse> {
        let raw = extract_vba_project_bin(&path)?.ok_or_else(|| {
            anyhow!(WorkbookError::Vba(
                "no xl/vbaProject.bin found in workbook".to_string()
            ))
        })?;

        let project = ovba::open_project(raw).map_err(|e| {
            anyhow!(WorkbookError::Vba(format!("failed to parse VBA project: {e}")))
        })?;
        let source = project.module_source(&module_name).map_err(|e| {
            anyhow!(WorkbookError::Vba(format!(
                "module '{module_name}' not readable: {e}"
            )))
        })?;

        let mut total_lines: u32 = 0;
        let mut selected: Vec<&str> = Vec::new();
        for (idx, line) in source.lines().enumerate() {
            total_lines = total_lines.saturating_add(1);
            if (idx as u32) < offset {
                continue;
            }
            if selected.len() >= limit as usize {
                continue;
            }
            selected.push(line);
        }
        if total_lines == 0 && !source.is_empty() {
            total_lines = 1;
        }
        let truncated = total_lines.saturating_sub(offset) > limit;

        let mut page = selected.join("\n");
        if !page.is_empty() {
            page.push('\n');
        }

        let message = format!("{} of {} line(s)", selected.len(), total_lines);
        Ok(VbaModuleSourceResponse {
            success: true,
            file_path,
            module_name,
            offset_lines: offset,
            limit_lines: limit,
            total_lines,
            truncated,
            source: page,
            message,
        })
    })
    .await?
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AddVbaProjectParams {
    pub file_path: String,
    /// Base64-encoded vbaProject.bin payload.
    pub vba_project_base64: Option<String>,
    /// Alternatively, a workspace path to an existing vbaProject.bin file.
    pub vba_project_path: Option<String>,
    /// Output path; defaults to the workbook path with an .xlsm extension.
    pub output_path: Option<String>,
    #[serde(default)]
    pub overwrite: bool,
}

/// Inject a caller-supplied VBA project into a workbook, rewriting the OPC
/// content types and saving the result as a macro-enabled `.xlsm`.
pub async fn add_vba_project(
    state: Arc<AppState>,
    params: AddVbaProjectParams,
) -> Result<OperationResponse> {
    let source = state.resolve_existing(&params.file_path)?;

    let payload = match (&params.vba_project_base64, &params.vba_project_path) {
        (Some(encoded), _) => base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| anyhow!(WorkbookError::Vba(format!("invalid base64 payload: {e}"))))?,
        (None, Some(path)) => {
            let resolved = state.resolve_existing(path)?;
            std::fs::read(&resolved)
                .with_context(|| format!("failed to read VBA payload {:?}", resolved))?
        }
        (None, None) => {
            return Err(anyhow!(WorkbookError::Vba(
                "one of vba_project_base64 or vba_project_path is required".to_string()
            )));
        }
    };
    if payload.len() as u64 > MAX_VBA_PROJECT_BYTES {
        return Err(anyhow!(WorkbookError::Vba(format!(
            "VBA payload too large ({} bytes; max {} bytes)",
            payload.len(),
            MAX_VBA_PROJECT_BYTES
        ))));
    }

    let target = match &params.output_path {
        Some(p) => state.resolve_target(p)?,
        None => source.with_extension("xlsm"),
    };
    if target.exists() && target != source && !(params.overwrite && state.config().allow_overwrite)
    {
        return Err(WorkbookError::OverwriteRefused(target.display().to_string()).into());
    }

    let source_clone = source.clone();
    let target_clone = target.clone();
    task::spawn_blocking(move || inject_vba_project(&source_clone, &target_clone, &payload))
        .await??;

    Ok(OperationResponse::ok(
        params.file_path,
        format!(
            "injected VBA project; macro-enabled workbook at {}",
            path_to_forward_slashes(&target)
        ),
    )
    .with_target(path_to_forward_slashes(&target)))
}

/// Cheap container probe used by `describe_workbook`.
pub fn has_vba_project(path: &Path) -> Result<bool> {
    let file =
        File::open(path).with_context(|| format!("failed to open workbook {:?}", path))?;
    let mut archive = zip::ZipArchive::new(file)
        .with_context(|| format!("failed to open workbook container {:?}", path))?;
    match archive.by_name(VBA_PART_NAME) {
        Ok(_) => Ok(true),
        Err(ZipError::FileNotFound) => Ok(false),
        Err(e) => Err(anyhow!("failed to probe {VBA_PART_NAME}: {e}")),
    }
}

fn extract_vba_project_bin(path: &Path) -> Result<Option<Vec<u8>>> {
    let file =
        File::open(path).with_context(|| format!("failed to open workbook {:?}", path))?;
    let mut archive = zip::ZipArchive::new(file)
        .with_context(|| format!("failed to open workbook container {:?}", path))?;

    let mut entry = match archive.by_name(VBA_PART_NAME) {
        Ok(f) => f,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(anyhow!("failed to locate {VBA_PART_NAME}: {e}")),
    };

    let declared_size = entry.size();
    if declared_size > MAX_VBA_PROJECT_BYTES {
        bail!(
            "{VBA_PART_NAME} too large ({declared_size} bytes; max {MAX_VBA_PROJECT_BYTES} bytes)"
        );
    }

    let mut buf: Vec<u8> = Vec::with_capacity(declared_size.min(1024 * 1024) as usize);
    entry
        .read_to_end(&mut buf)
        .map_err(|e| anyhow!("failed to read {VBA_PART_NAME}: {e}"))?;

    if buf.len() as u64 > MAX_VBA_PROJECT_BYTES {
        bail!(
            "{VBA_PART_NAME} too large after read ({} bytes; max {MAX_VBA_PROJECT_BYTES} bytes)",
            buf.len()
        );
    }

    Ok(Some(buf))
}

/// Rewrite the OPC container: copy every part, swap the workbook content type
/// for the macro-enabled one, declare the `bin` part, and append the payload.
fn inject_vba_project(source: &Path, target: &Path, payload: &[u8]) -> Result<()> {
    let file =
        File::open(source).with_context(|| format!("failed to open workbook {:?}", source))?;
    let mut archive = zip::ZipArchive::new(file)
        .with_context(|| format!("failed to open workbook container {:?}", source))?;

    let staging = tempfile::NamedTempFile::new_in(
        target.parent().unwrap_or_else(|| Path::new(".")),
    )
    .context("failed to create staging file")?;
    let mut writer = zip::ZipWriter::new(staging.reopen()?);
    let options = zip::write::FileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let name = entry.name().to_string();

        if name == VBA_PART_NAME {
            continue;
        }
        if entry.is_dir() {
            writer.add_directory(name, options)?;
            continue;
        }

        let mut contents = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut contents)?;

        if name == CONTENT_TYPES_PART {
            let xml = String::from_utf8(contents)
                .map_err(|e| anyhow!("malformed {CONTENT_TYPES_PART}: {e}"))?;
            let mut xml = xml.replace(WORKBOOK_CONTENT_TYPE, MACRO_WORKBOOK_CONTENT_TYPE);
            if !xml.contains("vnd.ms-office.vbaProject") {
                xml = xml.replace("</Types>", &format!("{VBA_DEFAULT_DECL}</Types>"));
            }
            contents = xml.into_bytes();
        }

        writer.start_file(name, options)?;
        writer.write_all(&contents)?;
    }

    writer.start_file(VBA_PART_NAME, options)?;
    writer.write_all(payload)?;
    writer.finish()?;

    staging
        .persist(target)
        .map_err(|e| anyhow!("failed to place {:?}: {}", target, e.error))?;
    Ok(())
}
