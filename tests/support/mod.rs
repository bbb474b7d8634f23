#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tempfile::{TempDir, tempdir};
use umya_spreadsheet::{self, Spreadsheet};
use workbook_mcp::state::AppState;
use workbook_mcp::{ServerConfig, TransportKind, WorkbookServer};

const DEFAULT_EXTENSIONS: &[&str] = &["xlsx", "xlsm"];

pub fn write_workbook_to_path<F>(path: &Path, f: F)
where
    F: FnOnce(&mut Spreadsheet),
{
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create dir");
    }
    let mut book = umya_spreadsheet::new_file();
    f(&mut book);
    umya_spreadsheet::writer::xlsx::write(&book, path).expect("write workbook");
}

/// Fill a rectangular block of string values anchored at zero-based
/// (row, col) on the named sheet.
pub fn fill_block(book: &mut Spreadsheet, sheet: &str, row: u32, col: u32, data: &[&[&str]]) {
    let ws = book.get_sheet_by_name_mut(sheet).expect("sheet exists");
    for (r, values) in data.iter().enumerate() {
        for (c, value) in values.iter().enumerate() {
            ws.get_cell_mut((col + 1 + c as u32, row + 1 + r as u32))
                .set_value(*value);
        }
    }
}

pub struct TestWorkspace {
    _tempdir: TempDir,
    root: PathBuf,
}

impl TestWorkspace {
    pub fn new() -> Self {
        let tempdir = tempdir().expect("tempdir");
        let root = tempdir.path().to_path_buf();
        Self {
            _tempdir: tempdir,
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn create_workbook<F>(&self, name: &str, f: F) -> PathBuf
    where
        F: FnOnce(&mut Spreadsheet),
    {
        let path = self.path(name);
        write_workbook_to_path(&path, f);
        path
    }

    pub fn read_workbook(&self, name: &str) -> Spreadsheet {
        umya_spreadsheet::reader::xlsx::read(self.path(name)).expect("read workbook")
    }

    pub fn config(&self) -> ServerConfig {
        ServerConfig {
            workspace_root: self.root.clone(),
            supported_extensions: DEFAULT_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            enabled_tools: None,
            transport: TransportKind::Stdio,
            http_bind_address: "127.0.0.1:8079".parse().unwrap(),
            allow_overwrite: false,
            soffice_path: None,
            bridge_timeout_secs: 60,
        }
    }

    pub fn config_with<F>(&self, configure: F) -> ServerConfig
    where
        F: FnOnce(&mut ServerConfig),
    {
        let mut config = self.config();
        configure(&mut config);
        config
    }

    pub fn app_state(&self) -> Arc<AppState> {
        app_state_with_config(self.config())
    }

    pub async fn server(&self) -> Result<WorkbookServer> {
        let config = Arc::new(self.config());
        WorkbookServer::new(config).await
    }
}

pub fn app_state_with_config(config: ServerConfig) -> Arc<AppState> {
    let config = Arc::new(config);
    Arc::new(AppState::new(config))
}

/// Cell text at a zero-based (row, col) on a loaded workbook.
pub fn cell_text(book: &Spreadsheet, sheet: &str, row: u32, col: u32) -> String {
    book.get_sheet_by_name(sheet)
        .expect("sheet exists")
        .get_cell((col + 1, row + 1))
        .map(|cell| cell.get_value().to_string())
        .unwrap_or_default()
}
