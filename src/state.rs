//! Application state shared by tool handlers.
//!
//! Deliberately thin: configuration plus the optional automation bridge.
//! Workbooks are never cached across calls; every adapter opens the file,
//! does its work, and (for mutations) saves before returning, so the file on
//! disk is the only shared state and concurrent calls race with
//! last-save-wins semantics.

use crate::bridge::{AutomationBridge, LibreOfficeBridge};
use crate::config::ServerConfig;
use crate::workbook;
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub struct AppState {
    config: Arc<ServerConfig>,
    bridge: Option<Arc<dyn AutomationBridge>>,
    bridge_binary: Option<PathBuf>,
}

impl AppState {
    pub fn new(config: Arc<ServerConfig>) -> Self {
        let timeout = Duration::from_secs(config.bridge_timeout_secs);
        let discovered = LibreOfficeBridge::discover(config.soffice_path.as_deref(), timeout);
        let bridge_binary = discovered.as_ref().map(|b| b.binary_path().to_path_buf());
        let bridge =
            discovered.map(|b| Arc::new(b) as Arc<dyn AutomationBridge>);

        match &bridge_binary {
            Some(path) => info!(binary = %path.display(), "automation bridge available"),
            None => info!("automation bridge not found; PDF export disabled"),
        }

        Self {
            config,
            bridge,
            bridge_binary,
        }
    }

    pub fn config(&self) -> Arc<ServerConfig> {
        self.config.clone()
    }

    pub fn bridge(&self) -> Option<&Arc<dyn AutomationBridge>> {
        self.bridge.as_ref()
    }

    /// Binary backing the primary bridge, for alternate discovery.
    pub fn bridge_binary(&self) -> Option<&PathBuf> {
        self.bridge_binary.as_ref()
    }

    /// Resolve a tool-supplied path to an existing workbook file.
    pub fn resolve_existing(&self, file_path: &str) -> Result<PathBuf> {
        workbook::resolve_existing_workbook(&self.config, file_path)
    }

    /// Resolve a tool-supplied path that may not exist yet.
    pub fn resolve_target(&self, file_path: &str) -> Result<PathBuf> {
        workbook::resolve_workspace_path(&self.config, file_path)
    }
}
