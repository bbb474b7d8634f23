mod support;

use support::TestWorkspace;
use workbook_mcp::{CliArgs, ServerConfig, TransportKind};

fn base_args(ws: &TestWorkspace) -> CliArgs {
    CliArgs {
        config: None,
        workspace_root: Some(ws.root().to_path_buf()),
        extensions: None,
        enabled_tools: None,
        transport: None,
        http_bind: None,
        allow_overwrite: false,
        soffice_path: None,
        bridge_timeout_secs: None,
    }
}

#[test]
fn defaults_are_stdio_with_xlsx_extensions() {
    let ws = TestWorkspace::new();
    let config = ServerConfig::from_args(base_args(&ws)).unwrap();

    assert_eq!(config.transport, TransportKind::Stdio);
    assert_eq!(config.supported_extensions, vec!["xlsm", "xlsx"]);
    assert!(config.enabled_tools.is_none());
    assert!(!config.allow_overwrite);
    assert_eq!(config.bridge_timeout_secs, 60);
    config.validate().unwrap();
}

#[test]
fn extensions_are_normalized_and_deduplicated() {
    let ws = TestWorkspace::new();
    let mut args = base_args(&ws);
    args.extensions = Some(vec![
        ".XLSX".to_string(),
        "xlsx".to_string(),
        " xlsm ".to_string(),
    ]);
    let config = ServerConfig::from_args(args).unwrap();
    assert_eq!(config.supported_extensions, vec!["xlsm", "xlsx"]);
}

#[test]
fn empty_extension_list_is_rejected() {
    let ws = TestWorkspace::new();
    let mut args = base_args(&ws);
    args.extensions = Some(vec!["".to_string(), " ".to_string()]);
    assert!(ServerConfig::from_args(args).is_err());
}

#[test]
fn enabled_tools_gate_lookups_case_insensitively() {
    let ws = TestWorkspace::new();
    let mut args = base_args(&ws);
    args.enabled_tools = Some(vec!["Read_Sheet_Data".to_string(), "list_sheets".to_string()]);
    let config = ServerConfig::from_args(args).unwrap();

    assert!(config.is_tool_enabled("read_sheet_data"));
    assert!(config.is_tool_enabled("LIST_SHEETS"));
    assert!(!config.is_tool_enabled("write_sheet_data"));
}

#[test]
fn yaml_config_file_fills_in_unset_values() {
    let ws = TestWorkspace::new();
    let config_path = ws.path("server.yaml");
    std::fs::write(
        &config_path,
        format!(
            "workspace_root: {}\ntransport: http\nallow_overwrite: true\nbridge_timeout_secs: 5\n",
            ws.root().display()
        ),
    )
    .unwrap();

    let mut args = base_args(&ws);
    args.config = Some(config_path);
    args.workspace_root = None;
    let config = ServerConfig::from_args(args).unwrap();

    assert_eq!(config.transport, TransportKind::Http);
    assert!(config.allow_overwrite);
    assert_eq!(config.bridge_timeout_secs, 5);
    assert_eq!(config.workspace_root, ws.root());
}

#[test]
fn cli_values_take_precedence_over_the_file() {
    let ws = TestWorkspace::new();
    let config_path = ws.path("server.json");
    std::fs::write(
        &config_path,
        r#"{"transport": "http", "bridge_timeout_secs": 5}"#,
    )
    .unwrap();

    let mut args = base_args(&ws);
    args.config = Some(config_path);
    args.transport = Some(TransportKind::Stdio);
    args.bridge_timeout_secs = Some(120);
    let config = ServerConfig::from_args(args).unwrap();

    assert_eq!(config.transport, TransportKind::Stdio);
    assert_eq!(config.bridge_timeout_secs, 120);
}

#[test]
fn missing_config_file_is_an_error() {
    let ws = TestWorkspace::new();
    let mut args = base_args(&ws);
    args.config = Some(ws.path("nope.yaml"));
    assert!(ServerConfig::from_args(args).is_err());
}

#[test]
fn missing_workspace_root_fails_validation() {
    let ws = TestWorkspace::new();
    let mut args = base_args(&ws);
    args.workspace_root = Some(ws.path("does-not-exist"));
    let config = ServerConfig::from_args(args).unwrap();
    assert!(config.validate().is_err());
}

#[test]
fn supported_extension_check_ignores_case() {
    let ws = TestWorkspace::new();
    let config = ServerConfig::from_args(base_args(&ws)).unwrap();
    assert!(config.has_supported_extension(std::path::Path::new("a/b/Report.XLSX")));
    assert!(!config.has_supported_extension(std::path::Path::new("a/b/report.csv")));
    assert!(!config.has_supported_extension(std::path::Path::new("a/b/no-extension")));
}
