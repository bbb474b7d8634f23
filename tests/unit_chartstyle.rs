use workbook_mcp::chartstyle::{palette_for_style, parse_style_token, resolve, scheme_colors};

#[test]
fn numeric_tokens_parse_within_bounds() {
    assert_eq!(parse_style_token("1"), Some(1));
    assert_eq!(parse_style_token("48"), Some(48));
    assert_eq!(parse_style_token("0"), None);
    assert_eq!(parse_style_token("49"), None);
}

#[test]
fn style_n_form_parses() {
    assert_eq!(parse_style_token("style12"), Some(12));
    assert_eq!(parse_style_token("Style7"), Some(7));
    assert_eq!(parse_style_token("style99"), None);
    assert_eq!(parse_style_token("style"), None);
}

#[test]
fn descriptive_names_resolve() {
    assert_eq!(parse_style_token("dark-blue"), Some(7));
    assert_eq!(parse_style_token("DARK-BLUE"), Some(7));
    assert_eq!(parse_style_token("colorful-3"), Some(15));
    assert_eq!(parse_style_token("nonsense"), None);
    assert_eq!(parse_style_token(""), None);
}

#[test]
fn style_ids_imply_palettes() {
    assert_eq!(palette_for_style(1), "office");
    assert_eq!(palette_for_style(7), "dark-blue");
    assert_eq!(palette_for_style(15), "colorful");
    assert_eq!(palette_for_style(48), "default");
}

#[test]
fn schemes_carry_eight_colors() {
    for name in ["default", "office", "colorful", "pastel", "dark-blue"] {
        let colors = scheme_colors(name).expect("scheme exists");
        assert_eq!(colors.len(), 8);
    }
    assert!(scheme_colors("missing").is_none());
}

#[test]
fn resolve_defaults_to_style_two() {
    let styling = resolve(None, None, None);
    assert_eq!(styling.style_id, 2);
    assert_eq!(styling.palette, "office");
    assert_eq!(styling.colors.len(), 8);
    assert!(styling.warnings.is_empty());
}

#[test]
fn resolve_unknown_style_warns_and_falls_back() {
    let styling = resolve(Some("does-not-exist"), None, None);
    assert_eq!(styling.style_id, 2);
    assert_eq!(styling.warnings.len(), 1);
    assert!(styling.warnings[0].contains("does-not-exist"));
}

#[test]
fn theme_overrides_style_palette() {
    let styling = resolve(Some("dark-blue"), Some("pastel"), None);
    assert_eq!(styling.style_id, 7);
    assert_eq!(styling.palette, "pastel");
    assert_eq!(
        styling.colors,
        scheme_colors("pastel")
            .unwrap()
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
    );
}

#[test]
fn unknown_theme_warns_and_keeps_style_palette() {
    let styling = resolve(Some("dark-blue"), Some("neon"), None);
    assert_eq!(styling.palette, "dark-blue");
    assert_eq!(styling.warnings.len(), 1);
}

#[test]
fn custom_palette_wins_over_everything() {
    let custom = vec!["#ff0000".to_string(), "00FF00".to_string()];
    let styling = resolve(Some("dark-blue"), Some("pastel"), Some(&custom));
    assert_eq!(styling.palette, "custom");
    assert_eq!(styling.colors, vec!["FF0000", "00FF00"]);
}
