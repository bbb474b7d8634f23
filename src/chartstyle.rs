//! Chart style lookup tables.
//!
//! Maps human-friendly style tokens ("dark-blue", "colorful-3", "style12",
//! bare numbers) to the numeric Excel chart styles 1-48, associates each
//! style with a recommended palette, and carries the named color schemes
//! applied to chart series.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Style name -> Excel chart style number (1-48).
static STYLE_NAMES: Lazy<HashMap<&'static str, u32>> = Lazy::new(|| {
    let mut m = HashMap::new();
    let entries: &[(&str, u32)] = &[
        // Light styles
        ("light-1", 1), ("light-2", 2), ("light-3", 3), ("light-4", 4),
        ("light-5", 5), ("light-6", 6),
        ("office-1", 1), ("office-2", 2), ("office-3", 3), ("office-4", 4),
        ("office-5", 5), ("office-6", 6),
        ("white", 1), ("minimal", 2), ("soft", 3), ("gradient", 4),
        ("muted", 5), ("outlined", 6),
        // Dark styles
        ("dark-1", 7), ("dark-2", 8), ("dark-3", 9), ("dark-4", 10),
        ("dark-5", 11), ("dark-6", 12),
        ("dark-blue", 7), ("dark-gray", 8), ("dark-green", 9),
        ("dark-red", 10), ("dark-purple", 11), ("dark-orange", 12),
        ("navy", 7), ("charcoal", 8), ("forest", 9), ("burgundy", 10),
        ("indigo", 11), ("rust", 12),
        // Colorful styles
        ("colorful-1", 13), ("colorful-2", 14), ("colorful-3", 15),
        ("colorful-4", 16), ("colorful-5", 17), ("colorful-6", 18),
        ("colorful-7", 19), ("colorful-8", 20),
        ("bright", 13), ("vivid", 14), ("rainbow", 15), ("multi", 16),
        ("contrast", 17), ("vibrant", 18),
        // Office theme families
        ("ion-1", 21), ("ion-2", 22), ("ion-3", 23), ("ion-4", 24),
        ("wisp-1", 25), ("wisp-2", 26), ("wisp-3", 27), ("wisp-4", 28),
        ("aspect-1", 29), ("aspect-2", 30), ("aspect-3", 31), ("aspect-4", 32),
        ("badge-1", 33), ("badge-2", 34), ("badge-3", 35), ("badge-4", 36),
        ("gallery-1", 37), ("gallery-2", 38), ("gallery-3", 39), ("gallery-4", 40),
        ("median-1", 41), ("median-2", 42), ("median-3", 43), ("median-4", 44),
        // Per-chart-type shorthands
        ("column-default", 1), ("column-dark", 7), ("column-colorful", 13),
        ("bar-default", 1), ("bar-dark", 7), ("bar-colorful", 13),
        ("line-default", 1), ("line-dark", 7), ("line-markers", 3), ("line-dash", 5),
        ("pie-default", 1), ("pie-dark", 7), ("pie-explosion", 4), ("pie-3d", 10),
        ("area-default", 1), ("area-dark", 7), ("area-transparent", 5), ("area-stacked", 9),
        ("scatter-default", 1), ("scatter-dark", 7), ("scatter-bubble", 4), ("scatter-smooth", 9),
    ];
    m.extend(entries.iter().copied());
    m
});

/// Named palettes: eight RGB hex colors each, applied round-robin to series.
static COLOR_SCHEMES: Lazy<HashMap<&'static str, [&'static str; 8]>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert(
        "default",
        ["4472C4", "ED7D31", "A5A5A5", "FFC000", "5B9BD5", "70AD47", "8549BA", "C55A11"],
    );
    m.insert(
        "office",
        ["4472C4", "ED7D31", "A5A5A5", "FFC000", "5B9BD5", "70AD47", "8549BA", "C55A11"],
    );
    m.insert(
        "colorful",
        ["5B9BD5", "ED7D31", "A5A5A5", "FFC000", "4472C4", "70AD47", "264478", "9E480E"],
    );
    m.insert(
        "pastel",
        ["9DC3E6", "FFD966", "C5E0B3", "F4B183", "B4A7D6", "8FBCDB", "D89595", "B7B7B7"],
    );
    m.insert(
        "dark-blue",
        ["2F5597", "1F3864", "4472C4", "5B9BD5", "8FAADC", "2E75B5", "255E91", "1C4587"],
    );
    m.insert(
        "dark-gray",
        ["404040", "595959", "7F7F7F", "A6A6A6", "BFBFBF", "262626", "0D0D0D", "737373"],
    );
    m.insert(
        "dark-red",
        ["952213", "C0504D", "FF8B6B", "EA6B66", "DA3903", "FF4500", "B22222", "8B0000"],
    );
    m.insert(
        "dark-green",
        ["1E6C41", "375623", "548235", "70AD47", "9BC169", "006400", "228B22", "3CB371"],
    );
    m.insert(
        "dark-purple",
        ["5C3292", "7030A0", "8064A2", "9A7FBA", "B3A2C7", "800080", "9400D3", "8B008B"],
    );
    m.insert(
        "dark-orange",
        ["C55A11", "ED7D31", "F4B183", "FFC000", "FFD966", "FF8C00", "FF7F50", "FF4500"],
    );
    m
});

/// Resolved styling for a chart about to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartStyling {
    pub style_id: u32,
    pub palette: String,
    pub colors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Convert a style token into a numeric Excel style (1-48).
///
/// Accepts a bare number ("5"), the "styleN" form (any interleaving of
/// digits after the prefix), or a descriptive name from the table.
pub fn parse_style_token(token: &str) -> Option<u32> {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(num) = trimmed.parse::<u32>() {
        return (1..=48).contains(&num).then_some(num);
    }

    let lower = trimmed.to_ascii_lowercase();
    if let Some(rest) = lower.strip_prefix("style") {
        let digits: String = rest.chars().filter(|c| c.is_ascii_digit()).collect();
        if let Ok(num) = digits.parse::<u32>()
            && (1..=48).contains(&num)
        {
            return Some(num);
        }
        return None;
    }

    STYLE_NAMES.get(lower.as_str()).copied()
}

/// The palette a style number implies.
pub fn palette_for_style(style_id: u32) -> &'static str {
    match style_id {
        1 | 2 => "office",
        3 | 4 => "colorful",
        5 | 6 => "pastel",
        7 => "dark-blue",
        8 => "dark-gray",
        9 => "dark-green",
        10 => "dark-red",
        11 => "dark-purple",
        12 => "dark-orange",
        13..=20 => "colorful",
        _ => "default",
    }
}

pub fn scheme_colors(name: &str) -> Option<&'static [&'static str; 8]> {
    COLOR_SCHEMES.get(name.to_ascii_lowercase().as_str())
}

/// Resolve the effective styling for a chart.
///
/// Precedence: explicit custom palette > named theme > palette implied by
/// the style token. Unknown tokens fall back to the default scheme and are
/// reported as warnings rather than failing the insertion.
pub fn resolve(
    style: Option<&str>,
    theme: Option<&str>,
    custom_palette: Option<&[String]>,
) -> ChartStyling {
    let mut warnings = Vec::new();

    let style_id = match style {
        Some(token) => match parse_style_token(token) {
            Some(id) => id,
            None => {
                warnings.push(format!(
                    "unknown chart style '{token}', using style 2; valid styles are 1-48, 'styleN', or names like 'dark-blue'"
                ));
                2
            }
        },
        None => 2,
    };

    let mut palette = palette_for_style(style_id).to_string();
    if let Some(theme_name) = theme {
        if scheme_colors(theme_name).is_some() {
            palette = theme_name.to_ascii_lowercase();
        } else {
            warnings.push(format!("unknown chart theme '{theme_name}', keeping palette '{palette}'"));
        }
    }

    let colors: Vec<String> = match custom_palette {
        Some(custom) if !custom.is_empty() => {
            palette = "custom".to_string();
            custom
                .iter()
                .map(|c| c.trim_start_matches('#').to_ascii_uppercase())
                .collect()
        }
        _ => scheme_colors(&palette)
            .unwrap_or_else(|| scheme_colors("default").expect("default scheme"))
            .iter()
            .map(|c| (*c).to_string())
            .collect(),
    };

    ChartStyling {
        style_id,
        palette,
        colors,
        warnings,
    }
}
