//! Cell style specifications and their application to umya styles.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use umya_spreadsheet::structs::{HorizontalAlignmentValues, VerticalAlignmentValues};
use umya_spreadsheet::{PatternValues, Style};

/// Style options a tool call can request for a range of cells. All fields
/// are optional; only the requested properties are touched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CellStyleSpec {
    pub font_name: Option<String>,
    pub font_size: Option<f64>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    /// Underline style: "single", "double", or "none".
    pub underline: Option<String>,
    pub strikethrough: Option<bool>,
    /// Font color as RGB or ARGB hex, with or without leading '#'.
    pub font_color: Option<String>,
    /// Solid fill color as RGB or ARGB hex.
    pub fill_color: Option<String>,
    /// Border style applied to all four sides: "thin", "medium", "thick",
    /// "dashed", "dotted", "double", "hair".
    pub border_style: Option<String>,
    pub border_color: Option<String>,
    /// Horizontal alignment: "left", "center", "right", "justify".
    pub alignment: Option<String>,
    /// Vertical alignment: "top", "center", "bottom".
    pub vertical_alignment: Option<String>,
    pub wrap_text: Option<bool>,
}

impl CellStyleSpec {
    pub fn is_empty(&self) -> bool {
        self.font_name.is_none()
            && self.font_size.is_none()
            && self.bold.is_none()
            && self.italic.is_none()
            && self.underline.is_none()
            && self.strikethrough.is_none()
            && self.font_color.is_none()
            && self.fill_color.is_none()
            && self.border_style.is_none()
            && self.border_color.is_none()
            && self.alignment.is_none()
            && self.vertical_alignment.is_none()
            && self.wrap_text.is_none()
    }
}

/// Normalize "#RGB", "RRGGBB", or "AARRGGBB" into ARGB hex, defaulting the
/// alpha channel to FF.
pub fn normalize_argb(input: &str) -> Option<String> {
    let hex: String = input
        .trim()
        .trim_start_matches('#')
        .chars()
        .filter(|c| c.is_ascii_hexdigit())
        .map(|c| c.to_ascii_uppercase())
        .collect();
    match hex.len() {
        3 => {
            let expanded: String = hex.chars().flat_map(|c| [c, c]).collect();
            Some(format!("FF{expanded}"))
        }
        6 => Some(format!("FF{hex}")),
        8 => Some(hex),
        _ => None,
    }
}

/// Apply the requested properties onto a cell's style in place.
pub fn apply_cell_style(style: &mut Style, spec: &CellStyleSpec) {
    let touches_font = spec.font_name.is_some()
        || spec.font_size.is_some()
        || spec.bold.is_some()
        || spec.italic.is_some()
        || spec.underline.is_some()
        || spec.strikethrough.is_some()
        || spec.font_color.is_some();

    if touches_font {
        let font = style.get_font_mut();
        if let Some(name) = &spec.font_name {
            font.set_name(name.clone());
        }
        if let Some(size) = spec.font_size {
            font.set_size(size);
        }
        if let Some(bold) = spec.bold {
            font.set_bold(bold);
        }
        if let Some(italic) = spec.italic {
            font.set_italic(italic);
        }
        if let Some(underline) = &spec.underline {
            font.set_underline(underline.clone());
        }
        if let Some(strike) = spec.strikethrough {
            font.set_strikethrough(strike);
        }
        if let Some(color) = &spec.font_color
            && let Some(argb) = normalize_argb(color)
        {
            font.get_color_mut().set_argb(argb);
        }
    }

    if let Some(fill) = &spec.fill_color
        && let Some(argb) = normalize_argb(fill)
    {
        let pattern = style.get_fill_mut().get_pattern_fill_mut();
        pattern.set_pattern_type(PatternValues::Solid);
        pattern.get_foreground_color_mut().set_argb(argb);
    }

    if spec.border_style.is_some() || spec.border_color.is_some() {
        let border_style = spec
            .border_style
            .clone()
            .unwrap_or_else(|| "thin".to_string());
        let border_argb = spec
            .border_color
            .as_deref()
            .and_then(normalize_argb);
        let borders = style.get_borders_mut();
        let apply = |side: &mut umya_spreadsheet::structs::Border| {
            side.set_border_style(border_style.clone());
            if let Some(argb) = &border_argb {
                side.get_color_mut().set_argb(argb.clone());
            }
        };
        apply(borders.get_left_border_mut());
        apply(borders.get_right_border_mut());
        apply(borders.get_top_border_mut());
        apply(borders.get_bottom_border_mut());
    }

    if spec.alignment.is_some() || spec.vertical_alignment.is_some() || spec.wrap_text.is_some() {
        let alignment = style.get_alignment_mut();
        if let Some(horizontal) = &spec.alignment
            && let Ok(value) = HorizontalAlignmentValues::from_str(horizontal)
        {
            alignment.set_horizontal(value);
        }
        if let Some(vertical) = &spec.vertical_alignment
            && let Ok(value) = VerticalAlignmentValues::from_str(vertical)
        {
            alignment.set_vertical(value);
        }
        if let Some(wrap) = spec.wrap_text {
            alignment.set_wrap_text(wrap);
        }
    }
}
