//! Raw values read from a live document before normalization.

use serde::{Deserialize, Serialize};

/// Resolved computed style of one element; every property is the raw CSS string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComputedStyle {
    pub display: Option<String>,
    pub visibility: Option<String>,
    pub opacity: Option<String>,
    pub color: Option<String>,
    pub font_size: Option<String>,
    pub font_family: Option<String>,
    pub font_weight: Option<String>,
    pub text_align: Option<String>,
    pub padding_top: Option<String>,
    pub padding_right: Option<String>,
    pub padding_bottom: Option<String>,
    pub padding_left: Option<String>,
    pub border_radius: Option<String>,
    pub box_shadow: Option<String>,
    pub z_index: Option<String>,
    pub background_color: Option<String>,
}

/// Rendered box in viewport coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DomRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl DomRect {
    pub fn has_area(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}
