use serde::{Deserialize, Serialize};

use super::leading_number;

pub const DEFAULT_FONT_WEIGHT: u16 = 400;
pub const DEFAULT_FONT_SIZE: f64 = 14.0;

const MAX_FONT_WEIGHT: u32 = 1000;
const ROOT_FONT_SIZE: f64 = 16.0;
const PX_PER_PT: f64 = 1.333;

const WEIGHT_KEYWORDS: &[(&str, u16)] = &[
    ("thin", 100),
    ("extralight", 200),
    ("light", 300),
    ("normal", 400),
    ("medium", 500),
    ("semibold", 600),
    ("bold", 700),
    ("extrabold", 800),
    ("black", 900),
];

/// Keyword table first, then the leading integer clamped to 1000; 400 when
/// neither applies or the number is zero.
pub fn parse_font_weight(input: Option<&str>) -> u16 {
    let Some(value) = input.map(str::trim).filter(|v| !v.is_empty()) else {
        return DEFAULT_FONT_WEIGHT;
    };
    let lower = value.to_ascii_lowercase();
    if let Some((_, weight)) = WEIGHT_KEYWORDS.iter().find(|(name, _)| *name == lower) {
        return *weight;
    }
    let digits: String = lower.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return DEFAULT_FONT_WEIGHT;
    }
    // Only digits remain, so a parse failure is an overflow.
    match digits.parse::<u32>().unwrap_or(u32::MAX) {
        0 => DEFAULT_FONT_WEIGHT,
        weight => weight.min(MAX_FONT_WEIGHT) as u16,
    }
}

/// Pixel-equivalent font size. `em` and `rem` resolve against 16px, `pt` at 1.333px.
pub fn parse_font_size(input: Option<&str>) -> f64 {
    let Some(value) = input.map(str::trim).filter(|v| !v.is_empty()) else {
        return DEFAULT_FONT_SIZE;
    };
    let Some((magnitude, unit)) = leading_number(value) else {
        return DEFAULT_FONT_SIZE;
    };
    match unit.to_ascii_lowercase().as_str() {
        "px" => magnitude,
        "em" | "rem" => magnitude * ROOT_FONT_SIZE,
        "pt" => magnitude * PX_PER_PT,
        _ if magnitude != 0.0 => magnitude,
        _ => DEFAULT_FONT_SIZE,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
    Justified,
}

pub fn parse_text_align(input: Option<&str>) -> TextAlign {
    match input.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        Some("center") => TextAlign::Center,
        Some("right") => TextAlign::Right,
        Some("justify") => TextAlign::Justified,
        _ => TextAlign::Left,
    }
}

/// Style name a design host uses for a numeric weight.
pub fn font_style_for_weight(weight: u16) -> &'static str {
    match weight {
        0..=149 => "Thin",
        150..=249 => "Extra Light",
        250..=349 => "Light",
        350..=449 => "Regular",
        450..=549 => "Medium",
        550..=649 => "Semi Bold",
        650..=749 => "Bold",
        750..=849 => "Extra Bold",
        _ => "Black",
    }
}
