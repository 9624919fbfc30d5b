use serde::{Deserialize, Serialize};

use super::color::{parse_color, Rgba};
use super::leading_number;
use crate::types::{BoxShadow, Padding};

/// Resolved padding in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Insets {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Insets {
    pub fn is_zero(&self) -> bool {
        self.top == 0.0 && self.right == 0.0 && self.bottom == 0.0 && self.left == 0.0
    }
}

/// Leading magnitude of a CSS length; the unit is ignored and 0 is the default.
pub fn parse_length(input: Option<&str>) -> f64 {
    input
        .and_then(|value| leading_number(value.trim()))
        .map(|(magnitude, _)| magnitude)
        .unwrap_or(0.0)
}

pub fn parse_padding(padding: Option<&Padding>) -> Insets {
    match padding {
        Some(p) => Insets {
            top: parse_length(Some(&p.top)),
            right: parse_length(Some(&p.right)),
            bottom: parse_length(Some(&p.bottom)),
            left: parse_length(Some(&p.left)),
        },
        None => Insets::default(),
    }
}

/// Only the first radius of a shorthand is used.
pub fn parse_border_radius(input: Option<&str>) -> f64 {
    parse_length(input)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlendMode {
    Normal,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Offset {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropShadow {
    pub color: Rgba,
    pub offset: Offset,
    pub radius: f64,
    pub spread: f64,
    pub visible: bool,
    pub blend_mode: BlendMode,
}

/// Drop-shadow effect for a captured shadow; `None` when its color is absent or transparent.
pub fn parse_box_shadow(shadow: Option<&BoxShadow>) -> Option<DropShadow> {
    let shadow = shadow?;
    let color = parse_color(&shadow.color)?;
    Some(DropShadow {
        color,
        offset: Offset {
            x: f64::from(shadow.x),
            y: f64::from(shadow.y),
        },
        radius: f64::from(shadow.blur).abs(),
        spread: f64::from(shadow.spread),
        visible: true,
        blend_mode: BlendMode::Normal,
    })
}

/// Opacity within `0..=1`; anything else is ignored.
pub fn parse_opacity(input: Option<&str>) -> Option<f64> {
    let value: f64 = input?.trim().parse().ok()?;
    (0.0..=1.0).contains(&value).then_some(value)
}
