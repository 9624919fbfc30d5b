//! Normalization of raw computed style into element record fields.

use crate::types::{BoxShadow, ComputedStyle, DomRect, ElementRecord, Padding};

const ZERO_LENGTH: &str = "0px";

/// Rendered, displayed, not hidden, not fully transparent.
pub fn is_visible(rect: &DomRect, style: &ComputedStyle) -> bool {
    rect.has_area()
        && style.display.as_deref() != Some("none")
        && style.visibility.as_deref() != Some("hidden")
        && style.opacity.as_deref() != Some("0")
}

pub fn build_record(tag: &str, text: &str, rect: &DomRect, style: &ComputedStyle) -> ElementRecord {
    ElementRecord {
        tag: tag.to_ascii_lowercase(),
        text: text.trim().to_string(),
        x: round_px(rect.x),
        y: round_px(rect.y),
        width: round_px(rect.width),
        height: round_px(rect.height),
        color: non_empty(&style.color),
        font_size: non_empty(&style.font_size),
        font_family: style.font_family.as_deref().and_then(first_font_family),
        font_weight: non_empty(&style.font_weight),
        text_align: non_empty(&style.text_align),
        padding: Some(Padding {
            top: or_zero(&style.padding_top),
            right: or_zero(&style.padding_right),
            bottom: or_zero(&style.padding_bottom),
            left: or_zero(&style.padding_left),
        }),
        border_radius: Some(or_zero(&style.border_radius)),
        box_shadow: style.box_shadow.as_deref().and_then(parse_shadow_capture),
        opacity: Some(non_empty(&style.opacity).unwrap_or_else(|| "1".to_string())),
        z_index: Some(non_empty(&style.z_index).unwrap_or_else(|| "auto".to_string())),
        background_color: style.background_color.as_deref().and_then(declared_background),
        src: None,
    }
}

/// Half-away-from-zero rounding, clamped into `i32`.
pub fn round_px(value: f64) -> i32 {
    if value.is_finite() {
        value.round().clamp(i32::MIN as f64, i32::MAX as f64) as i32
    } else {
        0
    }
}

/// Background color, or `None` when nothing is painted.
pub fn declared_background(value: &str) -> Option<String> {
    let value = value.trim();
    let compact: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    if value.is_empty()
        || value.eq_ignore_ascii_case("transparent")
        || compact == "rgba(0,0,0,0)"
    {
        return None;
    }
    Some(value.to_string())
}

/// First family of a `font-family` stack with quotes removed.
pub fn first_font_family(stack: &str) -> Option<String> {
    let first = stack.split(',').next()?.trim();
    let cleaned: String = first.chars().filter(|c| *c != '"' && *c != '\'').collect();
    let cleaned = cleaned.trim();
    (!cleaned.is_empty()).then(|| cleaned.to_string())
}

/// Decompose the first shadow of a computed `box-shadow`.
///
/// Accepts the color either before or after the lengths. Lengths are truncated
/// toward zero; a missing spread is 0. `none` and anything without an `x y`
/// pair or a color yield `None`.
pub fn parse_shadow_capture(value: &str) -> Option<BoxShadow> {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("none") {
        return None;
    }
    let first = first_layer(value);

    let mut lengths = Vec::new();
    let mut color_parts = Vec::new();
    for token in tokens(first) {
        if token.eq_ignore_ascii_case("inset") {
            continue;
        }
        match parse_px(token) {
            Some(length) if lengths.len() < 4 => lengths.push(length),
            Some(_) => return None,
            None => color_parts.push(token),
        }
    }
    if lengths.len() < 2 || color_parts.is_empty() {
        return None;
    }
    Some(BoxShadow {
        x: lengths[0],
        y: lengths[1],
        blur: lengths.get(2).copied().unwrap_or(0),
        spread: lengths.get(3).copied().unwrap_or(0),
        color: color_parts.join(" "),
    })
}

fn first_layer(value: &str) -> &str {
    let mut depth = 0usize;
    for (index, ch) in value.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => return value[..index].trim(),
            _ => {}
        }
    }
    value
}

/// Whitespace-separated tokens, keeping parenthesized groups together.
fn tokens(value: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut start: Option<usize> = None;
    for (index, ch) in value.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            c if c.is_whitespace() && depth == 0 => {
                if let Some(s) = start.take() {
                    out.push(&value[s..index]);
                }
                continue;
            }
            _ => {}
        }
        if start.is_none() {
            start = Some(index);
        }
    }
    if let Some(s) = start {
        out.push(&value[s..]);
    }
    out
}

fn parse_px(token: &str) -> Option<i32> {
    let number = token.strip_suffix("px").unwrap_or(token);
    if number.is_empty() || !number.starts_with(|c: char| c.is_ascii_digit() || "+-.".contains(c))
    {
        return None;
    }
    let value: f64 = number.parse().ok()?;
    if !token.ends_with("px") && value != 0.0 {
        return None;
    }
    Some(value.trunc() as i32)
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn or_zero(value: &Option<String>) -> String {
    non_empty(value).unwrap_or_else(|| ZERO_LENGTH.to_string())
}
