//! CSS value parsing shared by capture and reconstruction.
//!
//! Every function here is total: malformed input produces a documented default
//! or `None`, never an error. Nothing in this module touches a document or a
//! design host, so each parser is unit-tested in isolation.

pub mod box_model;
pub mod color;
pub mod typography;

pub use box_model::{
    parse_border_radius, parse_box_shadow, parse_length, parse_opacity, parse_padding, BlendMode,
    DropShadow, Insets, Offset,
};
pub use color::{parse_color, Rgba};
pub use typography::{
    font_style_for_weight, parse_font_size, parse_font_weight, parse_text_align, TextAlign,
    DEFAULT_FONT_SIZE, DEFAULT_FONT_WEIGHT,
};

/// Split `input` into its leading unsigned decimal (`\d*\.?\d+`) and the remainder.
pub(crate) fn leading_number(input: &str) -> Option<(f64, &str)> {
    let bytes = input.as_bytes();
    let int_end = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
    let mut end = int_end;
    if bytes.get(int_end) == Some(&b'.') {
        let frac = bytes[int_end + 1..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        if frac > 0 {
            end = int_end + 1 + frac;
        }
    }
    if end == 0 {
        return None;
    }
    let magnitude = input[..end].parse().ok()?;
    Some((magnitude, &input[end..]))
}

#[cfg(test)]
mod tests {
    use super::leading_number;

    #[test]
    fn leading_number_matches_css_magnitudes() {
        assert_eq!(leading_number("12px"), Some((12.0, "px")));
        assert_eq!(leading_number(".75rem"), Some((0.75, "rem")));
        assert_eq!(leading_number("3."), Some((3.0, ".")));
        assert_eq!(leading_number("-4px"), None);
        assert_eq!(leading_number("px"), None);
    }
}
