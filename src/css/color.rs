use palette::Srgba;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Normalized RGBA color, every channel in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba::opaque(0.0, 0.0, 0.0);
    pub const WHITE: Rgba = Rgba::opaque(1.0, 1.0, 1.0);

    pub const fn opaque(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// `#rrggbb` form of the opaque part.
    pub fn to_hex(&self) -> String {
        let byte = |channel: f32| (channel.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!("#{:02x}{:02x}{:02x}", byte(self.r), byte(self.g), byte(self.b))
    }

    fn from_channels(channels: Srgba<u8>) -> Self {
        let c: Srgba<f32> = channels.into_format();
        Self {
            r: c.red,
            g: c.green,
            b: c.blue,
            a: c.alpha,
        }
    }
}

const NAMED_COLORS: &[(&str, Rgba)] = &[
    ("black", Rgba::opaque(0.0, 0.0, 0.0)),
    ("white", Rgba::opaque(1.0, 1.0, 1.0)),
    ("red", Rgba::opaque(1.0, 0.0, 0.0)),
    ("green", Rgba::opaque(0.0, 0.5, 0.0)),
    ("blue", Rgba::opaque(0.0, 0.0, 1.0)),
    ("gray", Rgba::opaque(0.5, 0.5, 0.5)),
    ("grey", Rgba::opaque(0.5, 0.5, 0.5)),
    ("yellow", Rgba::opaque(1.0, 1.0, 0.0)),
    ("orange", Rgba::opaque(1.0, 0.647, 0.0)),
    ("purple", Rgba::opaque(0.5, 0.0, 0.5)),
    ("pink", Rgba::opaque(1.0, 0.753, 0.796)),
    ("brown", Rgba::opaque(0.647, 0.165, 0.165)),
];

/// Parse a CSS color.
///
/// Returns `None` for "no color": empty input, `transparent`, `initial`,
/// `inherit`, or anything whose alpha resolves to zero. Input that is present
/// but not understood (unknown keyword, malformed hex, broken `rgb()`) is
/// normalized to opaque black rather than rejected.
pub fn parse_color(input: &str) -> Option<Rgba> {
    let value = input.trim();
    let lower = value.to_ascii_lowercase();
    if matches!(lower.as_str(), "" | "transparent" | "initial" | "inherit") {
        return None;
    }

    let color = if let Some(hex) = lower.strip_prefix('#') {
        parse_hex(hex)
    } else if let Some(args) = functional_args(&lower) {
        parse_rgb_args(args)
    } else {
        NAMED_COLORS
            .iter()
            .find(|(name, _)| *name == lower)
            .map(|(_, color)| *color)
    };

    let color = color.unwrap_or_else(|| {
        debug!(input = value, "unrecognised color, using black");
        Rgba::BLACK
    });

    (color.a > 0.0).then_some(color)
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let byte = |s: &str| u8::from_str_radix(s, 16).ok();
    let (r, g, b, a) = match hex.len() {
        3 => {
            let doubled: Vec<u8> = hex
                .chars()
                .map(|c| byte(&format!("{c}{c}")))
                .collect::<Option<_>>()?;
            (doubled[0], doubled[1], doubled[2], 255)
        }
        6 => (byte(&hex[0..2])?, byte(&hex[2..4])?, byte(&hex[4..6])?, 255),
        8 => (
            byte(&hex[0..2])?,
            byte(&hex[2..4])?,
            byte(&hex[4..6])?,
            byte(&hex[6..8])?,
        ),
        _ => return None,
    };
    Some(Rgba::from_channels(Srgba::new(r, g, b, a)))
}

fn functional_args(value: &str) -> Option<&str> {
    let rest = value
        .strip_prefix("rgba(")
        .or_else(|| value.strip_prefix("rgb("))?;
    rest.strip_suffix(')')
}

/// Accepts both `r, g, b[, a]` and `r g b[ / a]`.
fn parse_rgb_args(args: &str) -> Option<Rgba> {
    let parts: Vec<&str> = args
        .split(|c: char| c == ',' || c == '/' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .collect();
    if parts.len() < 3 {
        return None;
    }

    let channel = |part: &str| -> Option<f32> {
        let value = match part.strip_suffix('%') {
            Some(pct) => pct.parse::<f32>().ok()? / 100.0,
            None => part.parse::<f32>().ok()? / 255.0,
        };
        Some(value.clamp(0.0, 1.0))
    };
    let alpha = match parts.get(3) {
        Some(part) => match part.strip_suffix('%') {
            Some(pct) => pct.parse::<f32>().ok()? / 100.0,
            None => part.parse::<f32>().ok()?,
        }
        .clamp(0.0, 1.0),
        None => 1.0,
    };

    Some(Rgba {
        r: channel(parts[0])?,
        g: channel(parts[1])?,
        b: channel(parts[2])?,
        a: alpha,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Rgba, b: Rgba) -> bool {
        (a.r - b.r).abs() < 1e-3
            && (a.g - b.g).abs() < 1e-3
            && (a.b - b.b).abs() < 1e-3
            && (a.a - b.a).abs() < 1e-3
    }

    #[test]
    fn parses_hex_forms() {
        assert_eq!(parse_color("#FFF"), Some(Rgba::WHITE));
        assert_eq!(parse_color("#000000"), Some(Rgba::BLACK));
        assert_eq!(parse_color("#abc").unwrap().to_hex(), "#aabbcc");
        let translucent = parse_color("#ff000080").unwrap();
        assert!(close(
            translucent,
            Rgba {
                r: 1.0,
                g: 0.0,
                b: 0.0,
                a: 128.0 / 255.0
            }
        ));
    }

    #[test]
    fn parses_rgb_functions() {
        assert_eq!(
            parse_color("rgba(255,0,0,0.5)"),
            Some(Rgba {
                r: 1.0,
                g: 0.0,
                b: 0.0,
                a: 0.5
            })
        );
        let gray = parse_color("rgb(51, 51, 51)").unwrap();
        assert!(close(gray, Rgba::opaque(0.2, 0.2, 0.2)));
        let spaced = parse_color("rgb(0 0 255 / 50%)").unwrap();
        assert!(close(
            spaced,
            Rgba {
                r: 0.0,
                g: 0.0,
                b: 1.0,
                a: 0.5
            }
        ));
    }

    #[test]
    fn transparent_inputs_are_no_color() {
        assert_eq!(parse_color("transparent"), None);
        assert_eq!(parse_color("rgba(0, 0, 0, 0)"), None);
        assert_eq!(parse_color("rgba(0,0,0,0)"), None);
        assert_eq!(parse_color("inherit"), None);
        assert_eq!(parse_color("initial"), None);
        assert_eq!(parse_color(""), None);
        assert_eq!(parse_color("#12345600"), None);
    }

    #[test]
    fn named_colors_come_from_a_fixed_table() {
        assert_eq!(parse_color("Orange"), Some(Rgba::opaque(1.0, 0.647, 0.0)));
        assert_eq!(parse_color("grey"), parse_color("gray"));
    }

    // Unknown or malformed input is a deliberate lossy normalization to black.
    #[test]
    fn unrecognised_colors_fall_back_to_opaque_black() {
        assert_eq!(parse_color("periwinkle"), Some(Rgba::BLACK));
        assert_eq!(parse_color("#12345"), Some(Rgba::BLACK));
        assert_eq!(parse_color("#zzzzzz"), Some(Rgba::BLACK));
        assert_eq!(parse_color("rgb(1, 2)"), Some(Rgba::BLACK));
        assert_eq!(parse_color("hsl(120, 50%, 50%)"), Some(Rgba::BLACK));
    }
}
