use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Device-independent viewport size in whole pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    #[serde(deserialize_with = "whole_pixels")]
    pub width: u32,
    #[serde(deserialize_with = "whole_pixels")]
    pub height: u32,
}

impl Viewport {
    /// Size used for the scene root when a page document carries no usable viewport.
    pub const SCENE_FALLBACK: Viewport = Viewport {
        width: 1200,
        height: 800,
    };

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn has_area(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1440,
            height: 900,
        }
    }
}

/// Accepts integral or fractional JSON numbers; negatives clamp to zero.
fn whole_pixels<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    Ok(value.round().clamp(0.0, u32::MAX as f64) as u32)
}

#[derive(Debug, Error)]
pub enum ViewportParseError {
    #[error("Invalid viewport format: expected WIDTHxHEIGHT (e.g., 1440x900)")]
    InvalidFormat,
    #[error("Invalid width: {0}")]
    InvalidWidth(String),
    #[error("Invalid height: {0}")]
    InvalidHeight(String),
    #[error("Viewport width and height must both be positive")]
    Empty,
}

impl FromStr for Viewport {
    type Err = ViewportParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        let (width, height) = normalized
            .split_once('x')
            .ok_or(ViewportParseError::InvalidFormat)?;
        if height.contains('x') {
            return Err(ViewportParseError::InvalidFormat);
        }

        let width: u32 = width
            .trim()
            .parse()
            .map_err(|_| ViewportParseError::InvalidWidth(width.trim().to_string()))?;
        let height: u32 = height
            .trim()
            .parse()
            .map_err(|_| ViewportParseError::InvalidHeight(height.trim().to_string()))?;

        let viewport = Viewport { width, height };
        if !viewport.has_area() {
            return Err(ViewportParseError::Empty);
        }
        Ok(viewport)
    }
}

impl std::fmt::Display for Viewport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_width_by_height() {
        let vp: Viewport = "1440x900".parse().unwrap();
        assert_eq!(vp, Viewport::default());

        let vp: Viewport = " 1920 X 1080 ".parse().unwrap();
        assert_eq!(vp.width, 1920);
        assert_eq!(vp.height, 1080);
    }

    #[test]
    fn rejects_malformed_and_empty_sizes() {
        assert!("1440".parse::<Viewport>().is_err());
        assert!("1440x900x600".parse::<Viewport>().is_err());
        assert!("abcx900".parse::<Viewport>().is_err());
        assert!("0x900".parse::<Viewport>().is_err());
        assert!("1440x0".parse::<Viewport>().is_err());
    }

    #[test]
    fn deserializes_fractional_dimensions() {
        let vp: Viewport = serde_json::from_str(r#"{"width": 1279.6, "height": 719}"#).unwrap();
        assert_eq!(vp.width, 1280);
        assert_eq!(vp.height, 719);
    }

    #[test]
    fn zero_sized_viewport_has_no_area() {
        let vp = Viewport {
            width: 0,
            height: 800,
        };
        assert!(!vp.has_area());
        assert!(Viewport::SCENE_FALLBACK.has_area());
        assert_eq!(Viewport::SCENE_FALLBACK.to_string(), "1200x800");
    }
}
