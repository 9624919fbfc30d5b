//! Page Document interchange schema.
//!
//! A page document is the flat, ordered list of visible element records captured
//! from a rendered page plus the asset table that travels with it. The same shape
//! is used on both sides of the archive; only the asset record type differs:
//!
//! - [`CapturedPage`] carries inline data URIs straight out of the extractor.
//! - [`PackagedPage`] carries references to files packaged inside the archive.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::viewport::Viewport;

/// Schema version written into every captured page document.
pub const PAGE_SCHEMA_VERSION: &str = "1.0";

/// Key prefix used for image entries in the asset table.
pub const IMAGE_KEY_PREFIX: &str = "img/";

/// Archive directory holding packaged image bytes.
pub const PACKAGED_IMAGE_DIR: &str = "assets/images/";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageDocument<A> {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub viewport: Option<Viewport>,
    pub elements: Vec<ElementRecord>,
    #[serde(default = "BTreeMap::new")]
    pub assets: BTreeMap<String, A>,
}

/// Page document as produced by the extractor.
pub type CapturedPage = PageDocument<CapturedAsset>;

/// Page document as stored in an archive's `data.json`.
pub type PackagedPage = PageDocument<PackagedAsset>;

impl<A> PageDocument<A> {
    pub fn new(title: impl Into<String>, url: impl Into<String>, viewport: Viewport) -> Self {
        Self {
            version: PAGE_SCHEMA_VERSION.to_string(),
            title: title.into(),
            url: url.into(),
            viewport: Some(viewport),
            elements: Vec::new(),
            assets: BTreeMap::new(),
        }
    }

    /// Replace the asset table, keeping every other field untouched.
    pub fn with_assets<B>(self, assets: BTreeMap<String, B>) -> PageDocument<B> {
        PageDocument {
            version: self.version,
            title: self.title,
            url: self.url,
            viewport: self.viewport,
            elements: self.elements,
            assets,
        }
    }

    /// True when everything except the asset table matches.
    pub fn same_content<B>(&self, other: &PageDocument<B>) -> bool {
        self.version == other.version
            && self.title == other.title
            && self.url == other.url
            && self.viewport == other.viewport
            && self.elements == other.elements
    }
}

/// One visible element, flattened out of the DOM tree.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementRecord {
    pub tag: String,
    #[serde(default)]
    pub text: String,
    #[serde(deserialize_with = "rounded_pixels")]
    pub x: i32,
    #[serde(deserialize_with = "rounded_pixels")]
    pub y: i32,
    #[serde(deserialize_with = "rounded_pixels")]
    pub width: i32,
    #[serde(deserialize_with = "rounded_pixels")]
    pub height: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_align: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub padding: Option<Padding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_radius: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub box_shadow: Option<BoxShadow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_index: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    /// Absolute image source; only set for `img` records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
}

impl ElementRecord {
    pub fn kind(&self) -> ElementKind {
        ElementKind::from_tag(&self.tag)
    }

    pub fn has_area(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// Four CSS length strings, one per side.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Padding {
    #[serde(default)]
    pub top: String,
    #[serde(default)]
    pub right: String,
    #[serde(default)]
    pub bottom: String,
    #[serde(default)]
    pub left: String,
}

/// The first shadow of a computed `box-shadow`, already split into parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxShadow {
    #[serde(deserialize_with = "rounded_pixels")]
    pub x: i32,
    #[serde(deserialize_with = "rounded_pixels")]
    pub y: i32,
    #[serde(deserialize_with = "rounded_pixels")]
    pub blur: i32,
    #[serde(deserialize_with = "rounded_pixels")]
    pub spread: i32,
    pub color: String,
}

/// Coarse element classification driving both capture and reconstruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Image,
    Heading,
    Paragraph,
    Span,
    Button,
    Link,
    Container,
}

impl ElementKind {
    pub fn from_tag(tag: &str) -> Self {
        match tag.to_ascii_lowercase().as_str() {
            "img" => ElementKind::Image,
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => ElementKind::Heading,
            "p" => ElementKind::Paragraph,
            "span" => ElementKind::Span,
            "button" => ElementKind::Button,
            "a" => ElementKind::Link,
            _ => ElementKind::Container,
        }
    }

    /// Kinds that always map to a text node.
    pub fn is_text(self) -> bool {
        matches!(
            self,
            ElementKind::Heading | ElementKind::Paragraph | ElementKind::Span
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Image,
    #[serde(other)]
    Unknown,
}

/// Asset record on the capture side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedAsset {
    /// Data URI (`data:<mime>;base64,<payload>`), or `None` when unavailable.
    #[serde(default)]
    pub base64: Option<String>,
    pub url: String,
    #[serde(rename = "type")]
    pub kind: AssetKind,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub cors_blocked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl CapturedAsset {
    pub fn image(url: impl Into<String>, data_uri: String) -> Self {
        Self {
            base64: Some(data_uri),
            url: url.into(),
            kind: AssetKind::Image,
            cors_blocked: false,
            error: None,
            note: None,
        }
    }

    pub fn blocked(url: impl Into<String>) -> Self {
        Self {
            base64: None,
            url: url.into(),
            kind: AssetKind::Image,
            cors_blocked: true,
            error: None,
            note: None,
        }
    }

    pub fn failed(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            base64: None,
            url: url.into(),
            kind: AssetKind::Image,
            cors_blocked: false,
            error: Some(error.into()),
            note: None,
        }
    }

    /// Inline bytes that can be packaged, if any.
    pub fn packable_data(&self) -> Option<&str> {
        if self.cors_blocked {
            return None;
        }
        self.base64.as_deref().filter(|data| !data.is_empty())
    }
}

/// Asset record on the archive side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackagedAsset {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default)]
    pub original_url: String,
    #[serde(rename = "type")]
    pub kind: AssetKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Asset-table key for an image source: `img/<last path segment>`.
pub fn image_asset_key(url: &url::Url) -> String {
    let filename = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .unwrap_or("image.png");
    format!("{IMAGE_KEY_PREFIX}{filename}")
}

/// Archive path for an image asset key.
pub fn packaged_image_path(key: &str) -> String {
    let filename = key.strip_prefix(IMAGE_KEY_PREFIX).unwrap_or(key);
    format!("{PACKAGED_IMAGE_DIR}{filename}")
}

fn rounded_pixels<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    Ok(value.round().clamp(i32::MIN as f64, i32::MAX as f64) as i32)
}
