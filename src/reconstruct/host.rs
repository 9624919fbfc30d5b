//! The scene-building capability the reconstructor drives.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::css::{DropShadow, Insets, Rgba, TextAlign};

#[derive(Debug, Error)]
pub enum HostError {
    #[error("font {0} is not available")]
    FontUnavailable(FontName),

    #[error("font {0} has not been loaded")]
    FontNotLoaded(FontName),

    #[error("image data is not in a supported format")]
    UnsupportedImage,

    #[error("{operation} is not supported on {kind:?} nodes")]
    Unsupported {
        operation: &'static str,
        kind: NodeKind,
    },

    #[error("unknown node handle")]
    UnknownNode,

    #[error("{0}")]
    Operation(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeKind {
    Frame,
    Text,
    Rectangle,
}

impl NodeKind {
    pub fn has_corner_radius(self) -> bool {
        matches!(self, NodeKind::Frame | NodeKind::Rectangle)
    }

    pub fn has_padding(self) -> bool {
        matches!(self, NodeKind::Frame)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FontName {
    pub family: String,
    pub style: String,
}

impl FontName {
    pub fn new(family: impl Into<String>, style: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            style: style.into(),
        }
    }
}

impl Default for FontName {
    fn default() -> Self {
        Self::new("Inter", "Regular")
    }
}

impl fmt::Display for FontName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.family, self.style)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScaleMode {
    Fill,
    Fit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Paint {
    Solid {
        color: Rgba,
    },
    #[serde(rename_all = "camelCase")]
    Image {
        image_hash: String,
        scale_mode: ScaleMode,
    },
}

impl Paint {
    pub fn solid(color: Rgba) -> Self {
        Paint::Solid { color }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LayoutMode {
    #[default]
    None,
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SizingMode {
    Fixed,
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layout {
    pub mode: LayoutMode,
    pub primary_axis_sizing: SizingMode,
    pub counter_axis_sizing: SizingMode,
    pub item_spacing: f64,
}

impl Layout {
    pub const ABSOLUTE: Layout = Layout {
        mode: LayoutMode::None,
        primary_axis_sizing: SizingMode::Fixed,
        counter_axis_sizing: SizingMode::Fixed,
        item_spacing: 0.0,
    };

    pub const VERTICAL_FIXED: Layout = Layout {
        mode: LayoutMode::Vertical,
        primary_axis_sizing: SizingMode::Fixed,
        counter_axis_sizing: SizingMode::Fixed,
        item_spacing: 0.0,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerticalAlign {
    Top,
    Center,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TextAutoResize {
    None,
    Height,
    WidthAndHeight,
}

/// One configurable property of a scene node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeProperty {
    Name(String),
    Position { x: f64, y: f64 },
    Size { width: f64, height: f64 },
    Fills(Vec<Paint>),
    CornerRadius(f64),
    Effects(Vec<DropShadow>),
    Opacity(f64),
    Padding(Insets),
    Layout(Layout),
    Characters(String),
    Font(FontName),
    FontSize(f64),
    TextAlignHorizontal(TextAlign),
    TextAlignVertical(VerticalAlign),
    TextAutoResize(TextAutoResize),
}

impl NodeProperty {
    pub fn label(&self) -> &'static str {
        match self {
            NodeProperty::Name(_) => "name",
            NodeProperty::Position { .. } => "position",
            NodeProperty::Size { .. } => "size",
            NodeProperty::Fills(_) => "fills",
            NodeProperty::CornerRadius(_) => "cornerRadius",
            NodeProperty::Effects(_) => "effects",
            NodeProperty::Opacity(_) => "opacity",
            NodeProperty::Padding(_) => "padding",
            NodeProperty::Layout(_) => "layout",
            NodeProperty::Characters(_) => "characters",
            NodeProperty::Font(_) => "fontName",
            NodeProperty::FontSize(_) => "fontSize",
            NodeProperty::TextAlignHorizontal(_) => "textAlignHorizontal",
            NodeProperty::TextAlignVertical(_) => "textAlignVertical",
            NodeProperty::TextAutoResize(_) => "textAutoResize",
        }
    }
}

/// A retained-mode design document that nodes can be built into.
///
/// Node handles are opaque to the reconstructor; every mutation goes through
/// the host so that failures surface as [`HostError`]s.
#[async_trait]
pub trait SceneHost: Send {
    type Node: Clone + fmt::Debug + Send + Sync;

    fn create_container(&mut self) -> Result<Self::Node, HostError>;

    fn create_text(&mut self) -> Result<Self::Node, HostError>;

    fn create_rectangle(&mut self) -> Result<Self::Node, HostError>;

    /// Register encoded image bytes, returning the hash an image paint refers to.
    fn create_image(&mut self, bytes: &[u8]) -> Result<String, HostError>;

    async fn load_font(&mut self, font: &FontName) -> Result<(), HostError>;

    fn set(&mut self, node: &Self::Node, property: NodeProperty) -> Result<(), HostError>;

    fn append_child(&mut self, parent: &Self::Node, child: &Self::Node) -> Result<(), HostError>;

    /// Discard a node that was never attached.
    fn remove(&mut self, node: &Self::Node);

    /// Place a finished root in the document.
    fn commit(&mut self, root: &Self::Node) -> Result<(), HostError>;
}
