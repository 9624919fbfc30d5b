//! In-memory [`SceneHost`] whose committed scene serializes to JSON.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

use super::host::{
    FontName, HostError, Layout, NodeKind, NodeProperty, Paint, SceneHost, TextAutoResize,
    VerticalAlign,
};
use crate::archive::crc32;
use crate::css::{DropShadow, Insets, TextAlign};

/// Families a fresh host can load, in the "Regular" style only.
pub const DEFAULT_FONT_FAMILIES: &[&str] = &["Inter", "Roboto"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneNode {
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fills: Vec<Paint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corner_radius: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<DropShadow>,
    pub opacity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub padding: Option<Insets>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<Layout>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub characters: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_name: Option<FontName>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_align_horizontal: Option<TextAlign>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_align_vertical: Option<VerticalAlign>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_auto_resize: Option<TextAutoResize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            name: String::new(),
            x: 0.0,
            y: 0.0,
            width: 100.0,
            height: 100.0,
            fills: Vec::new(),
            corner_radius: None,
            effects: Vec::new(),
            opacity: 1.0,
            padding: None,
            layout: None,
            characters: None,
            font_name: None,
            font_size: None,
            text_align_horizontal: None,
            text_align_vertical: None,
            text_auto_resize: None,
            children: Vec::new(),
        }
    }
}

#[derive(Debug)]
struct Slot {
    node: SceneNode,
    children: Vec<NodeId>,
    attached: bool,
}

/// A scene host that keeps everything in memory.
///
/// Fonts must be loaded before a text node may use them. Only the regular
/// style of [`DEFAULT_FONT_FAMILIES`] and families added with
/// [`MemoryHost::add_font_family`] load successfully.
#[derive(Debug)]
pub struct MemoryHost {
    slots: Vec<Option<Slot>>,
    available_fonts: HashSet<FontName>,
    loaded_fonts: HashSet<FontName>,
    images: BTreeMap<String, usize>,
    roots: Vec<NodeId>,
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHost {
    pub fn new() -> Self {
        let available_fonts = DEFAULT_FONT_FAMILIES
            .iter()
            .map(|family| FontName::new(*family, "Regular"))
            .collect();
        Self {
            slots: Vec::new(),
            available_fonts,
            loaded_fonts: HashSet::new(),
            images: BTreeMap::new(),
            roots: Vec::new(),
        }
    }

    /// Make every standard style of `family` loadable.
    pub fn add_font_family(&mut self, family: &str) {
        for weight in (100..=900).step_by(100) {
            self.available_fonts
                .insert(FontName::new(family, crate::css::font_style_for_weight(weight)));
        }
    }

    /// Byte length of each registered image, by hash.
    pub fn images(&self) -> &BTreeMap<String, usize> {
        &self.images
    }

    /// Committed roots, children resolved.
    pub fn scene(&self) -> Vec<SceneNode> {
        self.roots.iter().filter_map(|id| self.resolve(*id)).collect()
    }

    /// Nodes that were created and not removed, attached or not.
    pub fn live_nodes(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    fn resolve(&self, id: NodeId) -> Option<SceneNode> {
        let slot = self.slots.get(id.0)?.as_ref()?;
        let mut node = slot.node.clone();
        node.children = slot
            .children
            .iter()
            .filter_map(|child| self.resolve(*child))
            .collect();
        Some(node)
    }

    fn create(&mut self, kind: NodeKind) -> NodeId {
        self.slots.push(Some(Slot {
            node: SceneNode::new(kind),
            children: Vec::new(),
            attached: false,
        }));
        NodeId(self.slots.len() - 1)
    }

    fn slot_mut(&mut self, id: &NodeId) -> Result<&mut Slot, HostError> {
        self.slots
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(HostError::UnknownNode)
    }

    fn require_loaded(&self, font: &FontName) -> Result<(), HostError> {
        if self.loaded_fonts.contains(font) {
            Ok(())
        } else {
            Err(HostError::FontNotLoaded(font.clone()))
        }
    }
}

fn text_only(kind: NodeKind, operation: &'static str) -> Result<(), HostError> {
    if kind == NodeKind::Text {
        Ok(())
    } else {
        Err(HostError::Unsupported { operation, kind })
    }
}

#[async_trait]
impl SceneHost for MemoryHost {
    type Node = NodeId;

    fn create_container(&mut self) -> Result<NodeId, HostError> {
        Ok(self.create(NodeKind::Frame))
    }

    fn create_text(&mut self) -> Result<NodeId, HostError> {
        let id = self.create(NodeKind::Text);
        self.slot_mut(&id)?.node.font_name = Some(FontName::default());
        Ok(id)
    }

    fn create_rectangle(&mut self) -> Result<NodeId, HostError> {
        Ok(self.create(NodeKind::Rectangle))
    }

    fn create_image(&mut self, bytes: &[u8]) -> Result<String, HostError> {
        image::guess_format(bytes).map_err(|_| HostError::UnsupportedImage)?;
        let hash = format!("{:08x}{:08x}", crc32(bytes), bytes.len());
        self.images.insert(hash.clone(), bytes.len());
        Ok(hash)
    }

    async fn load_font(&mut self, font: &FontName) -> Result<(), HostError> {
        if !self.available_fonts.contains(font) {
            return Err(HostError::FontUnavailable(font.clone()));
        }
        self.loaded_fonts.insert(font.clone());
        Ok(())
    }

    fn set(&mut self, id: &NodeId, property: NodeProperty) -> Result<(), HostError> {
        let kind = self.slot_mut(id)?.node.kind;
        match &property {
            NodeProperty::Characters(_) => {
                text_only(kind, property.label())?;
                let font = self.slot_mut(id)?.node.font_name.clone().unwrap_or_default();
                self.require_loaded(&font)?;
            }
            NodeProperty::Font(font) => {
                text_only(kind, property.label())?;
                self.require_loaded(font)?;
            }
            NodeProperty::FontSize(_)
            | NodeProperty::TextAlignHorizontal(_)
            | NodeProperty::TextAlignVertical(_)
            | NodeProperty::TextAutoResize(_) => text_only(kind, property.label())?,
            NodeProperty::CornerRadius(_) if !kind.has_corner_radius() => {
                return Err(HostError::Unsupported {
                    operation: property.label(),
                    kind,
                })
            }
            NodeProperty::Padding(_) | NodeProperty::Layout(_) if !kind.has_padding() => {
                return Err(HostError::Unsupported {
                    operation: property.label(),
                    kind,
                })
            }
            NodeProperty::Size { width, height } if *width < 0.01 || *height < 0.01 => {
                return Err(HostError::Operation(format!(
                    "cannot resize to {width}x{height}"
                )))
            }
            _ => {}
        }

        let node = &mut self.slot_mut(id)?.node;
        match property {
            NodeProperty::Name(name) => node.name = name,
            NodeProperty::Position { x, y } => {
                node.x = x;
                node.y = y;
            }
            NodeProperty::Size { width, height } => {
                node.width = width;
                node.height = height;
            }
            NodeProperty::Fills(fills) => node.fills = fills,
            NodeProperty::CornerRadius(radius) => node.corner_radius = Some(radius),
            NodeProperty::Effects(effects) => node.effects = effects,
            NodeProperty::Opacity(opacity) => node.opacity = opacity,
            NodeProperty::Padding(padding) => node.padding = Some(padding),
            NodeProperty::Layout(layout) => node.layout = Some(layout),
            NodeProperty::Characters(text) => node.characters = Some(text),
            NodeProperty::Font(font) => node.font_name = Some(font),
            NodeProperty::FontSize(size) => node.font_size = Some(size),
            NodeProperty::TextAlignHorizontal(align) => node.text_align_horizontal = Some(align),
            NodeProperty::TextAlignVertical(align) => node.text_align_vertical = Some(align),
            NodeProperty::TextAutoResize(mode) => node.text_auto_resize = Some(mode),
        }
        Ok(())
    }

    fn append_child(&mut self, parent: &NodeId, child: &NodeId) -> Result<(), HostError> {
        if parent == child {
            return Err(HostError::Operation("a node cannot contain itself".into()));
        }
        let kind = self.slot_mut(parent)?.node.kind;
        if kind != NodeKind::Frame {
            return Err(HostError::Unsupported {
                operation: "appendChild",
                kind,
            });
        }
        let child_slot = self.slot_mut(child)?;
        if child_slot.attached {
            return Err(HostError::Operation("node already has a parent".into()));
        }
        child_slot.attached = true;
        self.slot_mut(parent)?.children.push(*child);
        Ok(())
    }

    fn remove(&mut self, id: &NodeId) {
        let Some(slot) = self.slots.get_mut(id.0).and_then(Option::take) else {
            return;
        };
        for child in slot.children {
            self.remove(&child);
        }
        debug!(node = id.0, "removed node");
    }

    fn commit(&mut self, root: &NodeId) -> Result<(), HostError> {
        let slot = self.slot_mut(root)?;
        if slot.attached {
            return Err(HostError::Operation("only detached nodes can be committed".into()));
        }
        slot.attached = true;
        self.roots.push(*root);
        Ok(())
    }
}
