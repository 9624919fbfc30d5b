//! Serialized page snapshot types, as emitted by the Playwright capture script.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::types::{ComputedStyle, DomRect};
use crate::viewport::Viewport;
use crate::{H2dError, Result};

/// Raw script result wrapping a page snapshot.
#[derive(Debug, Deserialize)]
pub(crate) struct ScriptResultWithSnapshot {
    pub status: String,
    pub snapshot: Option<RawPageSnapshot>,
}

/// One rendered page: metadata plus every allow-listed element in document order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPageSnapshot {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub viewport: Option<Viewport>,
    #[serde(default)]
    pub nodes: Vec<RawNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawNode {
    pub tag: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub rect: RawRect,
    #[serde(default)]
    pub style: ComputedStyle,
    #[serde(default)]
    pub src: Option<String>,
    /// `false` when the browser gave up loading the image.
    #[serde(default = "default_complete")]
    pub complete: bool,
}

fn default_complete() -> bool {
    true
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRect {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
}

impl From<RawRect> for DomRect {
    fn from(raw: RawRect) -> Self {
        DomRect {
            x: raw.x,
            y: raw.y,
            width: raw.width,
            height: raw.height,
        }
    }
}

impl RawPageSnapshot {
    /// Read a snapshot previously saved as JSON.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            H2dError::Config(format!(
                "Snapshot file not found or unreadable: {} ({e})",
                path.display()
            ))
        })?;
        serde_json::from_str(&text).map_err(H2dError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_snapshot_deserializes_correctly() {
        let json = r#"{
            "url": "https://example.com",
            "title": "Example Page",
            "viewport": {"width": 1280, "height": 720},
            "nodes": [{
                "tag": "img",
                "text": "",
                "rect": {"x": 0, "y": 0, "width": 100, "height": 50.5},
                "style": {
                    "fontFamily": "Arial",
                    "fontSize": "16px",
                    "display": "block",
                    "visibility": "visible",
                    "opacity": "0.5",
                    "paddingTop": "4px"
                },
                "src": "/logo.png",
                "complete": false
            }]
        }"#;

        let snapshot: RawPageSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.url, "https://example.com");
        assert_eq!(snapshot.viewport.unwrap().width, 1280);
        let node = &snapshot.nodes[0];
        assert_eq!(node.tag, "img");
        assert_eq!(node.rect.height, 50.5);
        assert_eq!(node.style.font_size.as_deref(), Some("16px"));
        assert_eq!(node.style.padding_top.as_deref(), Some("4px"));
        assert_eq!(node.style.color, None);
        assert_eq!(node.src.as_deref(), Some("/logo.png"));
        assert!(!node.complete);
    }

    #[test]
    fn script_result_with_snapshot_deserializes() {
        let json = r#"{"status": "ok", "snapshot": {"url": "https://test.com", "title": "Test", "nodes": []}}"#;
        let result: ScriptResultWithSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(result.status, "ok");
        let snapshot = result.snapshot.unwrap();
        assert_eq!(snapshot.title, "Test");
        assert!(snapshot.nodes.is_empty());
        assert!(snapshot.viewport.is_none());
    }

    #[test]
    fn nodes_default_to_complete() {
        let node: RawNode = serde_json::from_str(r#"{"tag": "p"}"#).unwrap();
        assert!(node.complete);
        assert_eq!(DomRect::from(node.rect), DomRect::default());
    }
}
