//! Page document to design scene reconstruction.
//!
//! - [`host`] - the injected scene-building capability
//! - [`engine`] - element-by-element mapping onto host nodes
//! - [`memory`] - an in-memory host used by the CLI and tests

mod engine;
pub mod host;
pub mod memory;
mod styles;

pub use engine::{display_name, Reconstructor};
pub use host::{
    FontName, HostError, Layout, LayoutMode, NodeKind, NodeProperty, Paint, ScaleMode, SceneHost,
    SizingMode, TextAutoResize, VerticalAlign,
};
pub use memory::{MemoryHost, NodeId, SceneNode, DEFAULT_FONT_FAMILIES};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::viewport::Viewport;

#[derive(Debug, Error)]
pub enum ReconstructError {
    #[error("Layout reconstruction failed: Failed to create any elements ({errors} errors)")]
    NothingCreated { errors: usize },

    #[error("Layout reconstruction failed: {0}")]
    Host(#[from] HostError),
}

/// How an `img` record finds its packaged bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum AssetMatching {
    /// Match the asset derived from the record's `src`; records without one
    /// use the first packaged image.
    #[default]
    ByKey,
    /// Every image uses the first packaged image.
    FirstAvailable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReconstructOptions {
    pub use_auto_layout: bool,
    pub asset_matching: AssetMatching,
    pub fallback_font: FontName,
    /// Root size when the page has no usable viewport.
    pub default_viewport: Viewport,
}

impl Default for ReconstructOptions {
    fn default() -> Self {
        Self {
            use_auto_layout: false,
            asset_matching: AssetMatching::default(),
            fallback_font: FontName::default(),
            default_viewport: Viewport::SCENE_FALLBACK,
        }
    }
}

/// Element indices by outcome. Every index lands in exactly one of
/// `created`, `skipped` or `failed`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconstructReport {
    pub total: usize,
    pub created: Vec<usize>,
    /// Non-positive width or height.
    pub skipped: Vec<usize>,
    pub failed: Vec<usize>,
    /// Created, but text styling failed.
    pub degraded: Vec<usize>,
    /// Created as an image placeholder.
    pub placeholders: Vec<usize>,
    /// Element index to its position among the root's children.
    pub node_index: BTreeMap<usize, usize>,
}

#[derive(Debug, Clone)]
pub struct Reconstruction<N> {
    pub root: N,
    pub report: ReconstructReport,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::css::Rgba;
    use crate::progress::ProgressUpdate;
    use crate::types::{AssetKind, ElementRecord, PackagedAsset, PackagedPage};
    use async_trait::async_trait;
    use image::{ImageBuffer, ImageFormat, Rgba as Pixel};
    use std::io::Cursor;

    fn png() -> Vec<u8> {
        let img = ImageBuffer::from_pixel(1, 1, Pixel([10u8, 20, 30, 255]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn element(tag: &str, text: &str, x: i32, y: i32, width: i32, height: i32) -> ElementRecord {
        ElementRecord {
            tag: tag.into(),
            text: text.into(),
            x,
            y,
            width,
            height,
            ..Default::default()
        }
    }

    fn page(elements: Vec<ElementRecord>) -> PackagedPage {
        let mut page = PackagedPage::new("Demo", "https://example.com/", Viewport::new(800, 600));
        page.elements = elements;
        page
    }

    async fn run(
        page: &PackagedPage,
        assets: &BTreeMap<String, Vec<u8>>,
        options: ReconstructOptions,
    ) -> (MemoryHost, Result<Reconstruction<NodeId>, ReconstructError>, Vec<ProgressUpdate>) {
        let mut host = MemoryHost::new();
        let mut updates = Vec::new();
        let result = Reconstructor::new(options)
            .run(page, assets, &mut host, &mut |update| updates.push(update))
            .await;
        (host, result, updates)
    }

    #[tokio::test]
    async fn heading_becomes_one_text_node() {
        let page = page(vec![element("h1", "Hello", 10, 20, 100, 40)]);
        let (host, result, _) = run(&page, &BTreeMap::new(), ReconstructOptions::default()).await;
        let report = result.unwrap().report;
        assert_eq!(report.created, vec![0]);

        let scene = host.scene();
        assert_eq!(scene.len(), 1);
        let root = &scene[0];
        assert_eq!((root.width, root.height), (800.0, 600.0));
        assert_eq!(root.name, "Demo");
        assert_eq!(root.fills, vec![Paint::solid(Rgba::WHITE)]);
        assert_eq!(root.children.len(), 1);
        let text = &root.children[0];
        assert_eq!(text.kind, NodeKind::Text);
        assert_eq!((text.x, text.y, text.width, text.height), (10.0, 20.0, 100.0, 40.0));
        assert_eq!(text.characters.as_deref(), Some("Hello"));
        assert_eq!(text.name, "H1: Hello");
        assert_eq!(text.text_auto_resize, Some(TextAutoResize::WidthAndHeight));
    }

    #[tokio::test]
    async fn zero_area_elements_are_skipped_and_all_skipped_fails() {
        let page = page(vec![
            element("div", "", 0, 0, 0, 10),
            element("p", "x", 0, 0, 10, -1),
        ]);
        let (host, result, updates) = run(&page, &BTreeMap::new(), ReconstructOptions::default()).await;
        let err = result.unwrap_err();
        assert!(matches!(err, ReconstructError::NothingCreated { errors: 2 }));
        assert!(err
            .to_string()
            .ends_with("Failed to create any elements (2 errors)"));
        assert!(host.scene().is_empty());
        assert_eq!(host.live_nodes(), 0);
        assert_eq!(updates.last().map(|u| u.percent), Some(90));
    }

    #[tokio::test]
    async fn transparent_background_never_fills() {
        let mut div = element("div", "", 0, 0, 50, 50);
        div.background_color = None;
        let mut red = element("div", "", 0, 0, 50, 50);
        red.background_color = Some("rgb(255, 0, 0)".into());
        let (host, result, _) =
            run(&page(vec![div, red]), &BTreeMap::new(), ReconstructOptions::default()).await;
        result.unwrap();
        let children = &host.scene()[0].children;
        assert!(children[0].fills.is_empty());
        assert_eq!(children[1].fills, vec![Paint::solid(Rgba::opaque(1.0, 0.0, 0.0))]);
    }

    #[tokio::test]
    async fn tag_mapping_follows_priority() {
        let elements = vec![
            element("button", "Go", 0, 0, 80, 30),
            element("button", "  ", 0, 40, 80, 30),
            element("a", "", 0, 80, 20, 20),
            element("a", "docs", 0, 100, 40, 20),
            element("div", "", 0, 120, 100, 100),
            element("div", "inline text", 0, 240, 100, 20),
        ];
        let (host, result, _) =
            run(&page(elements), &BTreeMap::new(), ReconstructOptions::default()).await;
        assert_eq!(result.unwrap().report.created.len(), 6);
        let kids = &host.scene()[0].children;
        let kinds: Vec<_> = kids.iter().map(|n| n.kind).collect();
        assert_eq!(
            kinds,
            [
                NodeKind::Frame,
                NodeKind::Frame,
                NodeKind::Frame,
                NodeKind::Text,
                NodeKind::Frame,
                NodeKind::Text
            ]
        );
        let label = &kids[0].children[0];
        assert_eq!(label.characters.as_deref(), Some("Go"));
        assert_eq!((label.x, label.y, label.width, label.height), (0.0, 0.0, 80.0, 30.0));
        assert_eq!(label.text_align_vertical, Some(VerticalAlign::Center));
        assert!(kids[1].children.is_empty());
    }

    #[tokio::test]
    async fn auto_layout_only_for_block_tags() {
        let elements = vec![
            element("div", "", 0, 0, 10, 10),
            element("a", "", 0, 0, 10, 10),
        ];
        let options = ReconstructOptions {
            use_auto_layout: true,
            ..ReconstructOptions::default()
        };
        let (host, result, _) = run(&page(elements), &BTreeMap::new(), options).await;
        result.unwrap();
        let kids = &host.scene()[0].children;
        assert_eq!(kids[0].layout, Some(Layout::VERTICAL_FIXED));
        assert_eq!(kids[1].layout, Some(Layout::ABSOLUTE));
    }

    #[tokio::test]
    async fn images_match_by_key_or_fall_back() {
        let mut logo = element("img", "", 0, 0, 10, 10);
        logo.src = Some("https://example.com/a/logo.png".into());
        let mut other = element("img", "", 0, 20, 10, 10);
        other.src = Some("https://example.com/missing.png".into());
        let legacy = element("img", "", 0, 40, 10, 10);
        let mut page = page(vec![logo, other, legacy]);
        page.assets.insert(
            "img/logo.png".into(),
            PackagedAsset {
                filename: Some("assets/images/logo.png".into()),
                original_url: "https://example.com/a/logo.png".into(),
                kind: AssetKind::Image,
                note: None,
            },
        );
        let assets = BTreeMap::from([("assets/images/logo.png".to_string(), png())]);

        let (host, result, _) = run(&page, &assets, ReconstructOptions::default()).await;
        let report = result.unwrap().report;
        assert_eq!(report.placeholders, vec![1]);
        let kids = &host.scene()[0].children;
        assert!(matches!(kids[0].fills[0], Paint::Image { .. }));
        assert_eq!(kids[1].fills, vec![Paint::solid(engine::PLACEHOLDER_GRAY)]);
        assert!(matches!(kids[2].fills[0], Paint::Image { .. }));

        let first = ReconstructOptions {
            asset_matching: AssetMatching::FirstAvailable,
            ..ReconstructOptions::default()
        };
        let (_, result, _) = run(&page, &assets, first).await;
        assert!(result.unwrap().report.placeholders.is_empty());
    }

    #[tokio::test]
    async fn undecodable_image_is_a_placeholder_not_a_failure() {
        let img = element("img", "", 0, 0, 10, 10);
        let assets = BTreeMap::from([("assets/images/x.png".to_string(), b"junk".to_vec())]);
        let (_, result, _) = run(&page(vec![img]), &assets, ReconstructOptions::default()).await;
        let report = result.unwrap().report;
        assert_eq!(report.created, vec![0]);
        assert_eq!(report.placeholders, vec![0]);
    }

    #[tokio::test]
    async fn missing_fallback_font_degrades_text() {
        let mut text = element("p", "styled", 0, 0, 10, 10);
        text.font_family = Some("Unknown Sans".into());
        let options = ReconstructOptions {
            fallback_font: FontName::new("Not Installed", "Regular"),
            ..ReconstructOptions::default()
        };
        let elements = vec![text, element("div", "", 0, 0, 5, 5)];
        let (host, result, _) = run(&page(elements), &BTreeMap::new(), options).await;
        let report = result.unwrap().report;
        assert_eq!(report.created, vec![0, 1]);
        assert_eq!(report.degraded, vec![0]);
        let node = &host.scene()[0].children[0];
        assert_eq!(node.characters.as_deref(), Some("styled"));
        assert_eq!(node.text_auto_resize, None);
    }

    #[tokio::test]
    async fn text_styles_fall_back_to_default_font() {
        let mut text = element("p", "styled", 0, 0, 10, 10);
        text.font_family = Some("Unknown Sans".into());
        text.font_weight = Some("bold".into());
        text.color = Some("#00ff00".into());
        text.background_color = Some("#ff0000".into());
        text.font_size = Some("1.5rem".into());
        text.text_align = Some("center".into());
        let (host, result, _) =
            run(&page(vec![text]), &BTreeMap::new(), ReconstructOptions::default()).await;
        assert!(result.unwrap().report.degraded.is_empty());
        let node = &host.scene()[0].children[0];
        assert_eq!(node.font_name, Some(FontName::default()));
        assert_eq!(node.font_size, Some(24.0));
        assert_eq!(node.fills, vec![Paint::solid(Rgba::opaque(0.0, 1.0, 0.0))]);
        assert_eq!(node.text_align_horizontal, Some(crate::css::TextAlign::Center));
    }

    #[tokio::test]
    async fn progress_reports_every_ten_elements() {
        let elements: Vec<_> = (0..25)
            .map(|i| element("div", "", 0, i, 10, 10))
            .collect();
        let (_, result, updates) =
            run(&page(elements), &BTreeMap::new(), ReconstructOptions::default()).await;
        result.unwrap();
        let percents: Vec<_> = updates.iter().map(|u| u.percent).collect();
        assert_eq!(percents, [42, 74, 90]);
        assert_eq!(updates[2].message, "Processing elements (25/25)");
    }

    #[tokio::test]
    async fn missing_viewport_uses_default_size() {
        let mut page = page(vec![element("div", "", 0, 0, 10, 10)]);
        page.viewport = None;
        page.title.clear();
        let (host, result, _) = run(&page, &BTreeMap::new(), ReconstructOptions::default()).await;
        result.unwrap();
        let root = &host.scene()[0];
        assert_eq!(root.name, "Imported Page");
        assert_eq!((root.width, root.height), (1200.0, 800.0));
    }

    /// Delegates to a [`MemoryHost`], refusing one font family and failing
    /// every property the predicate matches.
    struct FlakyHost {
        inner: MemoryHost,
        missing_family: Option<&'static str>,
        fails: Box<dyn Fn(&NodeProperty) -> bool + Send>,
    }

    impl FlakyHost {
        fn new(
            missing_family: Option<&'static str>,
            fails: impl Fn(&NodeProperty) -> bool + Send + 'static,
        ) -> Self {
            Self {
                inner: MemoryHost::new(),
                missing_family,
                fails: Box::new(fails),
            }
        }
    }

    #[async_trait]
    impl SceneHost for FlakyHost {
        type Node = NodeId;

        fn create_container(&mut self) -> Result<NodeId, HostError> {
            self.inner.create_container()
        }

        fn create_text(&mut self) -> Result<NodeId, HostError> {
            self.inner.create_text()
        }

        fn create_rectangle(&mut self) -> Result<NodeId, HostError> {
            self.inner.create_rectangle()
        }

        fn create_image(&mut self, bytes: &[u8]) -> Result<String, HostError> {
            self.inner.create_image(bytes)
        }

        async fn load_font(&mut self, font: &FontName) -> Result<(), HostError> {
            if self.missing_family == Some(font.family.as_str()) {
                return Err(HostError::FontUnavailable(font.clone()));
            }
            self.inner.load_font(font).await
        }

        fn set(&mut self, node: &NodeId, property: NodeProperty) -> Result<(), HostError> {
            if (self.fails)(&property) {
                return Err(HostError::Operation(format!("{} rejected", property.label())));
            }
            self.inner.set(node, property)
        }

        fn append_child(&mut self, parent: &NodeId, child: &NodeId) -> Result<(), HostError> {
            self.inner.append_child(parent, child)
        }

        fn remove(&mut self, node: &NodeId) {
            self.inner.remove(node)
        }

        fn commit(&mut self, root: &NodeId) -> Result<(), HostError> {
            self.inner.commit(root)
        }
    }

    async fn run_on(
        host: &mut FlakyHost,
        page: &PackagedPage,
        options: ReconstructOptions,
    ) -> (Result<Reconstruction<NodeId>, ReconstructError>, Vec<ProgressUpdate>) {
        let mut updates = Vec::new();
        let result = Reconstructor::new(options)
            .run(page, &BTreeMap::new(), host, &mut |update| updates.push(update))
            .await;
        (result, updates)
    }

    fn count_nodes(nodes: &[SceneNode]) -> usize {
        nodes.iter().map(|node| 1 + count_nodes(&node.children)).sum()
    }

    #[tokio::test]
    async fn text_uses_configured_fallback_when_default_family_is_missing() {
        let mut host = FlakyHost::new(Some("Inter"), |_| false);
        let mut heavy = element("p", "heavy", 0, 60, 100, 20);
        heavy.font_family = Some("Inter".into());
        heavy.font_weight = Some("700".into());
        let elements = vec![
            element("h1", "Title", 0, 0, 200, 40),
            element("button", "Go", 0, 40, 80, 20),
            heavy,
        ];
        let options = ReconstructOptions {
            fallback_font: FontName::new("Roboto", "Regular"),
            ..ReconstructOptions::default()
        };

        let (result, _) = run_on(&mut host, &page(elements), options).await;
        let report = result.unwrap().report;
        assert_eq!(report.created, vec![0, 1, 2]);
        assert!(report.failed.is_empty());
        assert!(report.degraded.is_empty());

        let kids = &host.inner.scene()[0].children;
        let roboto = Some(FontName::new("Roboto", "Regular"));
        assert_eq!(kids[0].characters.as_deref(), Some("Title"));
        assert_eq!(kids[0].font_name, roboto);
        assert_eq!(kids[1].children[0].characters.as_deref(), Some("Go"));
        assert_eq!(kids[1].children[0].font_name, roboto);
        assert_eq!(kids[2].font_name, roboto);
    }

    #[tokio::test]
    async fn text_without_any_font_is_degraded_not_failed() {
        let mut host = FlakyHost::new(Some("Inter"), |_| false);
        let options = ReconstructOptions {
            fallback_font: FontName::new("Not Installed", "Regular"),
            ..ReconstructOptions::default()
        };
        let (result, _) =
            run_on(&mut host, &page(vec![element("h1", "Title", 0, 0, 200, 40)]), options).await;
        let report = result.unwrap().report;
        assert_eq!(report.created, vec![0]);
        assert_eq!(report.degraded, vec![0]);
        let node = &host.inner.scene()[0].children[0];
        assert_eq!(node.kind, NodeKind::Text);
        assert_eq!(node.characters, None);
    }

    #[tokio::test]
    async fn host_failure_inside_one_element_leaves_the_rest() {
        let mut host = FlakyHost::new(None, |property| {
            matches!(property, NodeProperty::Name(name) if name.starts_with("P:"))
        });
        let mut elements: Vec<_> = (0..12)
            .map(|i| element("div", "", 0, i * 10, 10, 10))
            .collect();
        elements[3] = element("p", "broken", 0, 30, 50, 10);

        let (result, updates) = run_on(&mut host, &page(elements), ReconstructOptions::default()).await;
        let report = result.unwrap().report;
        assert_eq!(report.failed, vec![3]);
        assert_eq!(report.created.len(), 11);
        assert!(!report.created.contains(&3));
        assert_eq!(report.node_index.get(&4), Some(&3));

        let scene = host.inner.scene();
        assert_eq!(scene[0].children.len(), 11);
        assert_eq!(host.inner.live_nodes(), count_nodes(&scene));

        let percents: Vec<_> = updates.iter().map(|u| u.percent).collect();
        assert!(percents.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(percents.last(), Some(&90));
    }

    #[tokio::test]
    async fn failed_button_label_is_removed_with_its_button() {
        let mut host = FlakyHost::new(None, |property| {
            matches!(property, NodeProperty::TextAlignVertical(_))
        });
        let elements = vec![
            element("button", "Buy", 0, 0, 80, 30),
            element("div", "", 0, 40, 80, 30),
        ];

        let (result, _) = run_on(&mut host, &page(elements), ReconstructOptions::default()).await;
        let report = result.unwrap().report;
        assert_eq!(report.failed, vec![0]);
        assert_eq!(report.created, vec![1]);
        let scene = host.inner.scene();
        assert_eq!(host.inner.live_nodes(), count_nodes(&scene));
        assert_eq!(count_nodes(&scene), 2);
    }

    #[test]
    fn display_names_truncate_text() {
        let long = "x".repeat(31);
        assert_eq!(display_name(&element("p", &long, 0, 0, 1, 1)), format!("P: {}...", "x".repeat(30)));
        assert_eq!(display_name(&element("div", "", 0, 0, 1, 1)), "DIV");
    }
}
