use std::collections::BTreeMap;
use tracing::{debug, error, info, warn};
use url::Url;

use super::host::{
    FontName, HostError, Layout, NodeKind, NodeProperty, Paint, ScaleMode, SceneHost, VerticalAlign,
};
use super::styles::{activate_font, apply_common_styles, apply_text_styles, requested_font};
use super::{
    AssetMatching, ReconstructError, ReconstructOptions, ReconstructReport, Reconstruction,
};
use crate::css::{Rgba, TextAlign};
use crate::progress::ProgressUpdate;
use crate::types::{
    image_asset_key, packaged_image_path, ElementKind, ElementRecord, PackagedPage,
    PACKAGED_IMAGE_DIR,
};
use crate::viewport::Viewport;

pub(crate) const PLACEHOLDER_GRAY: Rgba = Rgba::opaque(0.9, 0.9, 0.9);
const DEFAULT_ROOT_NAME: &str = "Imported Page";
const NAME_EXCERPT_CHARS: usize = 30;
const PROGRESS_EVERY: usize = 10;
const AUTO_LAYOUT_TAGS: &[&str] = &["div", "section", "article", "nav", "header", "footer"];

/// Builds a host scene from a packaged page document.
#[derive(Debug, Clone, Default)]
pub struct Reconstructor {
    options: ReconstructOptions,
}

/// Outcome of building one element.
enum Built {
    Created,
    Degraded,
    Placeholder,
}

/// Per-run state, dropped when the run ends.
struct RunContext {
    report: ReconstructReport,
}

impl Reconstructor {
    pub fn new(options: ReconstructOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ReconstructOptions {
        &self.options
    }

    /// Build `page` into `host` under a single new root container.
    ///
    /// `assets` maps packaged paths (`assets/images/...`) to image bytes.
    /// Fails only if the root cannot be built or no element was created, in
    /// which case nothing is committed.
    pub async fn run<H: SceneHost>(
        &self,
        page: &PackagedPage,
        assets: &BTreeMap<String, Vec<u8>>,
        host: &mut H,
        progress: &mut dyn FnMut(ProgressUpdate),
    ) -> Result<Reconstruction<H::Node>, ReconstructError> {
        info!(
            title = %page.title,
            elements = page.elements.len(),
            assets = assets.len(),
            "starting layout reconstruction"
        );
        let root = self.create_root(page, host)?;
        let total = page.elements.len();
        let mut ctx = RunContext {
            report: ReconstructReport {
                total,
                ..ReconstructReport::default()
            },
        };

        for (index, record) in page.elements.iter().enumerate() {
            if !record.has_area() {
                debug!(
                    index,
                    width = record.width,
                    height = record.height,
                    "skipping element with no area"
                );
                ctx.report.skipped.push(index);
            } else {
                match self.create_element(host, page, assets, record).await {
                    Ok((node, built)) => {
                        match host.append_child(&root, &node) {
                            Ok(()) => {
                                ctx.report.node_index.insert(index, ctx.report.created.len());
                                ctx.report.created.push(index);
                                match built {
                                    Built::Created => {}
                                    Built::Degraded => ctx.report.degraded.push(index),
                                    Built::Placeholder => ctx.report.placeholders.push(index),
                                }
                            }
                            Err(err) => {
                                error!(index, tag = %record.tag, error = %err, "could not attach element");
                                host.remove(&node);
                                ctx.report.failed.push(index);
                            }
                        }
                    }
                    Err(err) => {
                        error!(index, tag = %record.tag, error = %err, "element failed");
                        ctx.report.failed.push(index);
                    }
                }
            }

            let processed = index + 1;
            if processed % PROGRESS_EVERY == 0 || processed == total {
                progress(ProgressUpdate::scaled(
                    processed,
                    total,
                    10,
                    80,
                    format!("Processing elements ({processed}/{total})"),
                ));
            }
        }

        let report = ctx.report;
        if report.created.is_empty() {
            host.remove(&root);
            error!(
                failed = report.failed.len(),
                skipped = report.skipped.len(),
                "no elements were created"
            );
            return Err(ReconstructError::NothingCreated {
                errors: report.failed.len() + report.skipped.len(),
            });
        }

        host.commit(&root)?;
        info!(
            created = report.created.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "layout reconstruction completed"
        );
        Ok(Reconstruction { root, report })
    }

    fn create_root<H: SceneHost>(
        &self,
        page: &PackagedPage,
        host: &mut H,
    ) -> Result<H::Node, ReconstructError> {
        let root = host.create_container()?;
        let name = if page.title.trim().is_empty() {
            DEFAULT_ROOT_NAME.to_string()
        } else {
            page.title.clone()
        };
        let size = match page.viewport {
            Some(viewport) if viewport.has_area() => viewport,
            _ => {
                warn!(fallback = %self.options.default_viewport, "no usable viewport, using default size");
                self.options.default_viewport
            }
        };
        let configured = configure_root(host, &root, name, size);
        if let Err(err) = configured {
            host.remove(&root);
            return Err(err.into());
        }
        Ok(root)
    }

    async fn create_element<H: SceneHost>(
        &self,
        host: &mut H,
        page: &PackagedPage,
        assets: &BTreeMap<String, Vec<u8>>,
        record: &ElementRecord,
    ) -> Result<(H::Node, Built), HostError> {
        let (node, kind, mut built) = match record.kind() {
            ElementKind::Image => self.create_image(host, page, assets, record)?,
            ElementKind::Heading | ElementKind::Paragraph | ElementKind::Span => {
                self.create_text(host, record).await?
            }
            ElementKind::Button => self.create_button(host, record).await?,
            ElementKind::Link if !record.text.is_empty() => self.create_text(host, record).await?,
            ElementKind::Container if !record.text.trim().is_empty() => {
                self.create_text(host, record).await?
            }
            ElementKind::Link | ElementKind::Container => self.create_container(host, record)?,
        };

        let configured = self.configure(host, &node, kind, record).await;
        match configured {
            Ok(text_styled) => {
                if !text_styled && matches!(built, Built::Created) {
                    built = Built::Degraded;
                }
                Ok((node, built))
            }
            Err(err) => {
                host.remove(&node);
                Err(err)
            }
        }
    }

    /// Geometry, name, common styles, then text styles.
    ///
    /// Returns `false` when text styling failed and the node was kept unstyled.
    async fn configure<H: SceneHost>(
        &self,
        host: &mut H,
        node: &H::Node,
        kind: NodeKind,
        record: &ElementRecord,
    ) -> Result<bool, HostError> {
        host.set(
            node,
            NodeProperty::Position {
                x: f64::from(record.x),
                y: f64::from(record.y),
            },
        )?;
        host.set(
            node,
            NodeProperty::Size {
                width: f64::from(record.width),
                height: f64::from(record.height),
            },
        )?;
        host.set(node, NodeProperty::Name(display_name(record)))?;
        apply_common_styles(host, node, kind, record)?;

        if kind == NodeKind::Text {
            if let Err(err) = apply_text_styles(host, node, record, &self.options.fallback_font).await {
                warn!(tag = %record.tag, error = %err, "text styling failed");
                return Ok(false);
            }
        }
        Ok(true)
    }

    async fn create_text<H: SceneHost>(
        &self,
        host: &mut H,
        record: &ElementRecord,
    ) -> Result<(H::Node, NodeKind, Built), HostError> {
        let (node, font_ok) = self.text_node(host, record).await?;
        let built = if font_ok { Built::Created } else { Built::Degraded };
        Ok((node, NodeKind::Text, built))
    }

    /// A text node holding the record's text in its resolved font.
    ///
    /// The flag is `false` when neither the requested nor the fallback font
    /// could be activated; the node is still returned.
    async fn text_node<H: SceneHost>(
        &self,
        host: &mut H,
        record: &ElementRecord,
    ) -> Result<(H::Node, bool), HostError> {
        let fallback = &self.options.fallback_font;
        let font = match activate_font(host, requested_font(record, fallback), fallback).await {
            Ok(font) => Some(font),
            Err(err) => {
                warn!(tag = %record.tag, error = %err, "no font could be activated");
                None
            }
        };
        let node = host.create_text()?;
        match fill_text(host, &node, font, &record.text).await {
            Ok(font_ok) => Ok((node, font_ok)),
            Err(err) => {
                host.remove(&node);
                Err(err)
            }
        }
    }

    fn create_container<H: SceneHost>(
        &self,
        host: &mut H,
        record: &ElementRecord,
    ) -> Result<(H::Node, NodeKind, Built), HostError> {
        let node = host.create_container()?;
        let layout = if self.options.use_auto_layout && AUTO_LAYOUT_TAGS.contains(&record.tag.as_str()) {
            Layout::VERTICAL_FIXED
        } else {
            Layout::ABSOLUTE
        };
        if let Err(err) = host.set(&node, NodeProperty::Layout(layout)) {
            host.remove(&node);
            return Err(err);
        }
        Ok((node, NodeKind::Frame, Built::Created))
    }

    async fn create_button<H: SceneHost>(
        &self,
        host: &mut H,
        record: &ElementRecord,
    ) -> Result<(H::Node, NodeKind, Built), HostError> {
        let button = host.create_container()?;
        match self.fill_button(host, &button, record).await {
            Ok(built) => Ok((button, NodeKind::Frame, built)),
            Err(err) => {
                host.remove(&button);
                Err(err)
            }
        }
    }

    async fn fill_button<H: SceneHost>(
        &self,
        host: &mut H,
        button: &H::Node,
        record: &ElementRecord,
    ) -> Result<Built, HostError> {
        host.set(button, NodeProperty::Layout(Layout::ABSOLUTE))?;
        if record.text.trim().is_empty() {
            return Ok(Built::Created);
        }

        let (label, font_ok) = self.text_node(host, record).await?;
        match self.place_label(host, button, &label, record).await {
            Ok(Built::Created) if !font_ok => Ok(Built::Degraded),
            Ok(built) => Ok(built),
            Err(err) => {
                host.remove(&label);
                Err(err)
            }
        }
    }

    /// Size, style and center `label`, then attach it to `button`.
    async fn place_label<H: SceneHost>(
        &self,
        host: &mut H,
        button: &H::Node,
        label: &H::Node,
        record: &ElementRecord,
    ) -> Result<Built, HostError> {
        host.set(label, NodeProperty::Position { x: 0.0, y: 0.0 })?;
        host.set(
            label,
            NodeProperty::Size {
                width: f64::from(record.width),
                height: f64::from(record.height),
            },
        )?;
        let built = match apply_text_styles(host, label, record, &self.options.fallback_font).await {
            Ok(()) => Built::Created,
            Err(err) => {
                warn!(error = %err, "button label styling failed");
                Built::Degraded
            }
        };
        host.set(label, NodeProperty::TextAlignHorizontal(TextAlign::Center))?;
        host.set(label, NodeProperty::TextAlignVertical(VerticalAlign::Center))?;
        host.append_child(button, label)?;
        Ok(built)
    }

    fn create_image<H: SceneHost>(
        &self,
        host: &mut H,
        page: &PackagedPage,
        assets: &BTreeMap<String, Vec<u8>>,
        record: &ElementRecord,
    ) -> Result<(H::Node, NodeKind, Built), HostError> {
        let rect = host.create_rectangle()?;
        let (paint, built) = match self.find_image_asset(page, assets, record) {
            Some((path, bytes)) => match host.create_image(bytes) {
                Ok(hash) => {
                    debug!(asset = %path, "image asset matched");
                    (
                        Paint::Image {
                            image_hash: hash,
                            scale_mode: ScaleMode::Fill,
                        },
                        Built::Created,
                    )
                }
                Err(err) => {
                    warn!(asset = %path, error = %err, "image creation failed, using placeholder");
                    (Paint::solid(PLACEHOLDER_GRAY), Built::Placeholder)
                }
            },
            None => {
                debug!(src = ?record.src, "no image asset, using placeholder");
                (Paint::solid(PLACEHOLDER_GRAY), Built::Placeholder)
            }
        };
        if let Err(err) = host.set(&rect, NodeProperty::Fills(vec![paint])) {
            host.remove(&rect);
            return Err(err);
        }
        Ok((rect, NodeKind::Rectangle, built))
    }

    fn find_image_asset<'a>(
        &self,
        page: &PackagedPage,
        assets: &'a BTreeMap<String, Vec<u8>>,
        record: &ElementRecord,
    ) -> Option<(&'a String, &'a Vec<u8>)> {
        let src = record.src.as_deref().and_then(|src| Url::parse(src).ok());
        match (self.options.asset_matching, src) {
            (AssetMatching::ByKey, Some(url)) => {
                let key = image_asset_key(&url);
                let path = page
                    .assets
                    .get(&key)
                    .and_then(|asset| asset.filename.clone())
                    .unwrap_or_else(|| packaged_image_path(&key));
                assets.get_key_value(&path)
            }
            _ => assets
                .iter()
                .find(|(path, _)| path.starts_with(PACKAGED_IMAGE_DIR)),
        }
    }
}

/// Set the font, then the characters.
///
/// Without an activated font the node keeps the host's own default font; if
/// that cannot be loaded either the node stays empty.
async fn fill_text<H: SceneHost>(
    host: &mut H,
    node: &H::Node,
    font: Option<FontName>,
    text: &str,
) -> Result<bool, HostError> {
    if let Some(font) = font {
        host.set(node, NodeProperty::Font(font))?;
        host.set(node, NodeProperty::Characters(text.to_string()))?;
        return Ok(true);
    }
    match host.load_font(&FontName::default()).await {
        Ok(()) => host.set(node, NodeProperty::Characters(text.to_string()))?,
        Err(err) => warn!(error = %err, "host default font unavailable, text left empty"),
    }
    Ok(false)
}

fn configure_root<H: SceneHost>(
    host: &mut H,
    root: &H::Node,
    name: String,
    size: Viewport,
) -> Result<(), HostError> {
    host.set(root, NodeProperty::Name(name))?;
    host.set(root, NodeProperty::Layout(Layout::ABSOLUTE))?;
    host.set(
        root,
        NodeProperty::Size {
            width: f64::from(size.width),
            height: f64::from(size.height),
        },
    )?;
    host.set(root, NodeProperty::Fills(vec![Paint::solid(Rgba::WHITE)]))
}

/// `TAG` or `TAG: <first 30 chars>...`.
pub fn display_name(record: &ElementRecord) -> String {
    let mut name = record.tag.to_uppercase();
    if !record.text.is_empty() {
        let excerpt: String = record.text.chars().take(NAME_EXCERPT_CHARS).collect();
        name.push_str(": ");
        name.push_str(&excerpt);
        if record.text.chars().count() > NAME_EXCERPT_CHARS {
            name.push_str("...");
        }
    }
    name
}
