//! DOM to page document extraction.
//!
//! The [`Extractor`] walks a [`LiveDocument`] once: every allow-listed,
//! visible element becomes an [`ElementRecord`](crate::types::ElementRecord),
//! then every image element is copied into the asset table. Failures on a
//! single element or image are logged and skipped.

mod document;
mod images;
mod style;

pub use document::{DomError, LiveDocument};
pub use images::{capture_image, resolve_source, IMAGE_LOAD_TIMEOUT_MESSAGE};
pub use style::{
    build_record, declared_background, first_font_family, is_visible, parse_shadow_capture,
    round_px,
};

use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::types::{CapturedPage, ElementRecord, PageDocument};

/// Element kinds the extractor asks the document for, in this order.
pub const ELEMENT_KINDS: &[&str] = &[
    "div", "p", "h1", "h2", "h3", "h4", "h5", "h6", "span", "a", "button", "img",
];

pub const DEFAULT_IMAGE_TIMEOUT: Duration = Duration::from_secs(3);

const UNTITLED: &str = "Untitled";

#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Upper bound on waiting for a single image to finish loading.
    pub image_timeout: Duration,
    pub capture_images: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            image_timeout: DEFAULT_IMAGE_TIMEOUT,
            capture_images: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Extractor {
    options: ExtractOptions,
}

impl Extractor {
    pub fn new(options: ExtractOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Produce one page document from a rendered document.
    ///
    /// Only a failing element query aborts the run.
    pub async fn capture<D: LiveDocument>(&self, document: &D) -> Result<CapturedPage, DomError> {
        let title = document.title().await;
        let title = if title.trim().is_empty() {
            UNTITLED.to_string()
        } else {
            title
        };
        let location = document.location().await;
        let base = Url::parse(&location).ok();
        let mut page = PageDocument::new(title, location, document.viewport().await);

        let elements = document.query_all(ELEMENT_KINDS).await?;
        let total = elements.len();
        for (index, element) in elements.iter().enumerate() {
            match read_element(document, element, base.as_ref()).await {
                Ok(Some(record)) => page.elements.push(record),
                Ok(None) => {}
                Err(err) => warn!(index, error = %err, "skipping element"),
            }
        }
        debug!(
            queried = total,
            recorded = page.elements.len(),
            "elements extracted"
        );

        if self.options.capture_images {
            for element in document.query_all(&["img"]).await? {
                let Some((key, asset)) =
                    capture_image(document, &element, base.as_ref(), self.options.image_timeout)
                        .await
                else {
                    continue;
                };
                if page.assets.insert(key.clone(), asset).is_some() {
                    debug!(asset = %key, "asset key collision, keeping the later image");
                }
            }
        }

        info!(
            url = %page.url,
            elements = page.elements.len(),
            assets = page.assets.len(),
            "page captured"
        );
        Ok(page)
    }
}

/// `Ok(None)` for elements that fail the visibility check.
async fn read_element<D: LiveDocument>(
    document: &D,
    element: &D::Element,
    base: Option<&Url>,
) -> Result<Option<ElementRecord>, DomError> {
    let rect = document.bounding_rect(element).await?;
    let style = document.computed_style(element).await?;
    if !is_visible(&rect, &style) {
        return Ok(None);
    }
    let tag = document.tag_name(element).await?;
    let text = document.inner_text(element).await?;
    let mut record = build_record(&tag, &text, &rect, &style);
    if record.tag == "img" {
        record.src = document
            .image_source(element)
            .await
            .and_then(|src| resolve_source(base, &src))
            .map(String::from);
    }
    Ok(Some(record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::{RawNode, RawPageSnapshot, RawRect, SnapshotDocument, StaticFetcher};
    use crate::types::ComputedStyle;
    use crate::viewport::Viewport;
    use image::{ImageBuffer, ImageFormat, Rgba as Pixel};
    use std::io::Cursor;

    fn rect(x: f64, y: f64, width: f64, height: f64) -> RawRect {
        RawRect {
            x,
            y,
            width,
            height,
        }
    }

    fn node(tag: &str, text: &str, r: RawRect) -> RawNode {
        RawNode {
            tag: tag.into(),
            text: text.into(),
            rect: r,
            complete: true,
            ..Default::default()
        }
    }

    fn png() -> Vec<u8> {
        let img = ImageBuffer::from_pixel(1, 1, Pixel([0u8, 0, 255, 255]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn snapshot(nodes: Vec<RawNode>) -> RawPageSnapshot {
        RawPageSnapshot {
            url: "https://example.com/".into(),
            title: "Example".into(),
            viewport: Some(Viewport::new(800, 600)),
            nodes,
        }
    }

    #[tokio::test]
    async fn records_visible_elements_in_document_order() {
        let mut hidden = node("p", "hidden", rect(0.0, 0.0, 10.0, 10.0));
        hidden.style = ComputedStyle {
            visibility: Some("hidden".into()),
            ..Default::default()
        };
        let mut faded = node("span", "faded", rect(0.0, 0.0, 10.0, 10.0));
        faded.style.opacity = Some("0".into());
        let mut styled = node("h1", "  Hello  ", rect(10.4, 19.6, 100.0, 40.0));
        styled.style = ComputedStyle {
            background_color: Some("rgba(0, 0, 0, 0)".into()),
            font_family: Some("\"Helvetica Neue\", Arial".into()),
            ..Default::default()
        };
        let nodes = vec![
            styled,
            hidden,
            node("div", "", rect(0.0, 0.0, 0.0, 50.0)),
            faded,
            node("section", "not allow-listed", rect(0.0, 0.0, 5.0, 5.0)),
            node("a", "link", rect(1.0, 2.0, 3.0, 4.0)),
        ];
        let doc = SnapshotDocument::new(snapshot(nodes), StaticFetcher::new());
        let page = Extractor::default().capture(&doc).await.unwrap();

        assert_eq!(page.title, "Example");
        assert_eq!(page.viewport, Some(Viewport::new(800, 600)));
        let tags: Vec<_> = page.elements.iter().map(|e| e.tag.as_str()).collect();
        assert_eq!(tags, ["h1", "a"]);
        let h1 = &page.elements[0];
        assert_eq!((h1.x, h1.y, h1.width, h1.height), (10, 20, 100, 40));
        assert_eq!(h1.text, "Hello");
        assert_eq!(h1.background_color, None);
        assert_eq!(h1.font_family.as_deref(), Some("Helvetica Neue"));
        assert!(page.assets.is_empty());
    }

    #[tokio::test]
    async fn empty_title_becomes_untitled() {
        let mut snap = snapshot(vec![]);
        snap.title = "   ".into();
        let doc = SnapshotDocument::new(snap, StaticFetcher::new());
        let page = Extractor::default().capture(&doc).await.unwrap();
        assert_eq!(page.title, "Untitled");
        assert!(page.elements.is_empty());
    }

    #[tokio::test]
    async fn image_failures_are_isolated_per_asset() {
        let mut good = node("img", "", rect(0.0, 0.0, 20.0, 20.0));
        good.src = Some("/media/logo.png".into());
        let mut locked = node("img", "", rect(0.0, 30.0, 20.0, 20.0));
        locked.src = Some("https://cdn.other.com/locked.png".into());
        let mut broken = node("img", "", rect(0.0, 60.0, 20.0, 20.0));
        broken.src = Some("broken.png".into());
        broken.complete = false;
        let fetcher = StaticFetcher::new()
            .with_image("https://example.com/media/logo.png", png())
            .with_refused("https://cdn.other.com/locked.png");
        let doc = SnapshotDocument::new(snapshot(vec![good, locked, broken]), fetcher);

        let page = Extractor::default().capture(&doc).await.unwrap();
        assert_eq!(page.elements.len(), 3);
        assert_eq!(
            page.elements[0].src.as_deref(),
            Some("https://example.com/media/logo.png")
        );

        let logo = &page.assets["img/logo.png"];
        assert!(logo.base64.as_deref().unwrap().starts_with("data:image/png"));
        let locked = &page.assets["img/locked.png"];
        assert!(locked.cors_blocked);
        assert_eq!(locked.url, "https://cdn.other.com/locked.png");
        let broken = &page.assets["img/broken.png"];
        assert!(broken.base64.is_none());
        assert!(broken.error.is_some());
    }

    #[tokio::test]
    async fn images_can_be_skipped() {
        let mut img = node("img", "", rect(0.0, 0.0, 20.0, 20.0));
        img.src = Some("a.png".into());
        let doc = SnapshotDocument::new(snapshot(vec![img]), StaticFetcher::new());
        let extractor = Extractor::new(ExtractOptions {
            capture_images: false,
            ..ExtractOptions::default()
        });
        let page = extractor.capture(&doc).await.unwrap();
        assert_eq!(page.elements.len(), 1);
        assert!(page.assets.is_empty());
    }
}
