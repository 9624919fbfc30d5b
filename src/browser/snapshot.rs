//! [`LiveDocument`] over a serialized page snapshot.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::ImageFormat;
use std::collections::HashMap;
use std::io::Cursor;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

use super::dom::{RawNode, RawPageSnapshot};
use super::fetch::ImageFetcher;
use crate::extract::{resolve_source, DomError, LiveDocument};
use crate::types::{ComputedStyle, DomRect};
use crate::viewport::Viewport;

#[derive(Debug, Clone)]
enum LoadState {
    Loaded(Vec<u8>),
    Blocked,
}

/// A captured page replayed as a live document.
///
/// Image pixels are pulled through the fetcher the first time an image is
/// waited on; `data:` sources are decoded locally and never hit the fetcher.
pub struct SnapshotDocument<F> {
    snapshot: RawPageSnapshot,
    fetcher: F,
    base: Option<Url>,
    loads: Mutex<HashMap<usize, LoadState>>,
}

impl<F: ImageFetcher> SnapshotDocument<F> {
    pub fn new(snapshot: RawPageSnapshot, fetcher: F) -> Self {
        let base = Url::parse(&snapshot.url).ok();
        Self {
            snapshot,
            fetcher,
            base,
            loads: Mutex::new(HashMap::new()),
        }
    }

    pub fn snapshot(&self) -> &RawPageSnapshot {
        &self.snapshot
    }

    fn node(&self, element: &usize) -> Result<&RawNode, DomError> {
        self.snapshot.nodes.get(*element).ok_or(DomError::Detached)
    }

    fn source_url(&self, element: &usize) -> Result<Url, DomError> {
        let src = self
            .node(element)?
            .src
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| DomError::read("src", "element has no image source"))?;
        resolve_source(self.base.as_ref(), src)
            .ok_or_else(|| DomError::read("src", format!("cannot resolve {src}")))
    }
}

#[async_trait]
impl<F: ImageFetcher> LiveDocument for SnapshotDocument<F> {
    type Element = usize;

    async fn title(&self) -> String {
        self.snapshot.title.clone()
    }

    async fn location(&self) -> String {
        self.snapshot.url.clone()
    }

    async fn viewport(&self) -> Viewport {
        self.snapshot.viewport.unwrap_or_default()
    }

    async fn query_all(&self, tags: &[&str]) -> Result<Vec<usize>, DomError> {
        Ok(self
            .snapshot
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| tags.iter().any(|tag| tag.eq_ignore_ascii_case(&node.tag)))
            .map(|(index, _)| index)
            .collect())
    }

    async fn tag_name(&self, element: &usize) -> Result<String, DomError> {
        Ok(self.node(element)?.tag.clone())
    }

    async fn bounding_rect(&self, element: &usize) -> Result<DomRect, DomError> {
        Ok(self.node(element)?.rect.into())
    }

    async fn computed_style(&self, element: &usize) -> Result<ComputedStyle, DomError> {
        Ok(self.node(element)?.style.clone())
    }

    async fn inner_text(&self, element: &usize) -> Result<String, DomError> {
        Ok(self.node(element)?.text.clone())
    }

    async fn image_source(&self, element: &usize) -> Option<String> {
        let node = self.snapshot.nodes.get(*element)?;
        if !node.tag.eq_ignore_ascii_case("img") {
            return None;
        }
        node.src.clone().filter(|src| !src.is_empty())
    }

    async fn is_loaded(&self, element: &usize) -> bool {
        self.loads.lock().await.contains_key(element)
    }

    async fn wait_for_load(&self, element: &usize) -> Result<(), DomError> {
        if !self.node(element)?.complete {
            return Err(DomError::ImageLoad("Image load error".into()));
        }
        let url = self.source_url(element)?;

        let state = if url.scheme() == "data" {
            match decode_data_url(url.as_str()) {
                Some(bytes) => LoadState::Loaded(bytes),
                None => return Err(DomError::ImageLoad("Malformed data URI".into())),
            }
        } else {
            match self.fetcher.fetch(&url).await {
                Ok(bytes) => LoadState::Loaded(bytes),
                Err(err) if err.is_refusal() => {
                    debug!(url = %url, error = %err, "image refused");
                    LoadState::Blocked
                }
                Err(err) => return Err(DomError::ImageLoad(format!("Image load error: {err}"))),
            }
        };
        self.loads.lock().await.insert(*element, state);
        Ok(())
    }

    async fn copy_pixels(&self, element: &usize) -> Result<Option<String>, DomError> {
        let loads = self.loads.lock().await;
        match loads.get(element) {
            Some(LoadState::Loaded(bytes)) => Ok(reencode_png(bytes)),
            Some(LoadState::Blocked) => Ok(None),
            None => Err(DomError::ImageLoad("Image is not loaded".into())),
        }
    }
}

/// Decode then re-encode as a PNG data URI, like a canvas copy would.
fn reencode_png(bytes: &[u8]) -> Option<String> {
    let decoded = match image::load_from_memory(bytes) {
        Ok(image) => image,
        Err(err) => {
            warn!(error = %err, "image bytes are not decodable");
            return None;
        }
    };
    let mut png = Cursor::new(Vec::new());
    if let Err(err) = decoded.write_to(&mut png, ImageFormat::Png) {
        warn!(error = %err, "could not re-encode image as png");
        return None;
    }
    Some(format!(
        "data:image/png;base64,{}",
        STANDARD.encode(png.into_inner())
    ))
}

/// Only base64 payloads are accepted.
fn decode_data_url(url: &str) -> Option<Vec<u8>> {
    let rest = url.strip_prefix("data:")?;
    let (meta, payload) = rest.split_once(',')?;
    if !meta.ends_with(";base64") {
        return None;
    }
    STANDARD.decode(payload.trim()).ok()
}
