use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::document::LiveDocument;
use crate::types::{image_asset_key, CapturedAsset};

pub const IMAGE_LOAD_TIMEOUT_MESSAGE: &str = "Image load timeout";

/// Absolute form of an image source, resolved against the page location.
pub fn resolve_source(base: Option<&Url>, src: &str) -> Option<Url> {
    match base {
        Some(base) => base.join(src).ok(),
        None => Url::parse(src).ok(),
    }
}

/// Capture one image into an asset table entry.
///
/// Never fails the caller: load timeouts, load errors and refused pixel copies
/// are recorded on the returned asset. `None` means the element has no usable
/// source at all.
pub async fn capture_image<D: LiveDocument>(
    document: &D,
    element: &D::Element,
    base: Option<&Url>,
    timeout: Duration,
) -> Option<(String, CapturedAsset)> {
    let src = document.image_source(element).await?;
    let Some(url) = resolve_source(base, &src) else {
        warn!(src = %src, "could not resolve image source");
        return None;
    };
    let key = image_asset_key(&url);
    let asset = load_pixels(document, element, url.as_str(), timeout).await;
    debug!(
        asset = %key,
        inline = asset.base64.is_some(),
        cors_blocked = asset.cors_blocked,
        "captured image"
    );
    Some((key, asset))
}

async fn load_pixels<D: LiveDocument>(
    document: &D,
    element: &D::Element,
    url: &str,
    timeout: Duration,
) -> CapturedAsset {
    if !document.is_loaded(element).await {
        match tokio::time::timeout(timeout, document.wait_for_load(element)).await {
            Err(_) => {
                warn!(url, timeout_ms = timeout.as_millis() as u64, "image load timed out");
                return CapturedAsset::failed(url, IMAGE_LOAD_TIMEOUT_MESSAGE);
            }
            Ok(Err(err)) => {
                warn!(url, error = %err, "image failed to load");
                return CapturedAsset::failed(url, err.to_string());
            }
            Ok(Ok(())) => {}
        }
    }

    match document.copy_pixels(element).await {
        Ok(Some(data_uri)) => CapturedAsset::image(url, data_uri),
        Ok(None) => {
            warn!(url, "image pixels are not readable, keeping URL reference");
            CapturedAsset::blocked(url)
        }
        Err(err) => {
            warn!(url, error = %err, "could not copy image pixels");
            CapturedAsset::failed(url, err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_relative_sources_against_page() {
        let base = Url::parse("https://example.com/blog/post.html").unwrap();
        let url = resolve_source(Some(&base), "../img/hero.jpg").unwrap();
        assert_eq!(url.as_str(), "https://example.com/img/hero.jpg");
        assert!(resolve_source(None, "hero.jpg").is_none());
        assert_eq!(
            resolve_source(None, "https://cdn.example.com/a.png")
                .unwrap()
                .as_str(),
            "https://cdn.example.com/a.png"
        );
    }
}
