use async_trait::async_trait;
use thiserror::Error;

use crate::types::{ComputedStyle, DomRect};
use crate::viewport::Viewport;

#[derive(Debug, Error)]
pub enum DomError {
    #[error("element is no longer attached to the document")]
    Detached,

    #[error("failed to read {property}: {message}")]
    Read {
        property: &'static str,
        message: String,
    },

    #[error("{0}")]
    ImageLoad(String),
}

impl DomError {
    pub fn read(property: &'static str, message: impl Into<String>) -> Self {
        DomError::Read {
            property,
            message: message.into(),
        }
    }
}

/// A rendered document the extractor can walk.
///
/// Handles returned by [`LiveDocument::query_all`] are opaque and only valid
/// for the document that produced them.
#[async_trait]
pub trait LiveDocument: Send + Sync {
    type Element: Send + Sync;

    async fn title(&self) -> String;

    async fn location(&self) -> String;

    async fn viewport(&self) -> Viewport;

    /// Elements whose tag is in `tags`, in document order.
    async fn query_all(&self, tags: &[&str]) -> Result<Vec<Self::Element>, DomError>;

    async fn tag_name(&self, element: &Self::Element) -> Result<String, DomError>;

    async fn bounding_rect(&self, element: &Self::Element) -> Result<DomRect, DomError>;

    async fn computed_style(&self, element: &Self::Element) -> Result<ComputedStyle, DomError>;

    async fn inner_text(&self, element: &Self::Element) -> Result<String, DomError>;

    /// Raw `src` of an image element, `None` for other elements or an empty source.
    async fn image_source(&self, element: &Self::Element) -> Option<String>;

    async fn is_loaded(&self, element: &Self::Element) -> bool;

    /// Resolve once the image finishes loading; errors if loading fails.
    async fn wait_for_load(&self, element: &Self::Element) -> Result<(), DomError>;

    /// Re-encode the image's pixels as a data URI.
    ///
    /// `Ok(None)` means the pixels exist but may not be read (cross-origin).
    async fn copy_pixels(&self, element: &Self::Element) -> Result<Option<String>, DomError>;
}
