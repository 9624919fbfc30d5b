//! Shared data types.
//!
//! - [`page`] - the page document interchange schema
//! - [`dom`] - raw computed-style and geometry values read from a live page

pub mod dom;
pub mod page;

pub use dom::{ComputedStyle, DomRect};
pub use page::{
    image_asset_key, packaged_image_path, AssetKind, BoxShadow, CapturedAsset, CapturedPage,
    ElementKind, ElementRecord, Padding, PackagedAsset, PackagedPage, PageDocument,
    IMAGE_KEY_PREFIX, PACKAGED_IMAGE_DIR, PAGE_SCHEMA_VERSION,
};
