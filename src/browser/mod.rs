//! Live page capture.
//!
//! A page is rendered with Playwright (via Node.js) into a [`RawPageSnapshot`],
//! which [`SnapshotDocument`] then exposes to the extractor as a live document.
//!
//! - [`manager`] - capture sessions with concurrency control
//! - [`playwright`] - the capture script and availability checks
//! - [`dom`] - serialized snapshot types
//! - [`snapshot`] - the snapshot-backed document
//! - [`fetch`] - image retrieval for snapshot images
//!
//! # Example
//!
//! ```no_run
//! use h2d_lib::browser::{BrowserManager, BrowserOptions, NoFetch, SnapshotDocument};
//! use h2d_lib::extract::Extractor;
//!
//! # async fn example() -> h2d_lib::Result<()> {
//! let manager = BrowserManager::new(BrowserOptions::default());
//! let snapshot = manager.capture("https://example.com", None).await?;
//! let page = Extractor::default()
//!     .capture(&SnapshotDocument::new(snapshot, NoFetch))
//!     .await?;
//! println!("{} elements", page.elements.len());
//! # Ok(())
//! # }
//! ```

pub mod dom;
pub mod fetch;
pub mod manager;
mod playwright;
pub mod snapshot;

pub use dom::{RawNode, RawPageSnapshot, RawRect};
pub use fetch::{
    FetchError, HttpImageFetcher, ImageFetcher, NoFetch, StaticFetcher, DEFAULT_MAX_IMAGE_BYTES,
};
pub use manager::{
    capture_page_snapshot, BrowserManager, BrowserOptions, DEFAULT_NAVIGATION_TIMEOUT,
    DEFAULT_NETWORK_IDLE_TIMEOUT, DEFAULT_PROCESS_TIMEOUT, MOCK_SNAPSHOT_ENV,
};
pub use snapshot::SnapshotDocument;
