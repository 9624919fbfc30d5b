//! HTML to Design (h2d) Library
//!
//! Captures a rendered web page as a flat list of visible, styled elements plus
//! its images, packs the result into a portable archive, and rebuilds the
//! archive as a scene of design nodes through an injected host.
//!
//! # Module Overview
//!
//! - [`extract`] - walks a live document and produces a page document
//! - [`browser`] - Playwright capture and the snapshot-backed document
//! - [`css`] - computed-style strings to design values
//! - [`archive`] - stored ZIP container, packing and import
//! - [`reconstruct`] - page document to design nodes
//! - [`protocol`] - capture and import message handling
//! - [`config`] - configuration file support
//! - [`types`] - page document schema
//! - [`output`] - JSON output schemas
//!
//! # Example
//!
//! ```no_run
//! use h2d_lib::reconstruct::{MemoryHost, ReconstructOptions, Reconstructor};
//!
//! # async fn example(bytes: Vec<u8>) -> h2d_lib::Result<()> {
//! let archive = h2d_lib::import_archive(&bytes)?;
//! let mut host = MemoryHost::new();
//! let result = Reconstructor::new(ReconstructOptions::default())
//!     .run(&archive.page, &archive.assets, &mut host, &mut |update| {
//!         println!("{}% {}", update.percent, update.message)
//!     })
//!     .await?;
//! println!("created {} elements", result.report.created.len());
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod browser;
pub mod config;
pub mod css;
pub mod error;
pub mod extract;
pub mod output;
pub mod progress;
pub mod protocol;
pub mod reconstruct;
pub mod types;
pub mod viewport;

pub use archive::{archive_filename, import_archive, pack_page, ArchiveError, Manifest};
pub use browser::{capture_page_snapshot, BrowserManager, BrowserOptions, RawPageSnapshot};
pub use config::{Config, ConfigError};
pub use error::{ErrorCategory, ErrorPayload, H2dError, Result};
pub use extract::{ExtractOptions, Extractor, LiveDocument};
pub use output::{ErrorOutput, H2dOutput, H2D_OUTPUT_VERSION};
pub use protocol::{handle_capture_message, handle_import, ImportRequest, PluginMessage};
pub use reconstruct::{
    MemoryHost, ReconstructError, ReconstructOptions, ReconstructReport, Reconstructor, SceneHost,
};
pub use types::{CapturedPage, ElementRecord, PackagedPage};
pub use viewport::Viewport;
