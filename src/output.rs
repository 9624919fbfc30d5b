use serde::Serialize;
use std::path::PathBuf;

use crate::archive::{EntryInfo, Manifest};
use crate::error::ErrorPayload;
use crate::reconstruct::ReconstructReport;
use crate::viewport::Viewport;

/// Schema version for output payloads.
pub const H2D_OUTPUT_VERSION: &str = "0.1.0";

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum H2dOutput {
    Capture(CaptureOutput),
    Inspect(InspectOutput),
    Reconstruct(ReconstructOutput),
    Error(ErrorOutput),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Url,
    Snapshot,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceDescriptor {
    pub kind: SourceKind,
    pub value: String,
}

/// Asset outcomes for one capture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetCounts {
    pub captured: usize,
    pub cors_blocked: usize,
    pub failed: usize,
    /// Image files written into the archive.
    pub packaged: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureOutput {
    pub version: String,
    pub source: SourceDescriptor,
    pub title: String,
    pub url: String,
    pub viewport: Viewport,
    pub archive: PathBuf,
    pub archive_bytes: usize,
    pub elements: usize,
    pub assets: AssetCounts,
    /// Inline image data was dropped to respect the payload limit.
    pub payload_trimmed: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectOutput {
    pub version: String,
    pub input: PathBuf,
    pub manifest: Manifest,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewport: Option<Viewport>,
    pub elements: usize,
    pub assets: usize,
    pub entries: Vec<EntryInfo>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconstructOutput {
    pub version: String,
    pub input: PathBuf,
    pub message: String,
    pub report: ReconstructReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scene_output: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorOutput {
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub error: ErrorPayload,
}
