//! Request/response shapes at the two process boundaries.
//!
//! The capture side answers `{action}` messages with a JSON-encoded page
//! document; the import side turns one import request into a stream of
//! progress notifications ending in exactly one success or error.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::archive::{validate_page_value, ImportedArchive, Manifest};
use crate::extract::{Extractor, LiveDocument};
use crate::progress::ProgressUpdate;
use crate::reconstruct::{
    AssetMatching, ReconstructOptions, Reconstruction, Reconstructor, SceneHost,
};
use crate::types::{CapturedAsset, CapturedPage};
use crate::{H2dError, Result};

/// 1.5 MiB, counted in characters of the serialized page.
pub const DEFAULT_MAX_PAYLOAD_CHARS: usize = 1_572_864;

pub const PAYLOAD_OMITTED_NOTE: &str = "Base64 omitted to reduce payload size";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// The page document as a JSON string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CaptureResponse {
    fn ready() -> Self {
        Self {
            success: true,
            status: Some("ready".into()),
            data: None,
            encoding: None,
            error: None,
        }
    }

    fn captured(json: String) -> Self {
        Self {
            success: true,
            status: None,
            data: Some(json),
            encoding: Some("json".into()),
            error: None,
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            status: None,
            data: None,
            encoding: None,
            error: Some(message.into()),
        }
    }

    /// Decode the page carried by a successful capture response.
    pub fn page(&self) -> Result<CapturedPage> {
        match (&self.data, self.success) {
            (Some(json), true) => Ok(serde_json::from_str(json)?),
            _ => Err(H2dError::Unknown(
                self.error
                    .clone()
                    .unwrap_or_else(|| "Unknown capture error".into()),
            )),
        }
    }
}

/// Answer one capture-side message.
pub async fn handle_capture_message<D: LiveDocument>(
    message: &Value,
    extractor: &Extractor,
    document: &D,
    max_payload_chars: usize,
) -> CaptureResponse {
    let Some(action) = message.as_object().map(|m| m.get("action")) else {
        warn!("invalid message received");
        return CaptureResponse::failed("Invalid message format");
    };
    match action.and_then(Value::as_str) {
        Some("ping") => CaptureResponse::ready(),
        Some("capturePageTriggered") => match capture_payload(extractor, document, max_payload_chars).await {
            Ok(json) => CaptureResponse::captured(json),
            Err(err) => {
                warn!(error = %err, "page capture failed");
                CaptureResponse::failed(err.to_string())
            }
        },
        other => {
            warn!(action = ?other, "unknown action received");
            CaptureResponse::failed("Unknown action")
        }
    }
}

async fn capture_payload<D: LiveDocument>(
    extractor: &Extractor,
    document: &D,
    max_payload_chars: usize,
) -> Result<String> {
    let mut page = extractor.capture(document).await?;
    enforce_payload_limit(&mut page, max_payload_chars)?;
    Ok(serde_json::to_string(&page)?)
}

/// Strip inline image data when the serialized page is over `max_chars`.
///
/// Returns whether anything was stripped.
pub fn enforce_payload_limit(page: &mut CapturedPage, max_chars: usize) -> Result<bool> {
    let size = serde_json::to_string(page)?.chars().count();
    if size <= max_chars || page.assets.is_empty() {
        return Ok(false);
    }
    warn!(size, limit = max_chars, "payload too large, omitting inline image data");
    for asset in page.assets.values_mut() {
        *asset = CapturedAsset {
            base64: None,
            url: std::mem::take(&mut asset.url),
            kind: asset.kind,
            cors_blocked: false,
            error: None,
            note: Some(PAYLOAD_OMITTED_NOTE.into()),
        };
    }
    Ok(true)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSettings {
    #[serde(default)]
    pub use_auto_layout: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_matching: Option<AssetMatching>,
}

/// A decoded archive on its way to the reconstructor.
#[derive(Debug, Clone)]
pub struct ImportRequest {
    pub manifest: Option<Manifest>,
    /// The `data.json` document, validated on import.
    pub data: Value,
    /// Packaged files keyed by archive path.
    pub assets: BTreeMap<String, Vec<u8>>,
    pub settings: ImportSettings,
}

impl ImportRequest {
    pub fn from_archive(archive: ImportedArchive, settings: ImportSettings) -> Result<Self> {
        Ok(Self {
            manifest: Some(archive.manifest),
            data: serde_json::to_value(&archive.page)?,
            assets: archive.assets,
            settings,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum PluginMessage {
    ImportProgress(ProgressUpdate),
    ImportSuccess { message: String },
    ImportError { message: String },
}

impl PluginMessage {
    fn progress(percent: u8, message: &str) -> Self {
        PluginMessage::ImportProgress(ProgressUpdate::new(percent, message))
    }
}

/// Run one import, reporting through `emit`.
///
/// `emit` always receives exactly one terminal message; its error text
/// matches the returned error.
pub async fn handle_import<H: SceneHost>(
    request: ImportRequest,
    defaults: &ReconstructOptions,
    host: &mut H,
    emit: &mut dyn FnMut(PluginMessage),
) -> Result<Reconstruction<H::Node>> {
    match run_import(request, defaults, host, emit).await {
        Ok((reconstruction, message)) => {
            info!(%message, "import finished");
            emit(PluginMessage::ImportSuccess { message });
            Ok(reconstruction)
        }
        Err(err) => {
            warn!(error = %err, "import failed");
            emit(PluginMessage::ImportError {
                message: err.to_string(),
            });
            Err(err)
        }
    }
}

async fn run_import<H: SceneHost>(
    request: ImportRequest,
    defaults: &ReconstructOptions,
    host: &mut H,
    emit: &mut dyn FnMut(PluginMessage),
) -> Result<(Reconstruction<H::Node>, String)> {
    emit(PluginMessage::progress(5, "Initializing layout engine..."));
    let options = ReconstructOptions {
        use_auto_layout: request.settings.use_auto_layout,
        asset_matching: request
            .settings
            .asset_matching
            .unwrap_or(defaults.asset_matching),
        ..defaults.clone()
    };
    let reconstructor = Reconstructor::new(options);

    emit(PluginMessage::progress(10, "Processing page data..."));
    let page = validate_page_value(request.data)?;

    emit(PluginMessage::progress(15, "Starting layout reconstruction..."));
    let reconstruction = reconstructor
        .run(&page, &request.assets, host, &mut |update| {
            emit(PluginMessage::ImportProgress(update))
        })
        .await?;

    emit(PluginMessage::progress(95, "Finalizing import..."));
    let title = if page.title.is_empty() {
        "Unknown Page"
    } else {
        page.title.as_str()
    };
    let message = format!(
        "Successfully imported {} elements from \"{}\"",
        page.elements.len(),
        title
    );
    Ok((reconstruction, message))
}
