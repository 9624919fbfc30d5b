use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use super::container::{ArchiveWriter, EntryInfo};
use super::{ArchiveError, ARCHIVE_FORMAT, ARCHIVE_FORMAT_VERSION, DATA_ENTRY, MANIFEST_ENTRY};
use crate::types::{packaged_image_path, AssetKind, CapturedPage, PackagedAsset, PackagedPage};

const NOTE_CONVERSION_FAILED: &str = "Binary conversion failed, kept as URL reference";
const NOTE_CORS_BLOCKED: &str = "CORS blocked";
const NOTE_NO_DATA: &str = "Base64 not available";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub source: ManifestSource,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ManifestSource {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
}

impl Manifest {
    pub fn for_page(page: &CapturedPage, created: DateTime<Utc>) -> Self {
        Self {
            format: ARCHIVE_FORMAT.to_string(),
            version: ARCHIVE_FORMAT_VERSION.to_string(),
            created: Some(created),
            source: ManifestSource {
                title: page.title.clone(),
                url: page.url.clone(),
            },
        }
    }
}

/// A finished archive plus what went into it.
#[derive(Debug, Clone)]
pub struct PackedArchive {
    pub bytes: Vec<u8>,
    pub manifest: Manifest,
    pub page: PackagedPage,
    pub entries: Vec<EntryInfo>,
}

impl PackedArchive {
    pub fn packaged_asset_count(&self) -> usize {
        self.page
            .assets
            .values()
            .filter(|asset| asset.filename.is_some())
            .count()
    }
}

/// Serialize a captured page into archive bytes.
///
/// Entries are written as `manifest.json`, `data.json`, then one
/// `assets/images/<file>` per image whose inline data decodes. Assets without
/// usable data stay in `data.json` as a URL reference with a note explaining why.
pub fn pack_page(page: &CapturedPage, created: DateTime<Utc>) -> Result<PackedArchive, ArchiveError> {
    let manifest = Manifest::for_page(page, created);

    let mut packaged = BTreeMap::new();
    let mut files: Vec<(String, Vec<u8>)> = Vec::new();
    for (key, asset) in &page.assets {
        if asset.kind != AssetKind::Image {
            warn!(asset = %key, "skipping non-image asset");
            continue;
        }

        let reference = match asset.packable_data() {
            Some(data) => match decode_data_uri(data) {
                Ok(bytes) => {
                    let path = packaged_image_path(key);
                    debug!(asset = %key, path = %path, bytes = bytes.len(), "packaging image");
                    files.push((path.clone(), bytes));
                    PackagedAsset {
                        filename: Some(path),
                        original_url: asset.url.clone(),
                        kind: AssetKind::Image,
                        note: None,
                    }
                }
                Err(err) => {
                    warn!(asset = %key, error = %err, "could not decode inline image data");
                    url_reference(&asset.url, NOTE_CONVERSION_FAILED)
                }
            },
            None if asset.cors_blocked => url_reference(&asset.url, NOTE_CORS_BLOCKED),
            None => url_reference(&asset.url, NOTE_NO_DATA),
        };
        packaged.insert(key.clone(), reference);
    }

    let packaged_page = page.clone().with_assets(packaged);

    let mut writer = ArchiveWriter::new();
    writer.add_entry(MANIFEST_ENTRY, &to_pretty_json(&manifest, MANIFEST_ENTRY)?)?;
    writer.add_entry(DATA_ENTRY, &to_pretty_json(&packaged_page, DATA_ENTRY)?)?;
    for (path, bytes) in &files {
        writer.add_entry(path, bytes)?;
    }
    let entries = writer.entries().to_vec();
    let bytes = writer.finish()?;

    info!(
        elements = packaged_page.elements.len(),
        assets = files.len(),
        bytes = bytes.len(),
        "page archive packed"
    );

    Ok(PackedArchive {
        bytes,
        manifest,
        page: packaged_page,
        entries,
    })
}

/// Default file name for an archive created at `now`.
pub fn archive_filename(now: DateTime<Local>) -> String {
    format!("page-{}.zip", now.format("%Y%m%d_%H%M%S"))
}

fn url_reference(url: &str, note: &str) -> PackagedAsset {
    PackagedAsset {
        filename: None,
        original_url: url.to_string(),
        kind: AssetKind::Image,
        note: Some(note.to_string()),
    }
}

/// Accepts a `data:<mime>;base64,<payload>` URI or a bare base64 payload.
fn decode_data_uri(data: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let payload = match data.split_once(',') {
        Some((_, payload)) => payload,
        None => data,
    };
    STANDARD.decode(payload.trim())
}

fn to_pretty_json<T: Serialize>(value: &T, entry: &'static str) -> Result<Vec<u8>, ArchiveError> {
    serde_json::to_vec_pretty(value).map_err(|source| ArchiveError::Json { entry, source })
}
