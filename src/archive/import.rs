use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info};

use super::container::{ArchiveReader, EntryInfo};
use super::pack::Manifest;
use super::{ArchiveError, DATA_ENTRY, MANIFEST_ENTRY};
use crate::types::PackagedPage;

const ASSET_PREFIX: &str = "assets/";

/// Decoded archive contents.
#[derive(Debug, Clone)]
pub struct ImportedArchive {
    pub manifest: Manifest,
    pub page: PackagedPage,
    /// Packaged files keyed by their archive path.
    pub assets: BTreeMap<String, Vec<u8>>,
    pub entries: Vec<EntryInfo>,
}

pub fn import_archive(bytes: &[u8]) -> Result<ImportedArchive, ArchiveError> {
    let reader = ArchiveReader::new(bytes)?;

    let manifest_bytes = reader
        .read_by_name(MANIFEST_ENTRY)?
        .ok_or(ArchiveError::MissingEntry(MANIFEST_ENTRY))?;
    let data_bytes = reader
        .read_by_name(DATA_ENTRY)?
        .ok_or(ArchiveError::MissingEntry(DATA_ENTRY))?;

    let manifest: Manifest = serde_json::from_slice(manifest_bytes).map_err(|source| {
        ArchiveError::Json {
            entry: MANIFEST_ENTRY,
            source,
        }
    })?;
    let data: Value = serde_json::from_slice(data_bytes).map_err(|source| ArchiveError::Json {
        entry: DATA_ENTRY,
        source,
    })?;
    let page = validate_page_value(data)?;

    let mut assets = BTreeMap::new();
    for entry in reader.entries() {
        if entry.name.starts_with(ASSET_PREFIX) && !entry.name.ends_with('/') {
            let data = reader.read(entry)?;
            debug!(entry = %entry.name, bytes = data.len(), "loaded packaged asset");
            assets.insert(entry.name.clone(), data.to_vec());
        }
    }

    info!(
        elements = page.elements.len(),
        assets = assets.len(),
        "archive imported"
    );
    Ok(ImportedArchive {
        manifest,
        page,
        assets,
        entries: reader.entries().to_vec(),
    })
}

/// Check the structural requirements of a page document and deserialize it.
pub fn validate_page_value(data: Value) -> Result<PackagedPage, ArchiveError> {
    match data.get("elements") {
        None | Some(Value::Null) => {
            return Err(ArchiveError::InvalidDocument(
                "missing data or elements array".into(),
            ))
        }
        Some(Value::Array(_)) => {}
        Some(_) => {
            return Err(ArchiveError::InvalidDocument(
                "elements is not an array".into(),
            ))
        }
    }
    serde_json::from_value(data).map_err(|source| ArchiveError::Json {
        entry: DATA_ENTRY,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveWriter;
    use serde_json::json;

    fn archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ArchiveWriter::new();
        for (name, data) in entries {
            writer.add_entry(name, data).unwrap();
        }
        writer.finish().unwrap()
    }

    const MANIFEST: &[u8] = br#"{"format":"zip-pack","version":"1.0","source":{"title":"t","url":"u"}}"#;

    #[test]
    fn imports_page_and_assets() {
        let data = json!({
            "version": "1.0", "title": "t", "url": "u",
            "viewport": {"width": 800, "height": 600},
            "elements": [{"tag": "p", "text": "hi", "x": 1, "y": 2, "width": 3, "height": 4}],
            "assets": {"img/a.png": {"filename": "assets/images/a.png", "originalUrl": "https://x/a.png", "type": "image"}}
        });
        let bytes = archive(&[
            ("manifest.json", MANIFEST),
            ("data.json", data.to_string().as_bytes()),
            ("assets/images/a.png", b"png"),
        ]);
        let imported = import_archive(&bytes).unwrap();
        assert_eq!(imported.manifest.source.title, "t");
        assert_eq!(imported.page.elements.len(), 1);
        assert_eq!(imported.assets["assets/images/a.png"], b"png");
        assert_eq!(imported.entries.len(), 3);
    }

    #[test]
    fn missing_entries_are_structural_errors() {
        let no_manifest = archive(&[("data.json", br#"{"elements":[]}"#)]);
        assert!(matches!(
            import_archive(&no_manifest),
            Err(ArchiveError::MissingEntry("manifest.json"))
        ));

        let no_data = archive(&[("manifest.json", MANIFEST)]);
        let err = import_archive(&no_data).unwrap_err();
        assert!(matches!(err, ArchiveError::MissingEntry("data.json")));
        assert!(err.is_structural());

        let empty = archive(&[]);
        assert!(import_archive(&empty).is_err());
    }

    #[test]
    fn elements_must_be_a_sequence() {
        let err = validate_page_value(json!({"title": "x"})).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid page data structure: missing data or elements array"
        );
        let err = validate_page_value(json!({"elements": {"0": {}}})).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid page data structure: elements is not an array"
        );
        assert!(validate_page_value(json!({"elements": []})).is_ok());
    }
}
