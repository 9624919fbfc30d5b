//! The container must open in a standard ZIP reader, and standard stored
//! archives must open in ours.

use std::io::{Cursor, Read, Write};

use chrono::Utc;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use h2d_lib::archive::{crc32, ArchiveError, ArchiveWriter};
use h2d_lib::types::{CapturedAsset, CapturedPage, ElementRecord};
use h2d_lib::{import_archive, pack_page, Viewport};

const PNG_1X1: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk+M9QDwADhgGAWjR9awAAAABJRU5ErkJggg==";

fn sample_page() -> CapturedPage {
    let mut page = CapturedPage::new("Café", "https://example.com/", Viewport::new(1024, 768));
    page.elements.push(ElementRecord {
        tag: "p".into(),
        text: "Grüße".into(),
        x: 4,
        y: 8,
        width: 120,
        height: 18,
        ..Default::default()
    });
    page.assets.insert(
        "img/dot.png".into(),
        CapturedAsset::image("https://example.com/dot.png", PNG_1X1.to_string()),
    );
    page
}

#[test]
fn packed_archive_opens_in_standard_reader() {
    let packed = pack_page(&sample_page(), Utc::now()).expect("pack");
    let mut archive = ZipArchive::new(Cursor::new(packed.bytes.clone())).expect("zip reader");

    let mut names = Vec::new();
    for i in 0..archive.len() {
        let mut file = archive.by_index(i).expect("entry");
        assert_eq!(file.compression(), CompressionMethod::Stored);
        let mut contents = Vec::new();
        file.read_to_end(&mut contents).expect("read entry");
        assert_eq!(file.crc32(), crc32(&contents));
        names.push(file.name().to_string());
    }
    assert_eq!(
        names,
        vec!["manifest.json", "data.json", "assets/images/dot.png"]
    );

    let mut data = String::new();
    archive
        .by_name("data.json")
        .expect("data entry")
        .read_to_string(&mut data)
        .expect("read data");
    let value: serde_json::Value = serde_json::from_str(&data).expect("json");
    assert_eq!(value["title"], "Café");
    assert_eq!(value["elements"][0]["text"], "Grüße");
    assert_eq!(value["assets"]["img/dot.png"]["filename"], "assets/images/dot.png");
}

#[test]
fn non_ascii_entry_names_are_read_back_by_standard_reader() {
    let mut writer = ArchiveWriter::new();
    writer.add_entry("notes/résumé.txt", b"bonjour").expect("add");
    writer.add_entry("empty.txt", b"").expect("add empty");
    let bytes = writer.finish().expect("finish");

    let mut archive = ZipArchive::new(Cursor::new(bytes)).expect("zip reader");
    let mut file = archive.by_name("notes/résumé.txt").expect("utf-8 name");
    let mut contents = String::new();
    file.read_to_string(&mut contents).expect("read");
    assert_eq!(contents, "bonjour");
    drop(file);
    assert_eq!(archive.by_name("empty.txt").expect("empty").size(), 0);
}

#[test]
fn stored_archive_from_standard_writer_imports() {
    let manifest = serde_json::json!({
        "format": "zip-pack",
        "version": "1.0",
        "created": "2024-05-01T12:00:00Z",
        "source": {"title": "External", "url": "https://example.org/"}
    });
    let data = serde_json::json!({
        "version": "1.0",
        "title": "External",
        "url": "https://example.org/",
        "viewport": {"width": 800, "height": 600},
        "elements": [{"tag": "h2", "text": "Hi", "x": 0, "y": 0, "width": 50.4, "height": 20}],
        "assets": {}
    });

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file("manifest.json", options).expect("start");
    zip.write_all(manifest.to_string().as_bytes()).expect("write");
    zip.start_file("data.json", options).expect("start");
    zip.write_all(data.to_string().as_bytes()).expect("write");
    let bytes = zip.finish().expect("finish").into_inner();

    let imported = import_archive(&bytes).expect("import");
    assert_eq!(imported.manifest.source.title, "External");
    assert_eq!(imported.page.elements.len(), 1);
    assert_eq!(imported.page.elements[0].width, 50);
    assert!(imported.assets.is_empty());
}

#[test]
fn corrupted_entry_fails_checksum() {
    let packed = pack_page(&sample_page(), Utc::now()).expect("pack");
    let mut bytes = packed.bytes.clone();
    let data_entry = packed
        .entries
        .iter()
        .find(|entry| entry.name == "data.json")
        .expect("data entry");
    // Local header is 30 bytes, then the name, then the stored data.
    let first_data_byte = data_entry.header_offset as usize + 30 + data_entry.name.len();
    bytes[first_data_byte] ^= 0xff;

    let err = import_archive(&bytes).unwrap_err();
    assert!(
        matches!(err, ArchiveError::ChecksumMismatch { ref name, .. } if name == "data.json"),
        "unexpected error: {err}"
    );
}

#[test]
fn archive_with_trailing_comment_is_accepted() {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    zip.set_comment("written elsewhere");
    zip.start_file("manifest.json", options).expect("start");
    zip.write_all(br#"{"format":"zip-pack","version":"1.0"}"#).expect("write");
    zip.start_file("data.json", options).expect("start");
    zip.write_all(br#"{"elements":[]}"#).expect("write");
    let bytes = zip.finish().expect("finish").into_inner();

    let imported = import_archive(&bytes).expect("import");
    assert!(imported.page.elements.is_empty());
}
