use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::{Local, Utc};
use serde_json::json;

use h2d_lib::browser::{
    BrowserManager, BrowserOptions, HttpImageFetcher, NoFetch, RawPageSnapshot, SnapshotDocument,
};
use h2d_lib::extract::{ExtractOptions, Extractor, LiveDocument};
use h2d_lib::output::{AssetCounts, CaptureOutput, SourceDescriptor, SourceKind, H2D_OUTPUT_VERSION};
use h2d_lib::progress::ProgressCallback;
use h2d_lib::protocol::{handle_capture_message, PAYLOAD_OMITTED_NOTE};
use h2d_lib::types::CapturedPage;
use h2d_lib::{archive_filename, pack_page, H2dError, H2dOutput};

use crate::cli::OutputFormat;
use crate::formatting::{render_error, write_output};
use crate::settings::{
    format_effective_config, load_config, resolve_capture_settings, CaptureArgs,
    CaptureFlagSources, ResolvedCaptureSettings,
};

/// Run the capture command.
#[allow(clippy::too_many_arguments)]
pub async fn run_capture(
    raw_args: &[String],
    config_path: Option<PathBuf>,
    verbose: bool,
    url: Option<String>,
    snapshot: Option<PathBuf>,
    archive: Option<PathBuf>,
    args: CaptureArgs,
    format: OutputFormat,
    output: Option<PathBuf>,
) -> ExitCode {
    let config = match load_config(config_path.as_deref()) {
        Ok(cfg) => cfg,
        Err(err) => return render_error(err, format, output),
    };
    let flag_sources = CaptureFlagSources::from_args(raw_args);
    let resolved = resolve_capture_settings(args, &config, &flag_sources);
    if verbose {
        eprintln!(
            "{}",
            format_effective_config(&resolved, config_path.as_deref())
        );
    }

    let progress_logger: Option<ProgressCallback> = if verbose {
        Some(Arc::new(|msg: &str| eprintln!("{msg}")))
    } else {
        None
    };

    let (source, raw) = match (url, snapshot) {
        (Some(url), _) => {
            let options = BrowserOptions {
                viewport: resolved.viewport,
                navigation_timeout: resolved.nav_timeout,
                network_idle_timeout: resolved.network_idle_timeout,
                process_timeout: resolved.process_timeout,
                ..BrowserOptions::default()
            };
            let manager = BrowserManager::new(options);
            match manager.capture(&url, progress_logger.clone()).await {
                Ok(raw) => (
                    SourceDescriptor {
                        kind: SourceKind::Url,
                        value: url,
                    },
                    raw,
                ),
                Err(err) => return render_error(err, format, output),
            }
        }
        (None, Some(path)) => match RawPageSnapshot::from_file(&path) {
            Ok(raw) => (
                SourceDescriptor {
                    kind: SourceKind::Snapshot,
                    value: path.display().to_string(),
                },
                raw,
            ),
            Err(err) => return render_error(err, format, output),
        },
        (None, None) => {
            return render_error(
                H2dError::Config("Either --url or --snapshot is required".to_string()),
                format,
                output,
            )
        }
    };

    if verbose {
        eprintln!("Extracting {} nodes\u{2026}", raw.nodes.len());
    }
    let page = match extract(raw, &resolved).await {
        Ok(page) => page,
        Err(err) => return render_error(err, format, output),
    };

    let packed = match pack_page(&page, Utc::now()) {
        Ok(packed) => packed,
        Err(err) => return render_error(err.into(), format, output),
    };
    let archive_path = archive.unwrap_or_else(|| PathBuf::from(archive_filename(Local::now())));
    if let Err(err) = std::fs::write(&archive_path, &packed.bytes) {
        return render_error(err.into(), format, output);
    }
    if verbose {
        eprintln!(
            "Wrote {} ({} bytes)",
            archive_path.display(),
            packed.bytes.len()
        );
    }

    let body = H2dOutput::Capture(CaptureOutput {
        version: H2D_OUTPUT_VERSION.to_string(),
        source,
        title: page.title.clone(),
        url: page.url.clone(),
        viewport: page.viewport.unwrap_or(resolved.viewport),
        archive: archive_path,
        archive_bytes: packed.bytes.len(),
        elements: page.elements.len(),
        assets: AssetCounts {
            packaged: packed.packaged_asset_count(),
            ..asset_counts(&page)
        },
        payload_trimmed: payload_trimmed(&page),
    });
    if let Err(err) = write_output(&body, format, output.clone()) {
        return render_error(H2dError::Config(err.to_string()), format, output);
    }
    ExitCode::SUCCESS
}

async fn extract(
    raw: RawPageSnapshot,
    settings: &ResolvedCaptureSettings,
) -> Result<CapturedPage, H2dError> {
    let extractor = Extractor::new(ExtractOptions {
        image_timeout: settings.image_timeout,
        capture_images: true,
    });
    if settings.fetch_images {
        let fetcher = HttpImageFetcher::new(settings.image_timeout, settings.max_image_bytes)?;
        request_capture(&extractor, &SnapshotDocument::new(raw, fetcher), settings).await
    } else {
        request_capture(&extractor, &SnapshotDocument::new(raw, NoFetch), settings).await
    }
}

/// Drive the extractor through the capture message protocol.
async fn request_capture<D: LiveDocument>(
    extractor: &Extractor,
    document: &D,
    settings: &ResolvedCaptureSettings,
) -> Result<CapturedPage, H2dError> {
    let request = json!({ "action": "capturePageTriggered" });
    handle_capture_message(&request, extractor, document, settings.max_payload_chars)
        .await
        .page()
}

fn asset_counts(page: &CapturedPage) -> AssetCounts {
    page.assets
        .values()
        .fold(AssetCounts::default(), |mut counts, asset| {
            if asset.cors_blocked {
                counts.cors_blocked += 1;
            } else if asset.error.is_some() {
                counts.failed += 1;
            } else if asset.base64.is_some() {
                counts.captured += 1;
            }
            counts
        })
}

fn payload_trimmed(page: &CapturedPage) -> bool {
    page.assets
        .values()
        .any(|asset| asset.note.as_deref() == Some(PAYLOAD_OMITTED_NOTE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use h2d_lib::types::CapturedAsset;
    use h2d_lib::Viewport;

    #[test]
    fn asset_counts_classify_markers() {
        let mut page = CapturedPage::new("t", "https://example.com/", Viewport::default());
        page.assets.insert(
            "img/a.png".into(),
            CapturedAsset::image("https://example.com/a.png", "data:image/png;base64,AA==".into()),
        );
        page.assets
            .insert("img/b.png".into(), CapturedAsset::blocked("https://cdn.test/b.png"));
        page.assets.insert(
            "img/c.png".into(),
            CapturedAsset::failed("https://example.com/c.png", "Image load error"),
        );

        let counts = asset_counts(&page);
        assert_eq!(counts.captured, 1);
        assert_eq!(counts.cors_blocked, 1);
        assert_eq!(counts.failed, 1);
        assert!(!payload_trimmed(&page));
    }
}
