use std::fmt::Write as FmtWrite;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use h2d_lib::output::H2D_OUTPUT_VERSION;
use h2d_lib::{ErrorOutput, H2dError, H2dOutput};

use crate::cli::OutputFormat;

/// Write output in the requested format.
pub fn write_output(
    body: &H2dOutput,
    format: OutputFormat,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => write_json_output(body, output.as_deref())?,
        OutputFormat::Pretty => write_pretty_output(body, output.as_deref())?,
    };
    Ok(())
}

/// Render an error and return the appropriate exit code.
pub fn render_error(err: H2dError, format: OutputFormat, output: Option<PathBuf>) -> ExitCode {
    let error_payload = err.to_payload();
    let payload = H2dOutput::Error(ErrorOutput {
        version: H2D_OUTPUT_VERSION.to_string(),
        message: Some(error_payload.message.clone()),
        error: error_payload,
    });

    match format {
        OutputFormat::Json => {
            let content =
                serde_json::to_string(&payload).unwrap_or_else(|_| "{\"mode\":\"error\"}".into());
            if let Some(path) = output {
                if let Err(write_err) = std::fs::write(&path, &content) {
                    eprintln!("Failed to write error output: {}", write_err);
                    println!("{content}");
                }
            } else {
                println!("{content}");
            }
        }
        OutputFormat::Pretty => {
            if let Err(write_err) = write_pretty_output(&payload, output.as_deref()) {
                eprintln!("Failed to write error output: {}", write_err);
            }
        }
    };

    ExitCode::from(2)
}

/// Write JSON output to file or stdout.
fn write_json_output(
    body: &H2dOutput,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let content = serde_json::to_string(body)?;
    if let Some(path) = output {
        std::fs::write(path, content)?;
    } else {
        println!("{content}");
    }
    Ok(())
}

/// Write pretty output to file or stdout.
fn write_pretty_output(body: &H2dOutput, output: Option<&Path>) -> io::Result<()> {
    let stdout_is_tty = std::io::stdout().is_terminal();
    let use_human = output.is_none() && stdout_is_tty;

    if use_human {
        let content = format_pretty(body, true);
        println!("{content}");
        return Ok(());
    }

    // Non-tty or file output: keep JSON shape for pipelines/files.
    let content =
        serde_json::to_string_pretty(body).unwrap_or_else(|_| "{\"mode\":\"error\"}".to_string());
    if let Some(path) = output {
        std::fs::write(path, &content)?;
    } else {
        println!("{content}");
    }
    Ok(())
}

/// Format output for human consumption in a terminal.
pub fn format_pretty(body: &H2dOutput, colorize: bool) -> String {
    let mut buf = String::new();
    match body {
        H2dOutput::Capture(out) => {
            let header = color("[CAPTURE]", "36", colorize);
            writeln!(buf, "{} {}", header, display_title(&out.title)).ok();
            writeln!(buf, "Source: {} ({:?})", out.source.value, out.source.kind).ok();
            writeln!(
                buf,
                "Viewport: {}x{}",
                out.viewport.width, out.viewport.height
            )
            .ok();
            writeln!(buf, "Elements: {}", out.elements).ok();
            let assets = &out.assets;
            writeln!(
                buf,
                "Assets: {} captured, {} CORS blocked, {} failed, {} packaged",
                assets.captured, assets.cors_blocked, assets.failed, assets.packaged
            )
            .ok();
            if out.payload_trimmed {
                writeln!(
                    buf,
                    "{}",
                    color("Inline image data omitted (payload limit)", "33", colorize)
                )
                .ok();
            }
            writeln!(
                buf,
                "Archive: {} ({} bytes)",
                out.archive.display(),
                out.archive_bytes
            )
            .ok();
        }
        H2dOutput::Inspect(out) => {
            let header = color("[INSPECT]", "34", colorize);
            writeln!(buf, "{} {}", header, out.input.display()).ok();
            writeln!(
                buf,
                "Format: {} {}",
                out.manifest.format, out.manifest.version
            )
            .ok();
            if let Some(created) = &out.manifest.created {
                writeln!(buf, "Created: {}", created.to_rfc3339()).ok();
            }
            writeln!(
                buf,
                "Source: {} ({})",
                display_title(&out.manifest.source.title),
                out.manifest.source.url
            )
            .ok();
            if let Some(viewport) = &out.viewport {
                writeln!(buf, "Viewport: {}x{}", viewport.width, viewport.height).ok();
            }
            writeln!(buf, "Elements: {}  Assets: {}", out.elements, out.assets).ok();
            if !out.entries.is_empty() {
                writeln!(buf, "Entries:").ok();
                for entry in &out.entries {
                    writeln!(
                        buf,
                        "- {:40} {:>10} {:08x}",
                        entry.name, entry.size, entry.crc32
                    )
                    .ok();
                }
            }
        }
        H2dOutput::Reconstruct(out) => {
            let report = &out.report;
            let header = color("[RECONSTRUCT]", "32", colorize);
            writeln!(buf, "{} {}", header, out.message).ok();
            writeln!(
                buf,
                "Elements: {} total, {} created, {} skipped, {} failed",
                report.total,
                report.created.len(),
                report.skipped.len(),
                report.failed.len()
            )
            .ok();
            if !report.degraded.is_empty() {
                let line = format!("Degraded text styling: {:?}", report.degraded);
                writeln!(buf, "{}", color(&line, "33", colorize)).ok();
            }
            if !report.placeholders.is_empty() {
                let line = format!("Image placeholders: {:?}", report.placeholders);
                writeln!(buf, "{}", color(&line, "33", colorize)).ok();
            }
            if !report.failed.is_empty() {
                let line = format!("Failed: {:?}", report.failed);
                writeln!(buf, "{}", color(&line, "31", colorize)).ok();
            }
            if let Some(path) = &out.scene_output {
                writeln!(buf, "Scene: {}", path.display()).ok();
            }
        }
        H2dOutput::Error(out) => {
            let header = color("[ERROR]", "31", colorize);
            let message = out
                .message
                .as_deref()
                .unwrap_or_else(|| out.error.message.as_str());
            writeln!(buf, "{} {}", header, message).ok();
            if let Some(remediation) = &out.error.remediation {
                writeln!(buf, "Hint: {}", remediation).ok();
            }
        }
    }
    buf
}

fn display_title(title: &str) -> &str {
    if title.is_empty() {
        "(untitled)"
    } else {
        title
    }
}

/// Apply ANSI color codes when enabled.
fn color(text: &str, code: &str, colorize: bool) -> String {
    if colorize {
        format!("\x1b[{}m{}\x1b[0m", code, text)
    } else {
        text.to_string()
    }
}
