use std::path::PathBuf;
use std::process::ExitCode;

use h2d_lib::archive::ImportedArchive;
use h2d_lib::output::{InspectOutput, H2D_OUTPUT_VERSION};
use h2d_lib::{import_archive, H2dError, H2dOutput};

use crate::cli::OutputFormat;
use crate::formatting::{render_error, write_output};

/// Run the inspect command.
pub async fn run_inspect(
    verbose: bool,
    input: PathBuf,
    format: OutputFormat,
    output: Option<PathBuf>,
) -> ExitCode {
    let archive = match read_archive(&input) {
        Ok(archive) => archive,
        Err(err) => return render_error(err, format, output),
    };
    if verbose {
        eprintln!(
            "Read {} entries from {}",
            archive.entries.len(),
            input.display()
        );
    }

    let body = H2dOutput::Inspect(InspectOutput {
        version: H2D_OUTPUT_VERSION.to_string(),
        input,
        elements: archive.page.elements.len(),
        assets: archive.page.assets.len(),
        viewport: archive.page.viewport,
        manifest: archive.manifest,
        entries: archive.entries,
    });
    if let Err(err) = write_output(&body, format, output.clone()) {
        return render_error(H2dError::Config(err.to_string()), format, output);
    }
    ExitCode::SUCCESS
}

/// Read and decode an archive file, naming the path when it is missing.
pub(crate) fn read_archive(path: &std::path::Path) -> Result<ImportedArchive, H2dError> {
    let bytes = std::fs::read(path).map_err(|e| {
        H2dError::Config(format!(
            "Archive file not found or unreadable: {} ({e})",
            path.display()
        ))
    })?;
    Ok(import_archive(&bytes)?)
}
