use std::path::{Path, PathBuf};
use std::process::ExitCode;

use h2d_lib::output::{ReconstructOutput, H2D_OUTPUT_VERSION};
use h2d_lib::protocol::{handle_import, ImportRequest, ImportSettings, PluginMessage};
use h2d_lib::reconstruct::{AssetMatching, MemoryHost};
use h2d_lib::{H2dError, H2dOutput};

use crate::cli::OutputFormat;
use crate::commands::inspect::read_archive;
use crate::formatting::{render_error, write_output};
use crate::settings::{load_config, resolve_reconstruct_settings};

/// Run the reconstruct command.
#[allow(clippy::too_many_arguments)]
pub async fn run_reconstruct(
    config_path: Option<PathBuf>,
    verbose: bool,
    input: PathBuf,
    auto_layout: bool,
    asset_matching: Option<AssetMatching>,
    fonts: Vec<String>,
    scene_output: Option<PathBuf>,
    format: OutputFormat,
    output: Option<PathBuf>,
) -> ExitCode {
    let config = match load_config(config_path.as_deref()) {
        Ok(cfg) => cfg,
        Err(err) => return render_error(err, format, output),
    };
    let resolved = resolve_reconstruct_settings(auto_layout, asset_matching, &fonts, &config);

    let archive = match read_archive(&input) {
        Ok(archive) => archive,
        Err(err) => return render_error(err, format, output),
    };
    let settings = ImportSettings {
        use_auto_layout: resolved.options.use_auto_layout,
        asset_matching: Some(resolved.options.asset_matching),
    };
    let request = match ImportRequest::from_archive(archive, settings) {
        Ok(request) => request,
        Err(err) => return render_error(err, format, output),
    };

    let mut host = MemoryHost::new();
    for family in &resolved.fonts {
        host.add_font_family(family);
    }

    let mut message = String::new();
    let mut emit = |msg: PluginMessage| match msg {
        PluginMessage::ImportProgress(update) => {
            if verbose {
                eprintln!("[{:>3}%] {}", update.percent, update.message);
            }
        }
        PluginMessage::ImportSuccess { message: text } => message = text,
        PluginMessage::ImportError { .. } => {}
    };
    let reconstruction =
        match handle_import(request, &resolved.options, &mut host, &mut emit).await {
            Ok(reconstruction) => reconstruction,
            Err(err) => return render_error(err, format, output),
        };

    if let Some(path) = &scene_output {
        if let Err(err) = write_scene(&host, path) {
            return render_error(err, format, output);
        }
        if verbose {
            eprintln!("Wrote scene to {}", path.display());
        }
    }

    let body = H2dOutput::Reconstruct(ReconstructOutput {
        version: H2D_OUTPUT_VERSION.to_string(),
        input,
        message,
        report: reconstruction.report,
        scene_output,
    });
    if let Err(err) = write_output(&body, format, output.clone()) {
        return render_error(H2dError::Config(err.to_string()), format, output);
    }
    ExitCode::SUCCESS
}

fn write_scene(host: &MemoryHost, path: &Path) -> Result<(), H2dError> {
    let json = serde_json::to_string_pretty(&host.scene())?;
    std::fs::write(path, json)?;
    Ok(())
}
