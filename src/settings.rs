use std::path::Path;
use std::time::Duration;

use h2d_lib::reconstruct::{AssetMatching, ReconstructOptions};
use h2d_lib::Viewport;
use h2d_lib::{Config, H2dError};

/// Tracks which capture flags were explicitly provided vs. defaulted.
#[derive(Debug, Default)]
pub struct CaptureFlagSources {
    pub viewport: bool,
    pub image_timeout: bool,
    pub nav_timeout: bool,
    pub network_idle_timeout: bool,
    pub process_timeout: bool,
}

impl CaptureFlagSources {
    pub fn from_args(args: &[String]) -> Self {
        Self {
            viewport: flag_present(args, "--viewport"),
            image_timeout: flag_present(args, "--image-timeout"),
            nav_timeout: flag_present(args, "--nav-timeout"),
            network_idle_timeout: flag_present(args, "--network-idle-timeout"),
            process_timeout: flag_present(args, "--process-timeout"),
        }
    }
}

/// Checks if a flag was present in the command-line arguments.
pub fn flag_present(args: &[String], flag: &str) -> bool {
    args.iter()
        .any(|arg| arg == flag || arg.starts_with(&format!("{flag}=")))
}

/// Capture flag values as parsed, before merging with config.
#[derive(Debug, Clone, Copy)]
pub struct CaptureArgs {
    pub viewport: Viewport,
    pub image_timeout: u64,
    pub nav_timeout: u64,
    pub network_idle_timeout: u64,
    pub process_timeout: u64,
    pub offline: bool,
}

/// Resolved settings after merging CLI args and config file.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedCaptureSettings {
    pub viewport: Viewport,
    pub image_timeout: Duration,
    pub nav_timeout: Duration,
    pub network_idle_timeout: Duration,
    pub process_timeout: Duration,
    pub fetch_images: bool,
    pub max_payload_chars: usize,
    pub max_image_bytes: u64,
}

/// Merge CLI arguments with config file, preferring CLI when flags are present.
pub fn resolve_capture_settings(
    cli: CaptureArgs,
    config: &Config,
    flags: &CaptureFlagSources,
) -> ResolvedCaptureSettings {
    let pick = |present: bool, secs: u64, configured: Duration| {
        if present {
            Duration::from_secs(secs)
        } else {
            configured
        }
    };
    ResolvedCaptureSettings {
        viewport: if flags.viewport {
            cli.viewport
        } else {
            config.viewport
        },
        image_timeout: pick(
            flags.image_timeout,
            cli.image_timeout,
            config.timeouts.image_load,
        ),
        nav_timeout: pick(flags.nav_timeout, cli.nav_timeout, config.timeouts.navigation),
        network_idle_timeout: pick(
            flags.network_idle_timeout,
            cli.network_idle_timeout,
            config.timeouts.network_idle,
        ),
        process_timeout: pick(
            flags.process_timeout,
            cli.process_timeout,
            config.timeouts.process,
        ),
        fetch_images: config.capture.fetch_images && !cli.offline,
        max_payload_chars: config.capture.max_payload_chars,
        max_image_bytes: config.capture.max_image_bytes,
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedReconstructSettings {
    pub options: ReconstructOptions,
    /// Extra font families for the in-memory host, config first.
    pub fonts: Vec<String>,
}

/// `--auto-layout` can only switch auto-layout on; config decides otherwise.
pub fn resolve_reconstruct_settings(
    cli_auto_layout: bool,
    cli_asset_matching: Option<AssetMatching>,
    cli_fonts: &[String],
    config: &Config,
) -> ResolvedReconstructSettings {
    let mut options = config.reconstruct.options();
    options.use_auto_layout |= cli_auto_layout;
    if let Some(matching) = cli_asset_matching {
        options.asset_matching = matching;
    }
    let mut fonts = config.reconstruct.fonts.clone();
    for font in cli_fonts {
        if !fonts.contains(font) {
            fonts.push(font.clone());
        }
    }
    ResolvedReconstructSettings { options, fonts }
}

/// Load config from a TOML file, central config, or return defaults.
/// Priority: explicit path > ~/.config/h2d/config.toml > defaults
pub fn load_config(path: Option<&Path>) -> Result<Config, H2dError> {
    let cfg = Config::load(path)?;

    cfg.validate().map_err(|e| match path {
        Some(p) => H2dError::Config(format!("{} ({})", e, p.display())),
        None => H2dError::from(e),
    })?;
    Ok(cfg)
}

/// Format effective capture config as a single-line string.
pub fn format_effective_config(
    settings: &ResolvedCaptureSettings,
    config_source: Option<&Path>,
) -> String {
    let source = config_source
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "defaults".to_string());
    format!(
        "Effective config [{source}]: viewport={}x{}, timeouts: nav={}s, network-idle={}s, process={}s, image={}ms, fetch_images={}, max_payload_chars={}, max_image_bytes={}",
        settings.viewport.width,
        settings.viewport.height,
        settings.nav_timeout.as_secs(),
        settings.network_idle_timeout.as_secs(),
        settings.process_timeout.as_secs(),
        settings.image_timeout.as_millis(),
        settings.fetch_images,
        settings.max_payload_chars,
        settings.max_image_bytes,
    )
}
