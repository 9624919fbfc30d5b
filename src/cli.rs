use clap::{Parser, Subcommand, ValueEnum};
use h2d_lib::reconstruct::AssetMatching;
use h2d_lib::Viewport;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "h2d")]
#[command(
    version,
    about = "HTML to Design - capture rendered pages into archives and rebuild them as design scenes",
    long_about = "HTML to Design (h2d)\n\nModes:\n- capture: render a URL (or load a DOM snapshot), extract visible elements and images, and write a page archive.\n- inspect: list the manifest and entries of a page archive.\n- reconstruct: rebuild an archive as a design scene in the in-memory host and report per-element outcomes.\n\nUse --help on any subcommand for details."
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(
        long,
        global = true,
        value_name = "PATH",
        help = "Optional config file (TOML) to set defaults for viewport/timeouts/capture/reconstruct; CLI flags override config"
    )]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Capture a rendered page into a portable archive
    Capture {
        #[arg(
            long,
            conflicts_with = "snapshot",
            required_unless_present = "snapshot",
            help = "Page URL to render with Playwright"
        )]
        url: Option<String>,

        #[arg(
            long,
            value_name = "FILE",
            help = "DOM snapshot JSON to capture instead of rendering a URL"
        )]
        snapshot: Option<PathBuf>,

        #[arg(
            long,
            value_name = "PATH",
            help = "Archive path (defaults to page-YYYYMMDD_HHMMSS.zip in the current directory)"
        )]
        archive: Option<PathBuf>,

        #[arg(
            long,
            default_value = "1440x900",
            help = "Viewport dimensions (WIDTHxHEIGHT)"
        )]
        viewport: Viewport,

        #[arg(
            long,
            default_value = "3",
            help = "Per-image load timeout (seconds)"
        )]
        image_timeout: u64,

        #[arg(
            long,
            help = "Do not fetch image bytes; record images as URL references"
        )]
        offline: bool,

        #[arg(
            long,
            default_value = "30",
            help = "Navigation timeout (seconds) for URL rendering"
        )]
        nav_timeout: u64,

        #[arg(
            long,
            default_value = "10",
            help = "Network idle timeout (seconds) for URL rendering"
        )]
        network_idle_timeout: u64,

        #[arg(
            long,
            default_value = "45",
            help = "Process timeout (seconds) for Playwright invocation"
        )]
        process_timeout: u64,

        #[arg(long, value_enum, default_value = "json", help = "Output format")]
        format: OutputFormat,

        #[arg(long, short, help = "Report file path (stdout if omitted)")]
        output: Option<PathBuf>,
    },

    /// Show the manifest and entries of a page archive
    Inspect {
        #[arg(long, short, value_name = "ARCHIVE", help = "Archive to inspect")]
        input: PathBuf,

        #[arg(long, value_enum, default_value = "json", help = "Output format")]
        format: OutputFormat,

        #[arg(long, short, help = "Report file path (stdout if omitted)")]
        output: Option<PathBuf>,
    },

    /// Rebuild a page archive as a design scene
    Reconstruct {
        #[arg(long, short, value_name = "ARCHIVE", help = "Archive to reconstruct")]
        input: PathBuf,

        #[arg(
            long,
            help = "Use vertical auto-layout for div/section/article/nav/header/footer containers"
        )]
        auto_layout: bool,

        #[arg(long, value_enum, help = "How img elements find their packaged bytes")]
        asset_matching: Option<AssetMatching>,

        #[arg(
            long = "font",
            value_name = "FAMILY",
            help = "Extra font family available to the scene host (repeatable)"
        )]
        fonts: Vec<String>,

        #[arg(long, value_name = "PATH", help = "Write the built scene as JSON")]
        scene_output: Option<PathBuf>,

        #[arg(long, value_enum, default_value = "json", help = "Output format")]
        format: OutputFormat,

        #[arg(long, short, help = "Report file path (stdout if omitted)")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Pretty,
}

pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::{Cli, Commands, OutputFormat};
    use clap::Parser;
    use h2d_lib::reconstruct::AssetMatching;

    #[test]
    fn capture_command_uses_defaults() {
        let cli = Cli::parse_from(["h2d", "capture", "--url", "https://example.com"]);

        assert!(!cli.verbose);
        assert!(cli.config.is_none());

        match cli.command {
            Commands::Capture {
                url,
                snapshot,
                archive,
                viewport,
                image_timeout,
                offline,
                nav_timeout,
                network_idle_timeout,
                process_timeout,
                format,
                output,
            } => {
                assert_eq!(url.as_deref(), Some("https://example.com"));
                assert!(snapshot.is_none());
                assert!(archive.is_none());
                assert_eq!(viewport.width, 1440);
                assert_eq!(viewport.height, 900);
                assert_eq!(image_timeout, 3);
                assert!(!offline);
                assert_eq!(nav_timeout, 30);
                assert_eq!(network_idle_timeout, 10);
                assert_eq!(process_timeout, 45);
                assert!(matches!(format, OutputFormat::Json));
                assert!(output.is_none());
            }
            _ => panic!("expected capture command"),
        }
    }

    #[test]
    fn capture_requires_exactly_one_source() {
        assert!(Cli::try_parse_from(["h2d", "capture"]).is_err());
        assert!(Cli::try_parse_from([
            "h2d",
            "capture",
            "--url",
            "https://example.com",
            "--snapshot",
            "page.json",
        ])
        .is_err());
        assert!(Cli::try_parse_from(["h2d", "capture", "--snapshot", "page.json"]).is_ok());
    }

    #[test]
    fn reconstruct_command_respects_overrides() {
        let cli = Cli::parse_from([
            "h2d",
            "reconstruct",
            "--input",
            "page.zip",
            "--auto-layout",
            "--asset-matching",
            "first-available",
            "--font",
            "Lato",
            "--font",
            "Roboto Mono",
            "--scene-output",
            "scene.json",
            "--format",
            "pretty",
            "--verbose",
            "--config",
            "h2d.toml",
        ]);

        assert!(cli.verbose);
        assert_eq!(
            cli.config.as_deref(),
            Some(std::path::Path::new("h2d.toml"))
        );
        match cli.command {
            Commands::Reconstruct {
                input,
                auto_layout,
                asset_matching,
                fonts,
                scene_output,
                format,
                output,
            } => {
                assert_eq!(input, std::path::PathBuf::from("page.zip"));
                assert!(auto_layout);
                assert_eq!(asset_matching, Some(AssetMatching::FirstAvailable));
                assert_eq!(fonts, vec!["Lato".to_string(), "Roboto Mono".to_string()]);
                assert_eq!(
                    scene_output.as_deref(),
                    Some(std::path::Path::new("scene.json"))
                );
                assert!(matches!(format, OutputFormat::Pretty));
                assert!(output.is_none());
            }
            _ => panic!("expected reconstruct command"),
        }
    }

    #[test]
    fn rejects_malformed_viewport() {
        assert!(Cli::try_parse_from([
            "h2d",
            "capture",
            "--url",
            "https://example.com",
            "--viewport",
            "wide",
        ])
        .is_err());
    }
}
