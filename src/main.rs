mod cli;
mod commands;
mod formatting;
mod settings;

use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use cli::Commands;
use commands::{run_capture, run_inspect, run_reconstruct};
use settings::CaptureArgs;

#[tokio::main]
async fn main() -> ExitCode {
    run().await
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing(verbose: bool) {
    let default = if verbose { "h2d=info,h2d_lib=info" } else { "h2d=warn,h2d_lib=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

async fn run() -> ExitCode {
    let raw_args: Vec<String> = std::env::args().collect();
    let args = cli::parse();
    init_tracing(args.verbose);

    match args.command {
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
            run_capture(
                &raw_args,
                args.config,
                args.verbose,
                url,
                snapshot,
                archive,
                CaptureArgs {
                    viewport,
                    image_timeout,
                    nav_timeout,
                    network_idle_timeout,
                    process_timeout,
                    offline,
                },
                format,
                output,
            )
            .await
        }
        Commands::Inspect {
            input,
            format,
            output,
        } => run_inspect(args.verbose, input, format, output).await,
        Commands::Reconstruct {
            input,
            auto_layout,
            asset_matching,
            fonts,
            scene_output,
            format,
            output,
        } => {
            run_reconstruct(
                args.config,
                args.verbose,
                input,
                auto_layout,
                asset_matching,
                fonts,
                scene_output,
                format,
                output,
            )
            .await
        }
    }
}
