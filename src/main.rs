mod cli;
mod commands;
mod formatting;
mod settings;

use std::process::ExitCode;

use cli::{Commands, CommonArgs};
use commands::{run_render, RenderJob};
use formatting::render_error;
use settings::{load_config, resolve_pdf_options, resolve_screenshot_settings};

#[tokio::main]
async fn main() -> ExitCode {
    run().await
}

async fn run() -> ExitCode {
    let args = cli::parse();
    let format = common_args(&args.command).format;

    let config = match load_config(args.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(err) => {
            init_logging(args.verbose, "info");
            return render_error(err, format);
        }
    };
    init_logging(args.verbose, &config.log_level);

    let (common, job) = match args.command {
        Commands::Html { common } => (common, RenderJob::Html),
        Commands::Pdf { common, pdf } => (common, RenderJob::Pdf(resolve_pdf_options(&pdf))),
        Commands::Screenshot { common, shot } => {
            let (viewport, options) = resolve_screenshot_settings(&shot, &config);
            (common, RenderJob::Screenshot { viewport, options })
        }
    };

    run_render(common, job, &config, args.config.as_deref()).await
}

fn common_args(command: &Commands) -> &CommonArgs {
    match command {
        Commands::Html { common }
        | Commands::Pdf { common, .. }
        | Commands::Screenshot { common, .. } => common,
    }
}

/// Logs go to stderr so raw documents on stdout stay clean.
/// `RUST_LOG` wins over `--verbose`, which wins over the configured level.
fn init_logging(verbose: bool, level: &str) {
    let default_level = if verbose { "debug" } else { level };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
