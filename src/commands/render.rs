use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use pagerender_lib::{
    Config, HtmlOutput, ImageDimensions, PageOptions, PdfOptions, PdfOutput, RenderError,
    RenderOutput, Renderer, ScreenshotOptions, ScreenshotOutput, Viewport, OUTPUT_VERSION,
};
use tracing::{debug, info, warn};

use crate::cli::CommonArgs;
use crate::formatting::{render_error, write_output, Rendered};
use crate::settings::{format_effective_settings, resolve_launch_options, resolve_page_options};

/// What to produce for the requested URL.
pub enum RenderJob {
    Html,
    Pdf(PdfOptions),
    Screenshot {
        viewport: Viewport,
        options: ScreenshotOptions,
    },
}

/// Run one render: launch the browser, render, always shut the browser down,
/// then write the result.
pub async fn run_render(
    common: CommonArgs,
    job: RenderJob,
    config: &Config,
    config_path: Option<&Path>,
) -> ExitCode {
    let format = common.format;

    let url = match validate_url(&common.url) {
        Ok(url) => url,
        Err(err) => return render_error(err, format),
    };

    let launch = resolve_launch_options(&common, config);
    let page = resolve_page_options(&common, config);
    debug!("{}", format_effective_settings(&launch, &page, config_path));

    let renderer = match Renderer::launch(launch).await {
        Ok(renderer) => renderer,
        Err(err) => return render_error(err, format),
    };

    let started = Instant::now();
    let result = render(&renderer, &url, &page, &job).await;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    if let Err(err) = renderer.shutdown().await {
        warn!(error = %err, "browser shutdown failed");
    }

    let body = match result {
        Ok(body) => body,
        Err(err) => return render_error(err, format),
    };
    info!(url = %url, bytes = body.len(), elapsed_ms, "render complete");

    let output_path = common.output.clone();
    let descriptor = describe(&job, url, elapsed_ms, &body, output_path);
    match write_output(
        Rendered { body, descriptor },
        format,
        common.output.as_deref(),
    ) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => render_error(err, format),
    }
}

fn validate_url(raw: &str) -> Result<String, RenderError> {
    let parsed = url::Url::parse(raw)
        .map_err(|e| RenderError::Config(format!("Invalid URL '{}': {}", raw, e)))?;
    match parsed.scheme() {
        "http" | "https" | "file" | "data" | "about" => Ok(parsed.to_string()),
        scheme => Err(RenderError::Config(format!(
            "Invalid URL '{}': unsupported scheme '{}'",
            raw, scheme
        ))),
    }
}

async fn render(
    renderer: &Renderer<pagerender_lib::ChromiumEngine>,
    url: &str,
    page: &PageOptions,
    job: &RenderJob,
) -> Result<Vec<u8>, RenderError> {
    match job {
        RenderJob::Html => renderer
            .render_html(url, page)
            .await
            .map(String::into_bytes),
        RenderJob::Pdf(pdf) => renderer.render_pdf(url, page, pdf).await,
        RenderJob::Screenshot { viewport, options } => renderer
            .render_screenshot(url, page, viewport, options)
            .await
            .map(|shot| shot.bytes),
    }
}

fn describe(
    job: &RenderJob,
    url: String,
    elapsed_ms: u64,
    body: &[u8],
    output_path: Option<PathBuf>,
) -> RenderOutput {
    let version = OUTPUT_VERSION.to_string();
    match job {
        RenderJob::Html => RenderOutput::Html(HtmlOutput {
            version,
            url,
            elapsed_ms,
            output_path,
            html: None,
        }),
        RenderJob::Pdf(_) => RenderOutput::Pdf(PdfOutput {
            version,
            url,
            elapsed_ms,
            bytes: body.len(),
            output_path,
            data: None,
        }),
        RenderJob::Screenshot { viewport, options } => RenderOutput::Screenshot(ScreenshotOutput {
            version,
            url,
            elapsed_ms,
            format: options.format,
            content_type: options.format.mime_type().to_string(),
            viewport: *viewport,
            dimensions: ImageDimensions::probe(body),
            bytes: body.len(),
            output_path,
            data: None,
        }),
    }
}
