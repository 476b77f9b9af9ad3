use std::path::Path;
use std::time::Duration;

use pagerender_lib::{
    Config, Credentials, LaunchOptions, NavigationOptions, PageOptions, PdfMargin, PdfOptions,
    RenderError, ScreenshotOptions, Viewport,
};

use crate::cli::{CommonArgs, PdfArgs, ScreenshotArgs};

/// Load config from a TOML file, central config, or return defaults.
/// Priority: explicit path > ~/.config/pagerender/config.toml > defaults
pub fn load_config(path: Option<&Path>) -> Result<Config, RenderError> {
    let cfg = Config::load(path).map_err(|e| {
        let loc = path
            .map(|p| p.display().to_string())
            .or_else(|| Config::central_config_path().map(|p| p.display().to_string()))
            .unwrap_or_else(|| "defaults".to_string());
        RenderError::Config(format!("Failed to read config {}: {}", loc, e))
    })?;

    cfg.validate().map_err(|e| {
        let prefix = path
            .map(|p| format!("Invalid config ({}): {}", p.display(), e))
            .unwrap_or_else(|| format!("Invalid config: {}", e));
        RenderError::Config(prefix)
    })?;
    Ok(cfg)
}

/// Launch options: config values, with CLI flags layered on top. CLI browser
/// flags are appended after the configured ones.
pub fn resolve_launch_options(args: &CommonArgs, config: &Config) -> LaunchOptions {
    let mut launch = config.launch.clone();
    if let Some(chrome) = &args.chrome {
        launch.executable = Some(chrome.clone());
    }
    if args.headful {
        launch.headless = false;
    }
    launch.args.extend(args.chrome_args.iter().cloned());
    launch
}

pub fn resolve_page_options(args: &CommonArgs, config: &Config) -> PageOptions {
    let navigation = NavigationOptions {
        wait_until: args
            .wait_until
            .map(Into::into)
            .unwrap_or(config.page.wait_until),
        timeout: args
            .nav_timeout
            .map(Duration::from_secs)
            .unwrap_or(config.page.timeout),
    };
    let credentials = match (&args.username, &args.password) {
        (Some(user), Some(pass)) => Some(Credentials::new(user, pass)),
        _ => None,
    };
    PageOptions {
        navigation,
        headers: args.headers.clone(),
        emulate_media_type: args.media.map(Into::into),
        credentials,
    }
}

pub fn resolve_pdf_options(args: &PdfArgs) -> PdfOptions {
    PdfOptions {
        landscape: args.landscape,
        print_background: args.print_background,
        scale: args.scale,
        format: args.paper.map(Into::into),
        margin: args.margin.map(PdfMargin::uniform).unwrap_or_default(),
        page_ranges: args.page_ranges.clone(),
        ..PdfOptions::default()
    }
}

pub fn resolve_screenshot_settings(
    args: &ScreenshotArgs,
    config: &Config,
) -> (Viewport, ScreenshotOptions) {
    let mut viewport = args.viewport.unwrap_or(config.viewport);
    if let Some(scale) = args.scale_factor {
        viewport.device_scale_factor = scale;
    }

    let defaults = config.screenshot;
    let options = ScreenshotOptions {
        format: args.image_type.map(Into::into).unwrap_or(defaults.format),
        quality: args.quality.or(defaults.quality),
        full_page: args.full_page || defaults.full_page,
        omit_background: args.omit_background || defaults.omit_background,
        animation_timeout: args
            .animation_timeout
            .map(Duration::from_millis)
            .unwrap_or(defaults.animation_timeout),
    };
    (viewport, options)
}

/// Format effective settings as a single-line string.
pub fn format_effective_settings(
    launch: &LaunchOptions,
    page: &PageOptions,
    config_source: Option<&Path>,
) -> String {
    let source = config_source
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "defaults".to_string());
    format!(
        "Effective settings [{source}]: headless={}, chrome={}, extra-args={}, wait-until={}, nav-timeout={}s, headers={}, media={}, auth={}",
        launch.headless,
        launch
            .executable
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "auto".to_string()),
        launch.args.len(),
        page.navigation.wait_until,
        page.navigation.timeout.as_secs(),
        page.headers.is_some(),
        page.emulate_media_type
            .map(|m| m.as_str())
            .unwrap_or("default"),
        page.credentials.is_some(),
    )
}
