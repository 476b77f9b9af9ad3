//! pagerender library
//!
//! Renders URLs to HTML, PDF, or raster images through one shared headless
//! Chromium. Each render gets its own page, which is configured, navigated,
//! read, and closed again whether the render succeeds or not.
//!
//! # Module Overview
//!
//! - [`engine`] - Browser engine traits, launch options, Chromium implementation
//! - [`page`] - Request-scoped page lifecycle
//! - [`settle`] - Animation settling before screenshots
//! - [`renderer`] - `render_html` / `render_pdf` / `render_screenshot` facade
//! - [`options`] - Per-request options
//! - [`viewport`] - Viewport size and `WxH@Nx` parsing
//! - [`config`] - Configuration file support
//! - [`output`] - JSON output schemas
//!
//! # Example
//!
//! ```no_run
//! use pagerender_lib::{LaunchOptions, PageOptions, Renderer};
//!
//! # async fn example() -> pagerender_lib::Result<()> {
//! let renderer = Renderer::launch(LaunchOptions::default()).await?;
//! let html = renderer
//!     .render_html("https://example.com", &PageOptions::default())
//!     .await;
//! renderer.shutdown().await?;
//! println!("{}", html?);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod options;
pub mod output;
pub mod page;
pub mod renderer;
pub mod settle;
pub mod viewport;

pub use config::{Config, ConfigError};
pub use engine::{
    ChromiumEngine, ChromiumPage, Engine, EnginePage, EngineResult, LaunchOptions, FIXED_ARGS,
};
pub use error::{EngineError, ErrorCategory, ErrorPayload, PageCloseError, RenderError, Result};
pub use options::{
    parse_headers, CaptureOptions, Credentials, ImageFormat, MediaType, NavigationOptions,
    PageOptions, PaperFormat, PdfMargin, PdfOptions, Screenshot, ScreenshotOptions, WaitUntil,
    DEFAULT_NAVIGATION_TIMEOUT,
};
pub use output::{
    ErrorOutput, HtmlOutput, ImageDimensions, PdfOutput, RenderOutput, ScreenshotOutput,
    OUTPUT_VERSION,
};
pub use page::{with_page, PageState};
pub use renderer::Renderer;
pub use settle::{settle, SettleOutcome, SETTLE_POLL_INTERVAL};
pub use viewport::{Viewport, ViewportParseError};
