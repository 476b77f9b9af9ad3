//! Per-request option types.
//!
//! Options arrive already validated, except for the extra-header string which
//! is parsed here when the page is configured.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use crate::{RenderError, Result};

/// Default navigation timeout.
pub const DEFAULT_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Readiness condition that ends navigation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitUntil {
    #[default]
    Load,
    #[serde(rename = "domcontentloaded")]
    DomContentLoaded,
    #[serde(alias = "networkidle0", alias = "networkidle2")]
    NetworkIdle,
}

impl fmt::Display for WaitUntil {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WaitUntil::Load => "load",
            WaitUntil::DomContentLoaded => "domcontentloaded",
            WaitUntil::NetworkIdle => "networkidle",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationOptions {
    #[serde(default)]
    pub wait_until: WaitUntil,
    /// Zero disables the navigation deadline.
    #[serde(default = "default_navigation_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

fn default_navigation_timeout() -> Duration {
    DEFAULT_NAVIGATION_TIMEOUT
}

impl Default for NavigationOptions {
    fn default() -> Self {
        Self {
            wait_until: WaitUntil::default(),
            timeout: DEFAULT_NAVIGATION_TIMEOUT,
        }
    }
}

/// CSS media type to emulate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Screen,
    Print,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Screen => "screen",
            MediaType::Print => "print",
        }
    }
}

/// HTTP basic-auth credentials.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Options applied to the page before and during navigation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageOptions {
    pub navigation: NavigationOptions,
    /// Extra HTTP headers as a JSON object string, e.g. `{"x-token":"abc"}`.
    pub headers: Option<String>,
    pub emulate_media_type: Option<MediaType>,
    pub credentials: Option<Credentials>,
}

/// Parses the extra-header JSON string into a header map.
///
/// The value must be a JSON object whose values are all strings.
pub fn parse_headers(raw: &str) -> Result<BTreeMap<String, String>> {
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| RenderError::bad_options(format!("headers are not valid JSON: {}", e)))?;

    let object = match value {
        serde_json::Value::Object(map) => map,
        other => {
            return Err(RenderError::bad_options(format!(
                "headers must be a JSON object, got {}",
                json_kind(&other)
            )))
        }
    };

    object
        .into_iter()
        .map(|(name, value)| match value {
            serde_json::Value::String(s) => Ok((name, s)),
            other => Err(RenderError::bad_options(format!(
                "header '{}' must be a string, got {}",
                name,
                json_kind(&other)
            ))),
        })
        .collect()
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Named paper sizes, in inches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaperFormat {
    Letter,
    Legal,
    Tabloid,
    A3,
    A4,
    A5,
}

impl PaperFormat {
    /// Width and height in inches (portrait).
    pub fn dimensions(&self) -> (f64, f64) {
        match self {
            PaperFormat::Letter => (8.5, 11.0),
            PaperFormat::Legal => (8.5, 14.0),
            PaperFormat::Tabloid => (11.0, 17.0),
            PaperFormat::A3 => (11.7, 16.54),
            PaperFormat::A4 => (8.27, 11.7),
            PaperFormat::A5 => (5.83, 8.27),
        }
    }
}

/// Page margins in inches. Unset sides use the engine default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PdfMargin {
    pub top: Option<f64>,
    pub right: Option<f64>,
    pub bottom: Option<f64>,
    pub left: Option<f64>,
}

impl PdfMargin {
    pub fn uniform(inches: f64) -> Self {
        Self {
            top: Some(inches),
            right: Some(inches),
            bottom: Some(inches),
            left: Some(inches),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PdfOptions {
    pub landscape: bool,
    pub print_background: bool,
    pub scale: Option<f64>,
    /// Takes precedence over `width`/`height`.
    pub format: Option<PaperFormat>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub margin: PdfMargin,
    pub page_ranges: Option<String>,
    pub display_header_footer: bool,
    pub header_template: Option<String>,
    pub footer_template: Option<String>,
    pub prefer_css_page_size: bool,
}

impl PdfOptions {
    /// Effective paper size in inches, if any was requested.
    pub fn paper_size(&self) -> Option<(f64, f64)> {
        if let Some(format) = self.format {
            return Some(format.dimensions());
        }
        match (self.width, self.height) {
            (None, None) => None,
            (width, height) => {
                let (default_w, default_h) = PaperFormat::Letter.dimensions();
                Some((width.unwrap_or(default_w), height.unwrap_or(default_h)))
            }
        }
    }
}

/// Raster format of a screenshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Png,
    Jpeg,
    Webp,
}

impl ImageFormat {
    /// Whether the format accepts a quality setting.
    pub fn is_lossy(&self) -> bool {
        matches!(self, ImageFormat::Jpeg | ImageFormat::Webp)
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Webp => "webp",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Webp => "image/webp",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScreenshotOptions {
    #[serde(rename = "type")]
    pub format: ImageFormat,
    /// 0-100; only honoured for lossy formats.
    pub quality: Option<u8>,
    pub full_page: bool,
    pub omit_background: bool,
    /// Zero skips animation settling.
    #[serde(with = "humantime_serde")]
    pub animation_timeout: Duration,
}

impl ScreenshotOptions {
    /// Options for the engine capture call. Quality is dropped for lossless formats.
    pub fn capture_options(&self) -> CaptureOptions {
        CaptureOptions {
            format: self.format,
            quality: if self.format.is_lossy() {
                self.quality
            } else {
                None
            },
            full_page: self.full_page,
            omit_background: self.omit_background,
        }
    }
}

/// Parameters of one engine capture call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureOptions {
    pub format: ImageFormat,
    pub quality: Option<u8>,
    pub full_page: bool,
    pub omit_background: bool,
}

/// A captured screenshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screenshot {
    pub format: ImageFormat,
    pub bytes: Vec<u8>,
}
