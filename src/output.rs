use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::path::PathBuf;

use crate::error::ErrorPayload;
use crate::options::ImageFormat;
use crate::Viewport;

/// Schema version for output payloads.
pub const OUTPUT_VERSION: &str = "0.1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum RenderOutput {
    Html(HtmlOutput),
    Pdf(PdfOutput),
    Screenshot(ScreenshotOutput),
    Error(ErrorOutput),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HtmlOutput {
    pub version: String,
    pub url: String,
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    /// Inline document when no output path was given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfOutput {
    pub version: String,
    pub url: String,
    pub elapsed_ms: u64,
    pub bytes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    /// Base64 document when no output path was given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenshotOutput {
    pub version: String,
    pub url: String,
    pub elapsed_ms: u64,
    #[serde(rename = "type")]
    pub format: ImageFormat,
    pub content_type: String,
    pub viewport: Viewport,
    /// Decoded image size; differs from the viewport for full-page or scaled captures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<ImageDimensions>,
    pub bytes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

impl ImageDimensions {
    /// Reads the pixel size from an encoded screenshot's header without
    /// decoding the pixel data.
    pub fn probe(bytes: &[u8]) -> Option<Self> {
        let (width, height) = image::io::Reader::new(Cursor::new(bytes))
            .with_guessed_format()
            .ok()?
            .into_dimensions()
            .ok()?;
        Some(Self { width, height })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorOutput {
    pub version: String,
    pub error: ErrorPayload,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage, Rgba, RgbaImage};

    #[test]
    fn screenshot_output_uses_mode_tag_and_type_field() {
        let out = RenderOutput::Screenshot(ScreenshotOutput {
            version: OUTPUT_VERSION.to_string(),
            url: "https://example.com".to_string(),
            elapsed_ms: 12,
            format: ImageFormat::Png,
            content_type: ImageFormat::Png.mime_type().to_string(),
            viewport: Viewport::new(800, 600),
            dimensions: None,
            bytes: 3,
            output_path: Some(PathBuf::from("shot.png")),
            data: None,
        });
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["mode"], "screenshot");
        assert_eq!(json["type"], "png");
        assert_eq!(json["contentType"], "image/png");
        assert_eq!(json["outputPath"], "shot.png");
        assert!(json.get("data").is_none());
        assert!(json.get("dimensions").is_none());
    }

    #[test]
    fn error_output_round_trips_category() {
        let out = RenderOutput::Error(ErrorOutput {
            version: OUTPUT_VERSION.to_string(),
            error: ErrorPayload::new(ErrorCategory::Launch, "no chrome".to_string(), "install"),
        });
        let text = serde_json::to_string(&out).unwrap();
        match serde_json::from_str::<RenderOutput>(&text).unwrap() {
            RenderOutput::Error(err) => assert_eq!(err.error.category, ErrorCategory::Launch),
            other => panic!("unexpected output: {other:?}"),
        }
    }

    #[test]
    fn probe_reads_png_dimensions() {
        let img = RgbaImage::from_pixel(7, 3, Rgba([1, 2, 3, 255]));
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut buf, ImageOutputFormat::Png)
            .unwrap();

        let dims = ImageDimensions::probe(buf.get_ref()).expect("decodable png");
        assert_eq!(dims, ImageDimensions { width: 7, height: 3 });
        assert!(ImageDimensions::probe(b"not an image").is_none());
    }

    #[test]
    fn probe_reads_jpeg_header() {
        let img = RgbImage::from_pixel(1200, 3000, Rgb([40, 80, 120]));
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, ImageOutputFormat::Jpeg(70))
            .unwrap();

        let dims = ImageDimensions::probe(buf.get_ref()).expect("jpeg header");
        assert_eq!(
            dims,
            ImageDimensions {
                width: 1200,
                height: 3000
            }
        );
    }
}
