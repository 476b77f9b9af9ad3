use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Emulated screen for screenshots: CSS pixel size plus device pixel ratio.
///
/// Text form is `WIDTHxHEIGHT`, optionally followed by `@<ratio>x`, e.g.
/// `1280x720` or `390x844@3x`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    #[serde(default = "unit_scale")]
    pub device_scale_factor: f64,
    #[serde(default)]
    pub is_mobile: bool,
}

fn unit_scale() -> f64 {
    1.0
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Viewport {
            width,
            height,
            device_scale_factor: unit_scale(),
            is_mobile: false,
        }
    }

    pub fn with_scale_factor(self, device_scale_factor: f64) -> Self {
        Viewport {
            device_scale_factor,
            ..self
        }
    }

    fn is_scaled(&self) -> bool {
        (self.device_scale_factor - 1.0).abs() > f64::EPSILON
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Viewport::new(1440, 900)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ViewportParseError {
    #[error("viewport must look like 1440x900 or 390x844@3x, got '{0}'")]
    Malformed(String),
    #[error("viewport {axis} '{value}' is not a whole number of pixels")]
    BadDimension { axis: &'static str, value: String },
    #[error("viewport {0} must be at least 1 pixel")]
    Empty(&'static str),
    #[error("device scale factor '{0}' must be a positive number")]
    BadScale(String),
}

fn pixels(axis: &'static str, raw: &str) -> Result<u32, ViewportParseError> {
    match raw.trim().parse::<u32>() {
        Ok(0) => Err(ViewportParseError::Empty(axis)),
        Ok(px) => Ok(px),
        Err(_) => Err(ViewportParseError::BadDimension {
            axis,
            value: raw.trim().to_string(),
        }),
    }
}

impl FromStr for Viewport {
    type Err = ViewportParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let (size, scale) = match text.split_once('@') {
            Some((size, scale)) => (size, Some(scale)),
            None => (text, None),
        };
        let (w, h) = size
            .split_once('x')
            .filter(|(_, h)| !h.contains('x'))
            .ok_or_else(|| ViewportParseError::Malformed(text.to_string()))?;

        let mut viewport = Viewport::new(pixels("width", w)?, pixels("height", h)?);
        if let Some(scale) = scale {
            let ratio = scale.trim().trim_end_matches('x');
            viewport.device_scale_factor = ratio
                .parse::<f64>()
                .ok()
                .filter(|r| r.is_finite() && *r > 0.0)
                .ok_or_else(|| ViewportParseError::BadScale(scale.trim().to_string()))?;
        }
        Ok(viewport)
    }
}

impl fmt::Display for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)?;
        if self.is_scaled() {
            write!(f, "@{}x", self.device_scale_factor)?;
        }
        Ok(())
    }
}
