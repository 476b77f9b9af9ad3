use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Engine launch error: {0}")]
    EngineLaunch(String),

    #[error("Bad options: {0}")]
    BadOptions(String),

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Capture error: {0}")]
    Capture(String),

    #[error("Page crashed: {0}")]
    PageCrashed(String),

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl RenderError {
    pub fn navigation(url: impl Into<String>, message: impl Into<String>) -> Self {
        RenderError::Navigation {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn bad_options(message: impl Into<String>) -> Self {
        RenderError::BadOptions(message.into())
    }

    pub fn capture(message: impl Into<String>) -> Self {
        RenderError::Capture(message.into())
    }

    pub fn to_payload(&self) -> ErrorPayload {
        match self {
            RenderError::EngineLaunch(msg) => ErrorPayload::new(
                ErrorCategory::Launch,
                msg.to_string(),
                "Install Chrome/Chromium or pass --chrome PATH pointing at a runnable binary.",
            ),
            RenderError::BadOptions(msg) => {
                let remediation = if msg.to_ascii_lowercase().contains("header") {
                    "Pass --headers as a JSON object of string values, e.g. '{\"x-api-key\":\"abc\"}'."
                } else {
                    "Check the request options and retry."
                };
                ErrorPayload::new(ErrorCategory::Options, msg.to_string(), remediation)
            }
            RenderError::Navigation { url, message } => {
                let lower = message.to_ascii_lowercase();
                let remediation = if lower.contains("timed out") || lower.contains("timeout") {
                    "Try increasing --nav-timeout or use --wait-until domcontentloaded."
                } else if lower.contains("name_not_resolved") || lower.contains("connection") {
                    "Check that the host is reachable from this machine (DNS/proxy/VPN)."
                } else {
                    "Verify the URL loads in a regular browser."
                };
                ErrorPayload::new(
                    ErrorCategory::Navigation,
                    format!("Navigation to {} failed: {}", url, message),
                    remediation,
                )
            }
            RenderError::Capture(msg) => ErrorPayload::new(
                ErrorCategory::Capture,
                msg.to_string(),
                "Retry the render; large pages may need a smaller viewport or no --full-page.",
            ),
            RenderError::PageCrashed(msg) => ErrorPayload::new(
                ErrorCategory::Engine,
                format!("Page crashed: {}", msg),
                "The renderer process died; retry or lower page memory usage.",
            ),
            RenderError::Engine(msg) => ErrorPayload::new(
                ErrorCategory::Engine,
                msg.to_string(),
                "Re-run with --verbose; the browser may have exited unexpectedly.",
            ),
            RenderError::Io(e) => ErrorPayload::new(
                ErrorCategory::Config,
                e.to_string(),
                "Check output paths/permissions.",
            ),
            RenderError::Serialization(e) => ErrorPayload::new(
                ErrorCategory::Config,
                e.to_string(),
                "Check JSON inputs; run with --verbose for details.",
            ),
            RenderError::Config(msg) => {
                let lower = msg.to_ascii_lowercase();
                if lower.contains("invalid url") {
                    ErrorPayload::new(
                        ErrorCategory::Config,
                        msg.to_string(),
                        "Include the scheme, e.g. https://example.com.",
                    )
                } else if lower.contains("config") {
                    ErrorPayload::new(
                        ErrorCategory::Config,
                        msg.to_string(),
                        "Fix the TOML config file or pass --config with a valid path.",
                    )
                } else {
                    ErrorPayload::new(
                        ErrorCategory::Config,
                        msg.to_string(),
                        "Check flags/paths (e.g., --viewport WIDTHxHEIGHT).",
                    )
                }
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, RenderError>;

/// Failure reported by an engine implementation.
///
/// These never reach callers directly: the page lifecycle maps them onto
/// [`RenderError`] according to the step that failed.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{0}")]
    Protocol(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl EngineError {
    pub fn protocol(message: impl Into<String>) -> Self {
        EngineError::Protocol(message.into())
    }
}

/// Failure while closing a page. Logged and discarded by the page lifecycle.
#[derive(Debug, Error)]
#[error("failed to close page: {0}")]
pub struct PageCloseError(pub String);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Launch,
    Options,
    Navigation,
    Capture,
    Engine,
    Config,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub category: ErrorCategory,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
}

impl ErrorPayload {
    pub fn new(category: ErrorCategory, message: String, remediation: impl Into<String>) -> Self {
        Self {
            category,
            message,
            remediation: Some(remediation.into()),
        }
    }
}
