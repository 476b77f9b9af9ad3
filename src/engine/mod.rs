//! Browser engine seam.
//!
//! The renderer only talks to the browser through [`Engine`] and
//! [`EnginePage`]. The production implementation drives Chromium over the
//! DevTools protocol; tests substitute an in-memory engine.
//!
//! # Module Structure
//!
//! - [`launch`] - Launch options and the fixed isolation flags
//! - [`chromium`] - chromiumoxide-backed engine

pub mod chromium;
pub mod launch;

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{EngineError, PageCloseError};
use crate::options::{CaptureOptions, Credentials, MediaType, NavigationOptions, PdfOptions};
use crate::Viewport;

pub use chromium::{ChromiumEngine, ChromiumPage};
pub use launch::{LaunchOptions, FIXED_ARGS};

pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// A running browser process that can open pages.
#[async_trait]
pub trait Engine: Send + Sync {
    type Page: EnginePage + 'static;

    /// Opens a fresh, blank page.
    async fn new_page(&self) -> EngineResult<Self::Page>;

    /// Closes the browser process.
    async fn close(&mut self) -> EngineResult<()>;

    /// Transient user-data directory to remove after [`Engine::close`].
    fn user_data_dir(&self) -> Option<&Path>;
}

/// One browser tab.
#[async_trait]
pub trait EnginePage: Send + Sync {
    /// Replaces the extra headers sent with every subsequent request.
    async fn set_extra_http_headers(&self, headers: &BTreeMap<String, String>) -> EngineResult<()>;

    async fn emulate_media_type(&self, media: MediaType) -> EngineResult<()>;

    /// Answers HTTP basic-auth challenges with `credentials`.
    async fn authenticate(&self, credentials: &Credentials) -> EngineResult<()>;

    async fn set_cache_enabled(&self, enabled: bool) -> EngineResult<()>;

    async fn goto(&self, url: &str, navigation: &NavigationOptions) -> EngineResult<()>;

    /// Serialized DOM of the current document.
    async fn content(&self) -> EngineResult<String>;

    async fn pdf(&self, options: &PdfOptions) -> EngineResult<Vec<u8>>;

    async fn set_viewport(&self, viewport: &Viewport) -> EngineResult<()>;

    async fn screenshot(&self, capture: &CaptureOptions) -> EngineResult<Vec<u8>>;

    /// Resolves with a message when the page hits an asynchronous page-level
    /// error (e.g. the renderer crashed). Pending forever otherwise.
    async fn page_error(&self) -> String;

    async fn close(&self) -> Result<(), PageCloseError>;

    fn is_closed(&self) -> bool;
}
