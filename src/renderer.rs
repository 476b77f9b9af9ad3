//! Rendering facade over one shared browser engine.

use std::time::Instant;
use tracing::{debug, info, warn};

use crate::engine::{ChromiumEngine, Engine, EnginePage, LaunchOptions};
use crate::options::{MediaType, PageOptions, PdfOptions, Screenshot, ScreenshotOptions};
use crate::page::with_page;
use crate::settle::settle;
use crate::{RenderError, Result, Viewport};

/// Renders URLs to HTML, PDF, or images. Owns the engine for its lifetime.
///
/// Renders borrow `&self`, so many may run concurrently; each gets its own
/// page. Call [`Renderer::shutdown`] once at teardown.
pub struct Renderer<E: Engine> {
    engine: E,
}

impl Renderer<ChromiumEngine> {
    /// Launches the shared Chromium instance.
    pub async fn launch(options: LaunchOptions) -> Result<Self> {
        ChromiumEngine::launch(options).await.map(Self::new)
    }
}

impl<E: Engine> Renderer<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Serialized DOM after navigation.
    pub async fn render_html(&self, url: &str, options: &PageOptions) -> Result<String> {
        let started = Instant::now();
        let html = with_page(&self.engine, url, options, |page| async move {
            page.content()
                .await
                .map_err(|e| RenderError::capture(format!("failed to read page content: {}", e)))
        })
        .await?;
        debug!(url, bytes = html.len(), elapsed = ?started.elapsed(), "rendered html");
        Ok(html)
    }

    /// PDF bytes. Emulates `print` media unless the caller chose a media type.
    pub async fn render_pdf(
        &self,
        url: &str,
        options: &PageOptions,
        pdf: &PdfOptions,
    ) -> Result<Vec<u8>> {
        let started = Instant::now();
        let options = pdf_page_options(options);
        let bytes = with_page(&self.engine, url, &options, |page| async move {
            page.pdf(pdf)
                .await
                .map_err(|e| RenderError::capture(format!("failed to print PDF: {}", e)))
        })
        .await?;
        debug!(url, bytes = bytes.len(), elapsed = ?started.elapsed(), "rendered pdf");
        Ok(bytes)
    }

    /// Sets the viewport, optionally waits for animations to settle, then captures.
    pub async fn render_screenshot(
        &self,
        url: &str,
        options: &PageOptions,
        viewport: &Viewport,
        screenshot: &ScreenshotOptions,
    ) -> Result<Screenshot> {
        let started = Instant::now();
        let capture = screenshot.capture_options();
        let animation_timeout = screenshot.animation_timeout;
        let bytes = with_page(&self.engine, url, options, |page| async move {
            page.set_viewport(viewport)
                .await
                .map_err(|e| RenderError::Engine(format!("set viewport failed: {}", e)))?;
            if !animation_timeout.is_zero() {
                settle(page.as_ref(), &capture, animation_timeout).await;
            }
            page.screenshot(&capture)
                .await
                .map_err(|e| RenderError::capture(format!("failed to capture screenshot: {}", e)))
        })
        .await?;
        debug!(
            url,
            format = screenshot.format.extension(),
            bytes = bytes.len(),
            elapsed = ?started.elapsed(),
            "rendered screenshot"
        );
        Ok(Screenshot {
            format: screenshot.format,
            bytes,
        })
    }

    /// Closes the engine and removes its transient profile directory.
    ///
    /// The directory is removed even if closing the engine fails; the close
    /// error is returned afterwards.
    pub async fn shutdown(mut self) -> Result<()> {
        let closed = self.engine.close().await;
        if let Err(err) = &closed {
            warn!(error = %err, "browser engine did not close cleanly");
        }

        if let Some(dir) = self.engine.user_data_dir() {
            match tokio::fs::remove_dir_all(dir).await {
                Ok(()) => debug!(dir = %dir.display(), "removed transient profile"),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => return Err(RenderError::Io(err)),
            }
        }

        info!("browser engine shut down");
        closed.map_err(|e| RenderError::Engine(format!("failed to close browser: {}", e)))
    }
}

fn pdf_page_options(options: &PageOptions) -> PageOptions {
    let mut options = options.clone();
    options.emulate_media_type.get_or_insert(MediaType::Print);
    options
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_defaults_to_print_media() {
        let options = pdf_page_options(&PageOptions::default());
        assert_eq!(options.emulate_media_type, Some(MediaType::Print));
    }

    #[test]
    fn pdf_keeps_caller_media() {
        let options = pdf_page_options(&PageOptions {
            emulate_media_type: Some(MediaType::Screen),
            ..PageOptions::default()
        });
        assert_eq!(options.emulate_media_type, Some(MediaType::Screen));
    }
}
