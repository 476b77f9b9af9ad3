//! Request-scoped page lifecycle.
//!
//! [`with_page`] opens a page on the shared engine, configures it for one
//! request, navigates, hands it to the caller's body, and closes it on every
//! exit path. Close failures are logged and never replace the request's
//! own result.

use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::engine::{Engine, EnginePage};
use crate::error::EngineError;
use crate::options::{parse_headers, PageOptions};
use crate::{RenderError, Result};

/// Lifecycle states of one page session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    Idle,
    PageOpen,
    Configured,
    Navigated,
    OutputExtracted,
    Errored,
    Closed,
}

/// Tracks the state of one request's page.
#[derive(Debug)]
pub struct PageSession<'a> {
    url: &'a str,
    state: PageState,
}

impl<'a> PageSession<'a> {
    fn new(url: &'a str) -> Self {
        Self {
            url,
            state: PageState::Idle,
        }
    }

    pub fn state(&self) -> PageState {
        self.state
    }

    fn advance(&mut self, next: PageState) {
        if self.state == PageState::Closed {
            return;
        }
        debug!(url = self.url, from = ?self.state, to = ?next, "page state");
        self.state = next;
    }
}

/// Runs `body` against a freshly opened and navigated page, then closes it.
///
/// Configuration happens in a fixed order: extra headers, media emulation,
/// basic auth, cache disable, navigation. A page-level error reported by the
/// engine while any of this is in flight fails the call with
/// [`RenderError::PageCrashed`].
pub async fn with_page<E, T, F, Fut>(
    engine: &E,
    url: &str,
    options: &PageOptions,
    body: F,
) -> Result<T>
where
    E: Engine,
    F: FnOnce(Arc<E::Page>) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut session = PageSession::new(url);

    let page = engine
        .new_page()
        .await
        .map(Arc::new)
        .map_err(|e| RenderError::Engine(format!("failed to open page: {}", e)))?;
    session.advance(PageState::PageOpen);

    let outcome = {
        let work = run_request(&mut session, page.clone(), url, options, body);
        tokio::select! {
            biased;
            result = work => result,
            message = page.page_error() => {
                error!(url, error = %message, "page error");
                Err(RenderError::PageCrashed(message))
            }
        }
    };

    if outcome.is_err() {
        session.advance(PageState::Errored);
    }
    release(page.as_ref(), url).await;
    session.advance(PageState::Closed);
    outcome
}

async fn run_request<P, T, F, Fut>(
    session: &mut PageSession<'_>,
    page: Arc<P>,
    url: &str,
    options: &PageOptions,
    body: F,
) -> Result<T>
where
    P: EnginePage,
    F: FnOnce(Arc<P>) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    configure(page.as_ref(), options).await?;
    session.advance(PageState::Configured);

    page.goto(url, &options.navigation)
        .await
        .map_err(|e| navigation_error(url, e))?;
    session.advance(PageState::Navigated);

    let output = body(page).await?;
    session.advance(PageState::OutputExtracted);
    Ok(output)
}

async fn configure<P: EnginePage>(page: &P, options: &PageOptions) -> Result<()> {
    if let Some(raw) = &options.headers {
        let headers = parse_headers(raw)?;
        page.set_extra_http_headers(&headers)
            .await
            .map_err(|e| step_error("set extra headers", e))?;
    }
    if let Some(media) = options.emulate_media_type {
        page.emulate_media_type(media)
            .await
            .map_err(|e| step_error("emulate media type", e))?;
    }
    if let Some(credentials) = &options.credentials {
        page.authenticate(credentials)
            .await
            .map_err(|e| step_error("authenticate", e))?;
    }
    page.set_cache_enabled(false)
        .await
        .map_err(|e| step_error("disable cache", e))
}

async fn release<P: EnginePage>(page: &P, url: &str) {
    if page.is_closed() {
        return;
    }
    if let Err(err) = page.close().await {
        warn!(url, error = %err, "ignoring page close failure");
    }
}

fn navigation_error(url: &str, err: EngineError) -> RenderError {
    RenderError::navigation(url, err.to_string())
}

fn step_error(step: &str, err: EngineError) -> RenderError {
    RenderError::Engine(format!("{} failed: {}", step, err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_starts_idle() {
        let session = PageSession::new("https://example.com");
        assert_eq!(session.state(), PageState::Idle);
    }

    #[test]
    fn closed_is_terminal() {
        let mut session = PageSession::new("https://example.com");
        session.advance(PageState::PageOpen);
        session.advance(PageState::Closed);
        session.advance(PageState::Navigated);
        assert_eq!(session.state(), PageState::Closed);
    }

    #[test]
    fn navigation_errors_keep_url_and_cause() {
        let err = navigation_error(
            "https://unreachable.invalid",
            EngineError::protocol("net::ERR_NAME_NOT_RESOLVED"),
        );
        match err {
            RenderError::Navigation { url, message } => {
                assert_eq!(url, "https://unreachable.invalid");
                assert!(message.contains("ERR_NAME_NOT_RESOLVED"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
