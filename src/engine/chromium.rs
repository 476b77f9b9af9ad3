//! Chromium engine over the DevTools protocol (chromiumoxide).

use async_trait::async_trait;
use chromiumoxide::browser::HeadlessMode;
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetDeviceMetricsOverrideParams, SetEmulatedMediaParams,
};
use chromiumoxide::cdp::browser_protocol::fetch::{
    AuthChallengeResponse, AuthChallengeResponseResponse, ContinueRequestParams,
    ContinueWithAuthParams, EnableParams as FetchEnableParams, EventAuthRequired,
    EventRequestPaused, RequestPattern,
};
use chromiumoxide::cdp::browser_protocol::inspector::EventTargetCrashed;
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams, Headers, SetCacheDisabledParams, SetExtraHttpHeadersParams,
};
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, EventDomContentEventFired, NavigateParams, NavigateReturns,
    PrintToPdfParams,
};
use chromiumoxide::error::CdpError;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::collections::{BTreeMap, HashSet};
use std::fmt::Display;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::launch::{display_path, LaunchOptions};
use super::{Engine, EnginePage, EngineResult};
use crate::error::{EngineError, PageCloseError};
use crate::options::{
    CaptureOptions, Credentials, ImageFormat, MediaType, NavigationOptions, PdfOptions, WaitUntil,
};
use crate::{RenderError, Result, Viewport};

const BLANK_PAGE: &str = "about:blank";
const ERROR_PAGE_PREFIX: &str = "chrome-error://";

/// Poll interval and quiet window for `networkidle`.
const NETWORK_IDLE_POLL: Duration = Duration::from_millis(100);
const NETWORK_IDLE_QUIET: Duration = Duration::from_millis(500);

const RESOURCE_COUNT_SCRIPT: &str = "performance.getEntriesByType('resource').length";

impl From<CdpError> for EngineError {
    fn from(err: CdpError) -> Self {
        EngineError::Protocol(err.to_string())
    }
}

/// The shared browser process.
pub struct ChromiumEngine {
    browser: Browser,
    handler_task: JoinHandle<()>,
    transient_dir: Option<PathBuf>,
}

impl ChromiumEngine {
    /// Launches headless Chromium with the fixed isolation flags.
    pub async fn launch(options: LaunchOptions) -> Result<Self> {
        let profile = options.profile_dir();
        let args = options.effective_args();

        let mut builder = BrowserConfig::builder()
            .args(args.clone())
            .user_data_dir(&profile.path)
            .request_timeout(options.request_timeout);
        builder = if options.headless {
            builder.headless_mode(HeadlessMode::New)
        } else {
            builder.with_head()
        };
        if let Some(executable) = &options.executable {
            builder = builder.chrome_executable(executable);
        }
        let config = builder.build().map_err(RenderError::EngineLaunch)?;

        info!(
            executable = %display_path(options.executable.as_deref()),
            headless = options.headless,
            args = ?args,
            user_data_dir = %profile.path.display(),
            transient_profile = profile.transient,
            request_timeout = ?options.request_timeout,
            "launching browser engine"
        );

        let (browser, mut handler) = match Browser::launch(config).await {
            Ok(launched) => launched,
            Err(err) => {
                if profile.transient {
                    let _ = tokio::fs::remove_dir_all(&profile.path).await;
                }
                return Err(RenderError::EngineLaunch(err.to_string()));
            }
        };

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!(error = %err, "browser handler error");
                }
            }
        });

        Ok(Self {
            browser,
            handler_task,
            transient_dir: profile.transient.then_some(profile.path),
        })
    }
}

#[async_trait]
impl Engine for ChromiumEngine {
    type Page = ChromiumPage;

    async fn new_page(&self) -> EngineResult<ChromiumPage> {
        let page = self.browser.new_page(BLANK_PAGE).await?;
        let attached = ChromiumPage::attach(page.clone()).await;
        close_unattached(attached, || page.close()).await
    }

    async fn close(&mut self) -> EngineResult<()> {
        let closed = self.browser.close().await;
        if closed.is_ok() {
            let _ = self.browser.wait().await;
        }
        self.handler_task.abort();
        closed.map(|_| ()).map_err(EngineError::from)
    }

    fn user_data_dir(&self) -> Option<&Path> {
        self.transient_dir.as_deref()
    }
}

/// One Chromium tab.
pub struct ChromiumPage {
    page: Page,
    auth_task: Mutex<Option<JoinHandle<()>>>,
    errors: watch::Receiver<Option<String>>,
    crash_task: JoinHandle<()>,
    closed: AtomicBool,
}

impl ChromiumPage {
    fn stop_auth_task(&self) {
        if let Some(task) = lock(&self.auth_task).take() {
            task.abort();
        }
    }

    async fn attach(page: Page) -> EngineResult<Self> {
        page.execute(EnableParams::default()).await?;

        let (tx, errors) = watch::channel(None);
        let mut crashes = page.event_listener::<EventTargetCrashed>().await?;
        let crash_task = tokio::spawn(async move {
            if crashes.next().await.is_some() {
                let _ = tx.send(Some("renderer process crashed".to_string()));
            }
        });

        Ok(Self {
            page,
            auth_task: Mutex::new(None),
            errors,
            crash_task,
            closed: AtomicBool::new(false),
        })
    }

    async fn navigate(&self, url: &str, wait_until: WaitUntil) -> EngineResult<()> {
        match wait_until {
            WaitUntil::DomContentLoaded => {
                // Subscribe first so the event cannot fire before we listen.
                let mut dom_ready = self
                    .page
                    .event_listener::<EventDomContentEventFired>()
                    .await?;
                let response = self.page.execute(NavigateParams::new(url)).await?;
                if starts_new_document(&response.result)? && dom_ready.next().await.is_none() {
                    return Err(EngineError::protocol(
                        "page went away before DOMContentLoaded",
                    ));
                }
            }
            WaitUntil::Load => {
                self.page.goto(url).await?;
            }
            WaitUntil::NetworkIdle => {
                self.page.goto(url).await?;
                self.wait_for_network_idle().await?;
            }
        }
        self.ensure_not_error_page().await
    }

    async fn wait_for_network_idle(&self) -> EngineResult<()> {
        let mut last_count = self.resource_count().await?;
        let mut quiet_since = Instant::now();
        while quiet_since.elapsed() < NETWORK_IDLE_QUIET {
            tokio::time::sleep(NETWORK_IDLE_POLL).await;
            let count = self.resource_count().await?;
            if count != last_count {
                last_count = count;
                quiet_since = Instant::now();
            }
        }
        Ok(())
    }

    async fn resource_count(&self) -> EngineResult<u64> {
        self.page
            .evaluate(RESOURCE_COUNT_SCRIPT)
            .await?
            .into_value::<u64>()
            .map_err(|e| EngineError::protocol(e.to_string()))
    }

    /// Chromium swaps in its own error page for DNS/connection failures.
    async fn ensure_not_error_page(&self) -> EngineResult<()> {
        match self.page.url().await? {
            Some(current) if current.starts_with(ERROR_PAGE_PREFIX) => Err(EngineError::protocol(
                "navigation ended on the browser error page (host unreachable?)",
            )),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl EnginePage for ChromiumPage {
    async fn set_extra_http_headers(&self, headers: &BTreeMap<String, String>) -> EngineResult<()> {
        let value: serde_json::Map<String, serde_json::Value> = headers
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect();
        self.page
            .execute(SetExtraHttpHeadersParams::new(Headers::new(
                serde_json::Value::Object(value),
            )))
            .await?;
        Ok(())
    }

    async fn emulate_media_type(&self, media: MediaType) -> EngineResult<()> {
        let params = SetEmulatedMediaParams::builder()
            .media(media.as_str())
            .build();
        self.page.execute(params).await?;
        Ok(())
    }

    /// Intercepts requests through the Fetch domain and answers only the
    /// challenges the server actually issues. A second challenge for the same
    /// request means the credentials were rejected, so it is cancelled.
    async fn authenticate(&self, credentials: &Credentials) -> EngineResult<()> {
        let mut challenges = self.page.event_listener::<EventAuthRequired>().await?;
        let mut paused = self.page.event_listener::<EventRequestPaused>().await?;
        let page = self.page.clone();
        let credentials = credentials.clone();
        let task = tokio::spawn(async move {
            let mut answered: HashSet<String> = HashSet::new();
            loop {
                tokio::select! {
                    Some(event) = paused.next() => {
                        let resume = ContinueRequestParams::new(event.request_id.clone());
                        if let Err(err) = page.execute(resume).await {
                            debug!(error = %err, "failed to resume intercepted request");
                        }
                    }
                    Some(event) = challenges.next() => {
                        let retried = !answered.insert(event.request_id.inner().clone());
                        let reply = ContinueWithAuthParams::new(
                            event.request_id.clone(),
                            challenge_response(&credentials, retried),
                        );
                        if let Err(err) = page.execute(reply).await {
                            debug!(error = %err, "failed to answer auth challenge");
                        }
                    }
                    else => break,
                }
            }
        });
        if let Some(previous) = lock(&self.auth_task).replace(task) {
            previous.abort();
        }

        let intercept = FetchEnableParams::builder()
            .pattern(RequestPattern::builder().url_pattern("*").build())
            .handle_auth_requests(true)
            .build();
        self.page.execute(intercept).await?;
        Ok(())
    }

    async fn set_cache_enabled(&self, enabled: bool) -> EngineResult<()> {
        self.page
            .execute(SetCacheDisabledParams::new(!enabled))
            .await?;
        Ok(())
    }

    async fn goto(&self, url: &str, navigation: &NavigationOptions) -> EngineResult<()> {
        let navigate = self.navigate(url, navigation.wait_until);
        if navigation.timeout.is_zero() {
            return navigate.await;
        }
        tokio::time::timeout(navigation.timeout, navigate)
            .await
            .map_err(|_| EngineError::Timeout(navigation.timeout))?
    }

    async fn content(&self) -> EngineResult<String> {
        Ok(self.page.content().await?)
    }

    async fn pdf(&self, options: &PdfOptions) -> EngineResult<Vec<u8>> {
        let mut params = PrintToPdfParams::builder()
            .landscape(options.landscape)
            .print_background(options.print_background)
            .display_header_footer(options.display_header_footer)
            .prefer_css_page_size(options.prefer_css_page_size);
        if let Some(scale) = options.scale {
            params = params.scale(scale);
        }
        if let Some((width, height)) = options.paper_size() {
            params = params.paper_width(width).paper_height(height);
        }
        if let Some(top) = options.margin.top {
            params = params.margin_top(top);
        }
        if let Some(right) = options.margin.right {
            params = params.margin_right(right);
        }
        if let Some(bottom) = options.margin.bottom {
            params = params.margin_bottom(bottom);
        }
        if let Some(left) = options.margin.left {
            params = params.margin_left(left);
        }
        if let Some(ranges) = &options.page_ranges {
            params = params.page_ranges(ranges.clone());
        }
        if let Some(header) = &options.header_template {
            params = params.header_template(header.clone());
        }
        if let Some(footer) = &options.footer_template {
            params = params.footer_template(footer.clone());
        }
        Ok(self.page.pdf(params.build()).await?)
    }

    async fn set_viewport(&self, viewport: &Viewport) -> EngineResult<()> {
        let params = SetDeviceMetricsOverrideParams::builder()
            .width(i64::from(viewport.width))
            .height(i64::from(viewport.height))
            .device_scale_factor(viewport.device_scale_factor)
            .mobile(viewport.is_mobile)
            .build()
            .map_err(EngineError::Protocol)?;
        self.page.execute(params).await?;
        Ok(())
    }

    async fn screenshot(&self, capture: &CaptureOptions) -> EngineResult<Vec<u8>> {
        let mut params = ScreenshotParams::builder()
            .format(capture_format(capture.format))
            .full_page(capture.full_page)
            .omit_background(capture.omit_background);
        if let Some(quality) = capture.quality {
            params = params.quality(i64::from(quality));
        }
        Ok(self.page.screenshot(params.build()).await?)
    }

    async fn page_error(&self) -> String {
        let mut errors = self.errors.clone();
        loop {
            let current = errors.borrow_and_update().clone();
            if let Some(message) = current {
                return message;
            }
            if errors.changed().await.is_err() {
                return std::future::pending::<String>().await;
            }
        }
    }

    async fn close(&self) -> std::result::Result<(), PageCloseError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.crash_task.abort();
        self.stop_auth_task();
        self.page
            .clone()
            .close()
            .await
            .map_err(|e| PageCloseError(e.to_string()))
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Drop for ChromiumPage {
    fn drop(&mut self) {
        self.crash_task.abort();
        self.stop_auth_task();
    }
}

/// Closes a freshly created tab whose setup failed, so it does not outlive
/// the error. The setup error is returned; a close failure is only logged.
async fn close_unattached<T, C, Fut, E>(attached: EngineResult<T>, close: C) -> EngineResult<T>
where
    C: FnOnce() -> Fut,
    Fut: Future<Output = std::result::Result<(), E>>,
    E: Display,
{
    if attached.is_err() {
        if let Err(err) = close().await {
            warn!(error = %err, "failed to close page after setup error");
        }
    }
    attached
}

/// Whether a `Page.navigate` result loads a new document (and so fires
/// `DOMContentLoaded`). Same-document navigations carry no loader id.
fn starts_new_document(result: &NavigateReturns) -> EngineResult<bool> {
    if let Some(error) = &result.error_text {
        return Err(EngineError::protocol(error.clone()));
    }
    Ok(result.loader_id.is_some())
}

fn challenge_response(credentials: &Credentials, retried: bool) -> AuthChallengeResponse {
    if retried {
        return AuthChallengeResponse::new(AuthChallengeResponseResponse::CancelAuth);
    }
    let mut response =
        AuthChallengeResponse::new(AuthChallengeResponseResponse::ProvideCredentials);
    response.username = Some(credentials.username.clone());
    response.password = Some(credentials.password.clone());
    response
}

fn capture_format(format: ImageFormat) -> CaptureScreenshotFormat {
    match format {
        ImageFormat::Png => CaptureScreenshotFormat::Png,
        ImageFormat::Jpeg => CaptureScreenshotFormat::Jpeg,
        ImageFormat::Webp => CaptureScreenshotFormat::Webp,
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chromiumoxide::cdp::browser_protocol::network::LoaderId;
    use chromiumoxide::cdp::browser_protocol::page::FrameId;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn failed_setup_closes_the_new_tab() {
        let closes = AtomicUsize::new(0);
        let attached: EngineResult<()> = Err(EngineError::protocol("Network.enable failed"));

        let result = close_unattached(attached, || async {
            closes.fetch_add(1, Ordering::SeqCst);
            Ok::<(), String>(())
        })
        .await;

        assert!(matches!(
            result,
            Err(EngineError::Protocol(msg)) if msg.contains("Network.enable")
        ));
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn close_failure_keeps_the_setup_error() {
        let attached: EngineResult<()> = Err(EngineError::protocol("listener refused"));

        let result = close_unattached(attached, || async {
            Err::<(), String>("target already gone".to_string())
        })
        .await;

        assert!(matches!(result, Err(EngineError::Protocol(msg)) if msg == "listener refused"));
    }

    #[tokio::test]
    async fn successful_setup_leaves_the_tab_open() {
        let closes = AtomicUsize::new(0);

        let result = close_unattached(Ok(7u8), || async {
            closes.fetch_add(1, Ordering::SeqCst);
            Ok::<(), String>(())
        })
        .await;

        assert_eq!(result.ok(), Some(7));
        assert_eq!(closes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn first_challenge_gets_credentials() {
        let reply = challenge_response(&Credentials::new("alice", "s3cret"), false);
        assert_eq!(
            reply.response,
            AuthChallengeResponseResponse::ProvideCredentials
        );
        assert_eq!(reply.username.as_deref(), Some("alice"));
        assert_eq!(reply.password.as_deref(), Some("s3cret"));
    }

    #[test]
    fn repeated_challenge_is_cancelled_without_credentials() {
        let reply = challenge_response(&Credentials::new("alice", "s3cret"), true);
        assert_eq!(reply.response, AuthChallengeResponseResponse::CancelAuth);
        assert!(reply.username.is_none());
        assert!(reply.password.is_none());
    }

    #[test]
    fn navigation_to_new_document_waits_for_dom_ready() {
        let mut result = NavigateReturns::new(FrameId::new("main"));
        result.loader_id = Some(LoaderId::new("loader-1"));
        assert!(starts_new_document(&result).unwrap());
    }

    #[test]
    fn same_document_navigation_does_not_wait() {
        let result = NavigateReturns::new(FrameId::new("main"));
        assert!(!starts_new_document(&result).unwrap());
    }

    #[test]
    fn navigation_error_text_fails() {
        let mut result = NavigateReturns::new(FrameId::new("main"));
        result.error_text = Some("net::ERR_NAME_NOT_RESOLVED".to_string());
        let err = starts_new_document(&result).unwrap_err();
        assert!(err.to_string().contains("ERR_NAME_NOT_RESOLVED"));
    }
}
