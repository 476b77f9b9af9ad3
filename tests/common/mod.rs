#![allow(dead_code)]

use async_trait::async_trait;
use pagerender_lib::{
    CaptureOptions, Credentials, Engine, EngineError, EnginePage, EngineResult, MediaType,
    NavigationOptions, PageCloseError, PdfOptions, Viewport,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// How the fake page produces screenshot bytes.
#[derive(Debug, Clone, Default)]
pub enum Frames {
    /// Every capture returns the same bytes.
    #[default]
    Still,
    /// The first `n` captures differ from each other, then the page is still.
    ChangesFor(u32),
    /// Every capture differs from the last.
    Animating,
}

/// Failures and quirks injected into the fake engine.
#[derive(Debug, Clone, Default)]
pub struct Behavior {
    pub fail_new_page: bool,
    pub fail_headers: bool,
    pub fail_navigation: Option<String>,
    pub hang_navigation: bool,
    pub fail_close: bool,
    pub fail_content: bool,
    pub fail_capture: bool,
    /// Report a page crash this long after the page is opened.
    pub crash_after: Option<Duration>,
    pub frames: Frames,
    pub content: String,
}

#[derive(Default)]
pub struct Recorder {
    calls: Mutex<Vec<String>>,
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub captures: AtomicU32,
    captured_with: Mutex<Vec<CaptureOptions>>,
}

impl Recorder {
    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn captured_with(&self) -> Vec<CaptureOptions> {
        self.captured_with.lock().unwrap().clone()
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

pub struct FakeEngine {
    pub recorder: Arc<Recorder>,
    behavior: Behavior,
    user_data_dir: Option<PathBuf>,
    fail_engine_close: bool,
    pub engine_closed: bool,
}

impl FakeEngine {
    pub fn new(behavior: Behavior) -> Self {
        Self {
            recorder: Arc::new(Recorder::default()),
            behavior,
            user_data_dir: None,
            fail_engine_close: false,
            engine_closed: false,
        }
    }

    pub fn with_user_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.user_data_dir = Some(dir.into());
        self
    }

    pub fn failing_close(mut self) -> Self {
        self.fail_engine_close = true;
        self
    }
}

#[async_trait]
impl Engine for FakeEngine {
    type Page = FakePage;

    async fn new_page(&self) -> EngineResult<FakePage> {
        if self.behavior.fail_new_page {
            return Err(EngineError::protocol("target creation refused"));
        }
        self.recorder.opened.fetch_add(1, Ordering::SeqCst);
        self.recorder.record("new_page");
        Ok(FakePage {
            recorder: self.recorder.clone(),
            behavior: self.behavior.clone(),
            frame: AtomicU32::new(0),
            closed: AtomicBool::new(false),
        })
    }

    async fn close(&mut self) -> EngineResult<()> {
        self.engine_closed = true;
        if self.fail_engine_close {
            return Err(EngineError::protocol("browser already gone"));
        }
        Ok(())
    }

    fn user_data_dir(&self) -> Option<&Path> {
        self.user_data_dir.as_deref()
    }
}

pub struct FakePage {
    recorder: Arc<Recorder>,
    behavior: Behavior,
    frame: AtomicU32,
    closed: AtomicBool,
}

#[async_trait]
impl EnginePage for FakePage {
    async fn set_extra_http_headers(&self, headers: &BTreeMap<String, String>) -> EngineResult<()> {
        let names: Vec<&str> = headers.keys().map(String::as_str).collect();
        self.recorder.record(format!("headers:{}", names.join(",")));
        if self.behavior.fail_headers {
            return Err(EngineError::protocol("Network.setExtraHTTPHeaders rejected"));
        }
        Ok(())
    }

    async fn emulate_media_type(&self, media: MediaType) -> EngineResult<()> {
        self.recorder.record(format!("media:{}", media.as_str()));
        Ok(())
    }

    async fn authenticate(&self, credentials: &Credentials) -> EngineResult<()> {
        self.recorder
            .record(format!("auth:{}", credentials.username));
        Ok(())
    }

    async fn set_cache_enabled(&self, enabled: bool) -> EngineResult<()> {
        self.recorder.record(format!("cache:{}", enabled));
        Ok(())
    }

    async fn goto(&self, url: &str, navigation: &NavigationOptions) -> EngineResult<()> {
        self.recorder
            .record(format!("goto:{}:{}", url, navigation.wait_until));
        if self.behavior.hang_navigation {
            std::future::pending::<()>().await;
        }
        if let Some(message) = &self.behavior.fail_navigation {
            return Err(EngineError::protocol(message.clone()));
        }
        Ok(())
    }

    async fn content(&self) -> EngineResult<String> {
        self.recorder.record("content");
        if self.behavior.fail_content {
            return Err(EngineError::protocol("document detached"));
        }
        Ok(self.behavior.content.clone())
    }

    async fn pdf(&self, options: &PdfOptions) -> EngineResult<Vec<u8>> {
        self.recorder
            .record(format!("pdf:landscape={}", options.landscape));
        Ok(b"%PDF-1.7 fake".to_vec())
    }

    async fn set_viewport(&self, viewport: &Viewport) -> EngineResult<()> {
        self.recorder.record(format!("viewport:{}", viewport));
        Ok(())
    }

    async fn screenshot(&self, capture: &CaptureOptions) -> EngineResult<Vec<u8>> {
        self.recorder.captures.fetch_add(1, Ordering::SeqCst);
        self.recorder.captured_with.lock().unwrap().push(*capture);
        if self.behavior.fail_capture {
            return Err(EngineError::protocol("Page.captureScreenshot failed"));
        }
        let n = self.frame.fetch_add(1, Ordering::SeqCst);
        let frame = match self.behavior.frames {
            Frames::Still => 0,
            Frames::ChangesFor(changes) => n.min(changes),
            Frames::Animating => n,
        };
        Ok(frame.to_le_bytes().to_vec())
    }

    async fn page_error(&self) -> String {
        match self.behavior.crash_after {
            Some(delay) => {
                tokio::time::sleep(delay).await;
                "Target crashed".to_string()
            }
            None => std::future::pending().await,
        }
    }

    async fn close(&self) -> Result<(), PageCloseError> {
        self.recorder.record("close");
        self.closed.store(true, Ordering::SeqCst);
        self.recorder.closed.fetch_add(1, Ordering::SeqCst);
        if self.behavior.fail_close {
            return Err(PageCloseError("Target.closeTarget timed out".to_string()));
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
