//! Animation settling before screenshots.
//!
//! Pages captured right after navigation can be mid-transition. [`settle`]
//! captures frames until two consecutive ones are identical or the timeout
//! passes. It never fails: a timeout or a capture error just means the
//! screenshot goes ahead with whatever the page currently shows.

use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::engine::EnginePage;
use crate::options::CaptureOptions;

/// Delay between two settle frames.
pub const SETTLE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How a settle run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleOutcome {
    /// Two consecutive frames matched.
    Settled { frames: u32 },
    /// The timeout passed first.
    TimedOut,
    /// A frame capture failed; settling was abandoned.
    Abandoned,
}

/// Waits for the page's visual state to stop changing, for at most `timeout`.
pub async fn settle<P: EnginePage>(
    page: &P,
    capture: &CaptureOptions,
    timeout: Duration,
) -> SettleOutcome {
    let started = Instant::now();
    let outcome = match tokio::time::timeout(timeout, poll_frames(page, capture)).await {
        Ok(outcome) => outcome,
        Err(_) => SettleOutcome::TimedOut,
    };
    debug!(?outcome, elapsed = ?started.elapsed(), ?timeout, "animation settle finished");
    outcome
}

async fn poll_frames<P: EnginePage>(page: &P, capture: &CaptureOptions) -> SettleOutcome {
    let mut previous: Option<Vec<u8>> = None;
    let mut frames = 0u32;
    loop {
        let frame = match page.screenshot(capture).await {
            Ok(frame) => frame,
            Err(err) => {
                warn!(error = %err, "settle frame capture failed; continuing without settling");
                return SettleOutcome::Abandoned;
            }
        };
        frames += 1;
        if previous.as_deref() == Some(frame.as_slice()) {
            return SettleOutcome::Settled { frames };
        }
        previous = Some(frame);
        tokio::time::sleep(SETTLE_POLL_INTERVAL).await;
    }
}
