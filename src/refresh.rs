//! Periodic report refresh.
//!
//! An interval loop re-runs the aggregator and lands each outcome in a
//! shared [`DisplayState`]. A failed cycle keeps the previous report on
//! screen and only flips a transient error indicator; the page stays
//! interactive throughout.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, warn};

use crate::dates::ReportRange;
use crate::error::Result;
use crate::report::{self, Report, ReportOptions, ReportSource};

/// Shared display model for one dashboard page.
///
/// Concurrent refreshes are safe: last writer wins, and a stale in-flight
/// result simply overwrites or is overwritten.
#[derive(Default)]
pub struct DisplayState {
    report: Mutex<Option<Report>>,
    last_error: Mutex<Option<String>>,
    is_running: AtomicBool,
}

impl DisplayState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last successfully generated report, if any.
    pub fn report(&self) -> Option<Report> {
        self.report.lock().ok().and_then(|slot| slot.clone())
    }

    /// Transient error indicator from the most recent cycle; cleared by the
    /// next successful refresh.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().ok().and_then(|slot| slot.clone())
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }

    /// Ask the loop to stop after its current cycle.
    pub fn stop(&self) {
        self.is_running.store(false, Ordering::SeqCst);
    }

    /// Fold one refresh outcome in: success replaces the report and clears
    /// the error; failure records the error and leaves the report untouched.
    pub fn apply(&self, outcome: Result<Report>) {
        match outcome {
            Ok(report) => {
                if let Ok(mut slot) = self.report.lock() {
                    *slot = Some(report);
                }
                if let Ok(mut slot) = self.last_error.lock() {
                    *slot = None;
                }
            }
            Err(error) => {
                warn!(%error, "report refresh failed, keeping last good report");
                if let Ok(mut slot) = self.last_error.lock() {
                    *slot = Some(error.to_string());
                }
            }
        }
    }
}

/// Start the refresh loop: one aggregator run per interval, first run
/// immediately. The range callback is evaluated each cycle so "today" style
/// windows roll over at midnight.
pub fn start_refresh_loop<S, F>(
    source: Arc<S>,
    state: Arc<DisplayState>,
    options: ReportOptions,
    range_fn: F,
    interval: Duration,
) -> tokio::task::JoinHandle<()>
where
    S: ReportSource + 'static,
    F: Fn() -> ReportRange + Send + 'static,
{
    state.is_running.store(true, Ordering::SeqCst);
    tokio::spawn(async move {
        info!(interval_secs = interval.as_secs(), "report refresh loop started");
        loop {
            if !state.is_running() {
                info!("report refresh loop stopped");
                break;
            }

            let range = range_fn();
            let outcome = report::generate(source.as_ref(), range, &options).await;
            state.apply(outcome);

            tokio::time::sleep(interval).await;
        }
    })
}

// ===========================================================================
// Tests
// ===========================================================================
