//! Progress reporting for scan passes
//!
//! Events go to stderr as JSON lines (`{"seq":..,"ts":..,"_t":"p",..}`) so a
//! frontend can follow a pass without parsing log output.

use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use chrono::{DateTime, Utc};

use crate::error::LibraryError;
use crate::models::ScanSummary;

/// One scan event; the variant name is written as `_t`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "_t")]
pub enum ProgressEvent {
    #[serde(rename = "start")]
    Start {
        roots: Vec<String>,
        /// Cursor the pass compares modification times against
        #[serde(skip_serializing_if = "Option::is_none")]
        since: Option<String>,
    },
    /// Running totals, throttled
    #[serde(rename = "p")]
    Progress {
        #[serde(rename = "a")]
        added: u64,
        #[serde(rename = "s")]
        skipped: u64,
        #[serde(rename = "f")]
        failed: u64,
        dir: String,
    },
    /// A per-file failure; never throttled
    #[serde(rename = "err")]
    Error {
        kind: String,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        path: Option<String>,
    },
    #[serde(rename = "done")]
    Done {
        #[serde(rename = "a")]
        added: u64,
        #[serde(rename = "s")]
        skipped: u64,
        #[serde(rename = "f")]
        failed: u64,
        #[serde(rename = "d")]
        directories: u64,
        ms: u64,
    },
}

impl ProgressEvent {
    pub fn start(roots: &[PathBuf], since: Option<&DateTime<Utc>>) -> Self {
        ProgressEvent::Start {
            roots: roots.iter().map(|p| p.to_string_lossy().to_string()).collect(),
            since: since.map(crate::db::format_timestamp),
        }
    }

    pub fn error(error: &LibraryError) -> Self {
        ProgressEvent::Error {
            kind: format!("{:?}", error.kind),
            message: error.message.clone(),
            path: error.path.as_ref().map(|p| p.to_string_lossy().to_string()),
        }
    }

    pub fn done(summary: &ScanSummary) -> Self {
        ProgressEvent::Done {
            added: summary.added,
            skipped: summary.skipped,
            failed: summary.failed,
            directories: summary.directories,
            ms: summary.duration_ms,
        }
    }
}

/// Wire line: sequence number and timestamp around an event
#[derive(Debug, Serialize)]
struct ProgressLine<'a> {
    seq: u64,
    /// Milliseconds since reporter creation
    ts: u64,
    #[serde(flatten)]
    event: &'a ProgressEvent,
}

/// Progress reporter shared by all scan workers of one pass
#[derive(Debug)]
pub struct ProgressReporter {
    enabled: bool,
    /// Minimum gap between two `p` events, in milliseconds
    interval_ms: u64,
    last_progress: Mutex<Instant>,
    seq: AtomicU64,
    created: Instant,
}

impl ProgressReporter {
    pub fn new(enabled: bool, interval_ms: u64) -> Self {
        let now = Instant::now();
        Self {
            enabled,
            interval_ms,
            last_progress: Mutex::new(now),
            seq: AtomicU64::new(0),
            created: now,
        }
    }

    /// Reporter that never writes anything
    pub fn disabled() -> Self {
        Self::new(false, 0)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst)
    }

    fn elapsed_ms(&self) -> u64 {
        self.created.elapsed().as_millis() as u64
    }

    /// Claim the next progress slot if the interval has elapsed
    fn take_slot(&self) -> bool {
        let Ok(mut last) = self.last_progress.lock() else {
            return false;
        };
        if last.elapsed().as_millis() as u64 >= self.interval_ms {
            *last = Instant::now();
            true
        } else {
            false
        }
    }

    /// Render one event as the JSON line written to stderr
    fn render(&self, event: &ProgressEvent) -> Option<String> {
        let line = ProgressLine {
            seq: self.next_seq(),
            ts: self.elapsed_ms(),
            event,
        };
        serde_json::to_string(&line).ok()
    }

    /// Write an event unconditionally (when enabled)
    pub fn emit(&self, event: &ProgressEvent) {
        if !self.enabled {
            return;
        }
        if let Some(json) = self.render(event) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{}", json);
            let _ = stderr.flush();
        }
    }

    pub fn report_start(&self, roots: &[PathBuf], since: Option<&DateTime<Utc>>) {
        self.emit(&ProgressEvent::start(roots, since));
    }

    /// Report running totals; returns true if an event was actually sent
    pub fn report_progress(&self, added: u64, skipped: u64, failed: u64, dir: &str) -> bool {
        if !self.enabled || !self.take_slot() {
            return false;
        }
        self.emit(&ProgressEvent::Progress {
            added,
            skipped,
            failed,
            dir: dir.to_string(),
        });
        true
    }

    pub fn report_error(&self, error: &LibraryError) {
        self.emit(&ProgressEvent::error(error));
    }

    pub fn report_done(&self, summary: &ScanSummary) {
        self.emit(&ProgressEvent::done(summary));
    }
}
