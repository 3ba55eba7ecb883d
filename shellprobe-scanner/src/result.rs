use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::BTreeSet;
use std::time::Duration;

/// Raw response captured by a single probe.
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    pub url: String,
    pub status_code: u16,
    pub content_type: Option<String>,
    /// Number of body bytes actually read.
    pub content_length: u64,
    pub body: Vec<u8>,
    /// Set when the body was cut at the fetcher's read cap.
    pub truncated: bool,
    pub elapsed: Duration,
}

impl ProbeOutcome {
    pub fn new(url: String, status_code: u16) -> Self {
        Self {
            url,
            status_code,
            content_type: None,
            content_length: 0,
            body: Vec::new(),
            truncated: false,
            elapsed: Duration::from_secs(0),
        }
    }

    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = Some(content_type.to_string());
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self.content_length = self.body.len() as u64;
        self
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// What a probe produced: a response, or nothing usable.
#[derive(Debug, Clone)]
pub enum ProbeResult {
    Response(ProbeOutcome),
    /// Timeout, refused connection, DNS failure or any other transport fault.
    NoResult { url: String, reason: String },
}

impl ProbeResult {
    pub fn url(&self) -> &str {
        match self {
            ProbeResult::Response(outcome) => &outcome.url,
            ProbeResult::NoResult { url, .. } => url,
        }
    }

    pub fn is_response(&self) -> bool {
        matches!(self, ProbeResult::Response(_))
    }
}

/// Classification of one probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub url: String,
    pub status_code: Option<u16>,
    pub content_length: u64,
    pub suspicious: bool,
    pub reasons: Vec<String>,
}

impl Verdict {
    pub fn clean(url: String, status_code: Option<u16>, content_length: u64) -> Self {
        Self {
            url,
            status_code,
            content_length,
            suspicious: false,
            reasons: Vec::new(),
        }
    }
}

/// Lifecycle of a scan run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanPhase {
    Idle,
    Generating,
    Running,
    Finalizing,
    Done,
    Cancelled,
}

impl ScanPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScanPhase::Done | ScanPhase::Cancelled)
    }
}

/// One end-to-end execution against one base URL.
#[derive(Debug, Clone, Serialize)]
pub struct ScanRun {
    pub base_url: String,
    pub started_at: DateTime<Local>,
    pub finished_at: Option<DateTime<Local>>,
    pub duration: Duration,
    pub total_candidates: usize,
    /// Kept ordered so exported reports are stable between runs.
    pub checked_urls: BTreeSet<String>,
    /// Probes that ended without a response.
    pub failed: usize,
    pub suspicious: Vec<Verdict>,
    pub phase: ScanPhase,
}

impl ScanRun {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            started_at: Local::now(),
            finished_at: None,
            duration: Duration::from_secs(0),
            total_candidates: 0,
            checked_urls: BTreeSet::new(),
            failed: 0,
            suspicious: Vec::new(),
            phase: ScanPhase::Idle,
        }
    }

    pub fn checked_count(&self) -> usize {
        self.checked_urls.len()
    }

    /// Suspicious verdicts ordered by URL, the numbering every report uses.
    pub fn findings(&self) -> Vec<&Verdict> {
        let mut findings: Vec<&Verdict> = self.suspicious.iter().collect();
        findings.sort_by(|a, b| a.url.cmp(&b.url));
        findings
    }

    pub fn was_cancelled(&self) -> bool {
        self.phase == ScanPhase::Cancelled
    }

    /// Duration as `HH:MM:SS`.
    pub fn duration_display(&self) -> String {
        let secs = self.duration.as_secs();
        format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
