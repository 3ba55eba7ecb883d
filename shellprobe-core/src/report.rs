// Console and file reporting for finished scans

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use shellprobe_scanner::{ScanObserver, ScanRun, Verdict};
use std::fs;
use std::io;
use std::path::Path;

const RULE: &str = "══════════════════════════════════════════════════════════════════════";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }
}

/// Human readable summary of a finished (or cancelled) run.
pub fn generate_scan_report(run: &ScanRun) -> String {
    let mut report = String::new();

    report.push_str(&format!("\n{}\n", RULE));
    report.push_str("                            SCAN RESULTS\n");
    report.push_str(&format!("{}\n\n", RULE));

    if run.was_cancelled() {
        report.push_str(&format!(
            "[!] Scan interrupted: {} of {} candidates checked, results are partial.\n\n",
            run.checked_count(),
            run.total_candidates
        ));
    }

    if run.suspicious.is_empty() {
        report.push_str("[+] No suspicious files detected in common locations.\n");
        report.push_str("[+] This doesn't guarantee the site is clean.\n");
        report.push_str("[+] Consider deeper scanning and manual inspection.\n\n");
    } else {
        report.push_str(&format!(
            "[!] Found {} suspicious files:\n\n",
            run.suspicious.len()
        ));

        for (idx, verdict) in run.findings().iter().enumerate() {
            report.push_str(&format!("{}. {}\n", idx + 1, verdict.url));
            report.push_str(&format!("   Status Code: {}\n", status_label(verdict)));
            report.push_str(&format!("   Content Length: {} bytes\n", verdict.content_length));
            report.push_str("   Reasons:\n");
            for reason in &verdict.reasons {
                report.push_str(&format!("     - {}\n", reason));
            }
            report.push('\n');
        }
    }

    report.push_str(&format!("{}\n", RULE));
    report.push_str(&format!("Target: {}\n", run.base_url));
    if let Some(finished) = run.finished_at {
        report.push_str(&format!("Completed: {}\n", finished.format("%Y-%m-%d %H:%M:%S")));
    }
    report.push_str(&format!("Duration: {}\n", run.duration_display()));
    report.push_str(&format!("Total URLs checked: {}\n", run.checked_count()));
    if run.failed > 0 {
        report.push_str(&format!("Without response: {}\n", run.failed));
    }
    report.push_str(&format!("{}\n", RULE));

    report
}

/// Render `run` in `format` and write it to `path`.
pub fn write_report(run: &ScanRun, format: ReportFormat, path: &Path) -> io::Result<()> {
    let content = match format {
        ReportFormat::Text => generate_scan_report(run),
        ReportFormat::Json => serde_json::to_string_pretty(run).map_err(io::Error::other)?,
    };
    fs::write(path, content)
}

/// Plain-text block printed when a detection arrives.
pub fn format_detection(verdict: &Verdict) -> String {
    format!(
        "[!] SUSPICIOUS FILE FOUND: {}\n    Status: {}\n    Reasons: {}",
        verdict.url,
        status_label(verdict),
        verdict.reasons.join(", ")
    )
}

fn status_label(verdict: &Verdict) -> String {
    verdict
        .status_code
        .map(|code| code.to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Prints detections as they happen and tracks progress.
pub struct ConsoleObserver {
    progress: Option<ProgressBar>,
}

impl ConsoleObserver {
    pub fn new(show_progress: bool) -> Self {
        let progress = show_progress.then(|| {
            let pb = ProgressBar::new(0);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("=>-"),
            );
            pb
        });

        Self { progress }
    }
}

impl ScanObserver for ConsoleObserver {
    fn on_start(&self, base_url: &str, total: usize) {
        match self.progress {
            Some(ref pb) => {
                pb.set_length(total as u64);
                pb.set_message(base_url.to_string());
            }
            None => println!("[*] Total URLs to scan: {}", total),
        }
    }

    fn on_detection(&self, verdict: &Verdict) {
        let block = format!("\n{}", format_detection(verdict)).red().bold().to_string();
        match self.progress {
            Some(ref pb) => pb.println(block),
            None => println!("{}", block),
        }
    }

    fn on_progress(&self, checked: usize, total: usize) {
        match self.progress {
            Some(ref pb) => pb.set_position(checked as u64),
            None if checked % 50 == 0 => {
                println!("[*] Progress: {}/{} URLs scanned...", checked, total)
            }
            None => {}
        }
    }

    fn on_summary(&self, _run: &ScanRun) {
        if let Some(ref pb) = self.progress {
            pb.finish_and_clear();
        }
    }
}
