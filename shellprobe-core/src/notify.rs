//! Telegram notifications for scan start, detections and the final summary.
//!
//! Delivery is best-effort. [`TelegramNotifier`] queues messages on a channel
//! drained by a background task, so a slow or failing Bot API never holds up a
//! scan worker. Failures are logged and dropped.

use chrono::{DateTime, Local};
use reqwest::Client;
use serde::Serialize;
use shellprobe_scanner::{ScanObserver, ScanRun, Verdict};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Telegram API returned {status}: {body}")]
    Api { status: u16, body: String },
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
    pub api_base: String,
}

impl TelegramConfig {
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
    disable_web_page_preview: bool,
}

#[derive(Clone)]
pub struct TelegramClient {
    client: Client,
    config: TelegramConfig,
}

impl TelegramClient {
    pub fn new(config: TelegramConfig) -> Result<Self, NotifyError> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.config.api_base.trim_end_matches('/'),
            self.config.bot_token
        )
    }

    /// Send one HTML formatted message. Any non-success status is an error.
    pub async fn send_message(&self, text: &str) -> Result<(), NotifyError> {
        let payload = SendMessage {
            chat_id: &self.config.chat_id,
            text,
            parse_mode: "HTML",
            disable_web_page_preview: true,
        };

        let response = self.client.post(self.endpoint()).json(&payload).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Api {
                status: status.as_u16(),
                body,
            });
        }

        debug!("Telegram message delivered");
        Ok(())
    }
}

/// Send the connection test message.
pub async fn test_connection(client: &TelegramClient) -> Result<(), NotifyError> {
    client
        .send_message(
            "🔔 <b>Telegram Connection Test</b>\n\n\
             Your Web Shell Scanner is successfully connected to Telegram!\n\n\
             ✅ Notifications are enabled.",
        )
        .await
}

/// Escape the characters Telegram's HTML parse mode treats as markup.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub fn start_message(base_url: &str, total: usize, at: DateTime<Local>) -> String {
    format!(
        "🔍 <b>Web Shell Scan Started</b>\n\n\
         <b>Target:</b> {}\n\
         <b>URLs to Scan:</b> {}\n\
         <b>Started:</b> {}\n\n\
         ⏳ Scanning in progress...",
        escape_html(base_url),
        total,
        at.format("%Y-%m-%d %H:%M:%S")
    )
}

pub fn detection_message(verdict: &Verdict, at: DateTime<Local>) -> String {
    let reasons = verdict
        .reasons
        .iter()
        .map(|r| format!("  • {}", escape_html(r)))
        .collect::<Vec<_>>()
        .join("\n");

    let status = verdict
        .status_code
        .map(|code| code.to_string())
        .unwrap_or_else(|| "-".to_string());

    format!(
        "🚨 <b>SUSPICIOUS FILE DETECTED!</b>\n\n\
         <b>URL:</b> <code>{}</code>\n\n\
         <b>Status Code:</b> {}\n\
         <b>Content Length:</b> {} bytes\n\n\
         <b>Reasons:</b>\n{}\n\n\
         <b>Time:</b> {}\n\n\
         ⚠️ <b>Action Required!</b>",
        escape_html(&verdict.url),
        status,
        verdict.content_length,
        reasons,
        at.format("%H:%M:%S")
    )
}

pub fn summary_message(run: &ScanRun) -> String {
    let (icon, status_text, details) = if run.suspicious.is_empty() {
        (
            "✅",
            "Scan Completed - Clean".to_string(),
            "✅ No suspicious files detected in common locations.".to_string(),
        )
    } else {
        let details = run
            .findings()
            .iter()
            .enumerate()
            .map(|(idx, verdict)| {
                format!(
                    "{}. <code>{}</code>\n   └ Size: {} bytes",
                    idx + 1,
                    escape_html(&verdict.url),
                    verdict.content_length
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n");
        (
            "🚨",
            format!("Found {} suspicious file(s)", run.suspicious.len()),
            details,
        )
    };

    let status_text = if run.was_cancelled() {
        format!("Interrupted - {}", status_text)
    } else {
        status_text
    };

    let completed = run.finished_at.unwrap_or_else(Local::now);

    format!(
        "{} <b>Scan Report - {}</b>\n\n\
         <b>Target:</b> {}\n\
         <b>Duration:</b> {}\n\
         <b>URLs Checked:</b> {}\n\
         <b>Suspicious Files:</b> {}\n\n\
         <b>Details:</b>\n{}\n\n\
         <b>Completed:</b> {}",
        icon,
        status_text,
        escape_html(&run.base_url),
        run.duration_display(),
        run.checked_count(),
        run.suspicious.len(),
        details,
        completed.format("%Y-%m-%d %H:%M:%S")
    )
}

enum Command {
    Send(String),
    Flush(oneshot::Sender<()>),
}

/// Fire-and-forget Telegram observer.
#[derive(Clone)]
pub struct TelegramNotifier {
    tx: mpsc::UnboundedSender<Command>,
}

impl TelegramNotifier {
    /// Start the delivery task. Must be called from within a tokio runtime.
    pub fn spawn(client: TelegramClient) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Command>();

        tokio::spawn(async move {
            while let Some(command) = rx.recv().await {
                match command {
                    Command::Send(text) => {
                        if let Err(e) = client.send_message(&text).await {
                            warn!("Failed to send Telegram notification: {}", e);
                        }
                    }
                    Command::Flush(done) => {
                        let _ = done.send(());
                    }
                }
            }
        });

        Self { tx }
    }

    fn queue(&self, text: String) {
        if self.tx.send(Command::Send(text)).is_err() {
            warn!("Telegram notifier is not running, message dropped");
        }
    }

    /// Wait until every message queued before this call has been attempted.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.tx.send(Command::Flush(done)).is_ok() {
            let _ = wait.await;
        }
    }

    /// [`flush`](Self::flush) with a deadline. Returns `false` if messages
    /// were still pending when it expired.
    pub async fn flush_within(&self, deadline: Duration) -> bool {
        match tokio::time::timeout(deadline, self.flush()).await {
            Ok(()) => true,
            Err(_) => {
                warn!("Telegram delivery still pending after {:?}, giving up", deadline);
                false
            }
        }
    }
}

impl ScanObserver for TelegramNotifier {
    fn on_start(&self, base_url: &str, total: usize) {
        self.queue(start_message(base_url, total, Local::now()));
    }

    fn on_detection(&self, verdict: &Verdict) {
        self.queue(detection_message(verdict, Local::now()));
    }

    fn on_summary(&self, run: &ScanRun) {
        self.queue(summary_message(run));
    }
}
