// Tests for Telegram notification delivery

use chrono::{Local, TimeZone};
use shellprobe_core::notify::{
    NotifyError, TelegramClient, TelegramConfig, TelegramNotifier, detection_message,
    start_message, summary_message, test_connection,
};
use reqwest::Url;
use shellprobe_scanner::{ScanConfig, ScanObserver, Scanner};
use shellprobe_scanner::result::{ScanPhase, ScanRun, Verdict};
use std::time::Duration;
use wiremock::{
    matchers::{body_partial_json, method, path},
    Mock, MockServer, ResponseTemplate,
};

const TOKEN: &str = "123456:TEST";
const SEND_PATH: &str = "/bot123456:TEST/sendMessage";

fn client_for(server: &MockServer) -> TelegramClient {
    TelegramClient::new(TelegramConfig::new(TOKEN, "-1001").with_api_base(server.uri())).unwrap()
}

fn verdict() -> Verdict {
    Verdict {
        url: "https://example.com/uploads/wso.php?x=1&y=2".to_string(),
        status_code: Some(200),
        content_length: 20_480,
        suspicious: true,
        reasons: vec!["Malicious pattern: FilesMan".to_string()],
    }
}

// ============================================================================
// Message Formatting Tests
// ============================================================================

#[test]
fn test_start_message() {
    let at = Local.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap();
    let message = start_message("https://example.com/", 945, at);

    assert!(message.contains("<b>Web Shell Scan Started</b>"));
    assert!(message.contains("<b>Target:</b> https://example.com/"));
    assert!(message.contains("<b>URLs to Scan:</b> 945"));
    assert!(message.contains("<b>Started:</b> 2026-03-01 09:30:00"));
}

#[test]
fn test_detection_message_escapes_url() {
    let at = Local.with_ymd_and_hms(2026, 3, 1, 9, 31, 5).unwrap();
    let message = detection_message(&verdict(), at);

    assert!(message.contains("<code>https://example.com/uploads/wso.php?x=1&amp;y=2</code>"));
    assert!(message.contains("<b>Status Code:</b> 200"));
    assert!(message.contains("<b>Content Length:</b> 20480 bytes"));
    assert!(message.contains("  • Malicious pattern: FilesMan"));
    assert!(message.contains("<b>Time:</b> 09:31:05"));
}

#[test]
fn test_summary_message_with_findings() {
    let mut run = ScanRun::new("https://example.com/".to_string());
    run.suspicious = vec![verdict()];
    run.checked_urls.insert("https://example.com/uploads/wso.php?x=1&y=2".to_string());
    run.duration = Duration::from_secs(65);
    run.phase = ScanPhase::Done;

    let message = summary_message(&run);

    assert!(message.contains("Scan Report - Found 1 suspicious file(s)"));
    assert!(message.contains("<b>Duration:</b> 00:01:05"));
    assert!(message.contains("<b>URLs Checked:</b> 1"));
    assert!(message.contains("1. <code>https://example.com/uploads/wso.php?x=1&amp;y=2</code>"));
    assert!(message.contains("└ Size: 20480 bytes"));
}

#[test]
fn test_summary_message_numbers_findings_like_the_console_report() {
    let mut run = ScanRun::new("https://example.com/".to_string());
    let mut late = verdict();
    late.url = "https://example.com/z.php".to_string();
    let mut early = verdict();
    early.url = "https://example.com/a.php".to_string();
    run.suspicious = vec![late, early];

    let message = summary_message(&run);

    assert!(message.contains("1. <code>https://example.com/a.php</code>"));
    assert!(message.contains("2. <code>https://example.com/z.php</code>"));
}

#[test]
fn test_summary_message_clean_and_cancelled() {
    let mut run = ScanRun::new("https://example.com/".to_string());
    run.phase = ScanPhase::Cancelled;

    let message = summary_message(&run);

    assert!(message.contains("Interrupted - Scan Completed - Clean"));
    assert!(message.contains("No suspicious files detected in common locations."));
}

// ============================================================================
// Delivery Tests
// ============================================================================

#[tokio::test]
async fn test_send_message_posts_html_payload() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .and(body_partial_json(serde_json::json!({
            "chat_id": "-1001",
            "text": "hello",
            "parse_mode": "HTML",
            "disable_web_page_preview": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .expect(1)
        .mount(&mock_server)
        .await;

    client_for(&mock_server).send_message("hello").await.unwrap();
}

#[tokio::test]
async fn test_send_message_reports_api_errors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .mount(&mock_server)
        .await;

    let err = client_for(&mock_server).send_message("hello").await.unwrap_err();
    match err {
        NotifyError::Api { status, body } => {
            assert_eq!(status, 401);
            assert_eq!(body, "Unauthorized");
        }
        other => panic!("expected an API error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_connection_test_message() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    test_connection(&client_for(&mock_server)).await.unwrap();

    let requests = mock_server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert!(body["text"].as_str().unwrap().contains("Telegram Connection Test"));
}

#[tokio::test]
async fn test_notifier_delivers_start_detection_and_summary() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(3)
        .mount(&mock_server)
        .await;

    let notifier = TelegramNotifier::spawn(client_for(&mock_server));
    let mut run = ScanRun::new("https://example.com/".to_string());
    run.suspicious.push(verdict());

    notifier.on_start("https://example.com/", 945);
    notifier.on_detection(&verdict());
    notifier.on_summary(&run);
    notifier.flush().await;

    let requests = mock_server.received_requests().await.unwrap();
    let texts: Vec<String> = requests
        .iter()
        .map(|r| {
            let body: serde_json::Value = serde_json::from_slice(&r.body).unwrap();
            body["text"].as_str().unwrap().to_string()
        })
        .collect();

    assert_eq!(texts.len(), 3);
    assert!(texts[0].contains("Web Shell Scan Started"));
    assert!(texts[1].contains("SUSPICIOUS FILE DETECTED"));
    assert!(texts[2].contains("Scan Report"));
}

#[tokio::test]
async fn test_notifier_swallows_delivery_failures() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&mock_server)
        .await;

    let notifier = TelegramNotifier::spawn(client_for(&mock_server));
    notifier.on_start("https://example.com/", 10);
    notifier.on_detection(&verdict());
    notifier.flush().await;

    // Still usable after failures
    notifier.flush().await;
}

#[tokio::test]
async fn test_flush_within_gives_up_on_a_stalled_api() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&mock_server)
        .await;

    let notifier = TelegramNotifier::spawn(client_for(&mock_server));
    notifier.on_start("https://example.com/", 10);

    let started = std::time::Instant::now();
    assert!(!notifier.flush_within(Duration::from_millis(200)).await);
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_flush_within_reports_completed_delivery() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let notifier = TelegramNotifier::spawn(client_for(&mock_server));
    notifier.on_start("https://example.com/", 10);

    assert!(notifier.flush_within(Duration::from_secs(5)).await);
}

#[tokio::test]
async fn test_failing_notifier_does_not_change_scan_results() {
    let site = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/uploads/wso.php"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string("<title>FilesMan</title>"),
        )
        .with_priority(1)
        .mount(&site)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&site)
        .await;

    let telegram = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&telegram)
        .await;

    let mut config = ScanConfig::new(Url::parse(&site.uri()).unwrap());
    config.workers = 3;
    config.filenames = vec!["wso.php".to_string(), "c99.php".to_string()];
    config.directories = vec!["/uploads/".to_string(), "/tmp/".to_string()];

    let baseline = Scanner::new(config.clone()).unwrap().run().await;

    let notifier = TelegramNotifier::spawn(client_for(&telegram));
    let notified = Scanner::new(config)
        .unwrap()
        .with_observer(std::sync::Arc::new(notifier.clone()))
        .run()
        .await;
    notifier.flush().await;

    assert_eq!(notified.phase, ScanPhase::Done);
    assert_eq!(notified.total_candidates, 6);
    assert_eq!(notified.checked_urls, baseline.checked_urls);
    assert_eq!(notified.suspicious, baseline.suspicious);
    assert_eq!(notified.suspicious.len(), 1);
    assert!(notified.suspicious[0].url.ends_with("/uploads/wso.php"));

    // start, one detection and the summary were all attempted
    assert_eq!(telegram.received_requests().await.unwrap().len(), 3);
}
