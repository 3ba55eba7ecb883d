// Single-request HTTP probing

use crate::error::Result;
use crate::result::{ProbeOutcome, ProbeResult};
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::Client;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::debug;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Security Scanner Bot) WebShell Detector/2.0";
pub const DEFAULT_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Issues one probe per call. Implementations never fail: transport problems
/// come back as [`ProbeResult::NoResult`].
pub trait ProbeFetcher: Send + Sync + 'static {
    fn fetch(&self, url: &str) -> impl Future<Output = ProbeResult> + Send;
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub timeout: Duration,
    pub user_agent: String,
    /// Body bytes read before the rest of the response is dropped.
    pub max_body_bytes: usize,
    /// Skip certificate trust checks. Targets are often internal or
    /// self-signed hosts owned by the operator.
    pub accept_invalid_certs: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_body_bytes: 2 * 1024 * 1024,
            accept_invalid_certs: true,
        }
    }
}

/// reqwest-backed fetcher. Redirects are never followed: a 3xx on a shell-like
/// name is itself the answer.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    max_body_bytes: usize,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(DEFAULT_ACCEPT));

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .timeout(config.timeout)
            .connect_timeout(config.timeout)
            .pool_max_idle_per_host(50)
            .redirect(reqwest::redirect::Policy::none())
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;

        Ok(Self {
            client,
            max_body_bytes: config.max_body_bytes,
        })
    }

    async fn fetch_outcome(&self, url: &str) -> std::result::Result<ProbeOutcome, reqwest::Error> {
        let start = Instant::now();
        let mut response = self.client.get(url).send().await?;

        let status_code = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let mut body = Vec::new();
        let mut truncated = false;
        while let Some(chunk) = response.chunk().await? {
            let room = self.max_body_bytes - body.len();
            if chunk.len() > room {
                body.extend_from_slice(&chunk[..room]);
                truncated = true;
                break;
            }
            body.extend_from_slice(&chunk);
        }

        Ok(ProbeOutcome {
            url: url.to_string(),
            status_code,
            content_type,
            content_length: body.len() as u64,
            body,
            truncated,
            elapsed: start.elapsed(),
        })
    }
}

impl ProbeFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> ProbeResult {
        debug!("Probing {}", url);
        match self.fetch_outcome(url).await {
            Ok(outcome) => {
                debug!(
                    "{} -> {} ({} bytes in {:?})",
                    url, outcome.status_code, outcome.content_length, outcome.elapsed
                );
                ProbeResult::Response(outcome)
            }
            Err(e) => {
                debug!("No result for {}: {}", url, e);
                ProbeResult::NoResult {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        matchers::{header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn fetcher_with(timeout: Duration, max_body_bytes: usize) -> HttpFetcher {
        HttpFetcher::new(&FetchConfig {
            timeout,
            max_body_bytes,
            ..FetchConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_returns_status_headers_and_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/shell.php"))
            .and(header("user-agent", DEFAULT_USER_AGENT))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html; charset=utf-8")
                    .set_body_bytes(b"<html>hello</html>"),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let fetcher = HttpFetcher::new(&FetchConfig::default()).unwrap();
        let url = format!("{}/shell.php", mock_server.uri());

        match fetcher.fetch(&url).await {
            ProbeResult::Response(outcome) => {
                assert_eq!(outcome.status_code, 200);
                assert_eq!(outcome.content_type.as_deref(), Some("text/html; charset=utf-8"));
                assert_eq!(outcome.body, b"<html>hello</html>");
                assert_eq!(outcome.content_length, 18);
                assert!(!outcome.truncated);
            }
            other => panic!("expected a response, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_redirects_are_not_followed() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/admin/cmd.php"))
            .respond_with(
                ResponseTemplate::new(302).insert_header("location", "/login"),
            )
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let fetcher = HttpFetcher::new(&FetchConfig::default()).unwrap();
        let url = format!("{}/admin/cmd.php", mock_server.uri());

        match fetcher.fetch(&url).await {
            ProbeResult::Response(outcome) => assert_eq!(outcome.status_code, 302),
            other => panic!("expected a response, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_body_is_capped() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/big.php"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![b'a'; 4096]))
            .mount(&mock_server)
            .await;

        let fetcher = fetcher_with(Duration::from_secs(5), 1000);
        let url = format!("{}/big.php", mock_server.uri());

        match fetcher.fetch(&url).await {
            ProbeResult::Response(outcome) => {
                assert_eq!(outcome.body.len(), 1000);
                assert_eq!(outcome.content_length, 1000);
                assert!(outcome.truncated);
            }
            other => panic!("expected a response, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timeout_is_no_result() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/slow.php"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&mock_server)
            .await;

        let fetcher = fetcher_with(Duration::from_millis(200), 1024);
        let url = format!("{}/slow.php", mock_server.uri());

        let result = fetcher.fetch(&url).await;
        assert!(!result.is_response());
        assert_eq!(result.url(), url);
    }

    #[tokio::test]
    async fn test_refused_connection_is_no_result() {
        // Nothing listens on port 9 of the loopback interface in the test environment.
        let fetcher = fetcher_with(Duration::from_secs(2), 1024);
        let result = fetcher.fetch("http://127.0.0.1:9/shell.php").await;

        assert!(matches!(result, ProbeResult::NoResult { .. }));
    }
}
