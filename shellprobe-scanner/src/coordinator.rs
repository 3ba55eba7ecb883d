// Scan coordination: worker pool, de-duplication, aggregation and notification

use crate::candidate::{default_directories, default_filenames, generate_candidates, normalize_url};
use crate::classify::{Classifier, ClassifierConfig};
use crate::error::{Result, ScanError};
use crate::fetch::{FetchConfig, HttpFetcher, ProbeFetcher};
use crate::result::{ScanPhase, ScanRun, Verdict};
use chrono::Local;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

pub const DEFAULT_WORKERS: usize = 10;

/// Receives scan events as they happen. Calls come from worker tasks in
/// completion order and must return quickly.
pub trait ScanObserver: Send + Sync {
    fn on_start(&self, _base_url: &str, _total: usize) {}

    fn on_detection(&self, _verdict: &Verdict) {}

    fn on_progress(&self, _checked: usize, _total: usize) {}

    fn on_summary(&self, _run: &ScanRun) {}
}

#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub base_url: Url,
    pub workers: usize,
    pub fetch: FetchConfig,
    pub classifier: ClassifierConfig,
    pub filenames: Vec<String>,
    pub directories: Vec<String>,
}

impl ScanConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            workers: DEFAULT_WORKERS,
            fetch: FetchConfig::default(),
            classifier: ClassifierConfig::default(),
            filenames: default_filenames(),
            directories: default_directories(),
        }
    }
}

pub struct Scanner<F: ProbeFetcher = HttpFetcher> {
    base_url: Url,
    workers: usize,
    filenames: Vec<String>,
    directories: Vec<String>,
    fetcher: Arc<F>,
    classifier: Arc<Classifier>,
    observers: Vec<Arc<dyn ScanObserver>>,
    cancel: CancellationToken,
    phase: watch::Sender<ScanPhase>,
}

impl Scanner<HttpFetcher> {
    pub fn new(config: ScanConfig) -> Result<Self> {
        let fetcher = HttpFetcher::new(&config.fetch)?;
        Self::with_fetcher(config, fetcher)
    }
}

impl<F: ProbeFetcher> Scanner<F> {
    pub fn with_fetcher(config: ScanConfig, fetcher: F) -> Result<Self> {
        if !matches!(config.base_url.scheme(), "http" | "https") {
            return Err(ScanError::InvalidUrl(config.base_url.to_string()));
        }
        if config.workers == 0 {
            return Err(ScanError::Config("worker count must be at least 1".to_string()));
        }
        if config.filenames.is_empty() {
            return Err(ScanError::Config("filename dictionary is empty".to_string()));
        }

        let classifier = Classifier::new(config.classifier)?;
        let (phase, _) = watch::channel(ScanPhase::Idle);

        Ok(Self {
            base_url: config.base_url,
            workers: config.workers,
            filenames: config.filenames,
            directories: config.directories,
            fetcher: Arc::new(fetcher),
            classifier: Arc::new(classifier),
            observers: Vec::new(),
            cancel: CancellationToken::new(),
            phase,
        })
    }

    pub fn with_observer(mut self, observer: Arc<dyn ScanObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn phase(&self) -> ScanPhase {
        *self.phase.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ScanPhase> {
        self.phase.subscribe()
    }

    /// The ordered candidate list this scanner will probe.
    pub fn candidates(&self) -> Vec<String> {
        generate_candidates(&self.base_url, &self.filenames, &self.directories)
    }

    /// Generate candidates for the configured base URL and probe all of them.
    pub async fn run(&self) -> ScanRun {
        self.phase.send_replace(ScanPhase::Generating);
        let candidates = self.candidates();
        self.run_candidates(candidates).await
    }

    /// Probe an explicit candidate list. Malformed entries are dropped and
    /// equivalent spellings collapse to their first occurrence before the
    /// total is taken.
    pub async fn run_candidates(&self, candidates: Vec<String>) -> ScanRun {
        let candidates = unique_candidates(candidates);
        let total = candidates.len();
        let started = Instant::now();

        let mut run = ScanRun::new(self.base_url.to_string());
        run.total_candidates = total;
        run.phase = ScanPhase::Running;

        info!(
            "Starting scan of {} with {} candidates and {} workers",
            self.base_url, total, self.workers
        );
        self.phase.send_replace(ScanPhase::Running);
        for observer in &self.observers {
            observer.on_start(run.base_url.as_str(), total);
        }

        let state = Arc::new(Mutex::new(run));
        let queue = Arc::new(Mutex::new(VecDeque::from(candidates)));
        let completed = Arc::new(AtomicUsize::new(0));
        let observers = Arc::new(self.observers.clone());

        let mut worker_handles = Vec::new();
        for worker_id in 0..self.workers.min(total) {
            let fetcher = self.fetcher.clone();
            let classifier = self.classifier.clone();
            let state = state.clone();
            let queue = queue.clone();
            let completed = completed.clone();
            let observers = observers.clone();
            let cancel = self.cancel.clone();

            let handle = tokio::spawn(async move {
                debug!("Worker {} started", worker_id);

                loop {
                    if cancel.is_cancelled() {
                        debug!("Worker {} stopping on cancellation", worker_id);
                        break;
                    }

                    let next = queue.lock().await.pop_front();
                    let Some(url) = next else {
                        break;
                    };

                    // Test-and-insert under one lock so no two workers probe the same URL
                    let fresh = state.lock().await.checked_urls.insert(url.clone());
                    if !fresh {
                        debug!("Skipping duplicate candidate {}", url);
                        continue;
                    }

                    let result = fetcher.fetch(&url).await;
                    let verdict = classifier.classify(&result);

                    {
                        let mut run = state.lock().await;
                        if !result.is_response() {
                            run.failed += 1;
                        }
                        if verdict.suspicious {
                            run.suspicious.push(verdict.clone());
                        }
                    }

                    let checked = completed.fetch_add(1, Ordering::Relaxed) + 1;

                    if verdict.suspicious {
                        info!("Suspicious file found: {} ({})", verdict.url, verdict.reasons.join(", "));
                        for observer in observers.iter() {
                            observer.on_detection(&verdict);
                        }
                    }
                    for observer in observers.iter() {
                        observer.on_progress(checked, total);
                    }
                }

                debug!("Worker {} finished", worker_id);
            });

            worker_handles.push(handle);
        }

        for handle in worker_handles {
            if let Err(e) = handle.await {
                error!("Worker task failed: {}", e);
            }
        }

        self.phase.send_replace(ScanPhase::Finalizing);

        let interrupted = self.cancel.is_cancelled() && !queue.lock().await.is_empty();
        let mut run = state.lock().await.clone();
        run.suspicious.sort_by(|a, b| a.url.cmp(&b.url));
        run.finished_at = Some(Local::now());
        run.duration = started.elapsed();
        run.phase = if interrupted {
            ScanPhase::Cancelled
        } else {
            ScanPhase::Done
        };

        info!(
            "Scan {}: {} checked, {} suspicious, {} without response in {}",
            if interrupted { "cancelled" } else { "complete" },
            run.checked_count(),
            run.suspicious.len(),
            run.failed,
            run.duration_display()
        );

        for observer in &self.observers {
            observer.on_summary(&run);
        }
        self.phase.send_replace(run.phase);

        run
    }
}

fn unique_candidates(candidates: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter_map(|candidate| {
            let normalized = normalize_url(&candidate);
            if normalized.is_none() {
                warn!("Skipping malformed candidate {}", candidate);
            }
            normalized
        })
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

/// Headless entry point: scan `base_url` with the built-in dictionaries and
/// signatures and no observers.
pub async fn run(base_url: &Url, timeout: Duration, workers: usize) -> Result<ScanRun> {
    let mut config = ScanConfig::new(base_url.clone());
    config.fetch.timeout = timeout;
    config.workers = workers;

    let scanner = Scanner::new(config)?;
    Ok(scanner.run().await)
}
