pub mod candidate;
pub mod classify;
pub mod coordinator;
pub mod error;
pub mod fetch;
pub mod result;

pub use candidate::{generate_candidates, normalize_url};
pub use classify::{Classifier, ClassifierConfig, DensityConfig};
pub use coordinator::{ScanConfig, ScanObserver, Scanner, run};
pub use error::ScanError;
pub use fetch::{FetchConfig, HttpFetcher, ProbeFetcher};
pub use result::{ProbeOutcome, ProbeResult, ScanPhase, ScanRun, Verdict};
