// Multi-signal classification of probe responses

use crate::error::{Result, ScanError};
use crate::result::{ProbeOutcome, ProbeResult, Verdict};
use regex::{Regex, RegexBuilder};
use url::Url;

/// Known web shell fingerprints. Illustrative, not authoritative.
pub const DEFAULT_SIGNATURES: &[&str] = &[
    r"eval\s*\(\s*base64_decode",
    r"eval\s*\(\s*gzinflate",
    r"eval\s*\(\s*str_rot13",
    r"assert\s*\(\s*base64_decode",
    r"system\s*\(",
    r"exec\s*\(",
    r"passthru\s*\(",
    r"shell_exec\s*\(",
    r#"base64_decode\s*\(\s*['"][\w+/=]{50,}"#,
    r"FilesMan",
    r"c99shell",
    r"r57shell",
    r"WSO\s*Shell",
    r"b374k",
    r"Backdoor",
    r"phpspy",
    r"SafeMode",
    r"uname\s*-a",
    r"chmod\s+777",
    r"preg_replace.*/e",
    r"\$_(GET|POST|REQUEST)\[.*\]\s*\(",
];

/// Extensions that imply a server-side script.
pub const DEFAULT_SCRIPT_EXTENSIONS: &[&str] = &[
    "php", "php3", "php4", "php5", "php7", "phtml", "phar", "asp", "aspx", "ashx", "asmx", "jsp",
    "jspx",
];

pub const REASON_CONTENT_TYPE: &str = "Unexpected content-type for script extension";
pub const REASON_DENSITY: &str = "High code-to-text ratio";

/// Size window and threshold for the code-density heuristic. The defaults are
/// rules of thumb, not validated thresholds.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityConfig {
    pub min_len: u64,
    pub max_len: u64,
    /// Fraction of the body that code punctuation must exceed.
    pub ratio: f64,
}

impl Default for DensityConfig {
    fn default() -> Self {
        Self {
            min_len: 10_000,
            max_len: 500_000,
            ratio: 0.10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub signatures: Vec<String>,
    pub script_extensions: Vec<String>,
    pub density: DensityConfig,
    /// Signature text kept in a reason string.
    pub reason_prefix_len: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            signatures: DEFAULT_SIGNATURES.iter().map(|s| s.to_string()).collect(),
            script_extensions: DEFAULT_SCRIPT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            density: DensityConfig::default(),
            reason_prefix_len: 50,
        }
    }
}

struct Signature {
    pattern: String,
    regex: Regex,
}

/// Pure mapping from a probe result to a [`Verdict`].
pub struct Classifier {
    signatures: Vec<Signature>,
    script_extensions: Vec<String>,
    density: DensityConfig,
    reason_prefix_len: usize,
}

impl Classifier {
    pub fn new(config: ClassifierConfig) -> Result<Self> {
        let signatures = config
            .signatures
            .into_iter()
            .map(|pattern| {
                RegexBuilder::new(&pattern)
                    .case_insensitive(true)
                    .build()
                    .map(|regex| Signature {
                        pattern: pattern.clone(),
                        regex,
                    })
                    .map_err(|source| ScanError::InvalidSignature { pattern, source })
            })
            .collect::<Result<Vec<_>>>()?;

        if !(0.0..=1.0).contains(&config.density.ratio) {
            return Err(ScanError::Config(format!(
                "density ratio must be within 0..=1, got {}",
                config.density.ratio
            )));
        }

        Ok(Self {
            signatures,
            script_extensions: config
                .script_extensions
                .into_iter()
                .map(|ext| ext.trim_start_matches('.').to_lowercase())
                .collect(),
            density: config.density,
            reason_prefix_len: config.reason_prefix_len,
        })
    }

    pub fn signature_count(&self) -> usize {
        self.signatures.len()
    }

    pub fn classify(&self, result: &ProbeResult) -> Verdict {
        let outcome = match result {
            ProbeResult::Response(outcome) => outcome,
            ProbeResult::NoResult { url, .. } => return Verdict::clean(url.clone(), None, 0),
        };

        if outcome.status_code != 200 {
            return Verdict::clean(
                outcome.url.clone(),
                Some(outcome.status_code),
                outcome.content_length,
            );
        }

        let text = outcome.body_text();
        let mut reasons = self.match_signatures(&text);

        if self.has_content_type_mismatch(outcome) {
            reasons.push(REASON_CONTENT_TYPE.to_string());
        }

        if self.is_code_dense(outcome) {
            reasons.push(REASON_DENSITY.to_string());
        }

        Verdict {
            url: outcome.url.clone(),
            status_code: Some(outcome.status_code),
            content_length: outcome.content_length,
            suspicious: !reasons.is_empty(),
            reasons,
        }
    }

    fn match_signatures(&self, text: &str) -> Vec<String> {
        self.signatures
            .iter()
            .filter(|sig| sig.regex.is_match(text))
            .map(|sig| {
                let shown: String = sig.pattern.chars().take(self.reason_prefix_len).collect();
                format!("Malicious pattern: {}", shown)
            })
            .collect()
    }

    fn has_content_type_mismatch(&self, outcome: &ProbeOutcome) -> bool {
        let Some(extension) = url_extension(&outcome.url) else {
            return false;
        };
        if !self.script_extensions.contains(&extension) {
            return false;
        }

        !outcome
            .content_type
            .as_deref()
            .map(|ct| ct.to_lowercase().contains("text/html"))
            .unwrap_or(false)
    }

    fn is_code_dense(&self, outcome: &ProbeOutcome) -> bool {
        let len = outcome.content_length;
        if len < self.density.min_len || len > self.density.max_len {
            return false;
        }

        let code_chars = outcome
            .body
            .iter()
            .filter(|b| matches!(b, b'{' | b'}' | b'(' | b')' | b'$' | b';'))
            .count();

        code_chars as f64 > len as f64 * self.density.ratio
    }
}

/// Lowercased extension of the last path segment, if any.
fn url_extension(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.next_back()?;
    let (stem, ext) = segment.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}
