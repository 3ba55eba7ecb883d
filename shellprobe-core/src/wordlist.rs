// Dictionary and signature files

use std::fs;
use std::path::{Path, PathBuf};

/// Expand a leading `~` in a user supplied path.
pub fn resolve_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

/// Load a newline-delimited list, skipping blank lines and `#` comments.
pub fn load_wordlist(path: &Path) -> Result<Vec<String>, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read wordlist {}: {}", path.display(), e))?;

    let words: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !line.starts_with('#'))
        .map(String::from)
        .collect();

    if words.is_empty() {
        return Err(format!(
            "Wordlist {} is empty or contains only comments",
            path.display()
        ));
    }

    Ok(words)
}

/// Load a list from `path` if given, otherwise fall back to `defaults`.
pub fn load_or_default(path: Option<&Path>, defaults: &[&str]) -> Result<Vec<String>, String> {
    match path {
        Some(path) => load_wordlist(path),
        None => Ok(defaults.iter().map(|s| s.to_string()).collect()),
    }
}
