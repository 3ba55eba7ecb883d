// Candidate URL generation from the shell filename and upload directory dictionaries

use std::collections::HashSet;
use url::Url;

/// File names commonly used by uploaded web shells.
pub const DEFAULT_SHELL_FILENAMES: &[&str] = &[
    "c99.php",
    "r57.php",
    "shell.php",
    "cmd.php",
    "backdoor.php",
    "b374k.php",
    "wso.php",
    "bypass.php",
    "alfa.php",
    "WSO.php",
    "adminer.php",
    "phpmyadmin.php",
    "filemanager.php",
    "uploader.php",
    "c100.php",
    "r57shell.php",
    "webshell.php",
    "hack.php",
    "x.php",
    "spy.php",
    "mysql.php",
    "madspot.php",
    "mini.php",
    "idx.php",
    "shell.aspx",
    "cmd.aspx",
    "webshell.aspx",
    "asp.aspx",
    "shell.jsp",
    "cmd.jsp",
    "webshell.jsp",
    "jspspy.jsp",
    "shell.py",
    "webshell.py",
    "backdoor.py",
];

/// Directories where uploads (and therefore shells) tend to land.
pub const DEFAULT_DIRECTORIES: &[&str] = &[
    "/uploads/",
    "/upload/",
    "/files/",
    "/file/",
    "/images/",
    "/image/",
    "/media/",
    "/assets/",
    "/temp/",
    "/tmp/",
    "/cache/",
    "/backup/",
    "/admin/",
    "/administrator/",
    "/wp-content/uploads/",
    "/wp-content/themes/",
    "/wp-includes/",
    "/includes/",
    "/inc/",
    "/modules/",
    "/plugins/",
    "/components/",
    "/content/",
    "/data/",
    "/public/",
    "/storage/",
];

pub fn default_filenames() -> Vec<String> {
    DEFAULT_SHELL_FILENAMES.iter().map(|s| s.to_string()).collect()
}

pub fn default_directories() -> Vec<String> {
    DEFAULT_DIRECTORIES.iter().map(|s| s.to_string()).collect()
}

/// Build the ordered candidate list: for every filename, the root-relative URL
/// followed by one URL per directory.
///
/// A path already present on `base` is kept as the join root. Directories that
/// trim to nothing, and spellings that resolve to a URL already emitted, are
/// dropped so every candidate is unique. First occurrence wins.
pub fn generate_candidates(base: &Url, filenames: &[String], directories: &[String]) -> Vec<String> {
    let root = join_root(base);
    let directories: Vec<&str> = directories
        .iter()
        .map(|d| d.trim_matches('/'))
        .filter(|d| !d.is_empty())
        .collect();

    let mut seen = HashSet::new();
    let mut candidates = Vec::with_capacity(filenames.len() * (directories.len() + 1));
    let mut push = |candidate: String| {
        if seen.insert(candidate.clone()) {
            candidates.push(candidate);
        }
    };

    for filename in filenames {
        let filename = filename.trim_matches('/');
        push(build_candidate(base, &root, None, filename));

        for &directory in &directories {
            push(build_candidate(base, &root, Some(directory), filename));
        }
    }

    candidates
}

/// Canonical string form of a URL, used as its identity within a run.
pub fn normalize_url(url: &str) -> Option<String> {
    Url::parse(url).ok().map(|u| u.to_string())
}

fn join_root(base: &Url) -> String {
    let path = base.path();
    if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{}/", path)
    }
}

fn build_candidate(base: &Url, root: &str, directory: Option<&str>, filename: &str) -> String {
    let path = match directory {
        Some(dir) if !dir.is_empty() => format!("{}{}/{}", root, dir, filename),
        _ => format!("{}{}", root, filename),
    };

    let mut url = base.clone();
    url.set_query(None);
    url.set_fragment(None);
    url.set_path(&path);
    url.to_string()
}
