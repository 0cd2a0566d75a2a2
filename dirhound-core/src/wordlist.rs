// Wordlist provider: loading, default lookup and the bundled fallback

use std::fs;
use std::path::{Path, PathBuf};

/// Well-known wordlist locations, in order of preference
pub const DEFAULT_WORDLISTS: &[&str] = &[
    "/usr/share/seclists/Discovery/Web-Content/directory-list-2.3-medium.txt",
    "/usr/share/seclists/Discovery/Web-Content/common.txt",
    "/usr/share/wordlists/dirb/common.txt",
];

/// Where a scan's words came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WordlistSource {
    File(PathBuf),
    Bundled,
}

/// Load wordlist from file
pub fn load_wordlist(path: &Path) -> Result<Vec<String>, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read wordlist {}: {}", path.display(), e))?;

    let words = parse_wordlist(&content);
    if words.is_empty() {
        return Err(format!(
            "Wordlist {} is empty or contains only comments",
            path.display()
        ));
    }

    Ok(words)
}

/// Trim lines, dropping blanks and `#` comments.
pub fn parse_wordlist(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !line.starts_with('#'))
        .map(String::from)
        .collect()
}

/// Custom path if given, else the first existing well-known path, else the
/// bundled list.
pub fn resolve_wordlist(custom: Option<&Path>) -> WordlistSource {
    resolve_from(custom, DEFAULT_WORDLISTS)
}

fn resolve_from(custom: Option<&Path>, candidates: &[&str]) -> WordlistSource {
    if let Some(path) = custom {
        return WordlistSource::File(path.to_path_buf());
    }
    candidates
        .iter()
        .map(PathBuf::from)
        .find(|path| path.is_file())
        .map(WordlistSource::File)
        .unwrap_or(WordlistSource::Bundled)
}
