// URL helpers shared by the phase URL builders

use url::Url;

/// Prepend `https://` when no scheme is given and strip trailing slashes.
pub fn normalize_target(target: &str) -> String {
    let trimmed = target.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

/// Append a wordlist entry as the last path segment of `base_url`.
///
/// Query and fragment of the base are dropped. The result is in the
/// canonical form `url` serializes to, so it can be used as a dedup key.
/// Words that resolve outside the base path, such as `%2e%2e`, or back onto
/// the base itself, such as `%2e`, are rejected.
pub fn build_probe_url(base_url: &str, word: &str) -> Result<String, String> {
    let mut url =
        Url::parse(base_url).map_err(|e| format!("Invalid base URL '{}': {}", base_url, e))?;

    let current_path = url.path().to_string();
    let path_base = if current_path.ends_with('/') {
        current_path
    } else {
        format!("{}/", current_path)
    };

    url.set_path(&format!("{}{}", path_base, word.trim_start_matches('/')));
    url.set_query(None);
    url.set_fragment(None);

    let resolved = url.path();
    if resolved.len() <= path_base.len() || !resolved.starts_with(path_base.as_str()) {
        return Err(format!("'{}' does not resolve below {}", word, base_url));
    }

    Ok(url.to_string())
}

/// Key used for output dedup: `/admin` and `/admin/` are the same finding.
pub fn slash_normalized(url: &str) -> &str {
    url.trim_end_matches('/')
}

/// Last path segment of a URL, ignoring any trailing slash.
pub fn last_segment(url: &str) -> &str {
    let trimmed = url.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}
