use crate::errors::{Result, SnapshotError};
use url::Url;

/// Turn user input into an absolute http(s) URL. Input without a scheme is
/// assumed to be `https://`. The fragment is dropped since it never changes
/// what the server returns.
pub fn normalize_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(SnapshotError::InvalidUrl("URL is required".to_string()));
    }
    if trimmed.chars().any(char::is_whitespace) {
        return Err(SnapshotError::InvalidUrl(format!(
            "{trimmed:?} contains whitespace"
        )));
    }

    let candidate = if has_scheme(trimmed) {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let mut url = Url::parse(&candidate)
        .map_err(|e| SnapshotError::InvalidUrl(format!("{trimmed:?}: {e}")))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(SnapshotError::InvalidUrl(format!(
            "unsupported scheme {:?}, only http and https are allowed",
            url.scheme()
        )));
    }
    match url.host_str() {
        Some(host) if !host.is_empty() => {}
        _ => {
            return Err(SnapshotError::InvalidUrl(format!(
                "{trimmed:?} has no host"
            )))
        }
    }

    url.set_fragment(None);
    Ok(url)
}

fn has_scheme(input: &str) -> bool {
    match input.find("://") {
        Some(idx) => input[..idx]
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')),
        None => false,
    }
}

/// Cache key for an already normalized URL.
pub fn cache_key(url: &Url) -> String {
    url.as_str().to_string()
}

/// Host patterns eligible for caching. A pattern matches its host exactly and
/// any subdomain of it; `*` matches everything.
#[derive(Debug, Clone, Default)]
pub struct HotUrls {
    patterns: Vec<String>,
}

impl HotUrls {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .filter_map(|p| host_pattern(p.as_ref()))
            .collect();
        Self { patterns }
    }

    pub fn is_hot(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.trim_start_matches("www.");
        self.patterns.iter().any(|pattern| {
            pattern == "*"
                || host == pattern
                || host
                    .strip_suffix(pattern.as_str())
                    .is_some_and(|rest| rest.ends_with('.'))
        })
    }

    /// Concrete URLs to pre-seed the cache with.
    pub fn seed_urls(&self) -> Vec<Url> {
        self.patterns
            .iter()
            .filter(|p| p.as_str() != "*")
            .filter_map(|p| normalize_url(p).ok())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Reduce a configured entry (`github.com`, `https://www.github.com/`, `*`)
/// to a bare lowercase host.
fn host_pattern(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw == "*" {
        return Some("*".to_string());
    }
    let url = normalize_url(raw).ok()?;
    let host = url.host_str()?.trim_start_matches("www.").to_string();
    Some(host)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_is_added_when_missing() {
        let url = normalize_url("example.com").unwrap();
        assert_eq!(url.as_str(), "https://example.com/");
    }

    #[test]
    fn bare_and_explicit_urls_share_a_cache_key() {
        let bare = normalize_url("example.com").unwrap();
        let explicit = normalize_url("https://example.com").unwrap();
        let shouting = normalize_url("  HTTPS://Example.COM/#top ").unwrap();

        assert_eq!(cache_key(&bare), cache_key(&explicit));
        assert_eq!(cache_key(&bare), cache_key(&shouting));
    }

    #[test]
    fn http_is_preserved() {
        let url = normalize_url("http://localhost:8080/page?q=1").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/page?q=1");
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        for raw in ["", "   ", "exa mple.com", "ftp://example.com", "https://", "javascript:alert(1)://x"] {
            let err = normalize_url(raw).unwrap_err();
            assert!(matches!(err, SnapshotError::InvalidUrl(_)), "{raw:?} gave {err:?}");
        }
    }

    #[test]
    fn hot_urls_match_hosts_and_subdomains() {
        let hot = HotUrls::new(["github.com", "https://www.google.com/"]);

        assert!(hot.is_hot(&normalize_url("github.com").unwrap()));
        assert!(hot.is_hot(&normalize_url("https://gist.github.com/abc").unwrap()));
        assert!(hot.is_hot(&normalize_url("www.google.com/search").unwrap()));
        assert!(!hot.is_hot(&normalize_url("notgithub.com").unwrap()));
        assert!(!hot.is_hot(&normalize_url("example.com").unwrap()));
    }

    #[test]
    fn wildcard_makes_everything_hot() {
        let hot = HotUrls::new(["*"]);
        assert!(hot.is_hot(&normalize_url("anything.test").unwrap()));
        assert!(hot.seed_urls().is_empty());
    }

    #[test]
    fn seed_urls_are_normalized() {
        let hot = HotUrls::new(["github.com", "stackoverflow.com"]);
        let seeds: Vec<String> = hot.seed_urls().iter().map(cache_key).collect();
        assert_eq!(seeds, vec!["https://github.com/", "https://stackoverflow.com/"]);
    }
}
