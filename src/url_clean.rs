//! Server URL cleanup.
//!
//! A server URL typed by a user may carry a path, query string or fragment
//! (`https://192.168.1.250:30/path?a=b`). Only the scheme and the network
//! location identify the server, so everything else is discarded.

const DEFAULT_SCHEME: &str = "https";

/// Reduce `server_url` to `scheme://netloc`.
///
/// Surrounding whitespace is trimmed first. When no scheme is present the
/// scheme defaults to `https` and the leading segment (up to the first `/`,
/// `?` or `#`) is taken as the network location. The network location is
/// passed through untouched: no validation, no case folding, no port
/// normalization. The function never fails.
pub fn cleanup_url(server_url: &str) -> String {
    let url = server_url.trim();

    let (scheme, rest) = match split_scheme(url) {
        Some((scheme, rest)) => (scheme, rest),
        None => ("", url),
    };
    let rest = rest.strip_prefix("//").unwrap_or(rest);

    let netloc_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let netloc = &rest[..netloc_end];

    let scheme = if scheme.is_empty() { DEFAULT_SCHEME } else { scheme };
    format!("{}://{}", scheme, netloc)
}

// RFC 3986: scheme = ALPHA *( ALPHA / DIGIT / "+" / "-" / "." ), followed by
// "://". A bare `host:port` is not treated as a scheme.
fn split_scheme(url: &str) -> Option<(&str, &str)> {
    let idx = url.find("://")?;
    let candidate = &url[..idx];
    let mut chars = candidate.chars();
    let first = chars.next()?;
    if !first.is_ascii_alphabetic() {
        return None;
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) {
        return None;
    }
    Some((candidate, &url[idx + 1..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_scheme_and_netloc_only() {
        assert_eq!(
            cleanup_url("https://192.168.1.250:30/path?a=b"),
            "https://192.168.1.250:30"
        );
        assert_eq!(
            cleanup_url("http://unit_test_mock_sg/api3/json#frag"),
            "http://unit_test_mock_sg"
        );
    }

    #[test]
    fn missing_scheme_defaults_to_https() {
        assert_eq!(cleanup_url("192.168.1.250/x"), "https://192.168.1.250");
        assert_eq!(cleanup_url("site.example.com"), "https://site.example.com");
        assert_eq!(cleanup_url("host:8080?q=1"), "https://host:8080");
    }

    #[test]
    fn trims_whitespace() {
        assert_eq!(
            cleanup_url("   https://site.example.com/  \n"),
            "https://site.example.com"
        );
    }

    #[test]
    fn netloc_is_not_normalized() {
        assert_eq!(
            cleanup_url("HTTPS://User@Site.Example.COM:443/"),
            "HTTPS://User@Site.Example.COM:443"
        );
    }

    #[test]
    fn malformed_input_is_best_effort() {
        assert_eq!(cleanup_url(""), "https://");
        assert_eq!(cleanup_url("/only/a/path"), "https://");
        assert_eq!(cleanup_url("1http://host"), "https://1http:");
    }
}
