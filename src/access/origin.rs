//! Origin parsing and matching for the access verifier.
//!
//! Every comparison goes through [`normalize_origin`]; raw strings are never
//! compared, so trailing slashes, path components, and scheme/host casing
//! cannot produce a bypass. Unparsable origins never match anything,
//! including themselves.

use url::{Origin, Url};

/// Reduce a URL or origin string to `scheme://host[:port]`, or `None` when it
/// does not parse to a non-opaque origin.
pub(crate) fn normalize_origin(value: &str) -> Option<String> {
    let url = Url::parse(value.trim()).ok()?;
    match url.origin() {
        origin @ Origin::Tuple(..) => Some(origin.ascii_serialization()),
        Origin::Opaque(_) => None,
    }
}

/// Whether the request provably came from the API's own origin.
///
/// A matching Origin header proves it; otherwise a matching Referer does,
/// even when Origin is present and foreign. Referer is
/// attacker-influenceable on some clients - a known weakness kept for
/// compatibility with dashboard calls that omit Origin, pinned by a test
/// rather than silently tightened.
pub(crate) fn is_same_origin(
    api_origin: Option<&str>,
    request_origin: Option<&str>,
    request_referer: Option<&str>,
) -> bool {
    let Some(normalized_api) = api_origin.and_then(normalize_origin) else {
        return false;
    };

    if let Some(origin) = request_origin.and_then(normalize_origin) {
        if origin == normalized_api {
            return true;
        }
    }

    if let Some(referer_origin) = request_referer.and_then(normalize_origin) {
        if referer_origin == normalized_api {
            return true;
        }
    }

    false
}

/// Whether a presented widget origin matches the project's allow-list.
///
/// Entries containing `://` are compared as whole normalized origins; bare
/// hostname entries match only the host component, ignoring scheme and port.
pub(crate) fn origin_allowed(site_origin: &str, allowed_origins: &[String]) -> bool {
    let Some(normalized) = normalize_origin(site_origin) else {
        return false;
    };
    let Some(host) = Url::parse(&normalized)
        .ok()
        .and_then(|url| url.host_str().map(str::to_lowercase))
    else {
        return false;
    };

    allowed_origins.iter().any(|entry| {
        let trimmed = entry.trim();
        if trimmed.is_empty() {
            return false;
        }
        if trimmed.contains("://") {
            return normalize_origin(trimmed).as_deref() == Some(normalized.as_str());
        }
        trimmed.eq_ignore_ascii_case(&host)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_path_and_folds_case() {
        assert_eq!(
            normalize_origin("https://A.Example.COM/some/path?x=1"),
            Some("https://a.example.com".to_string())
        );
        assert_eq!(
            normalize_origin("https://a.com:8080/"),
            Some("https://a.com:8080".to_string())
        );
        // Default ports collapse away.
        assert_eq!(
            normalize_origin("https://a.com:443"),
            Some("https://a.com".to_string())
        );
    }

    #[test]
    fn malformed_origins_never_normalize() {
        assert_eq!(normalize_origin("not a url"), None);
        assert_eq!(normalize_origin(""), None);
        assert_eq!(normalize_origin("a.com"), None);
        // Opaque origins (no host tuple) are rejected.
        assert_eq!(normalize_origin("data:text/plain,hello"), None);
    }

    #[test]
    fn same_origin_compares_normalized_forms() {
        let api = Some("https://app.upflow.dev");
        assert!(is_same_origin(api, Some("https://app.upflow.dev/"), None));
        assert!(is_same_origin(api, Some("https://APP.UPFLOW.DEV"), None));
        assert!(!is_same_origin(api, Some("https://evil.dev"), None));
        assert!(!is_same_origin(api, None, None));
        assert!(!is_same_origin(None, Some("https://app.upflow.dev"), None));
    }

    #[test]
    fn referer_fallback_still_allows_admin_path() {
        // Known weakness, preserved deliberately: when Origin is absent, a
        // matching Referer is accepted as same-origin proof.
        let api = Some("https://app.upflow.dev");
        assert!(is_same_origin(
            api,
            None,
            Some("https://app.upflow.dev/dashboard/projects")
        ));
        // A non-matching Origin does not short-circuit the check: a matching
        // Referer still rescues the request.
        assert!(is_same_origin(
            api,
            Some("https://evil.dev"),
            Some("https://app.upflow.dev/")
        ));
    }

    #[test]
    fn allow_list_full_origin_entries_match_exactly() {
        let allowed = vec!["https://a.com".to_string()];
        assert!(origin_allowed("https://a.com", &allowed));
        assert!(origin_allowed("https://a.com/", &allowed));
        // Port mismatch is a different origin.
        assert!(!origin_allowed("https://a.com:8080", &allowed));
        assert!(!origin_allowed("http://a.com", &allowed));
    }

    #[test]
    fn allow_list_bare_hostname_matches_host_only() {
        let allowed = vec!["widgets.example.com".to_string()];
        assert!(origin_allowed("https://widgets.example.com", &allowed));
        assert!(origin_allowed("http://widgets.example.com:3000", &allowed));
        assert!(!origin_allowed("https://other.example.com", &allowed));
    }

    #[test]
    fn allow_list_ignores_blank_entries_and_malformed_input() {
        let allowed = vec!["  ".to_string(), "https://a.com".to_string()];
        assert!(origin_allowed("https://a.com", &allowed));
        assert!(!origin_allowed("nonsense", &allowed));
        assert!(!origin_allowed("", &allowed));
    }
}
