//! Canonical forms for URLs, domains, seeds, and allow rules.
//!
//! These functions are the only place where schema drift between legacy and
//! current payloads is resolved. All of them are pure and idempotent:
//! normalizing an already-normalized value returns it unchanged.

use url::Url;

use super::rules::{AllowRule, Seed, TypeFlags};

/// Rejection at the normalization boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    /// A scheme other than http/https was typed.
    #[error("Invalid scheme \"{scheme}\". Only http:// and https:// are allowed.")]
    InvalidScheme {
        /// The scheme as typed.
        scheme: String,
    },

    /// The input was empty after trimming.
    #[error("URL must not be empty")]
    Empty,
}

/// Normalize one URL row under the row's `allow_http` flag.
///
/// - trims the input;
/// - rejects any scheme that is not http/https;
/// - injects a scheme chosen by `allow_http` when none is present;
/// - downgrades `http://` to `https://` when `allow_http` is false;
/// - strips fragments;
/// - guarantees a trailing `/` on the path.
///
/// Unparseable-but-schemed input is tolerated: the best-effort string after
/// scheme handling and fragment stripping is returned.
///
/// # Errors
///
/// [`NormalizeError::InvalidScheme`] for non-http schemes,
/// [`NormalizeError::Empty`] for blank input.
pub fn normalize_url_row(input: &str, allow_http: bool) -> Result<String, NormalizeError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(NormalizeError::Empty);
    }

    let with_scheme = match trimmed.split_once("://") {
        Some((scheme, rest)) => {
            let lower = scheme.to_ascii_lowercase();
            match lower.as_str() {
                "https" => format!("https://{rest}"),
                "http" => {
                    if allow_http {
                        format!("http://{rest}")
                    } else {
                        format!("https://{rest}")
                    }
                }
                _ => {
                    return Err(NormalizeError::InvalidScheme {
                        scheme: scheme.to_owned(),
                    });
                }
            }
        }
        None => {
            if allow_http {
                format!("http://{trimmed}")
            } else {
                format!("https://{trimmed}")
            }
        }
    };

    match Url::parse(&with_scheme) {
        Ok(mut url) => {
            url.set_fragment(None);
            let mut out = url.to_string();
            if url.query().is_none() && !out.ends_with('/') {
                out.push('/');
            }
            Ok(out)
        }
        Err(_) => {
            // Tolerated: keep the best-effort string, minus any fragment.
            let without_fragment = with_scheme
                .split_once('#')
                .map_or(with_scheme.as_str(), |(head, _)| head);
            Ok(without_fragment.to_owned())
        }
    }
}

/// Reduce arbitrary input to a bare domain: scheme and path stripped,
/// whatever remains before the first `/`.
#[must_use]
pub fn normalize_domain_input(input: &str) -> String {
    let trimmed = input.trim();
    let without_scheme = trimmed
        .split_once("://")
        .map_or(trimmed, |(_, rest)| rest);
    without_scheme
        .split('/')
        .next()
        .unwrap_or(without_scheme)
        .to_owned()
}

/// Fill defaulted type flags: an absent set means "web only".
#[must_use]
pub fn normalize_types(raw: Option<TypeFlags>) -> TypeFlags {
    raw.unwrap_or_default()
}

/// Normalize a seed row: the URL canonicalized under the seed's own flag.
#[must_use]
pub fn normalize_seed(raw: Seed) -> Seed {
    let url = normalize_url_row(&raw.url, raw.allow_http).unwrap_or(raw.url);
    Seed {
        url,
        allow_http: raw.allow_http,
    }
}

/// Normalize an allow rule: pattern canonicalized under the rule's
/// `allow_http` flag; missing fields were already defaulted at
/// deserialization (`match = "prefix"`, `allow_http = false`, web-only
/// types).
#[must_use]
pub fn normalize_allow_rule(mut raw: AllowRule) -> AllowRule {
    if let Ok(pattern) = normalize_url_row(&raw.pattern, raw.allow_http) {
        raw.pattern = pattern;
    }
    raw
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rules::MatchMode;

    #[test]
    fn injects_scheme_by_flag() {
        assert_eq!(normalize_url_row("x.com", false).unwrap(), "https://x.com/");
        assert_eq!(normalize_url_row("x.com", true).unwrap(), "http://x.com/");
    }

    #[test]
    fn downgrades_http_when_not_allowed() {
        assert_eq!(
            normalize_url_row("http://x.com/docs", false).unwrap(),
            "https://x.com/docs/"
        );
        assert_eq!(
            normalize_url_row("http://x.com/docs", true).unwrap(),
            "http://x.com/docs/"
        );
    }

    #[test]
    fn rejects_non_http_schemes() {
        let err = normalize_url_row("ftp://x.com", false).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid scheme \"ftp\". Only http:// and https:// are allowed."
        );
        assert!(normalize_url_row("gopher://x", true).is_err());
    }

    #[test]
    fn strips_fragments() {
        assert_eq!(
            normalize_url_row("https://x.com/a#section", false).unwrap(),
            "https://x.com/a/"
        );
    }

    #[test]
    fn ensures_trailing_slash() {
        assert_eq!(normalize_url_row("https://x.com", false).unwrap(), "https://x.com/");
        assert_eq!(
            normalize_url_row("https://x.com/docs", false).unwrap(),
            "https://x.com/docs/"
        );
        assert_eq!(
            normalize_url_row("https://x.com/docs/", false).unwrap(),
            "https://x.com/docs/"
        );
    }

    #[test]
    fn rejects_empty_input() {
        assert_eq!(normalize_url_row("   ", false).unwrap_err(), NormalizeError::Empty);
    }

    #[test]
    fn url_row_is_idempotent() {
        for (input, flag) in [
            ("x.com", false),
            ("http://x.com/a", false),
            ("http://x.com/a", true),
            ("https://x.com/a#frag", false),
            ("https://X.com/Path", false),
        ] {
            let once = normalize_url_row(input, flag).unwrap();
            let twice = normalize_url_row(&once, flag).unwrap();
            assert_eq!(once, twice, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn domain_input_strips_scheme_and_path() {
        assert_eq!(normalize_domain_input("https://x.com/a/b"), "x.com");
        assert_eq!(normalize_domain_input("x.com/a"), "x.com");
        assert_eq!(normalize_domain_input("  x.com  "), "x.com");
        assert_eq!(normalize_domain_input(""), "");
    }

    #[test]
    fn domain_input_is_idempotent() {
        for input in ["https://x.com/a", "x.com", "sub.x.com:8080/p"] {
            let once = normalize_domain_input(input);
            assert_eq!(normalize_domain_input(&once), once);
        }
    }

    #[test]
    fn seed_normalization_is_idempotent() {
        let seed = normalize_seed(Seed {
            url: "http://x.com".to_owned(),
            allow_http: false,
        });
        assert_eq!(seed.url, "https://x.com/");
        assert_eq!(normalize_seed(seed.clone()), seed);
    }

    #[test]
    fn allow_rule_normalization_canonicalizes_pattern() {
        let rule = normalize_allow_rule(AllowRule {
            id: None,
            pattern: "x.com/docs".to_owned(),
            match_mode: MatchMode::Prefix,
            types: TypeFlags::default(),
            allow_http: false,
            auth_profile: None,
        });
        assert_eq!(rule.pattern, "https://x.com/docs/");
        assert_eq!(normalize_allow_rule(rule.clone()), rule);
    }

    #[test]
    fn default_types_are_web_only() {
        let flags = normalize_types(None);
        assert!(flags.web);
        assert!(!flags.pdf && !flags.docx && !flags.xlsx && !flags.pptx);
    }
}
