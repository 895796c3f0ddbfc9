//! Validation of untrusted server and storage data.
//!
//! Everything that arrives from the network or from persisted storage goes
//! through a [`Sanitizer`] before it reaches the conversation log or the
//! screen. URLs are normalized through a real parser; only `http` and
//! `https` survive.

use serde_json::Value;
use url::Url;

use crate::types::Source;

const DEFAULT_ORIGIN: &str = "http://localhost/";

/// Sanitizes source lists and URLs against an application origin
#[derive(Debug, Clone)]
pub struct Sanitizer {
    origin: Url,
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self {
            origin: Url::parse(DEFAULT_ORIGIN).expect("default origin is a valid URL"),
        }
    }
}

impl Sanitizer {
    /// Create a sanitizer resolving relative URLs against `origin`
    pub fn new(origin: Url) -> Self {
        Self { origin }
    }

    /// Create a sanitizer from an origin string, falling back to the default origin
    pub fn from_origin(origin: &str) -> Self {
        match Url::parse(origin) {
            Ok(url) => Self::new(url),
            Err(e) => {
                tracing::warn!("Invalid origin {:?} ({}), using {}", origin, e, DEFAULT_ORIGIN);
                Self::default()
            }
        }
    }

    /// The origin relative URLs are resolved against
    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Coerce an arbitrary JSON value into a list of sources.
    ///
    /// Non-arrays yield an empty list. Non-object elements are dropped;
    /// object elements are always kept with non-string fields coerced to "".
    pub fn sources(&self, raw: &Value) -> Vec<Source> {
        let Some(items) = raw.as_array() else {
            return Vec::new();
        };

        items
            .iter()
            .filter_map(|item| {
                let obj = item.as_object()?;
                let title = obj.get("title").and_then(Value::as_str).unwrap_or_default();
                let url = obj.get("url").and_then(Value::as_str).unwrap_or_default();
                Some(self.source(Source::new(title, url)))
            })
            .collect()
    }

    /// Re-validate a typed source.
    ///
    /// An absolute, clean http(s) url is kept as given. Anything else is
    /// stored in its resolved form, or cleared when unsafe.
    pub fn source(&self, source: Source) -> Source {
        let url = if is_verbatim_safe(&source.url) {
            source.url
        } else {
            self.url(&source.url)
        };
        Source {
            title: source.title,
            url,
        }
    }

    /// Normalize a URL. Returns the absolute URL for `http`/`https`, otherwise "".
    pub fn url(&self, raw: &str) -> String {
        if raw.is_empty() {
            return String::new();
        }

        match Url::options().base_url(Some(&self.origin)).parse(raw) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => parsed.into(),
            _ => String::new(),
        }
    }
}

/// Absolute http(s) url that parses without a base and without the parser
/// silently dropping whitespace or control characters
fn is_verbatim_safe(raw: &str) -> bool {
    raw.trim() == raw
        && !raw.chars().any(char::is_control)
        && Url::parse(raw).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn app() -> Sanitizer {
        Sanitizer::from_origin("https://app.test")
    }

    #[test]
    fn test_sources_non_array_is_empty() {
        let s = app();
        assert!(s.sources(&Value::Null).is_empty());
        assert!(s.sources(&json!("x")).is_empty());
        assert!(s.sources(&json!(42)).is_empty());
        assert!(s.sources(&json!({"title": "T"})).is_empty());
    }

    #[test]
    fn test_sources_coerces_fields_and_drops_non_objects() {
        let s = app();
        let raw = json!([{"title": 1, "url": 2}, "junk", {"title": "T"}]);
        assert_eq!(
            s.sources(&raw),
            vec![Source::new("", ""), Source::new("T", "")]
        );
    }

    #[test]
    fn test_sources_drops_null_and_arrays() {
        let s = app();
        let raw = json!([null, [1, 2], 7, {"title": "kept", "url": "https://ok.test/x"}]);
        assert_eq!(s.sources(&raw), vec![Source::new("kept", "https://ok.test/x")]);
    }

    #[test]
    fn test_sources_clears_unsafe_urls() {
        let s = app();
        let raw = json!([
            {"title": "a", "url": "javascript:alert(1)"},
            {"title": "b", "url": "data:text/html,<b>x</b>"},
            {"title": "c", "url": "https://s.test"},
        ]);
        let sources = s.sources(&raw);
        assert_eq!(sources[0].url, "");
        assert_eq!(sources[1].url, "");
        // Safe urls are stored as received
        assert_eq!(sources[2].url, "https://s.test");
    }

    #[test]
    fn test_url_rejects_script_schemes() {
        let s = app();
        assert_eq!(s.url("javascript:alert(1)"), "");
        assert_eq!(s.url("JavaScript:alert(1)"), "");
        assert_eq!(s.url(" javascript:alert(1)"), "");
        assert_eq!(s.url("vbscript:msgbox"), "");
        assert_eq!(s.url("file:///etc/passwd"), "");
        assert_eq!(s.url("mailto:a@b.test"), "");
    }

    #[test]
    fn test_url_accepts_http_and_https() {
        let s = app();
        assert_eq!(s.url("https://x.test/a"), "https://x.test/a");
        assert_eq!(s.url("http://x.test/a?b=1#c"), "http://x.test/a?b=1#c");
        assert_eq!(s.url("HTTPS://X.TEST/a"), "https://x.test/a");
    }

    #[test]
    fn test_url_resolves_relative_against_origin() {
        let s = app();
        assert_eq!(s.url("/a/b"), "https://app.test/a/b");
        assert_eq!(s.url("a/b"), "https://app.test/a/b");
    }

    #[test]
    fn test_url_protocol_relative_is_normalized() {
        let s = app();
        assert_eq!(s.url("//other.test/p"), "https://other.test/p");
    }

    #[test]
    fn test_url_empty_and_malformed() {
        let s = app();
        assert_eq!(s.url(""), "");
        assert_eq!(s.url("http://"), "");
        assert_eq!(s.url("https://[::1"), "");
    }

    #[test]
    fn test_source_resolves_relative_url() {
        let s = app();
        let source = s.source(Source::new("a", "/docs/1"));
        assert_eq!(source.url, "https://app.test/docs/1");

        let sources = s.sources(&json!([{"title": "p", "url": "//cdn.test/x"}]));
        assert_eq!(sources[0].url, "https://cdn.test/x");
    }

    #[test]
    fn test_source_normalizes_embedded_control_characters() {
        let s = app();
        let source = s.source(Source::new("b", "ht\ttps://x.test/p"));
        assert_eq!(source.url, "https://x.test/p");

        let padded = s.source(Source::new("c", " https://x.test/q "));
        assert_eq!(padded.url, "https://x.test/q");

        let hidden = s.source(Source::new("d", "java\nscript:alert(1)"));
        assert_eq!(hidden.url, "");
    }

    #[test]
    fn test_invalid_origin_falls_back() {
        let s = Sanitizer::from_origin("not a url");
        assert_eq!(s.origin().as_str(), DEFAULT_ORIGIN);
    }
}
