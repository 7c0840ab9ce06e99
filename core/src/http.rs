//! HTTP data types exchanged between the engine and its transport.
//!
//! # Design
//! Requests and responses are plain data built on the `http` crate's
//! `Method`, `StatusCode` and `HeaderMap`. `HeaderMap` gives case-insensitive
//! names and multiple values per name for free. Response bodies are fully
//! buffered as `Bytes`, so status handlers and reader strategies can each
//! look at the content without coordinating a single-use stream.

use bytes::Bytes;
use http::header::{HeaderName, IntoHeaderName, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, Method, StatusCode};

/// Describes a request before the engine merges headers and attaches a body.
///
/// Built with consuming methods so a finished descriptor cannot be mutated
/// behind the engine's back.
#[derive(Debug, Clone)]
pub struct ClientRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
}

impl ClientRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::PUT, url)
    }

    pub fn patch(url: impl Into<String>) -> Self {
        Self::new(Method::PATCH, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::DELETE, url)
    }

    /// Append a header value. Existing values under the same name are kept.
    pub fn header<K: IntoHeaderName>(mut self, name: K, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Append a header only when `value` is present.
    pub fn optional_header<K: IntoHeaderName>(self, name: K, value: Option<HeaderValue>) -> Self {
        match value {
            Some(value) => self.header(name, value),
            None => self,
        }
    }

    pub fn content_type(self, value: HeaderValue) -> Self {
        self.header(CONTENT_TYPE, value)
    }
}

/// The outgoing request handed to a [`Transport`](crate::Transport).
///
/// Produced by the engine after header merging; the selected writer strategy
/// fills in `body` (and may add a content type).
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// A fully buffered response as returned by a transport.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn content_type(&self) -> Option<&str> {
        header_str(&self.headers, CONTENT_TYPE)
    }
}

/// Merge `request` over `defaults`.
///
/// Every name present in `request` replaces all default values for that
/// name; names only in `defaults` are carried over untouched.
pub fn merge_headers(defaults: &HeaderMap, request: &HeaderMap) -> HeaderMap {
    let mut merged = defaults.clone();
    for name in request.keys() {
        merged.remove(name);
    }
    for (name, value) in request {
        merged.append(name.clone(), value.clone());
    }
    merged
}

/// First value of `name`, if it is valid visible ASCII.
pub fn header_str(headers: &HeaderMap, name: HeaderName) -> Option<&str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// The media type of a content-type value, lowercased and stripped of
/// parameters (`"Application/JSON; charset=utf-8"` -> `"application/json"`).
pub fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

pub fn is_json(content_type: Option<&str>) -> bool {
    content_type.map(media_type).is_some_and(|media| {
        media == "application/json" || (media.starts_with("application/") && media.ends_with("+json"))
    })
}

pub fn is_text(content_type: Option<&str>) -> bool {
    content_type
        .map(media_type)
        .is_some_and(|media| media.starts_with("text/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::{ACCEPT, USER_AGENT};

    #[test]
    fn request_headers_replace_defaults_by_name() {
        let mut defaults = HeaderMap::new();
        defaults.insert(USER_AGENT, HeaderValue::from_static("default-agent"));
        defaults.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut request = HeaderMap::new();
        request.insert("user-agent", HeaderValue::from_static("custom"));

        let merged = merge_headers(&defaults, &request);
        assert_eq!(merged.get(USER_AGENT).unwrap(), "custom");
        assert_eq!(merged.get_all(USER_AGENT).iter().count(), 1);
        assert_eq!(merged.get(ACCEPT).unwrap(), "application/json");
    }

    #[test]
    fn merge_leaves_defaults_untouched() {
        let mut defaults = HeaderMap::new();
        defaults.insert(USER_AGENT, HeaderValue::from_static("default-agent"));
        let mut request = HeaderMap::new();
        request.insert(USER_AGENT, HeaderValue::from_static("custom"));

        let _ = merge_headers(&defaults, &request);
        assert_eq!(defaults.get(USER_AGENT).unwrap(), "default-agent");
    }

    #[test]
    fn merge_keeps_duplicate_request_values() {
        let mut defaults = HeaderMap::new();
        defaults.insert("x-tag", HeaderValue::from_static("base"));
        let request = ClientRequest::get("http://localhost/")
            .header("x-tag", HeaderValue::from_static("a"))
            .header("x-tag", HeaderValue::from_static("b"));

        let merged = merge_headers(&defaults, &request.headers);
        let values: Vec<_> = merged.get_all("x-tag").iter().collect();
        assert_eq!(values, ["a", "b"]);
    }

    #[test]
    fn optional_header_skips_absent_values() {
        let request = ClientRequest::delete("http://localhost/invites/abc")
            .optional_header("x-audit-log-reason", None)
            .optional_header("x-other", Some(HeaderValue::from_static("yes")));
        assert!(request.headers.get("x-audit-log-reason").is_none());
        assert_eq!(request.headers.get("x-other").unwrap(), "yes");
    }

    #[test]
    fn media_type_strips_parameters_and_case() {
        assert_eq!(media_type("Application/JSON; charset=utf-8"), "application/json");
        assert_eq!(media_type("text/plain"), "text/plain");
    }

    #[test]
    fn json_and_text_detection() {
        assert!(is_json(Some("application/json")));
        assert!(is_json(Some("application/problem+json; charset=utf-8")));
        assert!(!is_json(Some("text/plain")));
        assert!(!is_json(None));
        assert!(is_text(Some("text/html; charset=utf-8")));
        assert!(!is_text(Some("application/json")));
    }
}
