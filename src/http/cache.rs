//! HTTP cache validator module
//!
//! Provides `ETag` / `Last-Modified` generation and conditional request handling.

use chrono::{DateTime, Utc};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::SystemTime;

/// Generate a quoted `ETag` from the content, e.g. `"abc123def"`
pub fn generate_etag(content: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    let v = hasher.finish();
    format!("\"{v:x}\"")
}

/// Check if client's `If-None-Match` header matches the server's `ETag`
///
/// Supports a single `ETag`, a comma separated list, weak validators
/// (`W/"..."`) and the `*` wildcard. Returns true when a 304 should be sent.
pub fn check_etag_match(if_none_match: Option<&str>, etag: &str) -> bool {
    if_none_match.is_some_and(|client_etag| {
        client_etag.split(',').any(|e| {
            let e = e.trim();
            e == "*" || e.trim_start_matches("W/") == etag
        })
    })
}

/// Format a modification time as an HTTP-date (RFC 7231 IMF-fixdate)
pub fn format_http_date(time: SystemTime) -> String {
    let time: DateTime<Utc> = time.into();
    time.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_etag_is_stable() {
        assert_eq!(generate_etag(b"hello"), generate_etag(b"hello"));
        assert_ne!(generate_etag(b"hello"), generate_etag(b"world"));
        assert!(generate_etag(b"").starts_with('"'));
    }

    #[test]
    fn test_check_etag_match() {
        let etag = generate_etag(b"hello");
        assert!(check_etag_match(Some(&etag), &etag));
        assert!(check_etag_match(Some(&format!("\"other\", {etag}")), &etag));
        assert!(check_etag_match(Some(&format!("W/{etag}")), &etag));
        assert!(check_etag_match(Some("*"), &etag));
        assert!(!check_etag_match(Some("\"other\""), &etag));
        assert!(!check_etag_match(None, &etag));
    }

    #[test]
    fn test_format_http_date() {
        let time = SystemTime::UNIX_EPOCH + Duration::from_secs(784_111_777);
        assert_eq!(format_http_date(time), "Sun, 06 Nov 1994 08:49:37 GMT");
    }
}
