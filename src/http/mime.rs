//! MIME type detection module
//!
//! Returns the Content-Type for a served file based on its name.

use std::path::Path;

/// Used when the extension is unknown
pub const FALLBACK_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Get the Content-Type for `path`
///
/// Text types are served as UTF-8.
///
/// # Examples
/// ```
/// use coder_server::http::mime::get_content_type;
/// use std::path::Path;
/// assert_eq!(get_content_type(Path::new("index.html")), "text/html; charset=utf-8");
/// assert_eq!(get_content_type(Path::new("logo.png")), "image/png");
/// assert_eq!(get_content_type(Path::new("Makefile")), "text/plain; charset=utf-8");
/// ```
pub fn get_content_type(path: &Path) -> String {
    match mime_guess::from_path(path).first_raw() {
        Some(mime) if mime.starts_with("text/") => format!("{mime}; charset=utf-8"),
        Some(mime) => mime.to_string(),
        None => FALLBACK_CONTENT_TYPE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_types() {
        assert_eq!(get_content_type(Path::new("a/b.css")), "text/css; charset=utf-8");
        assert_eq!(get_content_type(Path::new("data.json")), "application/json");
        assert_eq!(get_content_type(Path::new("photo.JPG")), "image/jpeg");
        assert_eq!(get_content_type(Path::new("doc.pdf")), "application/pdf");
    }

    #[test]
    fn test_unknown_extension() {
        assert_eq!(get_content_type(Path::new("notes.zzzunknown")), FALLBACK_CONTENT_TYPE);
        assert_eq!(get_content_type(Path::new("LICENSE")), FALLBACK_CONTENT_TYPE);
    }
}
