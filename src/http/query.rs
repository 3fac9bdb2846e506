//! Query string helpers

/// First value of `name` in a form-encoded query string, percent-decoded
pub fn get_param(query: Option<&str>, name: &str) -> Option<String> {
    url::form_urlencoded::parse(query?.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_param() {
        assert_eq!(
            get_param(Some("file_path=src%2Fmain.rs&x=1"), "file_path").as_deref(),
            Some("src/main.rs")
        );
        assert_eq!(get_param(Some("file_path=a+b.txt"), "file_path").as_deref(), Some("a b.txt"));
        assert_eq!(get_param(Some("file_path="), "file_path").as_deref(), Some(""));
        assert_eq!(get_param(Some("other=1"), "file_path"), None);
        assert_eq!(get_param(None, "file_path"), None);
    }
}
