//! Pure functions for URL and query parameter handling.
//!
//! Stateless helpers for splitting a pasted URL into base + parameters and for building the
//! final request URL from parameter rows.

use url::Url;

use crate::key_value::KeyValue;

/// Extract the base URL (without query string) from a URL string.
///
/// # Examples
/// ```ignore
/// assert_eq!(extract_base_url("https://example.com/api?foo=bar"), "https://example.com/api");
/// assert_eq!(extract_base_url("https://example.com/api"), "https://example.com/api");
/// assert_eq!(extract_base_url(""), "");
/// ```
pub fn extract_base_url(url: &str) -> &str {
    match url.find('?') {
        Some(pos) => &url[..pos],
        None => url,
    }
}

/// Parse query parameters from a URL string.
///
/// Returns an empty Vec if the URL is empty or has no query string. URLs that fail to
/// parse (e.g. missing scheme) fall back to splitting the text after `?` by hand.
pub fn parse_query_params(url: &str) -> Vec<KeyValue> {
    if url.is_empty() {
        return Vec::new();
    }

    if let Ok(parsed_url) = Url::parse(url) {
        return parsed_url
            .query_pairs()
            .map(|(k, v)| KeyValue::new(k, v))
            .collect();
    }

    let Some(query_start) = url.find('?') else {
        return Vec::new();
    };

    url[query_start + 1..]
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let key = decode_component(key);
            if key.is_empty() {
                None
            } else {
                Some(KeyValue::new(key, decode_component(value)))
            }
        })
        .collect()
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|s| s.into_owned())
        .unwrap_or(spaced)
}

/// Build a URL by combining a base URL with query parameters.
///
/// Rows with an empty key are skipped. Keys and values are percent-encoded. When no row
/// survives, the base URL is returned untouched (no trailing `?`). A base that already carries
/// a query string is extended with `&`, so the result never holds more than one `?`.
///
/// # Examples
/// ```ignore
/// let params = [("foo", "bar"), ("", "x"), ("baz", "qux")];
/// let url = build_url_with_params("https://example.com/api", params);
/// assert_eq!(url, "https://example.com/api?foo=bar&baz=qux");
/// ```
pub fn build_url_with_params<'a, I>(base_url: &str, params: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let param_parts: Vec<String> = params
        .into_iter()
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| {
            format!(
                "{}={}",
                urlencoding::encode(key),
                urlencoding::encode(value)
            )
        })
        .collect();

    if param_parts.is_empty() {
        return base_url.to_string();
    }

    let separator = match base_url.find('?') {
        None => "?",
        Some(_) if base_url.ends_with('?') || base_url.ends_with('&') => "",
        Some(_) => "&",
    };
    format!("{}{}{}", base_url, separator, param_parts.join("&"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(params: &[(&'static str, &'static str)]) -> Vec<(&'static str, &'static str)> {
        params.to_vec()
    }

    // ============ extract_base_url tests ============

    #[test]
    fn test_extract_base_url_with_query() {
        assert_eq!(
            extract_base_url("https://example.com/api?foo=bar"),
            "https://example.com/api"
        );
    }

    #[test]
    fn test_extract_base_url_without_query() {
        assert_eq!(
            extract_base_url("https://example.com/api"),
            "https://example.com/api"
        );
    }

    #[test]
    fn test_extract_base_url_only_query() {
        assert_eq!(extract_base_url("?foo=bar"), "");
    }

    // ============ parse_query_params tests ============

    #[test]
    fn test_parse_url_without_query() {
        assert!(parse_query_params("https://example.com/api").is_empty());
        assert!(parse_query_params("").is_empty());
    }

    #[test]
    fn test_parse_url_with_multiple_params() {
        assert_eq!(
            parse_query_params("https://example.com?foo=bar&baz=qux"),
            vec![KeyValue::new("foo", "bar"), KeyValue::new("baz", "qux")]
        );
    }

    #[test]
    fn test_parse_url_with_encoded_params() {
        assert_eq!(
            parse_query_params("https://example.com?name=hello%20world&key=a%26b"),
            vec![
                KeyValue::new("name", "hello world"),
                KeyValue::new("key", "a&b")
            ]
        );
    }

    #[test]
    fn test_parse_partial_url_with_query() {
        assert_eq!(
            parse_query_params("example.com/search?q=rust+lang&flag"),
            vec![KeyValue::new("q", "rust lang"), KeyValue::new("flag", "")]
        );
    }

    // ============ build_url_with_params tests ============

    #[test]
    fn test_build_url_empty_params() {
        assert_eq!(
            build_url_with_params("https://example.com/api", pairs(&[])),
            "https://example.com/api"
        );
    }

    #[test]
    fn test_build_url_keeps_order() {
        assert_eq!(
            build_url_with_params(
                "https://example.com/api",
                pairs(&[("foo", "bar"), ("baz", "qux"), ("foo", "again")])
            ),
            "https://example.com/api?foo=bar&baz=qux&foo=again"
        );
    }

    #[test]
    fn test_build_url_all_empty_keys() {
        assert_eq!(
            build_url_with_params("https://example.com/api", pairs(&[("", "a"), ("", "")])),
            "https://example.com/api"
        );
    }

    #[test]
    fn test_build_url_with_special_chars() {
        assert_eq!(
            build_url_with_params(
                "https://example.com/api",
                pairs(&[("name", "hello world"), ("special", "a&b=c")])
            ),
            "https://example.com/api?name=hello%20world&special=a%26b%3Dc"
        );
    }

    #[test]
    fn test_build_url_extends_existing_query() {
        assert_eq!(
            build_url_with_params("https://x.io/a?x=1", pairs(&[("y", "2")])),
            "https://x.io/a?x=1&y=2"
        );
        assert_eq!(
            build_url_with_params("https://x.io/a?", pairs(&[("y", "2")])),
            "https://x.io/a?y=2"
        );
        assert_eq!(
            build_url_with_params("https://x.io/a?x=1", pairs(&[])),
            "https://x.io/a?x=1"
        );
    }
}
