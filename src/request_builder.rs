use log::debug;

use crate::key_value::{HeaderEditor, HeaderSuggestions, KeyValueList};
use crate::types::{Auth, HttpMethod, RequestDraft, RequestSnapshot, ResolvedRequest};
use crate::url_params::{build_url_with_params, extract_base_url, parse_query_params};

const AUTHORIZATION: &str = "Authorization";
const CONTENT_TYPE: &str = "Content-Type";
const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Owns the live request draft and derives sendable requests from it
#[derive(Debug, Default)]
pub struct RequestBuilder {
    draft: RequestDraft,
    header_suggestions: HeaderSuggestions,
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draft(&self) -> &RequestDraft {
        &self.draft
    }

    pub fn set_method(&mut self, method: HttpMethod) {
        self.draft.method = method;
    }

    pub fn set_url(&mut self, url: impl Into<String>) {
        self.draft.url = url.into();
    }

    /// Replace the body. Ignored while the method carries no body; the stored text is kept.
    pub fn set_body(&mut self, body: impl Into<String>) -> bool {
        if !self.draft.method.allows_body() {
            return false;
        }
        self.draft.body = body.into();
        true
    }

    pub fn set_auth(&mut self, auth: Auth) {
        self.draft.auth = auth;
    }

    pub fn query_params(&mut self) -> &mut KeyValueList {
        &mut self.draft.query_params
    }

    pub fn headers(&mut self) -> HeaderEditor<'_> {
        HeaderEditor::new(&mut self.draft.headers, &mut self.header_suggestions)
    }

    /// Split a pasted URL into the base URL and query parameter rows.
    pub fn paste_url(&mut self, pasted: &str) {
        let pasted = pasted.trim();
        self.draft.url = extract_base_url(pasted).to_string();
        self.draft.query_params = parse_query_params(pasted).into();
    }

    /// Replace method, URL, body, headers and query parameters wholesale. Auth is untouched.
    pub fn populate(&mut self, snapshot: RequestSnapshot) {
        debug!("Populating request builder with {}", snapshot.title());
        self.draft.method = snapshot.method;
        self.draft.url = snapshot.url;
        self.draft.body = snapshot.body;
        self.draft.headers = snapshot.headers.into();
        self.draft.query_params = snapshot.query_params.into();
        self.header_suggestions.clear();
    }

    /// Copy of the fields recorded in history.
    pub fn snapshot(&self) -> RequestSnapshot {
        RequestSnapshot {
            method: self.draft.method,
            url: self.draft.url.clone(),
            query_params: self.draft.query_params.to_vec(),
            headers: self.draft.headers.to_vec(),
            body: self.draft.body.clone(),
        }
    }

    pub fn resolve(&self) -> ResolvedRequest {
        resolve(&self.draft)
    }
}

/// Derive the request to send from a draft.
///
/// - query rows with empty keys are dropped, and no `?` is added when none remain
/// - a bearer token replaces any hand-written Authorization header
/// - `Content-Type: application/json` is added for non-empty bodies unless one was given
/// - the body is dropped for methods that carry none
pub fn resolve(draft: &RequestDraft) -> ResolvedRequest {
    let url = build_url_with_params(&draft.url, draft.query_params.active_pairs());

    let mut headers: Vec<(String, String)> = draft
        .headers
        .active_pairs()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    if let Auth::Bearer { token } = &draft.auth {
        if !token.is_empty() {
            headers.retain(|(k, _)| !k.eq_ignore_ascii_case(AUTHORIZATION));
            headers.push((AUTHORIZATION.to_string(), format!("Bearer {}", token)));
        }
    }

    let sends_body = draft.method.allows_body();
    if sends_body && !draft.body.is_empty() {
        let has_content_type = headers
            .iter()
            .any(|(k, _)| k.eq_ignore_ascii_case(CONTENT_TYPE));
        if !has_content_type {
            headers.push((CONTENT_TYPE.to_string(), DEFAULT_CONTENT_TYPE.to_string()));
        }
    }

    ResolvedRequest {
        method: draft.method,
        url,
        headers,
        body: sends_body.then(|| draft.body.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key_value::{Field, KeyValue};

    fn builder_with(method: HttpMethod, url: &str) -> RequestBuilder {
        let mut builder = RequestBuilder::new();
        builder.set_method(method);
        builder.set_url(url);
        builder
    }

    #[test]
    fn test_get_never_sends_body() {
        let mut builder = builder_with(HttpMethod::POST, "https://example.com");
        builder.set_body("{\"a\":1}");
        builder.set_method(HttpMethod::GET);

        let resolved = builder.resolve();
        assert_eq!(resolved.body, None);
        assert_eq!(resolved.header("Content-Type"), None);
    }

    #[test]
    fn test_body_edit_ignored_for_get_but_retained() {
        let mut builder = builder_with(HttpMethod::POST, "https://example.com");
        assert!(builder.set_body("kept"));
        builder.set_method(HttpMethod::GET);
        assert!(!builder.set_body("dropped"));
        assert_eq!(builder.draft().body, "kept");

        builder.set_method(HttpMethod::PUT);
        assert_eq!(builder.resolve().body.as_deref(), Some("kept"));
    }

    #[test]
    fn test_empty_body_is_still_sent_for_post() {
        let builder = builder_with(HttpMethod::POST, "https://example.com");
        let resolved = builder.resolve();
        assert_eq!(resolved.body.as_deref(), Some(""));
        assert_eq!(resolved.header("Content-Type"), None);
    }

    #[test]
    fn test_query_string_in_order_without_empty_keys() {
        let mut builder = builder_with(HttpMethod::GET, "https://api.example.com/items");
        let params = builder.query_params();
        params.push("page", "2");
        params.push("", "skipped");
        params.push("sort", "name");

        let url = builder.resolve().url;
        assert_eq!(url, "https://api.example.com/items?page=2&sort=name");
        assert_eq!(url.matches('?').count(), 1);
    }

    #[test]
    fn test_query_string_omitted_when_no_usable_keys() {
        let mut builder = builder_with(HttpMethod::GET, "https://api.example.com/items");
        builder.query_params().add_row();
        assert_eq!(builder.resolve().url, "https://api.example.com/items");
    }

    #[test]
    fn test_bearer_overrides_manual_authorization() {
        let mut builder = builder_with(HttpMethod::GET, "https://example.com");
        {
            let mut headers = builder.headers();
            headers.add_row();
            headers.update_field(0, Field::Key, "authorization");
            headers.update_field(0, Field::Value, "Bearer OLD");
        }
        builder.set_auth(Auth::Bearer {
            token: "abc".to_string(),
        });

        let resolved = builder.resolve();
        assert_eq!(resolved.header("Authorization"), Some("Bearer abc"));
        let count = resolved
            .headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case("authorization"))
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_empty_bearer_token_leaves_headers_alone() {
        let mut builder = builder_with(HttpMethod::GET, "https://example.com");
        builder.populate(RequestSnapshot {
            headers: vec![KeyValue::new("Authorization", "Basic xyz")],
            ..RequestSnapshot::new(HttpMethod::GET, "https://example.com")
        });
        builder.set_auth(Auth::Bearer {
            token: String::new(),
        });
        assert_eq!(builder.resolve().header("Authorization"), Some("Basic xyz"));
    }

    #[test]
    fn test_default_content_type_added() {
        let mut builder = builder_with(HttpMethod::POST, "https://example.com");
        builder.set_body("{}");
        assert_eq!(
            builder.resolve().header("Content-Type"),
            Some("application/json")
        );
    }

    #[test]
    fn test_explicit_content_type_preserved() {
        let mut builder = builder_with(HttpMethod::PATCH, "https://example.com");
        builder.set_body("a=1");
        builder.query_params().push("unrelated", "1");
        {
            let mut headers = builder.headers();
            headers.add_row();
            headers.update_field(0, Field::Key, "content-type");
            headers.update_field(0, Field::Value, "text/plain");
        }

        let resolved = builder.resolve();
        assert_eq!(resolved.header("Content-Type"), Some("text/plain"));
        assert_eq!(resolved.headers.len(), 1);
    }

    #[test]
    fn test_duplicate_headers_are_all_sent() {
        let mut builder = builder_with(HttpMethod::GET, "https://example.com");
        builder.populate(RequestSnapshot {
            headers: vec![KeyValue::new("X-Tag", "a"), KeyValue::new("X-Tag", "b")],
            ..RequestSnapshot::new(HttpMethod::GET, "https://example.com")
        });
        assert_eq!(builder.resolve().headers.len(), 2);
    }

    #[test]
    fn test_populate_replaces_fields_but_not_auth() {
        let mut builder = builder_with(HttpMethod::GET, "https://old.example.com");
        builder.query_params().push("old", "1");
        let auth = Auth::Bearer {
            token: "keep".to_string(),
        };
        builder.set_auth(auth.clone());

        let snapshot = RequestSnapshot {
            method: HttpMethod::POST,
            url: "https://new.example.com/posts".to_string(),
            query_params: vec![],
            headers: vec![KeyValue::new("Accept", "*/*")],
            body: "{\"title\":\"foo\"}".to_string(),
        };
        builder.populate(snapshot.clone());

        assert_eq!(builder.snapshot(), snapshot);
        assert_eq!(builder.draft().auth, auth);
    }

    #[test]
    fn test_paste_url_splits_query() {
        let mut builder = RequestBuilder::new();
        builder.paste_url("https://jsonplaceholder.typicode.com/comments?postId=1&_limit=5");
        assert_eq!(builder.draft().url, "https://jsonplaceholder.typicode.com/comments");
        assert_eq!(
            builder.draft().query_params.rows(),
            &[KeyValue::new("postId", "1"), KeyValue::new("_limit", "5")]
        );
        assert_eq!(
            builder.resolve().url,
            "https://jsonplaceholder.typicode.com/comments?postId=1&_limit=5"
        );
    }

    #[test]
    fn test_url_with_query_gets_single_question_mark() {
        let mut builder = builder_with(HttpMethod::GET, "https://x.io/a?x=1");
        builder.query_params().push("y", "2");

        let url = builder.resolve().url;
        assert_eq!(url, "https://x.io/a?x=1&y=2");
        assert_eq!(url.matches('?').count(), 1);
    }
}
