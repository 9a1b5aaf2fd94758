//! Boundary to the generative model and the request generator built on it.
//!
//! Model output is untrusted: it goes through the same checks as hand-typed input
//! (closed method set, string coercion for header and parameter rows) before it can reach
//! the request builder.

pub mod flows;
pub mod gemini;

use futures::future::BoxFuture;
use serde_json::Value;
use thiserror::Error;

use crate::code_formatter::strip_code_fence;
use crate::key_value::KeyValue;
use crate::types::{HttpMethod, RequestSnapshot};
use crate::url_params::{extract_base_url, parse_query_params};

/// A field-level problem with user input, reported before anything is sent
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AssistError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("{0} is not set")]
    MissingApiKey(&'static str),

    #[error("Completion request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Completion provider returned an error: {0}")]
    Provider(String),

    #[error("Generation failed: {0}")]
    InvalidOutput(String),
}

/// One prompt sent to the model
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub prompt: String,
    /// Sampling temperature in `[0, 1]`; `None` leaves the provider default.
    pub temperature: Option<f32>,
}

/// A text-completion service asked to answer with a single JSON document
pub trait CompletionProvider: Send + Sync {
    fn complete(&self, request: CompletionRequest) -> BoxFuture<'_, Result<String, AssistError>>;
}

const REQUEST_PROMPT: &str = "You are an expert API developer. Turn the user's description into a \
single structured HTTP request. Infer the HTTP method, the URL, query parameters, headers and \
body. When no domain is mentioned, use a well-known public API such as JSONPlaceholder.

Answer with one JSON object and nothing else, using exactly these keys:
- \"method\": one of GET, POST, PUT, PATCH, DELETE
- \"url\": the full URL without the query string
- \"queryParams\": optional array of {\"key\": string, \"value\": string}
- \"headers\": optional array of {\"key\": string, \"value\": string}
- \"body\": optional string; when the body is JSON, give it as a stringified JSON object

Description: ";

/// Reject creativity values outside `[0, 1]`.
pub fn validate_creativity(creativity: Option<f32>) -> Result<(), ValidationError> {
    match creativity {
        Some(c) if !(0.0..=1.0).contains(&c) => Err(ValidationError::new(
            "creativity",
            "Creativity must be between 0 and 1.",
        )),
        _ => Ok(()),
    }
}

/// Ask the model for a request matching `instruction`.
pub async fn generate_request(
    provider: &dyn CompletionProvider,
    instruction: &str,
    creativity: Option<f32>,
) -> Result<RequestSnapshot, AssistError> {
    let instruction = instruction.trim();
    if instruction.is_empty() {
        return Err(ValidationError::new("prompt", "Prompt is empty.").into());
    }
    validate_creativity(creativity)?;

    log::debug!("Generating request from a {} character prompt", instruction.len());
    let reply = provider
        .complete(CompletionRequest {
            prompt: format!("{REQUEST_PROMPT}{instruction}"),
            temperature: creativity,
        })
        .await?;

    parse_generated_request(&reply)
}

/// Parse model output into a request snapshot.
pub fn parse_generated_request(text: &str) -> Result<RequestSnapshot, AssistError> {
    let value: Value = serde_json::from_str(strip_code_fence(text))
        .map_err(|e| AssistError::InvalidOutput(format!("response is not JSON: {}", e)))?;
    request_from_value(&value)
}

/// Validate a JSON request object field by field. Unknown fields are ignored.
pub fn request_from_value(value: &Value) -> Result<RequestSnapshot, AssistError> {
    let obj = value
        .as_object()
        .ok_or_else(|| AssistError::InvalidOutput("expected a JSON object".to_string()))?;

    let method = match obj.get("method").and_then(Value::as_str) {
        Some(raw) => HttpMethod::from_str(raw).ok_or_else(|| {
            AssistError::InvalidOutput(format!("unsupported method '{}'", raw))
        })?,
        None => return Err(AssistError::InvalidOutput("missing method".to_string())),
    };

    let raw_url = obj
        .get("url")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .ok_or_else(|| AssistError::InvalidOutput("missing url".to_string()))?;

    // A query string inside the URL is moved into the parameter rows.
    let mut query_params = parse_query_params(raw_url);
    query_params.extend(coerce_pairs(obj.get("queryParams")));

    Ok(RequestSnapshot {
        method,
        url: extract_base_url(raw_url).to_string(),
        query_params,
        headers: coerce_pairs(obj.get("headers")),
        body: coerce_body(obj.get("body")),
    })
}

/// Accepts `[{"key", "value"}]` or a `{name: value}` map. Rows without a usable key are dropped.
fn coerce_pairs(value: Option<&Value>) -> Vec<KeyValue> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| {
                let key = item.get("key").and_then(scalar_to_string)?;
                if key.is_empty() {
                    return None;
                }
                let value = item
                    .get("value")
                    .and_then(scalar_to_string)
                    .unwrap_or_default();
                Some(KeyValue::new(key, value))
            })
            .collect(),
        Some(Value::Object(map)) => map
            .iter()
            .filter(|(key, _)| !key.is_empty())
            .map(|(key, value)| {
                KeyValue::new(key.as_str(), scalar_to_string(value).unwrap_or_default())
            })
            .collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => {
            log::debug!("Ignoring key/value field of unexpected type: {}", other);
            Vec::new()
        }
    }
}

fn coerce_body(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(structured @ (Value::Object(_) | Value::Array(_))) => {
            serde_json::to_string_pretty(structured).unwrap_or_default()
        }
        Some(scalar) => scalar.to_string(),
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Provider that replays a canned reply and remembers the prompts it saw
    pub struct ScriptedProvider {
        reply: Result<String, String>,
        pub seen: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedProvider {
        pub fn replying(reply: impl Into<String>) -> Self {
            Self {
                reply: Ok(reply.into()),
                seen: Mutex::new(Vec::new()),
            }
        }

        pub fn failing(message: impl Into<String>) -> Self {
            Self {
                reply: Err(message.into()),
                seen: Mutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    impl CompletionProvider for ScriptedProvider {
        fn complete(
            &self,
            request: CompletionRequest,
        ) -> BoxFuture<'_, Result<String, AssistError>> {
            self.seen.lock().unwrap().push(request);
            let reply = self.reply.clone().map_err(AssistError::Provider);
            Box::pin(async move { reply })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ScriptedProvider;
    use super::*;

    #[test]
    fn test_parse_full_request() {
        let reply = r#"{
            "method": "post",
            "url": "https://jsonplaceholder.typicode.com/posts",
            "headers": [{"key": "Accept", "value": "application/json"}],
            "queryParams": [{"key": "draft", "value": true}],
            "body": "{\"title\":\"foo\"}",
            "explanation": "ignored"
        }"#;
        let snapshot = parse_generated_request(reply).unwrap();
        assert_eq!(snapshot.method, HttpMethod::POST);
        assert_eq!(snapshot.url, "https://jsonplaceholder.typicode.com/posts");
        assert_eq!(snapshot.headers, vec![KeyValue::new("Accept", "application/json")]);
        assert_eq!(snapshot.query_params, vec![KeyValue::new("draft", "true")]);
        assert_eq!(snapshot.body, "{\"title\":\"foo\"}");
    }

    #[test]
    fn test_rejects_method_outside_closed_set() {
        let err = parse_generated_request(r#"{"method": "HEAD", "url": "https://x.io"}"#)
            .unwrap_err();
        assert!(matches!(err, AssistError::InvalidOutput(_)));
    }

    #[test]
    fn test_rejects_missing_url_and_non_objects() {
        assert!(parse_generated_request(r#"{"method": "GET"}"#).is_err());
        assert!(parse_generated_request(r#"{"method": "GET", "url": 7}"#).is_err());
        assert!(parse_generated_request("[]").is_err());
        assert!(parse_generated_request("Sure! Here is your request").is_err());
    }

    #[test]
    fn test_fenced_output_and_object_headers() {
        let reply = "```json\n{\"method\":\"GET\",\"url\":\"https://api.example.com/users?page=2\",\
                     \"headers\":{\"X-Count\":3},\"queryParams\":[{\"key\":\"\",\"value\":\"x\"},{\"value\":\"y\"}]}\n```";
        let snapshot = parse_generated_request(reply).unwrap();
        assert_eq!(snapshot.url, "https://api.example.com/users");
        assert_eq!(snapshot.query_params, vec![KeyValue::new("page", "2")]);
        assert_eq!(snapshot.headers, vec![KeyValue::new("X-Count", "3")]);
        assert_eq!(snapshot.body, "");
    }

    #[test]
    fn test_structured_body_is_stringified() {
        let reply = r#"{"method":"PUT","url":"https://x.io/a","body":{"done":true}}"#;
        let snapshot = parse_generated_request(reply).unwrap();
        assert_eq!(snapshot.body, "{\n  \"done\": true\n}");
    }

    #[tokio::test]
    async fn test_generate_request_passes_creativity() {
        let provider = ScriptedProvider::replying(r#"{"method":"GET","url":"https://x.io"}"#);
        let snapshot = generate_request(&provider, "list users", Some(0.3))
            .await
            .unwrap();
        assert_eq!(snapshot.url, "https://x.io");

        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen[0].temperature, Some(0.3));
        assert!(seen[0].prompt.ends_with("list users"));
    }

    #[tokio::test]
    async fn test_empty_prompt_never_reaches_provider() {
        let provider = ScriptedProvider::replying("{}");
        let err = generate_request(&provider, "   ", None).await.unwrap_err();
        assert!(matches!(err, AssistError::Validation(_)));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_creativity_out_of_range() {
        let provider = ScriptedProvider::replying("{}");
        let err = generate_request(&provider, "list users", Some(1.5))
            .await
            .unwrap_err();
        assert!(matches!(err, AssistError::Validation(ref v) if v.field == "creativity"));
    }

    #[tokio::test]
    async fn test_provider_failure_surfaces() {
        let provider = ScriptedProvider::failing("quota exceeded");
        let err = generate_request(&provider, "list users", None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
    }
}
