//! JSON formatting helpers for request and response bodies.
//!
//! Pure functions; nothing here touches the network.

/// Format JSON string with pretty indentation.
///
/// # Returns
/// * `Ok(String)` - Formatted JSON with 2-space indentation, keys in original order
/// * `Err(String)` - Parse error message
pub fn format_json(input: &str) -> Result<String, String> {
    if input.trim().is_empty() {
        return Err("Empty input".to_string());
    }

    let value: serde_json::Value =
        serde_json::from_str(input).map_err(|e| format!("JSON parse error: {}", e))?;

    serde_json::to_string_pretty(&value).map_err(|e| format!("JSON format error: {}", e))
}

/// Validate JSON syntax without formatting. Empty input counts as valid.
pub fn validate_json(input: &str) -> Result<(), String> {
    if input.trim().is_empty() {
        return Ok(());
    }

    serde_json::from_str::<serde_json::Value>(input)
        .map(|_| ())
        .map_err(|e| format!("Invalid JSON: {}", e))
}

/// Text shown for a response body: pretty JSON when it parses, the raw text otherwise.
pub fn display_body(raw: &str) -> String {
    format_json(raw).unwrap_or_else(|_| raw.to_string())
}

/// Strip a surrounding Markdown code fence (```` ```json ... ``` ````) if present.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. `json`) that may follow the opening fence.
    let info_len = body
        .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '.')))
        .unwrap_or(body.len());
    let after_info = &body[info_len..];
    let has_info = info_len > 0 && after_info.starts_with(char::is_whitespace);
    if has_info && !after_info.trim().is_empty() {
        after_info.trim()
    } else {
        body.trim()
    }
}
