//! Prompt flows: validated input, a prompt template, one completion and a typed JSON answer.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::{
    validate_creativity, AssistError, CompletionProvider, CompletionRequest, ValidationError,
};
use crate::code_formatter::strip_code_fence;
use crate::settings::SnippetLanguage;

/// Shortest accepted description, counted after trimming
pub const MIN_PROMPT_LEN: usize = 10;

const MOCK_API_PROMPT: &str = "You are an expert API developer who can generate mock APIs from \
OpenAPI specifications or natural language descriptions.
Generate a mock API definition for the following specification. The definition should be a valid \
OpenAPI specification or a set of instructions on how to create a mock server.
Answer with a JSON object of the form {\"mockApiDefinition\": string}.

Specification:
";

const DOCS_PROMPT: &str = "You are an expert technical writer creating API documentation. Based on \
the endpoint definition below, write a well-structured Markdown document with, where applicable: a \
title with the HTTP method and path, a description of the endpoint's purpose, path parameters, \
query parameters and headers (name, type, description), the request body schema, the possible \
response status codes, an example cURL request and an example successful response body.
Answer with a JSON object of the form {\"documentation\": string}.

Endpoint definition:
";

const SNIPPET_PROMPT: &str = "You are an expert code generation assistant. Write a concise, \
self-contained and runnable code snippet that performs the API request below.
Answer with a JSON object of the form {\"codeSnippet\": string}.
";

const TEST_CASES_PROMPT: &str = "You are an expert in API testing. Based on the API definition and \
data model below, generate a comprehensive set of test cases covering the happy path as well as \
error handling and edge cases (invalid data types, missing fields, authentication errors).
Answer with a JSON object with a single key \"testCases\": an array of objects shaped like
{\"description\": string, \"request\": {\"method\": string, \"path\": string, \"headers\"?: \
{name: value}, \"body\"?: any}, \"expectedResponse\": {\"statusCode\": number, \"body\"?: any}}.
";

#[derive(Debug, Clone, PartialEq)]
pub struct MockApiInput {
    pub prompt: String,
    pub creativity: Option<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocsInput {
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SnippetInput {
    pub prompt: String,
    pub language: SnippetLanguage,
    pub creativity: Option<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestCasesInput {
    pub api_definition: String,
    pub data_model: Option<String>,
    pub creativity: Option<f32>,
}

impl MockApiInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_min_len("prompt", &self.prompt)?;
        validate_creativity(self.creativity)
    }
}

impl DocsInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_min_len("prompt", &self.prompt)
    }
}

impl SnippetInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_min_len("prompt", &self.prompt)?;
        validate_creativity(self.creativity)
    }
}

impl TestCasesInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_min_len("apiDefinition", &self.api_definition)?;
        validate_creativity(self.creativity)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub description: String,
    pub request: TestRequest,
    pub expected_response: ExpectedResponse,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestRequest {
    pub method: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpectedResponse {
    pub status_code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MockApiOutput {
    mock_api_definition: String,
}

#[derive(Deserialize)]
struct DocsOutput {
    documentation: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnippetOutput {
    code_snippet: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TestCasesOutput {
    test_cases: Vec<TestCase>,
}

pub async fn generate_mock_api(
    provider: &dyn CompletionProvider,
    input: &MockApiInput,
) -> Result<String, AssistError> {
    input.validate()?;
    let prompt = format!("{MOCK_API_PROMPT}{}", input.prompt.trim());
    let output: MockApiOutput = run_json_flow(provider, prompt, input.creativity).await?;
    non_empty("mockApiDefinition", output.mock_api_definition)
}

pub async fn generate_docs(
    provider: &dyn CompletionProvider,
    input: &DocsInput,
) -> Result<String, AssistError> {
    input.validate()?;
    let prompt = format!("{DOCS_PROMPT}{}", input.prompt.trim());
    let output: DocsOutput = run_json_flow(provider, prompt, None).await?;
    non_empty("documentation", output.documentation)
}

pub async fn generate_snippet(
    provider: &dyn CompletionProvider,
    input: &SnippetInput,
) -> Result<String, AssistError> {
    input.validate()?;
    let prompt = format!(
        "{SNIPPET_PROMPT}\nEndpoint definition:\n{}\n\nProgramming language:\n{}",
        input.prompt.trim(),
        input.language
    );
    let output: SnippetOutput = run_json_flow(provider, prompt, input.creativity).await?;
    non_empty("codeSnippet", output.code_snippet)
}

pub async fn generate_test_cases(
    provider: &dyn CompletionProvider,
    input: &TestCasesInput,
) -> Result<Vec<TestCase>, AssistError> {
    input.validate()?;
    let mut prompt = format!(
        "{TEST_CASES_PROMPT}\nAPI definition:\n{}",
        input.api_definition.trim()
    );
    let data_model = input.data_model.as_deref().map(str::trim);
    if let Some(model) = data_model.filter(|m| !m.is_empty()) {
        prompt.push_str("\n\nData model:\n");
        prompt.push_str(model);
    }

    let output: TestCasesOutput = run_json_flow(provider, prompt, input.creativity).await?;
    Ok(output.test_cases)
}

/// Send one prompt and decode the reply as `T`.
pub(crate) async fn run_json_flow<T: DeserializeOwned>(
    provider: &dyn CompletionProvider,
    prompt: String,
    temperature: Option<f32>,
) -> Result<T, AssistError> {
    let reply = provider
        .complete(CompletionRequest {
            prompt,
            temperature,
        })
        .await?;

    serde_json::from_str(strip_code_fence(&reply)).map_err(|e| {
        log::debug!("Unexpected model output: {}", reply);
        AssistError::InvalidOutput(format!("unexpected response shape: {}", e))
    })
}

fn check_min_len(field: &'static str, text: &str) -> Result<(), ValidationError> {
    if text.trim().chars().count() < MIN_PROMPT_LEN {
        return Err(ValidationError::new(
            field,
            format!("Please enter at least {} characters.", MIN_PROMPT_LEN),
        ));
    }
    Ok(())
}

fn non_empty(field: &str, text: String) -> Result<String, AssistError> {
    if text.trim().is_empty() {
        return Err(AssistError::InvalidOutput(format!("{} is empty", field)));
    }
    Ok(text)
}
