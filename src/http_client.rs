use anyhow::Result;
use std::collections::BTreeMap;
use std::time::Instant;

use crate::code_formatter::display_body;
use crate::settings::Settings;
use crate::types::{ResolvedRequest, ResponseData, ResponseOutcome};

/// Sends resolved requests and normalizes whatever happens into a `ResponseOutcome`
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    /// Build a client honoring the timeout and certificate settings
    pub fn new(settings: &Settings) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .danger_accept_invalid_certs(!settings.ssl_verification);

        if let Some(timeout) = settings.request_timeout() {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

    /// Send one request. Never fails: transport errors become a `Failure` outcome.
    ///
    /// Only the total time from issuing the call to finishing the body read is measured.
    pub async fn send(&self, request: &ResolvedRequest) -> ResponseOutcome {
        let start = Instant::now();
        log::debug!("Sending {} {}", request.method, request.url);

        match self.execute(request).await {
            Ok((status, status_text, headers, raw_body)) => {
                let elapsed_ms = start.elapsed().as_millis() as u64;
                log::info!(
                    "{} {} -> {} in {}ms",
                    request.method,
                    request.url,
                    status,
                    elapsed_ms
                );

                ResponseOutcome::Success(ResponseData {
                    status,
                    status_text,
                    elapsed_ms,
                    size_bytes: raw_body.len() as u64,
                    headers,
                    body_text: display_body(&raw_body),
                })
            }
            Err(e) => {
                let elapsed_ms = start.elapsed().as_millis() as u64;
                let message = error_message(&e);
                log::error!("Request failed: {}", message);
                ResponseOutcome::Failure(ResponseData::client_error(&message, elapsed_ms))
            }
        }
    }

    async fn execute(
        &self,
        request: &ResolvedRequest,
    ) -> reqwest::Result<(u16, String, BTreeMap<String, String>, String)> {
        let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
            .unwrap_or(reqwest::Method::GET);

        let mut req = self.client.request(method, request.url.as_str());
        for (key, value) in &request.headers {
            req = req.header(key.as_str(), value.as_str());
        }
        if request.method.allows_body() {
            if let Some(body) = &request.body {
                req = req.body(body.clone());
            }
        }

        let response = req.send().await?;

        let status = response.status();
        let status_text = status.canonical_reason().unwrap_or_default().to_string();

        let mut headers: BTreeMap<String, String> = BTreeMap::new();
        for (key, value) in response.headers() {
            let value = String::from_utf8_lossy(value.as_bytes()).to_string();
            headers
                .entry(key.to_string())
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(&value);
                })
                .or_insert(value);
        }

        let body = response.text().await?;
        Ok((status.as_u16(), status_text, headers, body))
    }
}

/// Error text including the underlying causes, e.g. `error sending request: connection refused`.
fn error_message(error: &(dyn std::error::Error + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !message.contains(&cause_text) {
            message.push_str(": ");
            message.push_str(&cause_text);
        }
        source = cause.source();
    }
    message
}
