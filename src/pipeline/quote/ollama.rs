use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::types::LlmClient;
use super::QuoteError;

/// Build the blocking HTTP client shared by the LLM backends.
pub(crate) fn build_http_client(timeout_secs: u64) -> Result<reqwest::blocking::Client, QuoteError> {
    reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| QuoteError::HttpClient(format!("Failed to create HTTP client: {e}")))
}

/// Classify a transport failure from `send()`.
pub(crate) fn transport_error(err: reqwest::Error, endpoint: &str, timeout_secs: u64) -> QuoteError {
    if err.is_connect() {
        QuoteError::CollaboratorConnection(endpoint.to_string())
    } else if err.is_timeout() {
        QuoteError::HttpClient(format!("Request timed out after {timeout_secs}s"))
    } else {
        QuoteError::HttpClient(err.to_string())
    }
}

/// Ollama HTTP client for local mapping inference.
pub struct OllamaClient {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OllamaClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, QuoteError> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: build_http_client(timeout_secs)?,
            timeout_secs,
        })
    }

    /// Local instance on the standard port with a one-minute timeout.
    pub fn default_local() -> Result<Self, QuoteError> {
        Self::new("http://localhost:11434", 60)
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.base_url)
    }
}

/// Request body for Ollama /api/generate
#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
    /// Constrains decoding to a JSON document.
    format: &'a str,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    top_p: f32,
}

/// Response body from Ollama /api/generate
#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

impl LlmClient for OllamaClient {
    fn generate(&self, model: &str, prompt: &str, system: &str) -> Result<String, QuoteError> {
        let body = OllamaGenerateRequest {
            model,
            prompt,
            system,
            stream: false,
            format: "json",
            options: OllamaOptions {
                temperature: 0.1,
                top_p: 0.9,
            },
        };

        let response = self
            .client
            .post(self.generate_url())
            .json(&body)
            .send()
            .map_err(|e| transport_error(e, &self.base_url, self.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(QuoteError::CollaboratorStatus {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: OllamaGenerateResponse = response
            .json()
            .map_err(|e| QuoteError::ResponseParsing(e.to_string()))?;

        if parsed.response.trim().is_empty() {
            return Err(QuoteError::EmptyResponse("Ollama returned no text".into()));
        }
        Ok(parsed.response)
    }
}

/// Mock LLM client for testing. Returns a configurable response and
/// records every prompt it receives.
pub struct MockLlmClient {
    response: String,
    failure: Option<(u16, String)>,
    prompts: Mutex<Vec<String>>,
}

impl MockLlmClient {
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            failure: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Fail every call with the given upstream status.
    pub fn failing(status: u16, body: &str) -> Self {
        Self {
            failure: Some((status, body.to_string())),
            ..Self::new("")
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl LlmClient for MockLlmClient {
    fn generate(&self, _model: &str, prompt: &str, _system: &str) -> Result<String, QuoteError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        match &self.failure {
            Some((status, body)) => Err(QuoteError::CollaboratorStatus {
                status: *status,
                body: body.clone(),
            }),
            None => Ok(self.response.clone()),
        }
    }
}
