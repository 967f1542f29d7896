use serde::{Deserialize, Serialize};

use super::ollama::{build_http_client, transport_error};
use super::types::LlmClient;
use super::QuoteError;

/// Public Generative Language API. A Vertex AI publisher base
/// (`https://{region}-aiplatform.googleapis.com/v1/projects/{p}/locations/{region}/publishers/google`)
/// works the same way with a bearer token.
pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

const MAX_OUTPUT_TOKENS: u32 = 8192;

/// How requests are authenticated. Credentials are opaque; acquiring or
/// refreshing them is the caller's job.
#[derive(Clone, PartialEq, Eq)]
pub enum GeminiAuth {
    ApiKey(String),
    Bearer(String),
    None,
}

impl std::fmt::Debug for GeminiAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeminiAuth::ApiKey(_) => f.write_str("ApiKey(<redacted>)"),
            GeminiAuth::Bearer(_) => f.write_str("Bearer(<redacted>)"),
            GeminiAuth::None => f.write_str("None"),
        }
    }
}

/// Gemini `generateContent` client.
pub struct GeminiClient {
    endpoint: String,
    auth: GeminiAuth,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl GeminiClient {
    pub fn new(endpoint: &str, auth: GeminiAuth, timeout_secs: u64) -> Result<Self, QuoteError> {
        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            auth,
            client: build_http_client(timeout_secs)?,
            timeout_secs,
        })
    }

    fn generate_url(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, model)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    system_instruction: SystemInstruction<'a>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<TextPart<'a>>,
}

#[derive(Serialize)]
struct SystemInstruction<'a> {
    parts: Vec<TextPart<'a>>,
}

#[derive(Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    max_output_tokens: u32,
    response_mime_type: &'static str,
}

impl<'a> GenerateContentRequest<'a> {
    fn new(prompt: &'a str, system: &'a str) -> Self {
        Self {
            contents: vec![Content {
                role: "user",
                parts: vec![TextPart { text: prompt }],
            }],
            system_instruction: SystemInstruction {
                parts: vec![TextPart { text: system }],
            },
            generation_config: GenerationConfig {
                temperature: 0.1,
                top_p: 0.9,
                max_output_tokens: MAX_OUTPUT_TOKENS,
                response_mime_type: "application/json",
            },
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// Pull the answer text out of the envelope, skipping thought parts.
fn first_text(response: GenerateContentResponse) -> Result<String, QuoteError> {
    let mut finish_reason = None;
    for candidate in response.candidates {
        finish_reason = finish_reason.or(candidate.finish_reason);
        let text = candidate
            .content
            .into_iter()
            .flat_map(|c| c.parts)
            .filter(|p| !p.thought)
            .find_map(|p| p.text.filter(|t| !t.trim().is_empty()));
        if let Some(text) = text {
            return Ok(text);
        }
    }

    let reason = response
        .prompt_feedback
        .and_then(|f| f.block_reason)
        .or(finish_reason)
        .unwrap_or_else(|| "unknown".into());
    Err(QuoteError::EmptyResponse(format!(
        "no candidate text, possibly blocked by safety filters (reason: {reason})"
    )))
}

impl LlmClient for GeminiClient {
    fn generate(&self, model: &str, prompt: &str, system: &str) -> Result<String, QuoteError> {
        let mut request = self
            .client
            .post(self.generate_url(model))
            .json(&GenerateContentRequest::new(prompt, system));
        request = match &self.auth {
            GeminiAuth::ApiKey(key) => request.header("x-goog-api-key", key),
            GeminiAuth::Bearer(token) => request.bearer_auth(token),
            GeminiAuth::None => request,
        };

        let response = request
            .send()
            .map_err(|e| transport_error(e, &self.endpoint, self.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(QuoteError::CollaboratorStatus {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateContentResponse = response
            .json()
            .map_err(|e| QuoteError::ResponseParsing(e.to_string()))?;

        let text = first_text(parsed)?;
        tracing::debug!(model, chars = text.len(), "Gemini response received");
        Ok(text)
    }
}
