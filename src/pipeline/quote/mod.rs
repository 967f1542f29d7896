pub mod types;
pub mod grid;
pub mod parser;
pub mod mapping;
pub mod numeric;
pub mod heuristics;
pub mod extract;
pub mod accept;
pub mod prompt;
pub mod decode;
pub mod gemini;
pub mod ollama;
pub mod orchestrator;

pub use types::*;
pub use grid::*;
pub use parser::*;
pub use mapping::*;
pub use extract::*;
pub use accept::*;
pub use prompt::*;
pub use decode::*;
pub use gemini::*;
pub use ollama::*;
pub use orchestrator::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum QuoteError {
    #[error("Missing rows or xlsxBase64 in request body (exactly one is required)")]
    MissingInput,

    #[error("Spreadsheet could not be decoded: {0}")]
    DecodeFailure(String),

    #[error("Mapping service is not reachable at {0}")]
    CollaboratorConnection(String),

    #[error("Mapping service returned error (status {status}): {body}")]
    CollaboratorStatus { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Mapping service returned an empty response: {0}")]
    EmptyResponse(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("No JSON object found in AI response. Text: {0}")]
    NoJsonFound(String),

    #[error("AI returned malformed JSON: {message}")]
    MalformedAiResponse { message: String, excerpt: String },
}

/// Coarse classification used by the API layer for status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteErrorKind {
    MissingInput,
    DecodeFailure,
    CollaboratorFailure,
    NoJsonFound,
    MalformedAiResponse,
}

impl QuoteError {
    pub fn kind(&self) -> QuoteErrorKind {
        match self {
            QuoteError::MissingInput => QuoteErrorKind::MissingInput,
            QuoteError::DecodeFailure(_) => QuoteErrorKind::DecodeFailure,
            QuoteError::CollaboratorConnection(_)
            | QuoteError::CollaboratorStatus { .. }
            | QuoteError::HttpClient(_)
            | QuoteError::EmptyResponse(_)
            | QuoteError::ResponseParsing(_) => QuoteErrorKind::CollaboratorFailure,
            QuoteError::NoJsonFound(_) => QuoteErrorKind::NoJsonFound,
            QuoteError::MalformedAiResponse { .. } => QuoteErrorKind::MalformedAiResponse,
        }
    }

    /// Diagnostic text that is useful to a caller but too noisy for the message.
    pub fn details(&self) -> Option<String> {
        match self {
            QuoteError::MalformedAiResponse { excerpt, .. } if !excerpt.is_empty() => {
                Some(format!("Malformed JSON near: {excerpt}"))
            }
            QuoteError::CollaboratorStatus { body, .. } if !body.is_empty() => Some(body.clone()),
            _ => None,
        }
    }
}
