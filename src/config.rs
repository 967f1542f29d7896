//! Service configuration read from the environment.
//!
//! Every knob has a default so the binary starts with no environment at all;
//! only the LLM credentials normally need setting.

use std::net::SocketAddr;

use thiserror::Error;

use crate::pipeline::quote::{
    AnalyzerOptions, GeminiAuth, GeminiClient, LlmClient, OllamaClient, QuoteError,
    DEFAULT_GEMINI_ENDPOINT,
};

/// Application-level constants
pub const APP_NAME: &str = "quotesheet";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Service name reported by the health endpoint.
pub const SERVICE_NAME: &str = "quote-analyzer";

/// Filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> String {
    format!("info,{}=info,tower_http=warn", env!("CARGO_CRATE_NAME"))
}

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got '{value}'")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error("Unknown LLM backend '{0}' (expected 'gemini' or 'ollama')")]
    UnknownBackend(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmBackend {
    Gemini,
    Ollama,
}

impl LlmBackend {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gemini" | "vertex" => Ok(LlmBackend::Gemini),
            "ollama" => Ok(LlmBackend::Ollama),
            _ => Err(ConfigError::UnknownBackend(value.to_string())),
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            LlmBackend::Gemini => "gemini-2.0-flash",
            LlmBackend::Ollama => "llama3.1",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub bind_addr: SocketAddr,
    pub backend: LlmBackend,
    pub model: String,
    pub gemini_endpoint: String,
    pub gemini_auth: GeminiAuth,
    pub ollama_url: String,
    pub llm_timeout_secs: u64,
    pub preview_rows: usize,
    pub max_header_row: i64,
    pub max_body_bytes: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            backend: LlmBackend::Gemini,
            model: LlmBackend::Gemini.default_model().to_string(),
            gemini_endpoint: DEFAULT_GEMINI_ENDPOINT.to_string(),
            gemini_auth: GeminiAuth::None,
            ollama_url: "http://localhost:11434".to_string(),
            llm_timeout_secs: 60,
            preview_rows: AnalyzerOptions::default().preview_rows,
            max_header_row: AnalyzerOptions::default().max_header_row,
            max_body_bytes: 20 * 1024 * 1024,
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Loading
// ═══════════════════════════════════════════════════════════

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let backend = match get("QUOTESHEET_LLM_BACKEND") {
            Some(v) => LlmBackend::parse(&v)?,
            None => defaults.backend,
        };

        // An API key wins over a bearer token when both are present.
        let gemini_auth = match (get("GEMINI_API_KEY"), get("QUOTESHEET_BEARER_TOKEN")) {
            (Some(key), _) => GeminiAuth::ApiKey(key),
            (None, Some(token)) => GeminiAuth::Bearer(token),
            (None, None) => GeminiAuth::None,
        };

        Ok(Self {
            bind_addr: parse_var(get("QUOTESHEET_BIND"), "QUOTESHEET_BIND", "a socket address", defaults.bind_addr)?,
            backend,
            model: get("QUOTESHEET_MODEL").unwrap_or_else(|| backend.default_model().to_string()),
            gemini_endpoint: get("QUOTESHEET_GEMINI_ENDPOINT").unwrap_or(defaults.gemini_endpoint),
            gemini_auth,
            ollama_url: get("QUOTESHEET_OLLAMA_URL").unwrap_or(defaults.ollama_url),
            llm_timeout_secs: parse_var(
                get("QUOTESHEET_LLM_TIMEOUT_SECS"),
                "QUOTESHEET_LLM_TIMEOUT_SECS",
                "a whole number of seconds",
                defaults.llm_timeout_secs,
            )?,
            preview_rows: parse_var(
                get("QUOTESHEET_PREVIEW_ROWS"),
                "QUOTESHEET_PREVIEW_ROWS",
                "a positive integer",
                defaults.preview_rows,
            )?,
            max_header_row: parse_var(
                get("QUOTESHEET_MAX_HEADER_ROW"),
                "QUOTESHEET_MAX_HEADER_ROW",
                "a non-negative integer",
                defaults.max_header_row,
            )?,
            max_body_bytes: parse_var(
                get("QUOTESHEET_MAX_BODY_BYTES"),
                "QUOTESHEET_MAX_BODY_BYTES",
                "a byte count",
                defaults.max_body_bytes,
            )?,
        })
        .and_then(Self::validated)
    }

    fn validated(self) -> Result<Self, ConfigError> {
        if self.preview_rows == 0 {
            return Err(ConfigError::Invalid {
                var: "QUOTESHEET_PREVIEW_ROWS",
                expected: "a positive integer",
                value: "0".into(),
            });
        }
        if self.max_header_row < 0 {
            return Err(ConfigError::Invalid {
                var: "QUOTESHEET_MAX_HEADER_ROW",
                expected: "a non-negative integer",
                value: self.max_header_row.to_string(),
            });
        }
        Ok(self)
    }

    pub fn analyzer_options(&self) -> AnalyzerOptions {
        AnalyzerOptions {
            preview_rows: self.preview_rows,
            max_header_row: self.max_header_row,
        }
    }

    /// Build the configured LLM client. Blocking clients must be created
    /// outside the async runtime, so call this from a blocking task.
    pub fn build_llm_client(&self) -> Result<Box<dyn LlmClient + Send + Sync>, QuoteError> {
        match self.backend {
            LlmBackend::Gemini => Ok(Box::new(GeminiClient::new(
                &self.gemini_endpoint,
                self.gemini_auth.clone(),
                self.llm_timeout_secs,
            )?)),
            LlmBackend::Ollama => Ok(Box::new(OllamaClient::new(&self.ollama_url, self.llm_timeout_secs)?)),
        }
    }
}

fn parse_var<T: std::str::FromStr>(
    raw: Option<String>,
    var: &'static str,
    expected: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid { var, expected, value }),
    }
}
