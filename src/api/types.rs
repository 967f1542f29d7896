//! Shared state for the HTTP layer.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::config::ServiceConfig;
use crate::pipeline::quote::{LlmClient, QuoteAnalyzer, QuoteError};

/// Builds the LLM client for one request. Called on a blocking thread.
pub type LlmFactory =
    Arc<dyn Fn(&ServiceConfig) -> Result<Box<dyn LlmClient + Send + Sync>, QuoteError> + Send + Sync>;

// ═══════════════════════════════════════════════════════════
// API context, shared by every handler
// ═══════════════════════════════════════════════════════════

/// Immutable per-process context; every request builds its own analyzer.
#[derive(Clone)]
pub struct ApiContext {
    pub config: Arc<ServiceConfig>,
    llm_factory: LlmFactory,
}

impl ApiContext {
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            config: Arc::new(config),
            llm_factory: Arc::new(|cfg: &ServiceConfig| cfg.build_llm_client()),
        }
    }

    /// Swap the LLM backend, e.g. for a mock in tests.
    pub fn with_llm_factory(mut self, factory: LlmFactory) -> Self {
        self.llm_factory = factory;
        self
    }

    pub fn analyzer(&self) -> Result<QuoteAnalyzer, QuoteError> {
        let llm = (self.llm_factory)(&self.config)?;
        Ok(QuoteAnalyzer::new(llm, &self.config.model, self.config.analyzer_options()))
    }
}

// ═══════════════════════════════════════════════════════════
// Request bodies
// ═══════════════════════════════════════════════════════════

/// `POST /analyze` body. Exactly one of `rows` / `xlsxBase64` is expected.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub rows: Option<Vec<Value>>,
    #[serde(default)]
    pub xlsx_base64: Option<String>,
    #[serde(default)]
    pub preview: bool,
}
