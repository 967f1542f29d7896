use serde::Serialize;
use serde_json::Value;

use super::decode::{decode_base64_payload, CalamineDecoder};
use super::extract::extract_products;
use super::grid::Grid;
use super::mapping::interpret_mapping_response;
use super::parser::parse_mapping_response;
use super::prompt::{build_mapping_prompt, MAPPING_SYSTEM_PROMPT};
use super::types::{LlmClient, Mapping, MappingResponse, ProductRecord, SheetData, SpreadsheetDecoder};
use super::QuoteError;

/// Sheet name reported for the rows input shape.
pub const IMPORTED_SHEET_NAME: &str = "Imported Data";

/// Leading rows echoed back in a preview.
pub const SAMPLE_ROWS: usize = 5;

/// Pipeline stages, recorded on tracing events as `stage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisStage {
    AwaitingInput,
    GridReady,
    MappingRequested,
    MappingParsed,
    MappingNormalized,
    PreviewReady,
    ExtractionReady,
}

impl AnalysisStage {
    pub fn as_str(self) -> &'static str {
        match self {
            AnalysisStage::AwaitingInput => "awaiting_input",
            AnalysisStage::GridReady => "grid_ready",
            AnalysisStage::MappingRequested => "mapping_requested",
            AnalysisStage::MappingParsed => "mapping_parsed",
            AnalysisStage::MappingNormalized => "mapping_normalized",
            AnalysisStage::PreviewReady => "preview_ready",
            AnalysisStage::ExtractionReady => "extraction_ready",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalyzerOptions {
    /// Rows shown to the mapping collaborator.
    pub preview_rows: usize,
    /// Header rows beyond this are treated as hallucinated and reset to 0.
    pub max_header_row: i64,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            preview_rows: 25,
            max_header_row: 20,
        }
    }
}

/// The two accepted request shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum SheetInput {
    Rows(Vec<Value>),
    Workbook(String),
}

impl SheetInput {
    /// Exactly one of `rows` / `xlsxBase64` must be supplied; a blank
    /// base64 string counts as absent.
    pub fn from_parts(rows: Option<Vec<Value>>, xlsx_base64: Option<String>) -> Result<Self, QuoteError> {
        let xlsx_base64 = xlsx_base64.filter(|s| !s.trim().is_empty());
        match (rows, xlsx_base64) {
            (Some(rows), None) => Ok(SheetInput::Rows(rows)),
            (None, Some(payload)) => Ok(SheetInput::Workbook(payload)),
            _ => Err(QuoteError::MissingInput),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetInfo {
    pub name: String,
    pub rows: usize,
    pub cols: usize,
    pub headers: Vec<String>,
}

/// Mapping proposal for user confirmation; no extraction performed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewReport {
    pub success: bool,
    pub mode: &'static str,
    pub sheet_info: SheetInfo,
    pub mapping: Mapping,
    pub header_row: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub sample_data: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginalData {
    pub sheet_name: String,
    pub headers: Vec<String>,
    /// Header row as the model reported it, before clamping.
    pub header_row: i64,
    pub raw_data: Grid,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionReport {
    pub success: bool,
    pub mode: &'static str,
    pub products: Vec<ProductRecord>,
    pub mapping: Mapping,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    pub original_data: OriginalData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnalysisOutcome {
    Preview(PreviewReport),
    Extraction(ExtractionReport),
}

impl AnalysisOutcome {
    pub fn stage(&self) -> AnalysisStage {
        match self {
            AnalysisOutcome::Preview(_) => AnalysisStage::PreviewReady,
            AnalysisOutcome::Extraction(_) => AnalysisStage::ExtractionReady,
        }
    }
}

/// Reset a header row the model placed implausibly far down (or negative) to 0.
pub fn clamp_header_row(header_row: i64, max_header_row: i64) -> usize {
    if header_row < 0 || header_row > max_header_row {
        0
    } else {
        usize::try_from(header_row).unwrap_or(0)
    }
}

/// Runs one analysis request end to end:
/// input → grid → prompt → LLM → repair → normalize → preview | extract
pub struct QuoteAnalyzer {
    llm: Box<dyn LlmClient + Send + Sync>,
    decoder: Box<dyn SpreadsheetDecoder + Send + Sync>,
    model_name: String,
    options: AnalyzerOptions,
}

impl QuoteAnalyzer {
    pub fn new(llm: Box<dyn LlmClient + Send + Sync>, model_name: &str, options: AnalyzerOptions) -> Self {
        Self {
            llm,
            decoder: Box::new(CalamineDecoder),
            model_name: model_name.to_string(),
            options,
        }
    }

    pub fn with_decoder(mut self, decoder: Box<dyn SpreadsheetDecoder + Send + Sync>) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn analyze(&self, input: SheetInput, preview: bool) -> Result<AnalysisOutcome, QuoteError> {
        let _span = tracing::info_span!("analyze_sheet", model = %self.model_name, preview).entered();
        tracing::debug!(stage = AnalysisStage::AwaitingInput.as_str(), "Analysis started");

        let sheet = self.load_sheet(input)?;
        tracing::info!(
            stage = AnalysisStage::GridReady.as_str(),
            sheet = %sheet.sheet_name,
            rows = sheet.row_count(),
            cols = sheet.col_count(),
            "Sheet loaded"
        );

        let response = self.request_mapping(&sheet)?;

        let outcome = if preview {
            AnalysisOutcome::Preview(self.build_preview(sheet, response))
        } else {
            AnalysisOutcome::Extraction(self.build_extraction(sheet, response))
        };
        tracing::info!(stage = outcome.stage().as_str(), "Analysis complete");
        Ok(outcome)
    }

    fn load_sheet(&self, input: SheetInput) -> Result<SheetData, QuoteError> {
        match input {
            SheetInput::Rows(rows) => Ok(SheetData::new(IMPORTED_SHEET_NAME, Grid::from_json_rows(&rows))),
            SheetInput::Workbook(payload) => {
                let bytes = decode_base64_payload(&payload)?;
                tracing::debug!(bytes = bytes.len(), "Decoding workbook");
                let decoded = self.decoder.decode(&bytes)?;
                Ok(SheetData::new(&decoded.name, Grid::from_string_rows(decoded.rows)))
            }
        }
    }

    fn request_mapping(&self, sheet: &SheetData) -> Result<MappingResponse, QuoteError> {
        let preview = sheet.grid.head(self.options.preview_rows);
        let prompt = build_mapping_prompt(preview);
        tracing::info!(
            stage = AnalysisStage::MappingRequested.as_str(),
            preview_rows = preview.len(),
            prompt_chars = prompt.len(),
            "Requesting column mapping"
        );

        let raw = self.llm.generate(&self.model_name, &prompt, MAPPING_SYSTEM_PROMPT)?;
        tracing::debug!(chars = raw.len(), "Mapping response received");

        let parsed = parse_mapping_response(&raw).inspect_err(|e| {
            tracing::warn!(error = %e, "Mapping response could not be parsed");
        })?;
        tracing::debug!(stage = AnalysisStage::MappingParsed.as_str(), "Mapping response parsed");

        let response = interpret_mapping_response(&parsed);
        tracing::info!(
            stage = AnalysisStage::MappingNormalized.as_str(),
            header_row = response.header_row,
            located = response.mapping.located_count(),
            confidence = ?response.confidence,
            "Mapping normalized"
        );
        Ok(response)
    }

    fn build_preview(&self, sheet: SheetData, response: MappingResponse) -> PreviewReport {
        PreviewReport {
            success: true,
            mode: "preview",
            sheet_info: SheetInfo {
                headers: sheet.headers(),
                rows: sheet.row_count(),
                cols: sheet.col_count(),
                name: sheet.sheet_name,
            },
            sample_data: sheet.grid.head(SAMPLE_ROWS).to_vec(),
            mapping: response.mapping,
            header_row: response.header_row,
            confidence: response.confidence,
            notes: response.notes,
        }
    }

    fn build_extraction(&self, sheet: SheetData, response: MappingResponse) -> ExtractionReport {
        let header_row = clamp_header_row(response.header_row, self.options.max_header_row);
        if header_row as i64 != response.header_row {
            tracing::warn!(
                reported = response.header_row,
                max = self.options.max_header_row,
                "Implausible header row, extracting from row 1"
            );
        }

        let products = extract_products(&sheet.grid, &response.mapping, header_row);

        ExtractionReport {
            success: true,
            mode: "extract",
            products,
            mapping: response.mapping,
            confidence: response.confidence,
            original_data: OriginalData {
                headers: sheet.headers(),
                sheet_name: sheet.sheet_name,
                header_row: response.header_row,
                raw_data: sheet.grid,
            },
        }
    }
}
