//! `POST /analyze`: map and extract a supplier quote sheet.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use tracing::Instrument;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{AnalyzeRequest, ApiContext};
use crate::pipeline::quote::{AnalysisOutcome, SheetInput};

/// Runs the whole analysis on the blocking pool: the LLM clients use
/// blocking HTTP and the request may take as long as the model does.
pub async fn analyze(
    State(ctx): State<ApiContext>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<AnalysisOutcome>, ApiError> {
    let Json(request) = payload?;
    let input = SheetInput::from_parts(request.rows, request.xlsx_base64)?;
    let preview = request.preview;

    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("analyze_request", %request_id, preview);

    async move {
        let mode = match &input {
            SheetInput::Rows(rows) => format!("rows ({})", rows.len()),
            SheetInput::Workbook(payload) => format!("workbook ({} base64 chars)", payload.len()),
        };
        tracing::info!(%mode, "Analysis request received");

        let blocking_span = tracing::Span::current();
        let outcome = tokio::task::spawn_blocking(move || {
            let _guard = blocking_span.enter();
            ctx.analyzer()?.analyze(input, preview)
        })
        .await
        .map_err(|e| ApiError::Internal(format!("analysis task failed: {e}")))??;

        Ok::<_, ApiError>(Json(outcome))
    }
    .instrument(span)
    .await
}
