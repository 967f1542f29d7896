//! HTTP router.
//!
//! `POST /analyze` (plus the legacy `POST /analyzeQuoteSheetV2` path) and
//! `GET /health`, behind a permissive CORS layer and a request body limit.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api::endpoints;
use crate::api::types::ApiContext;

/// Build the service router.
///
/// Endpoint handlers use `State<ApiContext>` (provided via `with_state`).
pub fn api_router(ctx: ApiContext) -> Router {
    let body_limit = ctx.config.max_body_bytes;

    Router::new()
        .route("/analyze", post(endpoints::analyze::analyze))
        .route("/analyzeQuoteSheetV2", post(endpoints::analyze::analyze))
        .route("/health", get(endpoints::health::check))
        .with_state(ctx)
        .layer(DefaultBodyLimit::max(body_limit))
        // Browser front-ends call the service cross-origin.
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::ServiceConfig;
    use crate::pipeline::quote::{LlmClient, MockLlmClient, QuoteError};

    const REPLY: &str = r#"Here is the mapping:
```json
{"headerRow": 0, "mapping": {
  "sku": {"col": 0, "name": "ITEM NO.", "unit": null},
  "price": {"col": 1, "name": "FOB USD", "unit": "USD"},
  "cartonLength": {"col": 2, "name": "CARTON SIZE", "unit": "cm"}, // combined
}}
```"#;

    fn ctx_with_reply(reply: &'static str) -> ApiContext {
        ApiContext::new(ServiceConfig::default()).with_llm_factory(Arc::new(move |_: &ServiceConfig| {
            Ok::<_, QuoteError>(Box::new(MockLlmClient::new(reply)) as Box<dyn LlmClient + Send + Sync>)
        }))
    }

    fn failing_ctx() -> ApiContext {
        ApiContext::new(ServiceConfig::default()).with_llm_factory(Arc::new(|_: &ServiceConfig| {
            Ok::<_, QuoteError>(Box::new(MockLlmClient::failing(503, "model overloaded")) as Box<dyn LlmClient + Send + Sync>)
        }))
    }

    fn post_json(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn sheet() -> Value {
        json!([
            ["ITEM NO.", "FOB USD", "CARTON SIZE"],
            ["PSP001", "$12.50", "119.9X50X180CM"],
            [null, null, null],
            ["", "", "n/a"]
        ])
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, json) = send(api_router(ctx_with_reply(REPLY)), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["service"], "quote-analyzer");
        assert!(json["timestamp"].is_string());
    }

    #[tokio::test]
    async fn analyze_extracts_products() {
        let req = post_json("/analyze", &json!({"rows": sheet()}));
        let (status, json) = send(api_router(ctx_with_reply(REPLY)), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["mode"], "extract");

        let products = json["products"].as_array().unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0]["sku"], "PSP001");
        assert_eq!(products[0]["unitPrice"], 12.5);
        assert_eq!(products[0]["cartonLength"], 119.9);
        assert_eq!(products[0]["cartonHeight"], 180.0);
        assert_eq!(products[0]["cartonSource"], "CARTON SIZE");
        assert_eq!(json["originalData"]["sheetName"], "Imported Data");
    }

    #[tokio::test]
    async fn legacy_path_serves_preview() {
        let req = post_json("/analyzeQuoteSheetV2", &json!({"rows": sheet(), "preview": true}));
        let (status, json) = send(api_router(ctx_with_reply(REPLY)), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["mode"], "preview");
        assert_eq!(json["sheetInfo"]["rows"], 3);
        assert_eq!(json["sheetInfo"]["cols"], 3);
        assert_eq!(json["headerRow"], 0);
        assert_eq!(json["sampleData"].as_array().unwrap().len(), 3);
        assert!(json.get("products").is_none());
    }

    #[tokio::test]
    async fn missing_input_is_400() {
        let req = post_json("/analyze", &json!({"preview": true}));
        let (status, json) = send(api_router(ctx_with_reply(REPLY)), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("rows or xlsxBase64"));
        assert!(json["timestamp"].is_string());
    }

    #[tokio::test]
    async fn malformed_body_is_400_with_error_shape() {
        let req = Request::builder()
            .method("POST")
            .uri("/analyze")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, json) = send(api_router(ctx_with_reply(REPLY)), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn collaborator_failure_is_502() {
        let req = post_json("/analyze", &json!({"rows": sheet()}));
        let (status, json) = send(api_router(failing_ctx()), req).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(json["details"], "model overloaded");
    }

    #[tokio::test]
    async fn prose_reply_is_500() {
        let req = post_json("/analyze", &json!({"rows": sheet()}));
        let (status, json) = send(api_router(ctx_with_reply("No idea, sorry.")), req).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(json["error"].as_str().unwrap().starts_with("No JSON object found"));
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let ctx = ApiContext::new(ServiceConfig {
            max_body_bytes: 64,
            ..ServiceConfig::default()
        });
        let req = post_json("/analyze", &json!({"rows": [["x".repeat(200)]]}));
        let resp = api_router(ctx).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn cors_preflight_is_allowed() {
        let req = Request::builder()
            .method("OPTIONS")
            .uri("/analyze")
            .header("origin", "https://calculator.example")
            .header("access-control-request-method", "POST")
            .body(Body::empty())
            .unwrap();
        let resp = api_router(ctx_with_reply(REPLY)).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().contains_key("access-control-allow-origin"));
    }
}
