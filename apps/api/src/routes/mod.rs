pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::export::handlers::handle_export;
use crate::generation::handlers::handle_generate;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(health::root_handler))
        .route("/api/health", get(health::health_handler))
        .route("/api/templates", get(health::templates_handler))
        .route("/api/generate", post(handle_generate))
        .route("/api/export", post(handle_export))
        .layer(DefaultBodyLimit::max(upload_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read};
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::deck::SlideImage;
    use crate::imagery::{raster, ImageSource, ImageryError};
    use crate::llm_client::LlmClient;
    use crate::models::template::RgbColor;

    /// Image source that never touches the network.
    struct SolidImageSource;

    #[async_trait]
    impl ImageSource for SolidImageSource {
        async fn generate(
            &self,
            _prompt: &str,
            _template_style: &str,
        ) -> Result<SlideImage, ImageryError> {
            raster::placeholder(RgbColor(10, 20, 30), "Test")
        }
    }

    fn test_state(work_dir: &std::path::Path) -> AppState {
        state_with_llm_at(work_dir, None)
    }

    fn state_with_llm_at(work_dir: &std::path::Path, api_base: Option<String>) -> AppState {
        let mut config = Config::for_tests(work_dir.to_path_buf());
        if let Some(api_base) = api_base {
            config.gemini_api_base = api_base;
        }
        let llm = LlmClient::new(config.gemini_api_key.clone(), &config.gemini_api_base).unwrap();
        AppState::new(config, llm, Arc::new(SolidImageSource))
    }

    /// Serves a fixed `generateContent` reply (fenced JSON, as models send it) on a local port.
    async fn spawn_gemini_stub(record: Value) -> String {
        let reply = json!({
            "candidates": [{
                "content": {"parts": [{"text": format!("Here you go:\n```json\n{record}\n```")}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 120, "candidatesTokenCount": 80}
        });
        let stub = Router::new().fallback(move || {
            let reply = reply.clone();
            async move { axum::Json(reply) }
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, stub).await.unwrap();
        });
        format!("http://{addr}/v1beta/models")
    }

    async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        serde_json::from_slice(&body_bytes(response).await).unwrap()
    }

    fn export_request(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/export")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn zip_part(bytes: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut out = String::new();
        archive.by_name(name).unwrap().read_to_string(&mut out).unwrap();
        out
    }

    #[tokio::test]
    async fn test_root_and_health() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(dir.path()));

        let response = app
            .clone()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["message"], "Welcome to Slideflow API");

        let response = app
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "Slideflow API");
        assert_eq!(body["version"], "1.0.0");
        assert!(body["timestamp"].as_i64().unwrap() > 0);
    }

    #[tokio::test]
    async fn test_templates_catalogue() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(dir.path()));
        let response = app
            .oneshot(Request::get("/api/templates").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = body_json(response).await;
        let templates = body.as_array().unwrap();
        assert_eq!(templates.len(), 5);
        assert_eq!(templates[0]["id"], "corporate");
        assert_eq!(templates[0]["primary_color"], "#0F62FE");
    }

    #[tokio::test]
    async fn test_export_pptx_with_background_images() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(dir.path()));

        let response = app
            .oneshot(export_request(json!({
                "title": "Tidal Power",
                "slides": [
                    {"type": "title", "title": "Tidal Power", "subtitle": "An overview", "image_prompt": "ocean waves at dusk"},
                    {"type": "content", "title": "Benefits", "bullets": ["Predictable", "Clean"], "image_prompt": "turbines underwater"}
                ],
                "template_style": "marketing"
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/vnd.openxmlformats-officedocument.presentationml.presentation"
        );
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            r#"attachment; filename="Tidal Power.pptx""#
        );

        let bytes = body_bytes(response).await;
        let slide1 = zip_part(&bytes, "ppt/slides/slide1.xml");
        assert!(slide1.contains("Tidal Power"));
        assert!(slide1.contains("<p:pic>"));
        let slide2 = zip_part(&bytes, "ppt/slides/slide2.xml");
        assert!(slide2.contains("Predictable"));
    }

    #[tokio::test]
    async fn test_export_docx_uses_stored_record() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        let stored: crate::models::presentation::Presentation = serde_json::from_value(json!({
            "title": "Stored Deck",
            "slides": [{"type": "content", "title": "From disk", "bullets": ["kept"]}]
        }))
        .unwrap();
        let id = state.store.save(&stored).await.unwrap();
        let app = build_router(state);

        let response = app
            .oneshot(export_request(json!({
                "title": "Request Deck",
                "slides": [{"type": "content", "title": "From request"}],
                "format": "docx",
                "presentation_id": id.to_string()
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            r#"attachment; filename="Stored Deck.docx""#
        );
        let document = zip_part(&body_bytes(response).await, "word/document.xml");
        assert!(document.contains("From disk"));
        assert!(!document.contains("From request"));
    }

    #[tokio::test]
    async fn test_export_validation_errors() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(dir.path()));

        let response = app
            .clone()
            .oneshot(export_request(json!({"format": "pptx"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "VALIDATION_ERROR");

        let response = app
            .oneshot(export_request(json!({
                "title": "T",
                "slides": [{"type": "content"}],
                "format": "odp"
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    fn multipart_request(fields: &[(&str, &str)]) -> Request<Body> {
        let boundary = "slideflow-test-boundary";
        let mut body = String::new();
        for (name, value) in fields {
            body.push_str(&format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            ));
        }
        body.push_str(&format!("--{boundary}--\r\n"));
        Request::builder()
            .method("POST")
            .uri("/api/generate")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_generate_requires_prompt_or_document() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(dir.path()));

        let response = app
            .clone()
            .oneshot(multipart_request(&[("template_style", "corporate"), ("prompt", "  ")]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["message"], "Either prompt or document is required");

        let response = app
            .oneshot(multipart_request(&[("prompt", "Solar power")]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_generate_rejects_unsupported_document() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(dir.path()));

        let boundary = "b0undary";
        let body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"template_style\"\r\n\r\ncorporate\r\n\
             --{boundary}\r\nContent-Disposition: form-data; name=\"document\"; filename=\"old.doc\"\r\n\
             Content-Type: application/msword\r\n\r\nbinary\r\n--{boundary}--\r\n"
        );
        let request = Request::builder()
            .method("POST")
            .uri("/api/generate")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["message"], "Unsupported file format: .doc");
    }

    #[tokio::test]
    async fn test_generate_stores_record_and_hides_image_prompts() {
        let api_base = spawn_gemini_stub(json!({
            "title": "Tidal Energy",
            "slides": [
                {"type": "title", "title": "Tidal Energy", "subtitle": "Power from the sea", "image_prompt": "ocean waves at dawn"},
                {"type": "content", "title": "Why tides", "content": "Tides are predictable. They are dense."}
            ]
        }))
        .await;
        let dir = tempfile::tempdir().unwrap();
        let state = state_with_llm_at(dir.path(), Some(api_base));
        let store = state.store.clone();
        let app = build_router(state);

        let response = app
            .clone()
            .oneshot(multipart_request(&[
                ("template_style", "corporate"),
                ("prompt", "Tidal energy"),
                ("slide_count", "3"),
            ]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["title"], "Tidal Energy");
        let slides = body["slides"].as_array().unwrap();
        assert_eq!(slides.len(), 2);
        assert_eq!(slides[1]["bullets"], json!(["Tides are predictable.", "They are dense."]));
        assert!(slides.iter().all(|slide| slide.get("image_prompt").is_none()));

        let id: uuid::Uuid = body["presentation_id"].as_str().unwrap().parse().unwrap();
        let stored = store.load(id).await.unwrap().unwrap();
        assert_eq!(stored.slides[0].image_prompt.as_deref(), Some("ocean waves at dawn"));
        assert!(stored.slides[1]
            .image_prompt
            .as_deref()
            .unwrap()
            .contains("Why tides"));

        let response = app
            .oneshot(export_request(json!({
                "title": "Something else",
                "slides": [{"type": "content", "title": "Request slide"}],
                "format": "docx",
                "presentation_id": id.to_string()
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let document = zip_part(&body_bytes(response).await, "word/document.xml");
        assert!(document.contains("Tides are predictable."));
        assert!(!document.contains("Request slide"));
    }
}
