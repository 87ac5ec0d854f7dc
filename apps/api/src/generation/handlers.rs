//! Axum route handler for the Generation API.

use axum::{
    extract::{Multipart, State},
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::documents::{extract_text, DocumentError};
use crate::errors::AppError;
use crate::generation::generator::{clamp_slide_count, generate_presentation, GenerationInput};
use crate::models::presentation::Presentation;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

/// An uploaded file part.
#[derive(Debug)]
pub struct UploadedDocument {
    pub file_name: String,
    pub bytes: Bytes,
}

/// The multipart form of `POST /api/generate`, after field parsing.
#[derive(Debug, Default)]
pub struct GenerateForm {
    pub template_style: Option<String>,
    pub prompt: Option<String>,
    pub document: Option<UploadedDocument>,
    pub slide_count: Option<i64>,
}

/// The generated record as returned to clients: image prompts removed, id added.
#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    #[serde(flatten)]
    pub presentation: Presentation,
    pub presentation_id: Uuid,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/generate
///
/// Multipart fields: `template_style` (required), `prompt`, `document` (PDF/DOCX/TXT),
/// `slide_count`. Generates slide content, stores the full record and returns it
/// without image prompts.
pub async fn handle_generate(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<GenerateResponse>, AppError> {
    let form = read_generate_form(multipart).await?;

    let template_style = form
        .template_style
        .ok_or_else(|| AppError::Validation("template_style is required".to_string()))?;
    if form.prompt.is_none() && form.document.is_none() {
        return Err(AppError::Validation(
            "Either prompt or document is required".to_string(),
        ));
    }

    let document_text = match form.document {
        Some(document) => Some(extract_document(document).await?),
        None => None,
    };
    if form.prompt.is_none() && document_text.as_deref().map_or(true, str::is_empty) {
        return Err(AppError::Validation(
            "The uploaded document contains no text".to_string(),
        ));
    }

    let input = GenerationInput {
        prompt: form.prompt,
        document_text: document_text.filter(|t| !t.is_empty()),
        template_style,
        slide_count: clamp_slide_count(form.slide_count),
    };
    let presentation = generate_presentation(&state.llm, &input).await?;

    let presentation_id = state
        .store
        .save(&presentation)
        .await
        .map_err(AppError::Internal)?;

    Ok(Json(GenerateResponse {
        presentation: presentation.without_image_prompts(),
        presentation_id,
    }))
}

/// Reads the known form fields; unknown fields are ignored and blank text fields count as absent.
pub async fn read_generate_form(mut multipart: Multipart) -> Result<GenerateForm, AppError> {
    let mut form = GenerateForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "template_style" | "prompt" | "slide_count" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Invalid field {name}: {e}")))?;
                let value = value.trim();
                if value.is_empty() {
                    continue;
                }
                match name.as_str() {
                    "template_style" => form.template_style = Some(value.to_string()),
                    "prompt" => form.prompt = Some(value.to_string()),
                    _ => {
                        form.slide_count = Some(value.parse().map_err(|_| {
                            AppError::Validation(format!(
                                "slide_count must be an integer, got '{value}'"
                            ))
                        })?)
                    }
                }
            }
            "document" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Invalid document upload: {e}")))?;
                // browsers send an empty part when no file is chosen
                if file_name.is_empty() && bytes.is_empty() {
                    continue;
                }
                form.document = Some(UploadedDocument { file_name, bytes });
            }
            _ => {}
        }
    }

    Ok(form)
}

async fn extract_document(document: UploadedDocument) -> Result<String, AppError> {
    info!(
        "Extracting text from '{}' ({} bytes)",
        document.file_name,
        document.bytes.len()
    );
    let UploadedDocument { file_name, bytes } = document;
    tokio::task::spawn_blocking(move || extract_text(&file_name, &bytes))
        .await
        .map_err(|e| AppError::Internal(e.into()))?
        .map_err(|e| match e {
            DocumentError::Unsupported(_) => AppError::Validation(e.to_string()),
            other => AppError::UnprocessableEntity(format!("Failed to process document: {other}")),
        })
}
