// Export pipeline: resolves the record and style for a request, then writes PPTX, DOCX
// or PDF bytes. The HTTP surface lives in handlers.rs.

pub mod docx;
pub mod handlers;
pub mod pdf;
pub mod request;

use tracing::{debug, info, warn};

use crate::deck::{self, placement::ImagePlacement};
use crate::errors::AppError;
use crate::export::request::ExportRequest;
use crate::imagery::render_slide_images;
use crate::models::presentation::Presentation;
use crate::models::template::{StyleSpec, TemplateStyle};
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Pptx,
    Docx,
    Pdf,
}

impl ExportFormat {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "pptx" => Some(ExportFormat::Pptx),
            "docx" => Some(ExportFormat::Docx),
            "pdf" => Some(ExportFormat::Pdf),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Pptx => "pptx",
            ExportFormat::Docx => "docx",
            ExportFormat::Pdf => "pdf",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Pptx => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            }
            ExportFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            ExportFormat::Pdf => "application/pdf",
        }
    }
}

/// A finished export, ready to be sent as an attachment.
#[derive(Debug)]
pub struct ExportedFile {
    pub format: ExportFormat,
    pub title: String,
    pub bytes: Vec<u8>,
}

/// Runs the whole export for one request.
pub async fn export_presentation(
    state: &AppState,
    request: &ExportRequest,
) -> Result<ExportedFile, AppError> {
    let mut presentation = request.content()?;
    let format = request.format()?;
    let placement = request.image_placement()?;
    let template_style = request.template_style();

    if let Some(id) = request.presentation_id() {
        match state.store.load(id).await {
            Ok(Some(stored)) => {
                info!("Using stored record for presentation {}", id);
                presentation = stored;
            }
            Ok(None) => warn!("No stored record for presentation {}; using request content", id),
            Err(e) => warn!("Failed to load presentation {}: {:#}; using request content", id, e),
        }
    }

    let style = resolve_style(&template_style, request);
    info!(
        "Exporting '{}' as {} ({} slides, {} style, placement {:?})",
        presentation.display_title(),
        format.extension(),
        presentation.slides.len(),
        template_style,
        placement
    );

    let bytes = match format {
        ExportFormat::Pptx => {
            build_pptx(state, presentation.clone(), style, &template_style, placement).await?
        }
        ExportFormat::Docx => {
            let record = presentation.clone();
            tokio::task::spawn_blocking(move || docx::render_docx(&record, &style))
                .await
                .map_err(|e| AppError::Internal(e.into()))?
                .map_err(|e| AppError::Export(e.to_string()))?
        }
        ExportFormat::Pdf => {
            let pptx =
                build_pptx(state, presentation.clone(), style, &template_style, placement).await?;
            state
                .pdf
                .convert_pptx(&pptx)
                .await
                .map_err(|e| AppError::Export(e.to_string()))?
        }
    };

    Ok(ExportedFile {
        format,
        title: presentation.display_title().to_string(),
        bytes,
    })
}

/// Template style (unknown names fall back to corporate) with the request's overrides.
pub fn resolve_style(template_style: &str, request: &ExportRequest) -> StyleSpec {
    let base = TemplateStyle::from_name(template_style).unwrap_or_else(|| {
        warn!("Unknown template style '{}', using corporate", template_style);
        TemplateStyle::Corporate
    });
    let overrides = request.style_overrides();
    if !overrides.is_empty() {
        debug!("Applying style overrides: {:?}", overrides);
    }
    base.spec().with_overrides(&overrides)
}

async fn build_pptx(
    state: &AppState,
    presentation: Presentation,
    style: StyleSpec,
    template_style: &str,
    placement: ImagePlacement,
) -> Result<Vec<u8>, AppError> {
    let images = render_slide_images(
        &state.images,
        &presentation,
        template_style,
        placement,
        state.config.image_concurrency,
    )
    .await;

    tokio::task::spawn_blocking(move || {
        deck::render_pptx(&presentation, &style, placement, &images)
    })
    .await
    .map_err(|e| AppError::Internal(e.into()))?
    .map_err(|e| AppError::Export(e.to_string()))
}
