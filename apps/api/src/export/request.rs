//! The `POST /api/export` body and its resolution into export options.

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::warn;
use uuid::Uuid;

use crate::deck::placement::ImagePlacement;
use crate::errors::AppError;
use crate::export::ExportFormat;
use crate::models::presentation::{Presentation, SlideRecord};
use crate::models::template::StyleOverrides;

/// Export request. Two content shapes are accepted: `title` + `slides` at the root, or a
/// whole record under `contentData`. Style override keys stay in `rest`.
#[derive(Debug, Default, Deserialize)]
pub struct ExportRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub slides: Option<Vec<SlideRecord>>,
    #[serde(default, rename = "contentData")]
    pub content_data: Option<Presentation>,
    #[serde(default)]
    pub template_style: Option<String>,
    #[serde(default, rename = "templateStyle")]
    pub template_style_camel: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub presentation_id: Option<String>,
    #[serde(default, rename = "backgroundImages")]
    pub background_images: Option<bool>,
    #[serde(default, rename = "imagePlacement")]
    pub image_placement: Option<String>,
    #[serde(default, rename = "templateDetails")]
    pub template_details: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl ExportRequest {
    /// The record carried by the request itself.
    pub fn content(&self) -> Result<Presentation, AppError> {
        let title = self.title.as_deref().map(str::trim).filter(|t| !t.is_empty());
        let slides = self.slides.as_ref().filter(|s| !s.is_empty());

        if let (Some(title), Some(slides)) = (title, slides) {
            return Ok(Presentation {
                title: Some(title.to_string()),
                slides: slides.clone(),
                ..Default::default()
            });
        }

        self.content_data
            .clone()
            .filter(|c| c.title.is_some() || !c.slides.is_empty())
            .ok_or_else(|| {
                AppError::Validation(
                    "Content data is required (either as contentData or title+slides)".to_string(),
                )
            })
    }

    pub fn template_style(&self) -> String {
        self.template_style
            .as_deref()
            .or(self.template_style_camel.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("corporate")
            .to_string()
    }

    pub fn format(&self) -> Result<ExportFormat, AppError> {
        match self.format.as_deref() {
            None => Ok(ExportFormat::Pptx),
            Some(raw) => ExportFormat::from_name(raw).ok_or_else(|| {
                AppError::Validation(format!(
                    "Unsupported export format '{raw}'. Use pptx, docx or pdf"
                ))
            }),
        }
    }

    /// Placement after the legacy `backgroundImages` flag (default true) is applied.
    pub fn image_placement(&self) -> Result<ImagePlacement, AppError> {
        let placement = match self.image_placement.as_deref().map(str::trim) {
            None | Some("") => ImagePlacement::default(),
            Some(raw) => match raw.to_ascii_lowercase().as_str() {
                "background" => ImagePlacement::Background,
                "side" => ImagePlacement::Side,
                "none" => ImagePlacement::None,
                _ => {
                    return Err(AppError::Validation(format!(
                        "Unsupported imagePlacement '{raw}'. Use background, side or none"
                    )))
                }
            },
        };
        Ok(placement.with_legacy_background_flag(self.background_images.unwrap_or(true)))
    }

    /// The stored-record id, when it is a well-formed UUID.
    pub fn presentation_id(&self) -> Option<Uuid> {
        let raw = self.presentation_id.as_deref()?.trim();
        if raw.is_empty() {
            return None;
        }
        match Uuid::parse_str(raw) {
            Ok(id) => Some(id),
            Err(_) => {
                warn!("Ignoring malformed presentation_id '{}'", raw);
                None
            }
        }
    }

    pub fn style_overrides(&self) -> StyleOverrides {
        StyleOverrides::from_request(&self.rest, self.template_details.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::template::RgbColor;
    use serde_json::json;

    fn request(value: Value) -> ExportRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_root_title_and_slides_win() {
        let req = request(json!({
            "title": "Root",
            "slides": [{"type": "content", "title": "A"}],
            "contentData": {"title": "Nested", "slides": []}
        }));
        let content = req.content().unwrap();
        assert_eq!(content.title.as_deref(), Some("Root"));
        assert_eq!(content.slides.len(), 1);
    }

    #[test]
    fn test_content_data_fallback() {
        let req = request(json!({
            "title": "Root only",
            "contentData": {"title": "Nested", "description": "d", "slides": [{"type": "title"}]}
        }));
        let content = req.content().unwrap();
        assert_eq!(content.title.as_deref(), Some("Nested"));
        assert_eq!(content.description.as_deref(), Some("d"));
    }

    #[test]
    fn test_missing_content_is_rejected() {
        assert!(matches!(
            request(json!({"format": "pptx"})).content(),
            Err(AppError::Validation(_))
        ));
        assert!(request(json!({"contentData": {}})).content().is_err());
    }

    #[test]
    fn test_defaults() {
        let req = request(json!({}));
        assert_eq!(req.template_style(), "corporate");
        assert_eq!(req.format().unwrap(), ExportFormat::Pptx);
        assert_eq!(req.image_placement().unwrap(), ImagePlacement::Background);
        assert_eq!(req.presentation_id(), None);
    }

    #[test]
    fn test_template_style_aliases() {
        assert_eq!(request(json!({"templateStyle": "academic"})).template_style(), "academic");
        assert_eq!(
            request(json!({"template_style": "creative", "templateStyle": "academic"}))
                .template_style(),
            "creative"
        );
    }

    #[test]
    fn test_format_and_placement_validation() {
        assert_eq!(
            request(json!({"format": "DOCX"})).format().unwrap(),
            ExportFormat::Docx
        );
        assert!(request(json!({"format": "key"})).format().is_err());
        assert!(request(json!({"imagePlacement": "floating"}))
            .image_placement()
            .is_err());
    }

    #[test]
    fn test_legacy_background_flag() {
        let req = request(json!({"imagePlacement": "side"}));
        assert_eq!(req.image_placement().unwrap(), ImagePlacement::Background);
        let req = request(json!({"imagePlacement": "side", "backgroundImages": false}));
        assert_eq!(req.image_placement().unwrap(), ImagePlacement::Side);
    }

    #[test]
    fn test_presentation_id_must_be_uuid() {
        let id = Uuid::new_v4();
        assert_eq!(
            request(json!({"presentation_id": id.to_string()})).presentation_id(),
            Some(id)
        );
        assert_eq!(
            request(json!({"presentation_id": "../../etc/passwd"})).presentation_id(),
            None
        );
    }

    #[test]
    fn test_style_overrides_from_root_and_details() {
        let req = request(json!({
            "title": "T",
            "textColor": "#111111",
            "templateDetails": {"textColor": "#222222"}
        }));
        assert_eq!(req.style_overrides().text_color, Some(RgbColor(34, 34, 34)));
    }
}
