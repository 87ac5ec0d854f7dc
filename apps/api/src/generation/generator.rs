//! Presentation generation: turns a prompt and/or document text into a slide record.
//!
//! Flow: build structure prompt → LLM call_json → normalise record → return.
//! Persistence and the client view are handled by the caller.

use tracing::{info, warn};

use crate::errors::AppError;
use crate::generation::prompts::build_structure_prompt;
use crate::llm_client::LlmClient;
use crate::models::presentation::{Presentation, SlideKind, SlideRecord};

pub const MIN_SLIDES: u32 = 3;
pub const MAX_SLIDES: u32 = 20;

/// Everything the generation pipeline needs from a request.
#[derive(Debug, Clone, Default)]
pub struct GenerationInput {
    pub prompt: Option<String>,
    pub document_text: Option<String>,
    pub template_style: String,
    pub slide_count: Option<u32>,
}

/// Clamps a requested slide count to `MIN_SLIDES..=MAX_SLIDES`. Zero or absent means
/// "let the model decide".
pub fn clamp_slide_count(requested: Option<i64>) -> Option<u32> {
    match requested {
        None | Some(0) => None,
        Some(n) => Some(n.clamp(i64::from(MIN_SLIDES), i64::from(MAX_SLIDES)) as u32),
    }
}

/// Calls the LLM and returns a normalised presentation record.
pub async fn generate_presentation(
    llm: &LlmClient,
    input: &GenerationInput,
) -> Result<Presentation, AppError> {
    let prompt = build_structure_prompt(
        input.prompt.as_deref(),
        input.document_text.as_deref(),
        &input.template_style,
        input.slide_count,
    );

    let mut presentation: Presentation = llm
        .call_json(&prompt)
        .await
        .map_err(|e| AppError::Llm(format!("Failed to parse LLM response: {e}")))?;

    if presentation.slides.is_empty() {
        return Err(AppError::Llm("LLM response contained no slides".to_string()));
    }

    normalize_presentation(&mut presentation, &input.template_style);

    info!(
        "Generated presentation '{}' with {} slides ({} style)",
        presentation.display_title(),
        presentation.slides.len(),
        input.template_style
    );
    Ok(presentation)
}

/// Fills the gaps models commonly leave: the deck title, per-slide image prompts and
/// bullets on content slides.
pub fn normalize_presentation(presentation: &mut Presentation, template_style: &str) {
    if is_blank(&presentation.title) {
        if let Some(first) = presentation.slides.first() {
            if first.is_kind(&SlideKind::Title) && !is_blank(&first.title) {
                presentation.title = first.title.clone();
            }
        }
    }

    for slide in &mut presentation.slides {
        if is_blank(&slide.image_prompt) {
            slide.image_prompt = Some(format!(
                "Professional {template_style} style image related to {}",
                title_or(slide, "presentation topic")
            ));
        }

        let is_content = slide.kind.as_ref().is_some_and(SlideKind::is_content);
        let has_bullets = slide.bullets.as_ref().is_some_and(|b| !b.is_empty());
        if is_content && !has_bullets {
            slide.bullets = Some(default_bullets(slide));
        }
    }
}

fn default_bullets(slide: &SlideRecord) -> Vec<String> {
    let from_content = slide
        .content
        .as_deref()
        .map(split_sentences)
        .unwrap_or_default();
    if !from_content.is_empty() {
        return from_content;
    }

    warn!(
        "Content slide '{}' has no bullets or content, using placeholder bullets",
        title_or(slide, "untitled")
    );
    vec![
        format!("Key point about {}", title_or(slide, "this topic")),
        "Additional information".to_string(),
        "Further details".to_string(),
    ]
}

/// Splits text after `.`, `!` or `?` when followed by whitespace. Empty pieces are dropped.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let Some(&(next_index, next)) = chars.peek() else {
            continue;
        };
        if next.is_whitespace() {
            sentences.push(text[start..next_index].trim().to_string());
            start = next_index;
        }
    }
    sentences.push(text[start..].trim().to_string());

    sentences.retain(|s| !s.is_empty());
    sentences
}

fn title_or<'a>(slide: &'a SlideRecord, fallback: &'a str) -> &'a str {
    slide
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(fallback)
}

fn is_blank(field: &Option<String>) -> bool {
    field.as_deref().map_or(true, |s| s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> Presentation {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_clamp_slide_count() {
        assert_eq!(clamp_slide_count(None), None);
        assert_eq!(clamp_slide_count(Some(0)), None);
        assert_eq!(clamp_slide_count(Some(1)), Some(3));
        assert_eq!(clamp_slide_count(Some(-4)), Some(3));
        assert_eq!(clamp_slide_count(Some(12)), Some(12));
        assert_eq!(clamp_slide_count(Some(99)), Some(20));
    }

    #[test]
    fn test_split_sentences() {
        assert_eq!(
            split_sentences("First point. Second one!  Third?\nFourth"),
            vec!["First point.", "Second one!", "Third?", "Fourth"]
        );
        assert_eq!(split_sentences("Version 2.0 shipped."), vec!["Version 2.0 shipped."]);
        assert!(split_sentences("   ").is_empty());
    }

    #[test]
    fn test_title_taken_from_title_slide() {
        let mut presentation = record(json!({
            "slides": [{"type": "title", "title": "Ocean Energy"}, {"type": "content", "title": "Why", "bullets": ["a"]}]
        }));
        normalize_presentation(&mut presentation, "corporate");
        assert_eq!(presentation.title.as_deref(), Some("Ocean Energy"));
    }

    #[test]
    fn test_title_not_taken_from_content_slide() {
        let mut presentation = record(json!({
            "slides": [{"type": "content", "title": "Why", "bullets": ["a"]}]
        }));
        normalize_presentation(&mut presentation, "corporate");
        assert_eq!(presentation.title, None);
    }

    #[test]
    fn test_default_image_prompts() {
        let mut presentation = record(json!({
            "title": "Deck",
            "slides": [
                {"type": "title", "title": "Deck", "image_prompt": "keep me"},
                {"type": "quote", "quote": "q"}
            ]
        }));
        normalize_presentation(&mut presentation, "creative");
        assert_eq!(presentation.slides[0].image_prompt.as_deref(), Some("keep me"));
        assert_eq!(
            presentation.slides[1].image_prompt.as_deref(),
            Some("Professional creative style image related to presentation topic")
        );
    }

    #[test]
    fn test_bullets_from_content_or_placeholders() {
        let mut presentation = record(json!({
            "slides": [
                {"type": "content", "title": "Growth", "content": "Revenue doubled. Costs fell!"},
                {"type": "bullets", "title": "Plans"},
                {"type": "content"},
                {"type": "quote", "quote": "no bullets needed"}
            ]
        }));
        normalize_presentation(&mut presentation, "corporate");

        assert_eq!(
            presentation.slides[0].bullets,
            Some(vec!["Revenue doubled.".to_string(), "Costs fell!".to_string()])
        );
        assert_eq!(
            presentation.slides[1].bullets,
            Some(vec![
                "Key point about Plans".to_string(),
                "Additional information".to_string(),
                "Further details".to_string()
            ])
        );
        assert_eq!(
            presentation.slides[2].bullets.as_ref().unwrap()[0],
            "Key point about this topic"
        );
        assert_eq!(presentation.slides[3].bullets, None);
    }
}
