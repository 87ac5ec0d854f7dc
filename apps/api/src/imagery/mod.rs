//! Per-slide pictures: a pluggable image source plus deck-wide rendering.
//!
//! `AppState` holds an `Arc<dyn ImageSource>`; production uses `GeminiImageSource`,
//! tests swap in a fixed picture.

pub mod raster;

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use thiserror::Error;
use tracing::{info, warn};

use crate::deck::builder::wants_image;
use crate::deck::placement::ImagePlacement;
use crate::deck::SlideImage;
use crate::llm_client::LlmClient;
use crate::models::presentation::Presentation;
use crate::models::template::{placeholder_color, style_keywords};

/// Prompts shorter than this (after trimming) are replaced with a generic one.
const MIN_PROMPT_CHARS: usize = 5;

#[derive(Debug, Error)]
pub enum ImageryError {
    #[error("image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("image task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

/// Produces one picture for a slide prompt in a template style.
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn generate(&self, prompt: &str, template_style: &str)
        -> Result<SlideImage, ImageryError>;
}

// ────────────────────────────────────────────────────────────────────────────
// GeminiImageSource
// ────────────────────────────────────────────────────────────────────────────

/// Generates pictures with the LLM image model, falling back to the style placeholder
/// whenever the model fails or returns no usable picture.
pub struct GeminiImageSource {
    llm: LlmClient,
}

impl GeminiImageSource {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl ImageSource for GeminiImageSource {
    async fn generate(
        &self,
        prompt: &str,
        template_style: &str,
    ) -> Result<SlideImage, ImageryError> {
        let enhanced = enhance_prompt(prompt, template_style);
        info!("Generating image with prompt: '{}'", enhanced);

        match self.llm.generate_image(&enhanced).await {
            Ok(Some(generated)) => match raster::sniff(generated.data) {
                Ok(image) => return Ok(image),
                Err(e) => warn!(
                    "Discarding generated image ({}): {}; using placeholder",
                    generated.mime_type, e
                ),
            },
            Ok(None) => warn!("No image data found in response, using placeholder instead"),
            Err(e) => warn!("Image generation failed: {}; using placeholder", e),
        }

        placeholder(template_style).await
    }
}

/// The placeholder picture for a (possibly unknown) template name.
pub async fn placeholder(template_style: &str) -> Result<SlideImage, ImageryError> {
    let color = placeholder_color(template_style);
    let label = raster::placeholder_label(template_style);
    tokio::task::spawn_blocking(move || raster::placeholder(color, &label)).await?
}

/// Validates the prompt and appends the template's style keywords.
pub fn enhance_prompt(prompt: &str, template_style: &str) -> String {
    let prompt = prompt.trim();
    let base = if prompt.chars().count() < MIN_PROMPT_CHARS {
        warn!(
            "Invalid image prompt '{}', using a default prompt for the '{}' style",
            prompt, template_style
        );
        format!("Professional {template_style} style presentation visual with abstract design")
    } else {
        prompt.to_string()
    };
    format!("{base}. {}", style_keywords(template_style))
}

// ────────────────────────────────────────────────────────────────────────────
// Deck-wide rendering
// ────────────────────────────────────────────────────────────────────────────

/// Generates the picture for every slide that wants one, at most `concurrency` at a time.
///
/// The result is index-aligned with `presentation.slides`. Background placement gets the
/// white overlay; a slide whose picture cannot be produced is left without one.
pub async fn render_slide_images(
    source: &Arc<dyn ImageSource>,
    presentation: &Presentation,
    template_style: &str,
    placement: ImagePlacement,
    concurrency: usize,
) -> Vec<Option<SlideImage>> {
    let mut images: Vec<Option<SlideImage>> = vec![None; presentation.slides.len()];

    let wanted: Vec<(usize, String)> = presentation
        .slides
        .iter()
        .enumerate()
        .filter(|(_, slide)| wants_image(slide, placement))
        .map(|(index, slide)| (index, slide.image_prompt.clone().unwrap_or_default()))
        .collect();

    let jobs = wanted.into_iter().map(|(index, prompt)| {
        let source = Arc::clone(source);
        let template_style = template_style.to_string();
        async move {
            let result = render_one(source, &prompt, &template_style, placement).await;
            (index, result)
        }
    });

    let results: Vec<(usize, Result<SlideImage, ImageryError>)> = stream::iter(jobs)
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    for (index, result) in results {
        match result {
            Ok(image) => images[index] = Some(image),
            Err(e) => warn!("Slide {} left without image: {}", index + 1, e),
        }
    }

    let produced = images.iter().filter(|i| i.is_some()).count();
    info!("Rendered {} slide image(s) with placement {:?}", produced, placement);
    images
}

async fn render_one(
    source: Arc<dyn ImageSource>,
    prompt: &str,
    template_style: &str,
    placement: ImagePlacement,
) -> Result<SlideImage, ImageryError> {
    let image = source.generate(prompt, template_style).await?;
    if placement != ImagePlacement::Background {
        return Ok(image);
    }

    let original = image.clone();
    match tokio::task::spawn_blocking(move || raster::background_overlay(&image)).await? {
        Ok(washed) => Ok(washed),
        Err(e) => {
            warn!("Error processing background image: {}; using it unmodified", e);
            Ok(original)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::pptx::PictureFormat;
    use crate::models::template::RgbColor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ImageSource for CountingSource {
        async fn generate(
            &self,
            _prompt: &str,
            _template_style: &str,
        ) -> Result<SlideImage, ImageryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            raster::placeholder(RgbColor(0, 0, 0), "Test")
        }
    }

    fn presentation() -> Presentation {
        serde_json::from_value(serde_json::json!({
            "slides": [
                {"type": "title", "title": "A", "image_prompt": "a sunrise over hills"},
                {"type": "content", "title": "B"},
                {"type": "chart", "image_prompt": "ignored chart"},
                {"type": "quote", "quote": "q", "image_prompt": "an old library"}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_enhance_prompt() {
        assert_eq!(
            enhance_prompt("A red bridge", "creative"),
            format!("A red bridge. {}", style_keywords("creative"))
        );
        assert!(enhance_prompt(" hi ", "academic")
            .starts_with("Professional academic style presentation visual with abstract design. "));
    }

    #[tokio::test]
    async fn test_render_only_slides_that_want_images() {
        let counting = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
        });
        let source: Arc<dyn ImageSource> = counting.clone();

        let images =
            render_slide_images(&source, &presentation(), "corporate", ImagePlacement::Side, 2)
                .await;

        assert_eq!(images.len(), 4);
        assert!(images[0].is_some());
        assert!(images[1].is_none());
        assert!(images[2].is_none());
        assert!(images[3].is_some());
        assert_eq!(counting.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_background_placement_applies_overlay() {
        let source: Arc<dyn ImageSource> = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
        });
        let images = render_slide_images(
            &source,
            &presentation(),
            "corporate",
            ImagePlacement::Background,
            4,
        )
        .await;

        let image = images[0].as_ref().unwrap();
        assert_eq!(image.format, PictureFormat::Png);
        let decoded = image::load_from_memory(&image.data).unwrap().to_rgba8();
        assert_eq!(decoded.get_pixel(0, 0).0, [80, 80, 80, 255]);
    }

    fn assert_send<T: Send>(_: &T) {}

    #[test]
    fn test_render_future_is_send() {
        let source: Arc<dyn ImageSource> = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
        });
        let presentation = presentation();
        let future =
            render_slide_images(&source, &presentation, "corporate", ImagePlacement::Side, 2);
        assert_send(&future);
    }

    #[tokio::test]
    async fn test_none_placement_skips_generation() {
        let counting = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
        });
        let source: Arc<dyn ImageSource> = counting.clone();
        let images =
            render_slide_images(&source, &presentation(), "corporate", ImagePlacement::None, 4)
                .await;
        assert!(images.iter().all(Option::is_none));
        assert_eq!(counting.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_placeholder_for_unknown_style_is_grey() {
        let image = placeholder("vaporwave").await.unwrap();
        let decoded = image::load_from_memory(&image.data).unwrap().to_rgb8();
        assert_eq!(decoded.get_pixel(0, 0).0, [128, 128, 128]);
    }
}
