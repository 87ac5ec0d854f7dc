pub mod builder;
pub mod placement;
pub mod pptx;

use bytes::Bytes;
use thiserror::Error;

use crate::deck::builder::DeckBuilder;
use crate::deck::placement::ImagePlacement;
use crate::deck::pptx::PictureFormat;
use crate::models::presentation::Presentation;
use crate::models::template::StyleSpec;
use crate::ooxml::PackageError;

#[derive(Debug, Error)]
pub enum DeckError {
    #[error("failed to write presentation package: {0}")]
    Package(#[from] PackageError),

    #[error("slide {slide} has more pictures than image relationships")]
    MissingPictureRelationship { slide: usize },
}

/// An encoded picture ready to embed in a slide.
#[derive(Debug, Clone, PartialEq)]
pub struct SlideImage {
    pub data: Bytes,
    pub format: PictureFormat,
}

/// Builds the deck for `presentation` and serialises it to `.pptx` bytes.
pub fn render_pptx(
    presentation: &Presentation,
    style: &StyleSpec,
    placement: ImagePlacement,
    images: &[Option<SlideImage>],
) -> Result<Vec<u8>, DeckError> {
    let deck = DeckBuilder::new(style, placement).build(presentation, images);
    deck.to_pptx()
}
