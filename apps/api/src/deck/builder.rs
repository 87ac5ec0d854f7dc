//! Maps presentation records onto deck slides: one builder per slide type, plus
//! image placement for the whole deck.

use tracing::{debug, warn};

use crate::deck::placement::{Frame, ImagePlacement, ImagePosition, ImageSize};
use crate::deck::pptx::{
    Deck, DeckSlide, Paragraph, Picture, PlaceholderRole, RunFormat, SlideLayout,
};
use crate::deck::SlideImage;
use crate::models::presentation::{Presentation, SlideKind, SlideRecord};
use crate::models::template::StyleSpec;

/// Where a slide's image goes once placement mode and slide type are known.
#[derive(Debug, Clone, Copy, PartialEq)]
enum ImageSlot {
    Background,
    Positioned(ImagePosition, ImageSize),
}

/// True when a slide of this type is rendered at all.
pub fn is_renderable(slide: &SlideRecord) -> bool {
    matches!(
        slide.kind,
        Some(
            SlideKind::Title
                | SlideKind::Content
                | SlideKind::Bullets
                | SlideKind::Image
                | SlideKind::Quote
                | SlideKind::TwoColumn
        )
    )
}

/// True when the slide will carry a picture under `placement`.
pub fn wants_image(slide: &SlideRecord, placement: ImagePlacement) -> bool {
    placement != ImagePlacement::None
        && is_renderable(slide)
        && slide
            .image_prompt
            .as_deref()
            .is_some_and(|p| !p.trim().is_empty())
}

/// Picks left or right for side placement.
pub fn random_side() -> ImagePosition {
    if rand::random::<bool>() {
        ImagePosition::Left
    } else {
        ImagePosition::Right
    }
}

pub struct DeckBuilder<'a> {
    style: &'a StyleSpec,
    placement: ImagePlacement,
    choose_side: Box<dyn FnMut() -> ImagePosition + 'a>,
}

impl<'a> DeckBuilder<'a> {
    pub fn new(style: &'a StyleSpec, placement: ImagePlacement) -> Self {
        Self {
            style,
            placement,
            choose_side: Box::new(random_side),
        }
    }

    /// Replaces the random left/right choice used for side placement.
    pub fn with_side_chooser(mut self, choose_side: impl FnMut() -> ImagePosition + 'a) -> Self {
        self.choose_side = Box::new(choose_side);
        self
    }

    /// Builds the deck. `images[i]` is the picture for `presentation.slides[i]`, if any.
    pub fn build(mut self, presentation: &Presentation, images: &[Option<SlideImage>]) -> Deck {
        let mut deck = Deck::new(self.style.clone());

        for (index, record) in presentation.slides.iter().enumerate() {
            let Some(kind) = record.kind.clone() else {
                warn!("Skipping slide {} without a type", index + 1);
                continue;
            };

            let mut slide = match &kind {
                SlideKind::Title => self.title_slide(record),
                SlideKind::Content | SlideKind::Bullets => self.content_slide(record),
                SlideKind::Image => self.image_slide(record),
                SlideKind::Quote => self.quote_slide(record),
                SlideKind::TwoColumn => self.two_column_slide(record),
                SlideKind::Other(tag) => {
                    warn!("Skipping slide {} with unsupported type '{}'", index + 1, tag);
                    continue;
                }
            };
            slide.background = Some(self.style.background);

            let image = images.get(index).and_then(Option::as_ref);
            if let Some(image) = image.filter(|_| wants_image(record, self.placement)) {
                let slot = self.image_slot(&kind);
                attach_image(&mut slide, image, slot, record);
            }

            debug!(
                "Built slide {} as '{}' with {} picture(s)",
                index + 1,
                kind.as_str(),
                slide.pictures().count()
            );
            deck.slides.push(slide);
        }

        deck
    }

    fn image_slot(&mut self, kind: &SlideKind) -> ImageSlot {
        if self.placement == ImagePlacement::Background {
            return ImageSlot::Background;
        }
        let side = (self.choose_side)();
        match kind {
            SlideKind::Image => ImageSlot::Positioned(side, ImageSize::Large),
            SlideKind::TwoColumn => ImageSlot::Positioned(ImagePosition::Bottom, ImageSize::Medium),
            _ => ImageSlot::Positioned(side, ImageSize::Medium),
        }
    }

    fn title_format(&self) -> RunFormat {
        RunFormat::title(self.style)
    }

    fn body_format(&self) -> RunFormat {
        RunFormat::body(self.style)
    }

    fn add_title(&self, slide: &mut DeckSlide, role: PlaceholderRole, record: &SlideRecord) {
        if let Some(title) = non_empty(&record.title) {
            let mut paragraph = Paragraph::plain(title, self.title_format());
            if role == PlaceholderRole::CenteredTitle {
                paragraph = paragraph.centered();
            }
            slide.add_placeholder(role, vec![paragraph]);
        }
    }

    fn title_slide(&self, record: &SlideRecord) -> DeckSlide {
        let mut slide = DeckSlide::new(SlideLayout::Title);
        self.add_title(&mut slide, PlaceholderRole::CenteredTitle, record);

        let subtitle = non_empty(&record.subtitle).or_else(|| non_empty(&record.content));
        if let Some(subtitle) = subtitle {
            slide.add_placeholder(
                PlaceholderRole::Subtitle,
                vec![Paragraph::plain(subtitle, RunFormat::subtitle(self.style)).centered()],
            );
        }
        slide
    }

    fn content_slide(&self, record: &SlideRecord) -> DeckSlide {
        let mut slide = DeckSlide::new(SlideLayout::TitleAndContent);
        self.add_title(&mut slide, PlaceholderRole::Title, record);

        let bullets: Vec<&str> = record
            .bullets
            .iter()
            .flatten()
            .map(String::as_str)
            .filter(|b| !b.trim().is_empty())
            .collect();

        let body = if !bullets.is_empty() {
            bullets
                .into_iter()
                .map(|b| Paragraph::bullet(b, 0, self.body_format()))
                .collect()
        } else if let Some(content) = non_empty(&record.content) {
            vec![Paragraph::plain(content, self.body_format())]
        } else {
            Vec::new()
        };

        if !body.is_empty() {
            slide.add_placeholder(PlaceholderRole::Body, body);
        }
        slide
    }

    fn image_slide(&self, record: &SlideRecord) -> DeckSlide {
        let mut slide = DeckSlide::new(SlideLayout::TitleAndContent);
        self.add_title(&mut slide, PlaceholderRole::Title, record);
        if let Some(caption) = non_empty(&record.content) {
            slide.add_placeholder(
                PlaceholderRole::Body,
                vec![Paragraph::plain(caption, self.body_format())],
            );
        }
        slide
    }

    fn quote_slide(&self, record: &SlideRecord) -> DeckSlide {
        let mut slide = DeckSlide::new(SlideLayout::TitleAndContent);
        self.add_title(&mut slide, PlaceholderRole::Title, record);

        if let Some(quote) = non_empty(&record.quote) {
            let mut quote_format = self.body_format();
            quote_format.italic = true;
            let mut body = vec![Paragraph::plain(format!("\"{quote}\""), quote_format)];
            if let Some(author) = non_empty(&record.author) {
                body.push(Paragraph::plain(format!("— {author}"), self.body_format()).at_level(1));
            }
            slide.add_placeholder(PlaceholderRole::Body, body);
        }
        slide
    }

    fn two_column_slide(&self, record: &SlideRecord) -> DeckSlide {
        let mut slide = DeckSlide::new(SlideLayout::TitleAndContent);
        self.add_title(&mut slide, PlaceholderRole::Title, record);

        let mut label_format = self.body_format();
        label_format.bold = true;

        let mut body = Vec::new();
        for (label, text) in [
            ("Left Column:", &record.left_content),
            ("Right Column:", &record.right_content),
        ] {
            if let Some(text) = non_empty(text) {
                body.push(Paragraph::plain(label, label_format.clone()));
                body.push(Paragraph::plain(text, self.body_format()).at_level(1));
            }
        }
        if !body.is_empty() {
            slide.add_placeholder(PlaceholderRole::Body, body);
        }
        slide
    }
}

fn attach_image(slide: &mut DeckSlide, image: &SlideImage, slot: ImageSlot, record: &SlideRecord) {
    let description = record
        .title
        .clone()
        .unwrap_or_else(|| "Slide image".to_string());
    match slot {
        ImageSlot::Background => slide.add_picture_behind(Picture {
            data: image.data.clone(),
            format: image.format,
            frame: Frame::full_slide(),
            description,
        }),
        ImageSlot::Positioned(position, size) => slide.add_picture(Picture {
            data: image.data.clone(),
            format: image.format,
            frame: Frame::place(position, size),
            description,
        }),
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
