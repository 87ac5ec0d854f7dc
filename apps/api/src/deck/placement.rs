//! Image placement arithmetic: a fixed size table and five position formulas,
//! all in inches on a 13.333" × 7.5" (16:9) slide.

use serde::Deserialize;

/// Slide width in inches (16:9).
pub const SLIDE_WIDTH_IN: f64 = 13.333;
/// Slide height in inches.
pub const SLIDE_HEIGHT_IN: f64 = 7.5;
/// Margin kept between side/top/bottom images and the slide edge.
const EDGE_MARGIN_IN: f64 = 0.5;
/// Side images are never wider than this fraction of the slide.
const SIDE_WIDTH_DIVISOR: f64 = 2.5;
const SIDE_ASPECT: f64 = 0.75;

/// How images are placed across the whole deck.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImagePlacement {
    #[default]
    Background,
    Side,
    None,
}

impl ImagePlacement {
    /// Applies the legacy `backgroundImages` flag: when set, `side` is upgraded to `background`.
    pub fn with_legacy_background_flag(self, use_background_images: bool) -> Self {
        if use_background_images && self == ImagePlacement::Side {
            ImagePlacement::Background
        } else {
            self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImagePosition {
    Center,
    Left,
    Right,
    Top,
    Bottom,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImageSize {
    Small,
    #[default]
    Medium,
    Large,
}

impl ImageSize {
    /// (width, height) in inches.
    pub fn dimensions(&self) -> (f64, f64) {
        match self {
            ImageSize::Small => (2.0, 2.0),
            ImageSize::Medium => (4.0, 3.0),
            ImageSize::Large => (6.0, 4.5),
        }
    }
}

/// Position and extent of a picture, in inches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Frame {
    /// Full-bleed frame used for background images.
    pub fn full_slide() -> Self {
        Frame {
            left: 0.0,
            top: 0.0,
            width: SLIDE_WIDTH_IN,
            height: SLIDE_HEIGHT_IN,
        }
    }

    /// Computes where a picture of `size` goes at `position`.
    ///
    /// Left/right images are positioned from the table size, then narrowed to at most a
    /// 2.5th of the slide width at a 4:3 aspect. The anchor stays put, so a narrowed
    /// right-hand image ends short of the margin.
    pub fn place(position: ImagePosition, size: ImageSize) -> Self {
        let (mut width, mut height) = size.dimensions();

        let centred_left = (SLIDE_WIDTH_IN - width) / 2.0;
        let centred_top = (SLIDE_HEIGHT_IN - height) / 2.0;

        let (left, top) = match position {
            ImagePosition::Center => (centred_left, centred_top),
            ImagePosition::Left => (EDGE_MARGIN_IN, centred_top),
            ImagePosition::Right => (SLIDE_WIDTH_IN - width - EDGE_MARGIN_IN, centred_top),
            ImagePosition::Top => (centred_left, EDGE_MARGIN_IN),
            ImagePosition::Bottom => (centred_left, SLIDE_HEIGHT_IN - height - EDGE_MARGIN_IN),
        };

        if matches!(position, ImagePosition::Left | ImagePosition::Right) {
            width = width.min(SLIDE_WIDTH_IN / SIDE_WIDTH_DIVISOR);
            height = width * SIDE_ASPECT;
        }

        Frame {
            left,
            top,
            width,
            height,
        }
    }
}
