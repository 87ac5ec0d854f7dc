//! Pixel-level helpers: placeholder pictures, the background overlay and format checks.

use std::io::Cursor;
use std::sync::OnceLock;

use ab_glyph::{FontVec, PxScale};
use bytes::Bytes;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use imageproc::drawing::{draw_text_mut, text_size};
use tracing::{debug, warn};

use crate::deck::pptx::PictureFormat;
use crate::deck::SlideImage;
use crate::imagery::ImageryError;
use crate::models::template::RgbColor;

pub const PLACEHOLDER_WIDTH: u32 = 1024;
pub const PLACEHOLDER_HEIGHT: u32 = 768;
/// Opacity of the white wash laid over background pictures (out of 255).
pub const OVERLAY_ALPHA: u8 = 80;
const LABEL_SCALE: f32 = 60.0;

const FONT_CANDIDATES: [&str; 4] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/System/Library/Fonts/Helvetica.ttc",
    r"C:\Windows\Fonts\Arial.ttf",
];

/// A solid picture in `color` with `label` centred in white.
///
/// The label is skipped when no system font can be loaded.
pub fn placeholder(color: RgbColor, label: &str) -> Result<SlideImage, ImageryError> {
    let mut img = RgbImage::from_pixel(
        PLACEHOLDER_WIDTH,
        PLACEHOLDER_HEIGHT,
        Rgb([color.0, color.1, color.2]),
    );
    match label_font() {
        Some(font) => draw_label(&mut img, label, font),
        None => debug!("Placeholder '{}' drawn without label", label),
    }
    encode_png(DynamicImage::ImageRgb8(img))
}

/// "<Style> Placeholder", with the style name capitalised.
pub fn placeholder_label(template_style: &str) -> String {
    let mut chars = template_style.trim().chars();
    match chars.next() {
        Some(first) => format!(
            "{}{} Placeholder",
            first.to_uppercase(),
            chars.as_str().to_lowercase()
        ),
        None => "Placeholder".to_string(),
    }
}

/// First loadable system font, read once per process.
fn label_font() -> Option<&'static FontVec> {
    static FONT: OnceLock<Option<FontVec>> = OnceLock::new();
    FONT.get_or_init(|| {
        let font = FONT_CANDIDATES.iter().find_map(|path| {
            let bytes = std::fs::read(path).ok()?;
            FontVec::try_from_vec(bytes).ok()
        });
        if font.is_none() {
            warn!("No system font found; placeholder images will carry no label");
        }
        font
    })
    .as_ref()
}

fn draw_label(img: &mut RgbImage, label: &str, font: &FontVec) {
    let scale = PxScale::from(LABEL_SCALE);
    let (text_width, text_height) = text_size(scale, font, label);
    let x = (PLACEHOLDER_WIDTH as i32 - text_width as i32) / 2;
    let y = (PLACEHOLDER_HEIGHT as i32 - text_height as i32) / 2;
    draw_text_mut(img, Rgb([255, 255, 255]), x, y, scale, font, label);
}

/// Washes the picture with white at [`OVERLAY_ALPHA`] so slide text stays readable on top.
pub fn background_overlay(image: &SlideImage) -> Result<SlideImage, ImageryError> {
    let mut rgba = image::load_from_memory(&image.data)?.to_rgba8();
    for pixel in rgba.pixels_mut() {
        for channel in &mut pixel.0[..3] {
            *channel = blend_white(*channel, OVERLAY_ALPHA);
        }
    }
    encode_png(DynamicImage::ImageRgba8(rgba))
}

/// Identifies PNG or JPEG bytes. Anything else is rejected.
pub fn sniff(data: Bytes) -> Result<SlideImage, ImageryError> {
    let format = match image::guess_format(&data) {
        Ok(ImageFormat::Png) => PictureFormat::Png,
        Ok(ImageFormat::Jpeg) => PictureFormat::Jpeg,
        Ok(other) => return Err(ImageryError::UnsupportedFormat(format!("{other:?}"))),
        Err(_) => return Err(ImageryError::UnsupportedFormat("unknown".to_string())),
    };
    Ok(SlideImage { data, format })
}

fn encode_png(img: DynamicImage) -> Result<SlideImage, ImageryError> {
    let mut buffer = Vec::new();
    img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)?;
    Ok(SlideImage {
        data: Bytes::from(buffer),
        format: PictureFormat::Png,
    })
}

fn blend_white(channel: u8, alpha: u8) -> u8 {
    let a = u32::from(alpha);
    ((u32::from(channel) * (255 - a) + 255 * a + 127) / 255) as u8
}
