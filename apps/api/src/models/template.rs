//! Template styles: the catalogue served to clients, the per-template style
//! specification used by the deck builder, and caller-supplied style overrides.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::llm_client::prompts::IMAGE_QUALITY_SUFFIX;

/// The named cosmetic presets. Unknown names resolve to `Corporate` where a concrete
/// style is needed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TemplateStyle {
    #[default]
    Corporate,
    Creative,
    Academic,
    Marketing,
    Minimalist,
}

impl TemplateStyle {
    pub const ALL: [TemplateStyle; 5] = [
        TemplateStyle::Corporate,
        TemplateStyle::Creative,
        TemplateStyle::Academic,
        TemplateStyle::Marketing,
        TemplateStyle::Minimalist,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "corporate" => Some(TemplateStyle::Corporate),
            "creative" => Some(TemplateStyle::Creative),
            "academic" => Some(TemplateStyle::Academic),
            "marketing" => Some(TemplateStyle::Marketing),
            "minimalist" => Some(TemplateStyle::Minimalist),
            _ => None,
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            TemplateStyle::Corporate => "corporate",
            TemplateStyle::Creative => "creative",
            TemplateStyle::Academic => "academic",
            TemplateStyle::Marketing => "marketing",
            TemplateStyle::Minimalist => "minimalist",
        }
    }

    /// Catalogue entry for `GET /api/templates`.
    pub fn info(&self) -> TemplateInfo {
        let (name, description, primary, secondary, accent) = match self {
            TemplateStyle::Corporate => (
                "Corporate",
                "Professional design for business presentations",
                "#0F62FE",
                "#6F6F6F",
                "#4589FF",
            ),
            TemplateStyle::Creative => (
                "Creative",
                "Vibrant design for creative presentations",
                "#FF3366",
                "#9C27B0",
                "#FFCC00",
            ),
            TemplateStyle::Academic => (
                "Academic",
                "Structured design for educational content",
                "#006064",
                "#00897B",
                "#4DD0E1",
            ),
            TemplateStyle::Marketing => (
                "Marketing",
                "Persuasive design for sales pitches",
                "#FF5722",
                "#FF9800",
                "#FFC107",
            ),
            TemplateStyle::Minimalist => (
                "Minimalist",
                "Clean, typography-focused design",
                "#212121",
                "#757575",
                "#BDBDBD",
            ),
        };
        TemplateInfo {
            id: self.id(),
            name,
            description,
            primary_color: primary,
            secondary_color: secondary,
            accent_color: accent,
        }
    }

    /// Fonts, sizes and colours applied to generated slides.
    pub fn spec(&self) -> StyleSpec {
        match self {
            TemplateStyle::Corporate => StyleSpec {
                title_font: "Calibri".to_string(),
                body_font: "Arial".to_string(),
                title_size_pt: 40.0,
                body_size_pt: 24.0,
                title_color: RgbColor(0, 43, 91),
                body_color: RgbColor(51, 51, 51),
                subtitle_color: RgbColor(51, 51, 51),
                background: RgbColor(255, 255, 255),
                accent: RgbColor(0, 112, 192),
                title_bold: true,
                body_bold: false,
            },
            TemplateStyle::Creative => StyleSpec {
                title_font: "Poppins".to_string(),
                body_font: "Open Sans".to_string(),
                title_size_pt: 44.0,
                body_size_pt: 26.0,
                title_color: RgbColor(90, 24, 154),
                body_color: RgbColor(0, 128, 128),
                subtitle_color: RgbColor(0, 128, 128),
                background: RgbColor(255, 255, 255),
                accent: RgbColor(255, 51, 102),
                title_bold: true,
                body_bold: true,
            },
            TemplateStyle::Academic => StyleSpec {
                title_font: "Times New Roman".to_string(),
                body_font: "Georgia".to_string(),
                title_size_pt: 38.0,
                body_size_pt: 22.0,
                title_color: RgbColor(28, 61, 110),
                body_color: RgbColor(0, 0, 0),
                subtitle_color: RgbColor(0, 0, 0),
                background: RgbColor(250, 243, 224),
                accent: RgbColor(0, 80, 80),
                title_bold: true,
                body_bold: false,
            },
            TemplateStyle::Marketing => StyleSpec {
                title_font: "Raleway".to_string(),
                body_font: "Oswald".to_string(),
                title_size_pt: 48.0,
                body_size_pt: 26.0,
                title_color: RgbColor(230, 57, 70),
                body_color: RgbColor(29, 53, 87),
                subtitle_color: RgbColor(29, 53, 87),
                background: RgbColor(255, 255, 255),
                accent: RgbColor(244, 162, 97),
                title_bold: true,
                body_bold: true,
            },
            TemplateStyle::Minimalist => StyleSpec {
                title_font: "Lato".to_string(),
                body_font: "Inter".to_string(),
                title_size_pt: 40.0,
                body_size_pt: 24.0,
                title_color: RgbColor(0, 0, 0),
                body_color: RgbColor(68, 68, 68),
                subtitle_color: RgbColor(68, 68, 68),
                background: RgbColor(248, 249, 250),
                accent: RgbColor(0, 0, 0),
                title_bold: false,
                body_bold: false,
            },
        }
    }

    /// Fill colour of the placeholder image used when image generation fails.
    pub fn placeholder_color(&self) -> RgbColor {
        match self {
            TemplateStyle::Corporate => RgbColor(15, 98, 254),
            TemplateStyle::Creative => RgbColor(255, 51, 102),
            TemplateStyle::Academic => RgbColor(0, 96, 100),
            TemplateStyle::Marketing => RgbColor(255, 87, 34),
            TemplateStyle::Minimalist => RgbColor(33, 33, 33),
        }
    }

    fn base_keywords(&self) -> &'static str {
        match self {
            TemplateStyle::Corporate => {
                "professional, business, corporate, clean design, blue tones, formal"
            }
            TemplateStyle::Creative => "vibrant, colorful, artistic, creative, innovative, playful",
            TemplateStyle::Academic => "educational, scholarly, structured, clean, organized, formal",
            TemplateStyle::Marketing => {
                "persuasive, bold, attention-grabbing, action-oriented, sales focused"
            }
            TemplateStyle::Minimalist => {
                "minimal, clean, high contrast, typography focused, elegant, simple"
            }
        }
    }
}

impl fmt::Display for TemplateStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Image-prompt keywords for a (possibly unknown) template name.
pub fn style_keywords(template_style: &str) -> String {
    let base = TemplateStyle::from_name(template_style)
        .map(|s| s.base_keywords())
        .unwrap_or("professional, clean");
    format!("{base}, {IMAGE_QUALITY_SUFFIX}")
}

/// Placeholder colour for a (possibly unknown) template name; grey when unknown.
pub fn placeholder_color(template_style: &str) -> RgbColor {
    TemplateStyle::from_name(template_style)
        .map(|s| s.placeholder_color())
        .unwrap_or(RgbColor(128, 128, 128))
}

#[derive(Debug, Clone, Serialize)]
pub struct TemplateInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub primary_color: &'static str,
    pub secondary_color: &'static str,
    pub accent_color: &'static str,
}

/// 24-bit colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RgbColor(pub u8, pub u8, pub u8);

impl RgbColor {
    /// Parses `#RRGGBB`, `RRGGBB` or `#RGB`.
    pub fn parse_hex(raw: &str) -> Option<Self> {
        let hex = raw.trim().trim_start_matches('#');
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        match hex.len() {
            6 => Some(RgbColor(
                u8::from_str_radix(&hex[0..2], 16).ok()?,
                u8::from_str_radix(&hex[2..4], 16).ok()?,
                u8::from_str_radix(&hex[4..6], 16).ok()?,
            )),
            3 => {
                let digit = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|d| d * 17);
                Some(RgbColor(digit(0)?, digit(1)?, digit(2)?))
            }
            _ => None,
        }
    }

    /// Upper-case `RRGGBB`, the form DrawingML and WordprocessingML expect.
    pub fn hex(&self) -> String {
        format!("{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }
}

/// Resolved fonts, sizes and colours for one export.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleSpec {
    pub title_font: String,
    pub body_font: String,
    pub title_size_pt: f32,
    pub body_size_pt: f32,
    pub title_color: RgbColor,
    pub body_color: RgbColor,
    pub subtitle_color: RgbColor,
    pub background: RgbColor,
    pub accent: RgbColor,
    pub title_bold: bool,
    pub body_bold: bool,
}

impl StyleSpec {
    pub fn with_overrides(mut self, overrides: &StyleOverrides) -> Self {
        if let Some(color) = overrides.background_color {
            self.background = color;
        }
        if let Some(color) = overrides.text_color {
            self.body_color = color;
            self.subtitle_color = color;
        }
        if let Some(color) = overrides.primary_color {
            self.title_color = color;
        }
        if let Some(color) = overrides.secondary_color {
            self.subtitle_color = color;
        }
        if let Some(color) = overrides.accent_color {
            self.accent = color;
        }
        if let Some(font) = &overrides.font_family {
            self.title_font = font.clone();
            self.body_font = font.clone();
        }
        if let Some(size) = overrides.title_font_size {
            self.title_size_pt = size;
        }
        if let Some(size) = overrides.content_font_size {
            self.body_size_pt = size;
        }
        self
    }
}

/// Caller-supplied tweaks on top of a template.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleOverrides {
    pub background_color: Option<RgbColor>,
    pub text_color: Option<RgbColor>,
    pub primary_color: Option<RgbColor>,
    pub secondary_color: Option<RgbColor>,
    pub accent_color: Option<RgbColor>,
    pub font_family: Option<String>,
    pub title_font_size: Option<f32>,
    pub content_font_size: Option<f32>,
}

const MIN_FONT_PT: f32 = 6.0;
const MAX_FONT_PT: f32 = 160.0;

impl StyleOverrides {
    /// Collects overrides from the request root and the `templateDetails` object.
    ///
    /// Each property is accepted in snake_case and camelCase. Values in `details`
    /// win over root values; snake_case wins over camelCase within one object.
    pub fn from_request(root: &Map<String, Value>, details: Option<&Map<String, Value>>) -> Self {
        let lookup = |snake: &str, camel: &str| lookup_override(root, details, snake, camel);

        let color = |snake: &str, camel: &str| {
            lookup(snake, camel).and_then(|v| {
                let parsed = v.as_str().and_then(RgbColor::parse_hex);
                if parsed.is_none() {
                    warn!("Ignoring invalid colour for {snake}: {v}");
                }
                parsed
            })
        };

        let font_size = |snake: &str, camel: &str| {
            lookup(snake, camel).and_then(|v| {
                let parsed = match v {
                    Value::Number(n) => n.as_f64().map(|f| f as f32),
                    Value::String(s) => s.trim().trim_end_matches("pt").trim().parse::<f32>().ok(),
                    _ => None,
                }
                .filter(|pt| (MIN_FONT_PT..=MAX_FONT_PT).contains(pt));
                if parsed.is_none() {
                    warn!("Ignoring invalid font size for {snake}: {v}");
                }
                parsed
            })
        };

        StyleOverrides {
            background_color: color("background_color", "backgroundColor"),
            text_color: color("text_color", "textColor"),
            primary_color: color("primary_color", "primaryColor"),
            secondary_color: color("secondary_color", "secondaryColor"),
            accent_color: color("accent_color", "accentColor"),
            font_family: lookup("font_family", "fontFamily")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(String::from),
            title_font_size: font_size("title_font_size", "titleFontSize"),
            content_font_size: font_size("content_font_size", "contentFontSize"),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == StyleOverrides::default()
    }
}

fn lookup_override<'a>(
    root: &'a Map<String, Value>,
    details: Option<&'a Map<String, Value>>,
    snake: &str,
    camel: &str,
) -> Option<&'a Value> {
    details
        .into_iter()
        .chain(std::iter::once(root))
        .flat_map(|source| [snake, camel].into_iter().filter_map(move |key| source.get(key)))
        .find(|value| !value.is_null())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_template_lookup_is_case_insensitive() {
        assert_eq!(
            TemplateStyle::from_name(" Academic "),
            Some(TemplateStyle::Academic)
        );
        assert_eq!(TemplateStyle::from_name("neon"), None);
    }

    #[test]
    fn test_catalogue_has_five_templates() {
        let ids: Vec<_> = TemplateStyle::ALL.iter().map(|s| s.info().id).collect();
        assert_eq!(
            ids,
            ["corporate", "creative", "academic", "marketing", "minimalist"]
        );
        assert_eq!(TemplateStyle::Creative.info().primary_color, "#FF3366");
    }

    #[test]
    fn test_style_keywords() {
        assert!(style_keywords("corporate").starts_with("professional, business"));
        assert!(style_keywords("corporate").ends_with("photo-realistic"));
        assert_eq!(
            style_keywords("unknown"),
            "professional, clean, high quality, photo-realistic"
        );
    }

    #[test]
    fn test_placeholder_color_fallback() {
        assert_eq!(placeholder_color("marketing"), RgbColor(255, 87, 34));
        assert_eq!(placeholder_color("vaporwave"), RgbColor(128, 128, 128));
    }

    #[test]
    fn test_parse_hex() {
        assert_eq!(RgbColor::parse_hex("#0F62FE"), Some(RgbColor(15, 98, 254)));
        assert_eq!(RgbColor::parse_hex("ff0000"), Some(RgbColor(255, 0, 0)));
        assert_eq!(RgbColor::parse_hex("#fff"), Some(RgbColor(255, 255, 255)));
        assert_eq!(RgbColor::parse_hex("#12345"), None);
        assert_eq!(RgbColor::parse_hex("blue"), None);
        assert_eq!(RgbColor(0, 43, 91).hex(), "002B5B");
    }

    #[test]
    fn test_overrides_accept_both_casings() {
        let root = as_map(json!({
            "backgroundColor": "#101010",
            "text_color": "#202020",
            "fontFamily": "Inter",
            "titleFontSize": 36
        }));
        let overrides = StyleOverrides::from_request(&root, None);
        assert_eq!(overrides.background_color, Some(RgbColor(16, 16, 16)));
        assert_eq!(overrides.text_color, Some(RgbColor(32, 32, 32)));
        assert_eq!(overrides.font_family.as_deref(), Some("Inter"));
        assert_eq!(overrides.title_font_size, Some(36.0));
        assert_eq!(overrides.content_font_size, None);
    }

    #[test]
    fn test_template_details_take_precedence() {
        let root = as_map(json!({"primaryColor": "#000000", "contentFontSize": "20"}));
        let details = as_map(json!({"primary_color": "#FFFFFF", "accentColor": null}));
        let overrides = StyleOverrides::from_request(&root, Some(&details));
        assert_eq!(overrides.primary_color, Some(RgbColor(255, 255, 255)));
        assert_eq!(overrides.content_font_size, Some(20.0));
        assert_eq!(overrides.accent_color, None);
    }

    #[test]
    fn test_invalid_overrides_are_ignored() {
        let root = as_map(json!({"textColor": "not-a-colour", "titleFontSize": 0}));
        let overrides = StyleOverrides::from_request(&root, None);
        assert!(overrides.is_empty());
    }

    #[test]
    fn test_spec_with_overrides() {
        let overrides = StyleOverrides {
            text_color: Some(RgbColor(1, 2, 3)),
            secondary_color: Some(RgbColor(9, 9, 9)),
            font_family: Some("Roboto".to_string()),
            ..Default::default()
        };
        let spec = TemplateStyle::Corporate.spec().with_overrides(&overrides);
        assert_eq!(spec.body_color, RgbColor(1, 2, 3));
        assert_eq!(spec.subtitle_color, RgbColor(9, 9, 9));
        assert_eq!(spec.title_font, "Roboto");
        assert_eq!(spec.body_font, "Roboto");
        assert_eq!(spec.title_color, RgbColor(0, 43, 91));
    }
}
