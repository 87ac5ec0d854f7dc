use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Slide type tag carried in the `type` field of a slide record.
///
/// Unknown tags are preserved so records round-trip unchanged; the deck builder skips them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlideKind {
    Title,
    Content,
    /// Alias of `Content` emitted by some model responses.
    Bullets,
    Image,
    Quote,
    TwoColumn,
    Other(String),
}

impl SlideKind {
    pub fn as_str(&self) -> &str {
        match self {
            SlideKind::Title => "title",
            SlideKind::Content => "content",
            SlideKind::Bullets => "bullets",
            SlideKind::Image => "image",
            SlideKind::Quote => "quote",
            SlideKind::TwoColumn => "two-column",
            SlideKind::Other(tag) => tag,
        }
    }

    /// True for the bullet-list slide types (`content` and `bullets`).
    pub fn is_content(&self) -> bool {
        matches!(self, SlideKind::Content | SlideKind::Bullets)
    }
}

impl From<String> for SlideKind {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "title" => SlideKind::Title,
            "content" => SlideKind::Content,
            "bullets" => SlideKind::Bullets,
            "image" => SlideKind::Image,
            "quote" => SlideKind::Quote,
            "two-column" => SlideKind::TwoColumn,
            _ => SlideKind::Other(tag),
        }
    }
}

impl Serialize for SlideKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SlideKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(SlideKind::from)
    }
}

/// One slide as produced by the LLM: a type tag plus free-form content fields.
///
/// Fields this service does not interpret are kept in `extra` and written back verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlideRecord {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<SlideKind>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "lenient_list", skip_serializing_if = "Option::is_none")]
    pub bullets: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub quote: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub left_content: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub right_content: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub image_prompt: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SlideRecord {
    pub fn is_kind(&self, kind: &SlideKind) -> bool {
        self.kind.as_ref() == Some(kind)
    }
}

/// A presentation record: the unit stored between generation and export.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Presentation {
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub slides: Vec<SlideRecord>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Presentation {
    /// Copy of the record with every slide's `image_prompt` removed.
    /// This is the view returned to API clients; prompts stay server-side.
    pub fn without_image_prompts(&self) -> Self {
        let mut view = self.clone();
        for slide in &mut view.slides {
            slide.image_prompt = None;
        }
        view
    }

    /// Title used for download file names.
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or("presentation")
    }
}

/// Accepts a string, a number, or a list of strings (joined by newlines).
/// Models occasionally emit `content` as a list; rejecting the whole response for that is worse.
fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(Value::Array(items)) => Some(
            items
                .iter()
                .map(value_to_text)
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        Some(other) => Some(value_to_text(&other)),
    })
}

/// Accepts a list of scalars or a single string.
fn lenient_list<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Vec<String>>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::Array(items)) => Some(items.iter().map(value_to_text).collect()),
        Some(other) => Some(vec![value_to_text(&other)]),
    })
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
