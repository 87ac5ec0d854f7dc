//! Axum route handler for the Export API.

use axum::{
    extract::State,
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};

use crate::errors::AppError;
use crate::export::request::ExportRequest;
use crate::export::{export_presentation, ExportedFile};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/export
///
/// Renders the presentation (stored record when `presentation_id` resolves, else the
/// request content) as PPTX, DOCX or PDF and returns it as an attachment.
pub async fn handle_export(
    State(state): State<AppState>,
    Json(request): Json<ExportRequest>,
) -> Result<Response, AppError> {
    let file = export_presentation(&state, &request).await?;
    Ok(attachment(file))
}

fn attachment(file: ExportedFile) -> Response {
    let file_name = format!("{}.{}", file.title, file.format.extension());
    let disposition = content_disposition(&file_name);

    let mut response = file.bytes.into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(file.format.mime_type()),
    );
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    response
}

/// `attachment` disposition with an ASCII `filename` and an RFC 5987 `filename*` for the
/// original UTF-8 name.
pub fn content_disposition(file_name: &str) -> String {
    let ascii: String = file_name
        .chars()
        .map(|c| match c {
            '"' | '\\' | '/' | ':' | '*' | '?' | '<' | '>' | '|' => '_',
            c if c.is_ascii_control() || !c.is_ascii() => '_',
            c => c,
        })
        .collect();

    if ascii == file_name {
        format!(r#"attachment; filename="{ascii}""#)
    } else {
        format!(
            r#"attachment; filename="{ascii}"; filename*=UTF-8''{}"#,
            percent_encode(file_name)
        )
    }
}

fn percent_encode(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len() * 3);
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || b"-._~".contains(&byte) {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_file_name() {
        assert_eq!(
            content_disposition("Quarterly Review.pptx"),
            r#"attachment; filename="Quarterly Review.pptx""#
        );
    }

    #[test]
    fn test_unsafe_and_unicode_file_names() {
        assert_eq!(
            content_disposition(r#"a/b "c".pdf"#),
            r#"attachment; filename="a_b _c_.pdf"; filename*=UTF-8''a%2Fb%20%22c%22.pdf"#
        );
        assert_eq!(
            content_disposition("Café.docx"),
            r#"attachment; filename="Caf_.docx"; filename*=UTF-8''Caf%C3%A9.docx"#
        );
    }
}
