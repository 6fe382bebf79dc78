//! Serving stored attachment files

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};

use crate::error::{AppError, AppResult};
use crate::repositories::AttachmentRepository;
use crate::AppState;

/// Stream an attachment with the MIME type recorded at upload time
pub async fn get_upload(State(state): State<AppState>, Path(filename): Path<String>) -> AppResult<Response> {
    state.storage.resolve(&filename)?;

    let attachment = AttachmentRepository::find_by_stored_name(&state.db, &filename)
        .await?
        .ok_or_else(|| AppError::NotFound("File".to_string()))?;
    let bytes = state.storage.read(&attachment.stored_name).await?;

    let disposition = format!("inline; filename=\"{}\"", header_safe(&attachment.original_name));

    Ok((
        [
            (header::CONTENT_TYPE, attachment.mime_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

/// Printable ASCII without quotes or backslashes, for the Content-Disposition filename
fn header_safe(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c == ' ' || c.is_ascii_graphic() => c,
            _ => '_',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_safe() {
        assert_eq!(header_safe("scan 1.pdf"), "scan 1.pdf");
        assert_eq!(header_safe("a\"b\\c\nd.png"), "a_b_c_d.png");
        assert_eq!(header_safe("reçu.pdf"), "re_u.pdf");
    }
}
