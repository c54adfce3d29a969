use crate::api::errors::ApiError;
use std::path::Path;

pub(crate) const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn validate_password_len(password: &str) -> Result<(), ApiError> {
    if password.chars().count() >= MIN_PASSWORD_LEN {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long"
        )))
    }
}

/// Checks a document's extension against the allow-list and its declared MIME type
/// against the extension. Returns the lowercased extension.
pub(crate) fn validate_document_upload(
    filename: &str,
    content_type: &str,
    allowed_extensions: &[String],
) -> Result<String, ApiError> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .ok_or_else(|| ApiError::BadRequest("File must have an extension".to_string()))?;

    if !allowed_extensions.iter().any(|allowed| allowed == &extension) {
        return Err(ApiError::BadRequest(format!("File extension '{extension}' is not allowed")));
    }

    let mime = content_type.trim().to_ascii_lowercase();
    if mime_allowed_for_extension(&mime, &extension) {
        Ok(extension)
    } else {
        Err(ApiError::BadRequest(format!(
            "MIME type '{mime}' does not match extension '.{extension}'"
        )))
    }
}

fn mime_allowed_for_extension(mime: &str, extension: &str) -> bool {
    match extension {
        "pdf" => mime == "application/pdf",
        "jpg" | "jpeg" => matches!(mime, "image/jpeg" | "image/jpg"),
        "png" => mime == "image/png",
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowed() -> Vec<String> {
        ["pdf", "jpg", "jpeg", "png"].iter().map(|ext| ext.to_string()).collect()
    }

    #[test]
    fn accepts_matching_extension_and_mime() {
        let ext = validate_document_upload("Form 137.PDF", "application/pdf", &allowed())
            .expect("valid pdf");
        assert_eq!(ext, "pdf");
        assert!(validate_document_upload("photo.jpeg", "image/jpg", &allowed()).is_ok());
    }

    #[test]
    fn rejects_unknown_extension_and_mismatched_mime() {
        assert!(validate_document_upload("notes.docx", "application/msword", &allowed()).is_err());
        assert!(validate_document_upload("scan.png", "application/pdf", &allowed()).is_err());
        assert!(validate_document_upload("noext", "application/pdf", &allowed()).is_err());
    }

    #[test]
    fn password_needs_minimum_length() {
        assert!(validate_password_len("short").is_err());
        assert!(validate_password_len("long-enough").is_ok());
    }
}
