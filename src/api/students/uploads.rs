use std::time::Duration;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};

use crate::api::errors::ApiError;
use crate::api::guards::{require_staff_or_owner, CurrentUser};
use crate::api::students::fetch_student;
use crate::api::validation::validate_document_upload;
use crate::core::state::AppState;
use crate::db::models::{Student, User};
use crate::db::types::DocumentKind;
use crate::repositories;
use crate::schemas::student::{DocumentResponse, DownloadUrlResponse};
use crate::services::documents::{self, DocumentUpload};
use crate::services::storage::StorageService;

fn parse_kind(kind: &str) -> Result<DocumentKind, ApiError> {
    DocumentKind::parse(kind)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown document kind '{kind}'")))
}

fn require_storage(state: &AppState) -> Result<&StorageService, ApiError> {
    state
        .storage()
        .ok_or_else(|| ApiError::ServiceUnavailable("Document storage is not configured".to_string()))
}

/// Uploads and deletions are open to admins and to the student themself.
fn require_admin_or_owner(user: &User, student: &Student) -> Result<(), ApiError> {
    if user.is_admin() || student.user_id.as_deref() == Some(user.id.as_str()) {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Not allowed to change this student's documents"))
    }
}

fn sanitized_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '.' || *c == '_' || *c == '-')
        .collect();

    if sanitized.is_empty() {
        "document".to_string()
    } else {
        sanitized
    }
}

pub(in crate::api) async fn list_documents(
    Path(student_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<DocumentResponse>>, ApiError> {
    let student = fetch_student(&state, &student_id).await?;
    require_staff_or_owner(&user, &student)?;

    let stored = repositories::documents::list_for_student(state.db(), &student.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load documents"))?;

    Ok(Json(stored.into_iter().map(DocumentResponse::from_db).collect()))
}

pub(in crate::api) async fn upload_document(
    Path((student_id, kind)): Path<(String, String)>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<DocumentResponse>), ApiError> {
    let kind = parse_kind(&kind)?;
    let student = fetch_student(&state, &student_id).await?;
    require_admin_or_owner(&user, &student)?;
    let storage = require_storage(&state)?;

    let mut file_bytes: Option<Vec<u8>> = None;
    let mut filename: Option<String> = None;
    let mut content_type: Option<String> = None;
    let max_upload_size_mb = state.settings().storage().max_upload_size_mb;
    let max_bytes = max_upload_size_mb * 1024 * 1024;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::BadRequest("Invalid multipart data".to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        filename = field.file_name().map(|s| s.to_string());
        content_type = field.content_type().map(|s| s.to_string());
        let mut bytes = Vec::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|_| ApiError::BadRequest("Failed to read file".to_string()))?
        {
            let next_size = bytes.len() as u64 + chunk.len() as u64;
            if next_size > max_bytes {
                return Err(ApiError::BadRequest(format!(
                    "File size exceeds {max_upload_size_mb}MB limit"
                )));
            }
            bytes.extend_from_slice(&chunk);
        }
        file_bytes = Some(bytes);
    }

    let file_bytes =
        file_bytes.ok_or_else(|| ApiError::BadRequest("File is required".to_string()))?;
    if file_bytes.is_empty() {
        return Err(ApiError::BadRequest("File is empty".to_string()));
    }
    let filename = filename.unwrap_or_else(|| "document.pdf".to_string());
    let content_type = content_type.unwrap_or_else(|| "application/octet-stream".to_string());
    let extension = validate_document_upload(
        &filename,
        &content_type,
        &state.settings().storage().allowed_document_extensions,
    )?;

    let stored = documents::store_document(
        storage,
        state.db(),
        &student.id,
        kind,
        DocumentUpload {
            filename: sanitized_filename(&filename),
            content_type,
            extension,
            bytes: file_bytes,
        },
    )
    .await?;

    tracing::info!(
        user_id = %user.id,
        student_id = %student.id,
        kind = kind.as_str(),
        action = "document_upload",
        "Document uploaded"
    );

    Ok((StatusCode::CREATED, Json(DocumentResponse::from_db(stored))))
}

pub(in crate::api) async fn download_url(
    Path((student_id, kind)): Path<(String, String)>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<DownloadUrlResponse>, ApiError> {
    let kind = parse_kind(&kind)?;
    let student = fetch_student(&state, &student_id).await?;
    require_staff_or_owner(&user, &student)?;
    let storage = require_storage(&state)?;

    let document = repositories::documents::find(state.db(), &student.id, kind)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load document"))?
        .ok_or_else(|| ApiError::NotFound("Document not found".to_string()))?;

    let expires_in_seconds = state.settings().storage().presigned_url_expire_minutes * 60;
    let url = storage
        .presign_get(&document.storage_key, Duration::from_secs(expires_in_seconds))
        .await
        .map_err(|e| ApiError::internal(e, "Failed to generate download URL"))?;

    Ok(Json(DownloadUrlResponse { kind: kind.as_str().to_string(), url, expires_in_seconds }))
}

pub(in crate::api) async fn delete_document(
    Path((student_id, kind)): Path<(String, String)>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let kind = parse_kind(&kind)?;
    let student = fetch_student(&state, &student_id).await?;
    require_admin_or_owner(&user, &student)?;

    documents::remove_document(state.storage(), state.db(), &student.id, kind).await?;

    tracing::info!(
        user_id = %user.id,
        student_id = %student.id,
        kind = kind.as_str(),
        action = "document_delete",
        "Document deleted"
    );

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::sanitized_filename;

    #[test]
    fn sanitized_filename_filters_disallowed_chars() {
        assert_eq!(sanitized_filename("form 137 (copy)!.pdf"), "form137copy.pdf");
    }

    #[test]
    fn sanitized_filename_falls_back_on_empty() {
        assert_eq!(sanitized_filename("###"), "document");
    }
}
