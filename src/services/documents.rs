use sqlx::PgPool;

use crate::core::time::primitive_now_utc;
use crate::db::models::StudentDocument;
use crate::db::types::DocumentKind;
use crate::repositories;
use crate::repositories::documents::UpsertDocument;
use crate::services::errors::RecordsError;
use crate::services::storage::{document_key, StorageService};

/// A validated file received from a client.
#[derive(Debug)]
pub(crate) struct DocumentUpload {
    pub(crate) filename: String,
    pub(crate) content_type: String,
    pub(crate) extension: String,
    pub(crate) bytes: Vec<u8>,
}

/// Stores a document of one kind for a student, replacing any previous one.
///
/// The replaced object is deleted after the metadata switch; a failure there only leaves
/// an orphan object behind and is logged.
pub(crate) async fn store_document(
    storage: &StorageService,
    pool: &PgPool,
    student_id: &str,
    kind: DocumentKind,
    upload: DocumentUpload,
) -> Result<StudentDocument, RecordsError> {
    if repositories::students::find_by_id(pool, student_id).await?.is_none() {
        return Err(RecordsError::not_found("Student not found"));
    }

    let key = document_key(student_id, kind, &upload.extension);
    let (size_bytes, sha256) = storage
        .upload_bytes(&key, &upload.content_type, upload.bytes)
        .await
        .map_err(|e| RecordsError::Storage(format!("{e:#}")))?;

    let previous = match repositories::documents::upsert(
        pool,
        UpsertDocument {
            student_id,
            kind,
            storage_key: &key,
            filename: &upload.filename,
            content_type: &upload.content_type,
            size_bytes,
            sha256: &sha256,
            uploaded_at: primitive_now_utc(),
        },
    )
    .await
    {
        Ok(previous) => previous,
        Err(err) => {
            discard_object(storage, &key).await;
            return Err(err.into());
        }
    };

    if let Some(previous) = previous {
        discard_object(storage, &previous).await;
    }

    tracing::info!(
        student_id,
        kind = kind.as_str(),
        size_bytes,
        "Student document stored"
    );
    repositories::documents::find(pool, student_id, kind)
        .await?
        .ok_or_else(|| RecordsError::not_found("Document not found"))
}

/// Removes the stored object first, then its metadata row.
pub(crate) async fn remove_document(
    storage: Option<&StorageService>,
    pool: &PgPool,
    student_id: &str,
    kind: DocumentKind,
) -> Result<(), RecordsError> {
    let document = repositories::documents::find(pool, student_id, kind)
        .await?
        .ok_or_else(|| RecordsError::not_found("Document not found"))?;

    if let Some(storage) = storage {
        storage
            .delete_object(&document.storage_key)
            .await
            .map_err(|e| RecordsError::Storage(format!("{e:#}")))?;
    }
    repositories::documents::delete(pool, student_id, kind).await?;

    tracing::info!(student_id, kind = kind.as_str(), "Student document deleted");
    Ok(())
}

/// Deletes a student (grades and document rows cascade) and then their stored objects.
pub(crate) async fn delete_student(
    storage: Option<&StorageService>,
    pool: &PgPool,
    student_id: &str,
) -> Result<(), RecordsError> {
    let documents = repositories::documents::list_for_student(pool, student_id).await?;
    if !repositories::students::delete(pool, student_id).await? {
        return Err(RecordsError::not_found("Student not found"));
    }

    if let Some(storage) = storage {
        for document in &documents {
            discard_object(storage, &document.storage_key).await;
        }
    } else if !documents.is_empty() {
        tracing::warn!(
            student_id,
            count = documents.len(),
            "Storage not configured; document objects left in place"
        );
    }

    tracing::info!(student_id, documents = documents.len(), "Student deleted");
    Ok(())
}

async fn discard_object(storage: &StorageService, key: &str) {
    if let Err(err) = storage.delete_object(key).await {
        tracing::warn!(storage_key = key, error = %err, "Failed to delete stored object");
    }
}
