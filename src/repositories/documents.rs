use sqlx::PgPool;

use crate::db::models::StudentDocument;
use crate::db::types::DocumentKind;

const COLUMNS: &str =
    "student_id, kind, storage_key, filename, content_type, size_bytes, sha256, uploaded_at";

pub(crate) struct UpsertDocument<'a> {
    pub(crate) student_id: &'a str,
    pub(crate) kind: DocumentKind,
    pub(crate) storage_key: &'a str,
    pub(crate) filename: &'a str,
    pub(crate) content_type: &'a str,
    pub(crate) size_bytes: i64,
    pub(crate) sha256: &'a str,
    pub(crate) uploaded_at: time::PrimitiveDateTime,
}

pub(crate) async fn list_for_student(
    pool: &PgPool,
    student_id: &str,
) -> Result<Vec<StudentDocument>, sqlx::Error> {
    sqlx::query_as::<_, StudentDocument>(&format!(
        "SELECT {COLUMNS} FROM student_documents WHERE student_id = $1 ORDER BY kind"
    ))
    .bind(student_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn find(
    pool: &PgPool,
    student_id: &str,
    kind: DocumentKind,
) -> Result<Option<StudentDocument>, sqlx::Error> {
    sqlx::query_as::<_, StudentDocument>(&format!(
        "SELECT {COLUMNS} FROM student_documents WHERE student_id = $1 AND kind = $2"
    ))
    .bind(student_id)
    .bind(kind.as_str())
    .fetch_optional(pool)
    .await
}

/// Stores the document metadata and returns the storage key it replaced, if any.
pub(crate) async fn upsert(
    pool: &PgPool,
    params: UpsertDocument<'_>,
) -> Result<Option<String>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let previous = sqlx::query_scalar::<_, String>(
        "SELECT storage_key FROM student_documents
         WHERE student_id = $1 AND kind = $2
         FOR UPDATE",
    )
    .bind(params.student_id)
    .bind(params.kind.as_str())
    .fetch_optional(&mut *tx)
    .await?;

    sqlx::query(
        "INSERT INTO student_documents (
            student_id, kind, storage_key, filename, content_type, size_bytes, sha256, uploaded_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
         ON CONFLICT (student_id, kind) DO UPDATE SET
            storage_key = EXCLUDED.storage_key,
            filename = EXCLUDED.filename,
            content_type = EXCLUDED.content_type,
            size_bytes = EXCLUDED.size_bytes,
            sha256 = EXCLUDED.sha256,
            uploaded_at = EXCLUDED.uploaded_at",
    )
    .bind(params.student_id)
    .bind(params.kind.as_str())
    .bind(params.storage_key)
    .bind(params.filename)
    .bind(params.content_type)
    .bind(params.size_bytes)
    .bind(params.sha256)
    .bind(params.uploaded_at)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(previous.filter(|key| key != params.storage_key))
}

pub(crate) async fn delete(
    pool: &PgPool,
    student_id: &str,
    kind: DocumentKind,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "DELETE FROM student_documents WHERE student_id = $1 AND kind = $2 RETURNING storage_key",
    )
    .bind(student_id)
    .bind(kind.as_str())
    .fetch_optional(pool)
    .await
}
