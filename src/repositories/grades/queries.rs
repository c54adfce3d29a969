use sqlx::PgExecutor;

use crate::db::models::Grade;

use super::types::{TermSlot, COLUMNS};

/// Locks and returns the row occupying `slot`.
pub(crate) async fn find_slot_for_update<'e, E>(
    executor: E,
    slot: TermSlot<'_>,
) -> Result<Option<Grade>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Grade>(&format!(
        "SELECT {COLUMNS} FROM grades
         WHERE student_id = $1 AND subject_id = $2 AND semester = $3 AND academic_year = $4
         FOR UPDATE"
    ))
    .bind(slot.student_id)
    .bind(slot.subject_id)
    .bind(slot.semester)
    .bind(slot.academic_year)
    .fetch_optional(executor)
    .await
}

/// Oldest row of a subject for a student with the given activity flag, locked.
///
/// `term` narrows the lookup to one `(semester, academic_year)` pair.
pub(crate) async fn find_first_for_subject<'e, E>(
    executor: E,
    student_id: &str,
    subject_id: &str,
    is_active: bool,
    term: Option<(&str, &str)>,
) -> Result<Option<Grade>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let (semester, academic_year) = term.unzip();
    sqlx::query_as::<_, Grade>(&format!(
        "SELECT {COLUMNS} FROM grades
         WHERE student_id = $1 AND subject_id = $2 AND is_active = $3
           AND ($4::text IS NULL OR semester = $4)
           AND ($5::text IS NULL OR academic_year = $5)
         ORDER BY created_at, id
         LIMIT 1
         FOR UPDATE"
    ))
    .bind(student_id)
    .bind(subject_id)
    .bind(is_active)
    .bind(semester)
    .bind(academic_year)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn list_for_student<'e, E>(
    executor: E,
    student_id: &str,
) -> Result<Vec<Grade>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Grade>(&format!(
        "SELECT {COLUMNS} FROM grades
         WHERE student_id = $1
         ORDER BY academic_year, semester, created_at, id"
    ))
    .bind(student_id)
    .fetch_all(executor)
    .await
}
