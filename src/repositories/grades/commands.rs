use sqlx::PgExecutor;
use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::db::models::Grade;
use crate::db::types::EnrollmentStatus;

use super::types::{GradeWrite, NewGrade, COLUMNS};

/// Inserts the row unless its term slot is already taken. Returns whether a row was created.
pub(crate) async fn insert_if_absent<'e, E>(
    executor: E,
    params: NewGrade<'_>,
) -> Result<bool, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query(
        "INSERT INTO grades (
            id, student_id, subject_id, grade_value, semester, academic_year, year_level,
            is_active, status, created_at, updated_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$10)
         ON CONFLICT (student_id, subject_id, semester, academic_year) DO NOTHING",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(params.slot.student_id)
    .bind(params.slot.subject_id)
    .bind(params.grade_value)
    .bind(params.slot.semester)
    .bind(params.slot.academic_year)
    .bind(params.year_level)
    .bind(params.is_active)
    .bind(params.status)
    .bind(params.now)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn save<'e, E>(
    executor: E,
    grade_id: &str,
    params: GradeWrite,
) -> Result<Grade, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Grade>(&format!(
        "UPDATE grades SET
            grade_value = $1,
            semester = $2,
            academic_year = $3,
            year_level = $4,
            is_active = $5,
            status = $6,
            updated_at = $7
         WHERE id = $8
         RETURNING {COLUMNS}"
    ))
    .bind(params.grade_value)
    .bind(params.semester)
    .bind(params.academic_year)
    .bind(params.year_level)
    .bind(params.is_active)
    .bind(params.status)
    .bind(params.updated_at)
    .bind(grade_id)
    .fetch_one(executor)
    .await
}

pub(crate) async fn set_active<'e, E>(
    executor: E,
    grade_id: &str,
    is_active: bool,
    status: EnrollmentStatus,
    now: PrimitiveDateTime,
) -> Result<Grade, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Grade>(&format!(
        "UPDATE grades SET is_active = $1, status = $2, updated_at = $3
         WHERE id = $4
         RETURNING {COLUMNS}"
    ))
    .bind(is_active)
    .bind(status)
    .bind(now)
    .bind(grade_id)
    .fetch_one(executor)
    .await
}

/// Soft-deletes every active row of one subject for a student.
pub(crate) async fn deactivate_active_for_subject<'e, E>(
    executor: E,
    student_id: &str,
    subject_id: &str,
    now: PrimitiveDateTime,
) -> Result<u64, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query(
        "UPDATE grades SET is_active = FALSE, status = $1, updated_at = $2
         WHERE student_id = $3 AND subject_id = $4 AND is_active",
    )
    .bind(EnrollmentStatus::Drop)
    .bind(now)
    .bind(student_id)
    .bind(subject_id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

pub(crate) async fn delete_by_id<'e, E>(executor: E, grade_id: &str) -> Result<bool, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let result =
        sqlx::query("DELETE FROM grades WHERE id = $1").bind(grade_id).execute(executor).await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn delete_for_subject<'e, E>(
    executor: E,
    student_id: &str,
    subject_id: &str,
) -> Result<u64, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM grades WHERE student_id = $1 AND subject_id = $2")
        .bind(student_id)
        .bind(subject_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

/// Fills blank semester / academic year columns of a student's rows.
///
/// Rows whose fill would collide with an existing term slot are left alone.
pub(crate) async fn backfill_blank_terms<'e, E>(
    executor: E,
    student_id: &str,
    semester: &str,
    academic_year: &str,
    now: PrimitiveDateTime,
) -> Result<u64, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query(
        "UPDATE grades g SET
            semester = CASE WHEN btrim(g.semester) = '' THEN $2 ELSE g.semester END,
            academic_year = CASE WHEN btrim(g.academic_year) = '' THEN $3 ELSE g.academic_year END,
            updated_at = $4
         WHERE g.student_id = $1
           AND (btrim(g.semester) = '' OR btrim(g.academic_year) = '')
           AND NOT EXISTS (
               SELECT 1 FROM grades other
               WHERE other.student_id = g.student_id
                 AND other.subject_id = g.subject_id
                 AND other.id <> g.id
                 AND other.semester = CASE WHEN btrim(g.semester) = '' THEN $2 ELSE g.semester END
                 AND other.academic_year =
                     CASE WHEN btrim(g.academic_year) = '' THEN $3 ELSE g.academic_year END
           )",
    )
    .bind(student_id)
    .bind(semester)
    .bind(academic_year)
    .bind(now)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

/// Reactivates inactive rows sitting in the student's current year level and term,
/// recomputing their status from the stored grade value.
pub(crate) async fn reactivate_matching_slot<'e, E>(
    executor: E,
    student_id: &str,
    year_level: &str,
    semester: &str,
    academic_year: &str,
    now: PrimitiveDateTime,
) -> Result<u64, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query(
        "UPDATE grades SET
            is_active = TRUE,
            status = CASE WHEN grade_value IS NULL THEN $1 ELSE $2 END,
            updated_at = $3
         WHERE student_id = $4
           AND NOT is_active
           AND year_level = $5
           AND semester = $6
           AND academic_year = $7",
    )
    .bind(EnrollmentStatus::CurrentlyTaking)
    .bind(EnrollmentStatus::Done)
    .bind(now)
    .bind(student_id)
    .bind(year_level)
    .bind(semester)
    .bind(academic_year)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}
