use sqlx::{PgExecutor, PgPool};

use crate::db::models::{Student, Subject};
use crate::db::types::EnrollmentStatus;

const COLUMNS: &str = "\
    id, code, name, credits, department_id, course_id, semester_offered, year_level, \
    professor_name, lecture_hours, laboratory_hours, status, created_at, updated_at";

pub(crate) struct CreateSubject<'a> {
    pub(crate) id: &'a str,
    pub(crate) code: &'a str,
    pub(crate) name: &'a str,
    pub(crate) credits: i32,
    pub(crate) department_id: Option<&'a str>,
    pub(crate) course_id: &'a str,
    pub(crate) semester_offered: Option<&'a str>,
    pub(crate) year_level: Option<i32>,
    pub(crate) professor_name: Option<&'a str>,
    pub(crate) lecture_hours: i32,
    pub(crate) laboratory_hours: i32,
    pub(crate) created_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(
    pool: &PgPool,
    params: CreateSubject<'_>,
) -> Result<Subject, sqlx::Error> {
    sqlx::query_as::<_, Subject>(&format!(
        "INSERT INTO subjects (
            id, code, name, credits, department_id, course_id, semester_offered, year_level,
            professor_name, lecture_hours, laboratory_hours, status, created_at, updated_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$13)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.code)
    .bind(params.name)
    .bind(params.credits)
    .bind(params.department_id)
    .bind(params.course_id)
    .bind(params.semester_offered)
    .bind(params.year_level)
    .bind(params.professor_name)
    .bind(params.lecture_hours)
    .bind(params.laboratory_hours)
    .bind(EnrollmentStatus::CurrentlyTaking)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_by_id<'e, E>(
    executor: E,
    id: &str,
) -> Result<Option<Subject>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Subject>(&format!("SELECT {COLUMNS} FROM subjects WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Subjects of a course in their normal offering order.
pub(crate) async fn list_for_course<'e, E>(
    executor: E,
    course_id: &str,
) -> Result<Vec<Subject>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Subject>(&format!(
        "SELECT {COLUMNS} FROM subjects
         WHERE course_id = $1
         ORDER BY year_level NULLS LAST, semester_offered NULLS LAST, name"
    ))
    .bind(course_id)
    .fetch_all(executor)
    .await
}

/// Subjects offered by a course or belonging to a department, for a student's own view.
pub(crate) async fn list_for_course_or_department(
    pool: &PgPool,
    course_id: Option<&str>,
    department_id: Option<&str>,
) -> Result<Vec<Subject>, sqlx::Error> {
    sqlx::query_as::<_, Subject>(&format!(
        "SELECT {COLUMNS} FROM subjects
         WHERE course_id = $1 OR department_id = $2
         ORDER BY year_level NULLS LAST, semester_offered NULLS LAST, name"
    ))
    .bind(course_id)
    .bind(department_id)
    .fetch_all(pool)
    .await
}

/// Every subject that `student_id` has a grade row for, active or not.
pub(crate) async fn list_for_student<'e, E>(
    executor: E,
    student_id: &str,
) -> Result<Vec<Subject>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Subject>(&format!(
        "SELECT {COLUMNS} FROM subjects
         WHERE id IN (SELECT subject_id FROM grades WHERE student_id = $1)
         ORDER BY year_level NULLS LAST, name"
    ))
    .bind(student_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn list(
    pool: &PgPool,
    search: Option<&str>,
    course_id: Option<&str>,
) -> Result<Vec<Subject>, sqlx::Error> {
    let pattern = search
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| format!("%{value}%"));
    sqlx::query_as::<_, Subject>(&format!(
        "SELECT {COLUMNS} FROM subjects
         WHERE ($1::text IS NULL OR name ILIKE $1 OR code ILIKE $1 OR professor_name ILIKE $1)
           AND ($2::text IS NULL OR course_id = $2)
         ORDER BY name"
    ))
    .bind(pattern)
    .bind(course_id)
    .fetch_all(pool)
    .await
}

pub(crate) struct UpdateSubject {
    pub(crate) code: Option<String>,
    pub(crate) name: Option<String>,
    pub(crate) credits: Option<i32>,
    pub(crate) department_id: Option<String>,
    pub(crate) course_id: Option<String>,
    pub(crate) semester_offered: Option<String>,
    pub(crate) year_level: Option<i32>,
    pub(crate) professor_name: Option<String>,
    pub(crate) lecture_hours: Option<i32>,
    pub(crate) laboratory_hours: Option<i32>,
    pub(crate) status: Option<EnrollmentStatus>,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    params: UpdateSubject,
) -> Result<Option<Subject>, sqlx::Error> {
    sqlx::query_as::<_, Subject>(&format!(
        "UPDATE subjects SET
            code = COALESCE($1, code),
            name = COALESCE($2, name),
            credits = COALESCE($3, credits),
            department_id = COALESCE($4, department_id),
            course_id = COALESCE($5, course_id),
            semester_offered = COALESCE($6, semester_offered),
            year_level = COALESCE($7, year_level),
            professor_name = COALESCE($8, professor_name),
            lecture_hours = COALESCE($9, lecture_hours),
            laboratory_hours = COALESCE($10, laboratory_hours),
            status = COALESCE($11, status),
            updated_at = $12
         WHERE id = $13
         RETURNING {COLUMNS}"
    ))
    .bind(params.code)
    .bind(params.name)
    .bind(params.credits)
    .bind(params.department_id)
    .bind(params.course_id)
    .bind(params.semester_offered)
    .bind(params.year_level)
    .bind(params.professor_name)
    .bind(params.lecture_hours)
    .bind(params.laboratory_hours)
    .bind(params.status)
    .bind(params.updated_at)
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Writes the subject-level status. Returns whether the stored value changed.
pub(crate) async fn set_status<'e, E>(
    executor: E,
    id: &str,
    status: EnrollmentStatus,
    updated_at: time::PrimitiveDateTime,
) -> Result<bool, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query(
        "UPDATE subjects SET status = $1, updated_at = $2 WHERE id = $3 AND status <> $1",
    )
    .bind(status)
    .bind(updated_at)
    .bind(id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM subjects WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

/// Students holding an active grade row for the subject.
pub(crate) async fn roster(pool: &PgPool, subject_id: &str) -> Result<Vec<Student>, sqlx::Error> {
    sqlx::query_as::<_, Student>(&format!(
        "SELECT {} FROM students
         WHERE id IN (SELECT student_id FROM grades WHERE subject_id = $1 AND is_active)
         ORDER BY last_name, first_name",
        crate::repositories::students::COLUMNS
    ))
    .bind(subject_id)
    .fetch_all(pool)
    .await
}
