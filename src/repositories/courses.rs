use sqlx::{PgExecutor, PgPool};

use crate::db::models::Course;

const COURSE_COLUMNS: &str = "id, code, name, credits, department_id, created_at, updated_at";

pub(crate) struct CreateCourse<'a> {
    pub(crate) id: &'a str,
    pub(crate) code: &'a str,
    pub(crate) name: &'a str,
    pub(crate) credits: i32,
    pub(crate) department_id: &'a str,
    pub(crate) created_at: time::PrimitiveDateTime,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) struct UpdateCourse {
    pub(crate) code: Option<String>,
    pub(crate) name: Option<String>,
    pub(crate) credits: Option<i32>,
    pub(crate) department_id: Option<String>,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn create<'e, E>(
    executor: E,
    params: CreateCourse<'_>,
) -> Result<Course, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Course>(&format!(
        "INSERT INTO courses (id, code, name, credits, department_id, created_at, updated_at)
         VALUES ($1,$2,$3,$4,$5,$6,$7)
         RETURNING {COURSE_COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.code)
    .bind(params.name)
    .bind(params.credits)
    .bind(params.department_id)
    .bind(params.created_at)
    .bind(params.updated_at)
    .fetch_one(executor)
    .await
}

pub(crate) async fn find_by_id<'e, E>(
    executor: E,
    course_id: &str,
) -> Result<Option<Course>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Course>(&format!("SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1"))
        .bind(course_id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn list(pool: &PgPool, search: Option<&str>) -> Result<Vec<Course>, sqlx::Error> {
    let pattern = search
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| format!("%{value}%"));
    sqlx::query_as::<_, Course>(&format!(
        "SELECT {COURSE_COLUMNS} FROM courses
         WHERE $1::text IS NULL OR name ILIKE $1 OR code ILIKE $1
         ORDER BY name"
    ))
    .bind(pattern)
    .fetch_all(pool)
    .await
}

pub(crate) async fn update(
    pool: &PgPool,
    course_id: &str,
    params: UpdateCourse,
) -> Result<Option<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(&format!(
        "UPDATE courses SET
            code = COALESCE($1, code),
            name = COALESCE($2, name),
            credits = COALESCE($3, credits),
            department_id = COALESCE($4, department_id),
            updated_at = $5
         WHERE id = $6
         RETURNING {COURSE_COLUMNS}"
    ))
    .bind(params.code)
    .bind(params.name)
    .bind(params.credits)
    .bind(params.department_id)
    .bind(params.updated_at)
    .bind(course_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn delete(pool: &PgPool, course_id: &str) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("DELETE FROM courses WHERE id = $1").bind(course_id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}
