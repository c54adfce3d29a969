use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::db::models::Department;

const COLUMNS: &str = "id, name, created_at";

pub(crate) const FALLBACK_DEPARTMENT: &str = "General Studies";

pub(crate) async fn list(pool: &PgPool) -> Result<Vec<Department>, sqlx::Error> {
    sqlx::query_as::<_, Department>(&format!("SELECT {COLUMNS} FROM departments ORDER BY name"))
        .fetch_all(pool)
        .await
}

pub(crate) async fn find_by_id<'e, E>(
    executor: E,
    id: &str,
) -> Result<Option<Department>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Department>(&format!("SELECT {COLUMNS} FROM departments WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn create(
    pool: &PgPool,
    name: &str,
    created_at: time::PrimitiveDateTime,
) -> Result<Department, sqlx::Error> {
    sqlx::query_as::<_, Department>(&format!(
        "INSERT INTO departments (id, name, created_at) VALUES ($1, $2, $3) RETURNING {COLUMNS}"
    ))
    .bind(Uuid::new_v4().to_string())
    .bind(name)
    .bind(created_at)
    .fetch_one(pool)
    .await
}

/// Returns the department with this name, creating it when missing.
pub(crate) async fn get_or_create_by_name<'e, E>(
    executor: E,
    name: &str,
    created_at: time::PrimitiveDateTime,
) -> Result<Department, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Department>(&format!(
        "INSERT INTO departments (id, name, created_at) VALUES ($1, $2, $3)
         ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
         RETURNING {COLUMNS}"
    ))
    .bind(Uuid::new_v4().to_string())
    .bind(name)
    .bind(created_at)
    .fetch_one(executor)
    .await
}

pub(crate) async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("DELETE FROM departments WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}
