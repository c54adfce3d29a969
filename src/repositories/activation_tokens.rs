use sqlx::PgExecutor;

use crate::db::models::ActivationToken;

pub(crate) async fn create<'e, E>(
    executor: E,
    token_hash: &str,
    user_id: &str,
    expires_at: time::PrimitiveDateTime,
    created_at: time::PrimitiveDateTime,
) -> Result<(), sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        "INSERT INTO account_activation_tokens (token_hash, user_id, expires_at, created_at)
         VALUES ($1, $2, $3, $4)",
    )
    .bind(token_hash)
    .bind(user_id)
    .bind(expires_at)
    .bind(created_at)
    .execute(executor)
    .await?;
    Ok(())
}

/// Marks an unused, unexpired token as used and returns it. Single use.
pub(crate) async fn consume<'e, E>(
    executor: E,
    token_hash: &str,
    now: time::PrimitiveDateTime,
) -> Result<Option<ActivationToken>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, ActivationToken>(
        "UPDATE account_activation_tokens
         SET used_at = $2
         WHERE token_hash = $1 AND used_at IS NULL AND expires_at > $2
         RETURNING user_id, created_at",
    )
    .bind(token_hash)
    .bind(now)
    .fetch_optional(executor)
    .await
}
