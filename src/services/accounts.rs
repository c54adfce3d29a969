//! Self-service registration and account activation.
//!
//! New accounts start inactive and carry a single-use activation token. Delivering the
//! token (e-mail) is left to the caller.

use sqlx::{PgConnection, PgPool};
use thiserror::Error;
use time::{Duration, PrimitiveDateTime};
use uuid::Uuid;

use crate::core::security::{self, SecurityError};
use crate::core::time::primitive_now_utc;
use crate::db::is_unique_violation;
use crate::db::models::{Student, User};
use crate::db::types::UserRole;
use crate::repositories;
use crate::repositories::students::{CreateStudent, StudentFields};
use crate::repositories::users::CreateUser;
use crate::services::enrollment::{self, AssignmentOutcome};

#[derive(Debug, Error)]
pub(crate) enum AccountError {
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Activation link is invalid!")]
    InvalidActivationToken,
    #[error(transparent)]
    Security(#[from] SecurityError),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Debug)]
pub(crate) struct NewAccount {
    pub(crate) username: String,
    pub(crate) email: String,
    pub(crate) password: String,
    pub(crate) full_name: String,
}

#[derive(Debug)]
pub(crate) struct StudentRegistration {
    pub(crate) account: NewAccount,
    pub(crate) student_number: String,
    pub(crate) profile: StudentFields,
}

#[derive(Debug)]
pub(crate) struct Registered {
    pub(crate) user: User,
    pub(crate) student: Option<Student>,
    pub(crate) assignment: Option<AssignmentOutcome>,
    /// Plain activation token; only its hash is stored.
    pub(crate) activation_token: String,
}

/// Creates an inactive student account together with its profile, assigning the subjects
/// of the chosen course, in one transaction.
pub(crate) async fn register_student(
    pool: &PgPool,
    token_ttl: Duration,
    registration: StudentRegistration,
) -> Result<Registered, AccountError> {
    let StudentRegistration { account, student_number, mut profile } = registration;
    ensure_identity_free(pool, &account).await?;
    if repositories::students::student_number_taken(pool, &student_number).await? {
        return Err(AccountError::Conflict("Student number is already registered".to_string()));
    }

    let now = primitive_now_utc();
    let mut tx = pool.begin().await?;
    if let Some(message) = enrollment::missing_reference(&mut tx, &profile).await? {
        return Err(AccountError::NotFound(message.to_string()));
    }
    let user = insert_inactive_user(&mut tx, &account, UserRole::Student, now).await?;

    profile.email = Some(account.email.clone());
    let student = repositories::students::create(
        &mut *tx,
        CreateStudent {
            id: &Uuid::new_v4().to_string(),
            user_id: Some(&user.id),
            student_number: &student_number,
            fields: profile,
            created_at: now,
        },
    )
    .await
    .map_err(conflict_on_unique("Student number is already registered"))?;

    let assignment = if enrollment::should_assign(true, None, student.course_id.as_deref()) {
        Some(enrollment::assign_course_subjects(&mut tx, &student, now).await?)
    } else {
        None
    };

    let activation_token = issue_activation_token(&mut tx, &user.id, token_ttl, now).await?;
    tx.commit().await?;

    tracing::info!(
        user_id = %user.id,
        student_id = %student.id,
        "Student registered, awaiting activation"
    );
    Ok(Registered { user, student: Some(student), assignment, activation_token })
}

/// Creates an inactive staff account.
pub(crate) async fn register_staff(
    pool: &PgPool,
    token_ttl: Duration,
    account: NewAccount,
) -> Result<Registered, AccountError> {
    ensure_identity_free(pool, &account).await?;

    let now = primitive_now_utc();
    let mut tx = pool.begin().await?;
    let user = insert_inactive_user(&mut tx, &account, UserRole::Staff, now).await?;
    let activation_token = issue_activation_token(&mut tx, &user.id, token_ttl, now).await?;
    tx.commit().await?;

    tracing::info!(user_id = %user.id, "Staff registered, awaiting activation");
    Ok(Registered { user, student: None, assignment: None, activation_token })
}

/// Consumes an activation token and activates its account.
pub(crate) async fn activate(pool: &PgPool, token: &str) -> Result<User, AccountError> {
    let now = primitive_now_utc();
    let mut tx = pool.begin().await?;
    let token_hash = security::hash_activation_token(token);
    let consumed = repositories::activation_tokens::consume(&mut *tx, &token_hash, now)
        .await?
        .ok_or(AccountError::InvalidActivationToken)?;

    let user = repositories::users::update(
        &mut *tx,
        &consumed.user_id,
        repositories::users::UpdateUser {
            email: None,
            full_name: None,
            role: None,
            is_active: Some(true),
            hashed_password: None,
            updated_at: now,
        },
    )
    .await?
    .ok_or(AccountError::InvalidActivationToken)?;
    tx.commit().await?;

    tracing::info!(
        user_id = %user.id,
        token_age_seconds = (now - consumed.created_at).whole_seconds(),
        "Account activated"
    );
    Ok(user)
}

async fn ensure_identity_free(pool: &PgPool, account: &NewAccount) -> Result<(), AccountError> {
    let email = Some(account.email.as_str());
    if repositories::users::identity_taken(pool, &account.username, email).await? {
        return Err(AccountError::Conflict(
            "An account with this username or email already exists".to_string(),
        ));
    }
    Ok(())
}

async fn insert_inactive_user(
    conn: &mut PgConnection,
    account: &NewAccount,
    role: UserRole,
    now: PrimitiveDateTime,
) -> Result<User, AccountError> {
    let hashed_password = security::hash_password(&account.password)?;
    repositories::users::create(
        conn,
        CreateUser {
            id: &Uuid::new_v4().to_string(),
            username: &account.username,
            email: Some(&account.email),
            hashed_password,
            full_name: &account.full_name,
            role,
            is_active: false,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(conflict_on_unique("An account with this username or email already exists"))
}

async fn issue_activation_token(
    conn: &mut PgConnection,
    user_id: &str,
    ttl: Duration,
    now: PrimitiveDateTime,
) -> Result<String, AccountError> {
    let token = security::generate_activation_token();
    repositories::activation_tokens::create(
        conn,
        &security::hash_activation_token(&token),
        user_id,
        now + ttl,
        now,
    )
    .await?;
    Ok(token)
}

fn conflict_on_unique(message: &'static str) -> impl Fn(sqlx::Error) -> AccountError {
    move |err| {
        if is_unique_violation(&err) {
            AccountError::Conflict(message.to_string())
        } else {
            AccountError::Database(err)
        }
    }
}
