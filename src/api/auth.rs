use axum::{
    extract::{Form, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::api::validation::validate_password_len;
use crate::core::security;
use crate::core::state::AppState;
use crate::db::models::User;
use crate::repositories;
use crate::schemas::auth::{
    ActivateRequest, SignupResponse, StaffSignup, StudentSignup, TokenResponse, UserLogin,
};
use crate::schemas::user::UserResponse;
use crate::services::accounts::{self, NewAccount, Registered, StudentRegistration};

/// Max attempts per window for auth endpoints (login/signup/token).
const AUTH_RATE_LIMIT: u64 = 10;
/// Rate limit window in seconds.
const AUTH_RATE_WINDOW_SECONDS: u64 = 60;

#[derive(Debug, Deserialize)]
struct OAuth2PasswordForm {
    username: String,
    password: String,
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/signup/student", post(signup_student))
        .route("/signup/staff", post(signup_staff))
        .route("/activate", post(activate))
        .route("/login", post(login))
        .route("/token", post(token))
        .route("/me", get(me))
}

async fn signup_student(
    State(state): State<AppState>,
    Json(payload): Json<StudentSignup>,
) -> Result<(StatusCode, Json<SignupResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    validate_password_len(&payload.password)?;
    enforce_rate_limit(&state, "signup", &payload.username, "Too many signup attempts, try again later")
        .await?;

    let profile = payload.profile.into_fields().map_err(ApiError::BadRequest)?;
    let full_name = [profile.first_name.as_deref(), profile.last_name.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");

    let registered = accounts::register_student(
        state.db(),
        activation_ttl(&state),
        StudentRegistration {
            account: NewAccount {
                full_name: if full_name.is_empty() { payload.username.clone() } else { full_name },
                username: payload.username,
                email: payload.email,
                password: payload.password,
            },
            student_number: payload.student_number,
            profile,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(signup_response(&state, registered))))
}

async fn signup_staff(
    State(state): State<AppState>,
    Json(payload): Json<StaffSignup>,
) -> Result<(StatusCode, Json<SignupResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    validate_password_len(&payload.password)?;
    enforce_rate_limit(&state, "signup", &payload.username, "Too many signup attempts, try again later")
        .await?;

    let registered = accounts::register_staff(
        state.db(),
        activation_ttl(&state),
        NewAccount {
            username: payload.username,
            email: payload.email,
            password: payload.password,
            full_name: payload.full_name,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(signup_response(&state, registered))))
}

async fn activate(
    State(state): State<AppState>,
    Json(payload): Json<ActivateRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = accounts::activate(state.db(), payload.token.trim()).await?;
    Ok(Json(UserResponse::from_db(user)))
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<UserLogin>,
) -> Result<Json<TokenResponse>, ApiError> {
    enforce_rate_limit(&state, "login", &payload.username, "Too many login attempts, try again later")
        .await?;
    let user = authenticate(&state, &payload.username, &payload.password).await?;
    issue_token(&state, user)
}

async fn token(
    State(state): State<AppState>,
    Form(payload): Form<OAuth2PasswordForm>,
) -> Result<Json<TokenResponse>, ApiError> {
    enforce_rate_limit(&state, "token", &payload.username, "Too many token attempts, try again later")
        .await?;
    let user = authenticate(&state, &payload.username, &payload.password).await?;
    issue_token(&state, user)
}

async fn me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(UserResponse::from_db(user))
}

async fn enforce_rate_limit(
    state: &AppState,
    scope: &str,
    subject: &str,
    message: &'static str,
) -> Result<(), ApiError> {
    let rate_key = format!("rl:{scope}:{}", subject.trim().to_lowercase());
    let allowed = state
        .redis()
        .rate_limit(&rate_key, AUTH_RATE_LIMIT, AUTH_RATE_WINDOW_SECONDS)
        .await
        .unwrap_or(true);
    if allowed {
        Ok(())
    } else {
        Err(ApiError::TooManyRequests(message))
    }
}

async fn authenticate(state: &AppState, login: &str, password: &str) -> Result<User, ApiError> {
    let user = repositories::users::find_by_login(state.db(), login.trim())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load user"))?
        .ok_or(ApiError::Unauthorized("Incorrect username or password"))?;

    let verified = security::verify_password(password, &user.hashed_password)
        .map_err(|_| ApiError::Unauthorized("Incorrect username or password"))?;
    if !verified {
        return Err(ApiError::Unauthorized("Incorrect username or password"));
    }

    if !user.is_active {
        return Err(ApiError::BadRequest("Inactive user".to_string()));
    }

    Ok(user)
}

fn issue_token(state: &AppState, user: User) -> Result<Json<TokenResponse>, ApiError> {
    let token = security::create_access_token(&user.id, state.settings(), None)
        .map_err(|e| ApiError::internal(e, "Failed to create access token"))?;

    Ok(Json(TokenResponse {
        access_token: token,
        token_type: "bearer".to_string(),
        user: UserResponse::from_db(user),
    }))
}

fn activation_ttl(state: &AppState) -> time::Duration {
    let hours = state.settings().security().activation_token_expire_hours;
    time::Duration::hours(i64::try_from(hours).unwrap_or(i64::MAX / 3600))
}

fn signup_response(state: &AppState, registered: Registered) -> SignupResponse {
    let Registered { user, student, assignment, activation_token } = registered;
    let expose_token = !state.settings().runtime().environment.is_production();

    SignupResponse {
        message: "Account created. Activate it with the activation link before logging in."
            .to_string(),
        user: UserResponse::from_db(user),
        student_id: student.map(|student| student.id),
        assignment,
        activation_token: expose_token.then_some(activation_token),
    }
}

#[cfg(test)]
mod tests;
