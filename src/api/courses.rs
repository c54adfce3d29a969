use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentAdmin, CurrentUser};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::is_foreign_key_violation;
use crate::repositories;
use crate::repositories::departments::FALLBACK_DEPARTMENT;
use crate::schemas::catalog::{CourseCreate, CourseResponse, CourseUpdate, SubjectResponse};

#[derive(Debug, Deserialize)]
pub(crate) struct CourseListQuery {
    #[serde(default)]
    search: Option<String>,
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_courses).post(create_course))
        .route("/:course_id", get(get_course).patch(update_course).delete(delete_course))
        .route("/:course_id/subjects", get(list_course_subjects))
}

async fn list_courses(
    Query(params): Query<CourseListQuery>,
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<CourseResponse>>, ApiError> {
    let courses = repositories::courses::list(state.db(), params.search.as_deref())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list courses"))?;

    Ok(Json(courses.into_iter().map(CourseResponse::from_db).collect()))
}

async fn create_course(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<CourseCreate>,
) -> Result<(StatusCode, Json<CourseResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let now = primitive_now_utc();
    let department_name = payload
        .department_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(FALLBACK_DEPARTMENT);

    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;
    let department = repositories::departments::get_or_create_by_name(&mut *tx, department_name, now)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to resolve department"))?;

    let course = repositories::courses::create(
        &mut *tx,
        repositories::courses::CreateCourse {
            id: &Uuid::new_v4().to_string(),
            code: payload.code.trim(),
            name: payload.name.trim(),
            credits: payload.credits,
            department_id: &department.id,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create course"))?;
    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit course"))?;

    tracing::info!(
        admin_id = %admin.id,
        course_id = %course.id,
        department_id = %department.id,
        action = "course_create",
        "Course created"
    );

    Ok((StatusCode::CREATED, Json(CourseResponse::from_db(course))))
}

async fn get_course(
    Path(course_id): Path<String>,
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<CourseResponse>, ApiError> {
    let course = repositories::courses::find_by_id(state.db(), &course_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch course"))?
        .ok_or_else(|| ApiError::NotFound("Course not found".to_string()))?;

    Ok(Json(CourseResponse::from_db(course)))
}

async fn update_course(
    Path(course_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<CourseUpdate>,
) -> Result<Json<CourseResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let now = primitive_now_utc();
    let department_id = match payload.department_name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => Some(
            repositories::departments::get_or_create_by_name(state.db(), name, now)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to resolve department"))?
                .id,
        ),
        _ => None,
    };

    let course = repositories::courses::update(
        state.db(),
        &course_id,
        repositories::courses::UpdateCourse {
            code: payload.code.map(|code| code.trim().to_string()),
            name: payload.name.map(|name| name.trim().to_string()),
            credits: payload.credits,
            department_id,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update course"))?
    .ok_or_else(|| ApiError::NotFound("Course not found".to_string()))?;

    tracing::info!(
        admin_id = %admin.id,
        course_id = %course.id,
        action = "course_update",
        "Course updated"
    );

    Ok(Json(CourseResponse::from_db(course)))
}

async fn delete_course(
    Path(course_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let deleted = repositories::courses::delete(state.db(), &course_id).await.map_err(|e| {
        if is_foreign_key_violation(&e) {
            ApiError::Conflict("Course still has enrolled students".to_string())
        } else {
            ApiError::internal(e, "Failed to delete course")
        }
    })?;
    if !deleted {
        return Err(ApiError::NotFound("Course not found".to_string()));
    }

    tracing::info!(
        admin_id = %admin.id,
        course_id = %course_id,
        action = "course_delete",
        "Course deleted"
    );

    Ok(StatusCode::NO_CONTENT)
}

async fn list_course_subjects(
    Path(course_id): Path<String>,
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<SubjectResponse>>, ApiError> {
    let subjects = repositories::subjects::list_for_course(state.db(), &course_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list course subjects"))?;

    Ok(Json(subjects.into_iter().map(SubjectResponse::from_db).collect()))
}
