use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentAdmin, CurrentStaff, CurrentUser};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::is_foreign_key_violation;
use crate::repositories;
use crate::schemas::catalog::{
    RosterEntry, SubjectCreate, SubjectListQuery, SubjectResponse, SubjectUpdate,
};
use crate::services::grade_state::{non_blank, validate_write_semester};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_subjects).post(create_subject))
        .route("/:subject_id", get(get_subject).patch(update_subject).delete(delete_subject))
        .route("/:subject_id/students", get(subject_roster))
}

async fn list_subjects(
    Query(params): Query<SubjectListQuery>,
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<SubjectResponse>>, ApiError> {
    let subjects = repositories::subjects::list(
        state.db(),
        params.search.as_deref(),
        non_blank(params.course_id.as_deref()),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to list subjects"))?;

    Ok(Json(subjects.into_iter().map(SubjectResponse::from_db).collect()))
}

/// Normalizes an optional offering semester to its canonical label.
fn offered_semester(value: Option<&str>) -> Result<Option<String>, ApiError> {
    match non_blank(value) {
        Some(semester) => validate_write_semester(Some(semester))
            .map(Some)
            .map_err(|e| ApiError::BadRequest(e.to_string())),
        None => Ok(None),
    }
}

async fn ensure_department(state: &AppState, department_id: &str) -> Result<(), ApiError> {
    let department = repositories::departments::find_by_id(state.db(), department_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch department"))?;
    if department.is_none() {
        return Err(ApiError::NotFound("Department not found".to_string()));
    }
    Ok(())
}

async fn create_subject(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<SubjectCreate>,
) -> Result<(StatusCode, Json<SubjectResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let semester_offered = offered_semester(payload.semester_offered.as_deref())?;

    let course = repositories::courses::find_by_id(state.db(), &payload.course_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch course"))?
        .ok_or_else(|| ApiError::NotFound("Course not found".to_string()))?;

    let department_id = match non_blank(payload.department_id.as_deref()) {
        Some(department_id) => {
            ensure_department(&state, department_id).await?;
            department_id.to_string()
        }
        None => course.department_id.clone(),
    };

    let subject = repositories::subjects::create(
        state.db(),
        repositories::subjects::CreateSubject {
            id: &Uuid::new_v4().to_string(),
            code: payload.code.trim(),
            name: payload.name.trim(),
            credits: payload.credits,
            department_id: Some(&department_id),
            course_id: &course.id,
            semester_offered: semester_offered.as_deref(),
            year_level: payload.year_level,
            professor_name: non_blank(payload.professor_name.as_deref()),
            lecture_hours: payload.lecture_hours,
            laboratory_hours: payload.laboratory_hours,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create subject"))?;

    tracing::info!(
        admin_id = %admin.id,
        subject_id = %subject.id,
        course_id = %course.id,
        action = "subject_create",
        "Subject created"
    );

    Ok((StatusCode::CREATED, Json(SubjectResponse::from_db(subject))))
}

async fn get_subject(
    Path(subject_id): Path<String>,
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<SubjectResponse>, ApiError> {
    let subject = repositories::subjects::find_by_id(state.db(), &subject_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch subject"))?
        .ok_or_else(|| ApiError::NotFound("Subject not found".to_string()))?;

    Ok(Json(SubjectResponse::from_db(subject)))
}

async fn update_subject(
    Path(subject_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<SubjectUpdate>,
) -> Result<Json<SubjectResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let semester_offered = offered_semester(payload.semester_offered.as_deref())?;
    if let Some(department_id) = non_blank(payload.department_id.as_deref()) {
        ensure_department(&state, department_id).await?;
    }

    let subject = repositories::subjects::update(
        state.db(),
        &subject_id,
        repositories::subjects::UpdateSubject {
            code: payload.code.map(|code| code.trim().to_string()),
            name: payload.name.map(|name| name.trim().to_string()),
            credits: payload.credits,
            department_id: payload.department_id.filter(|id| !id.trim().is_empty()),
            course_id: payload.course_id.filter(|id| !id.trim().is_empty()),
            semester_offered,
            year_level: payload.year_level,
            professor_name: payload.professor_name,
            lecture_hours: payload.lecture_hours,
            laboratory_hours: payload.laboratory_hours,
            status: payload.status,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| {
        if is_foreign_key_violation(&e) {
            ApiError::NotFound("Course not found".to_string())
        } else {
            ApiError::internal(e, "Failed to update subject")
        }
    })?
    .ok_or_else(|| ApiError::NotFound("Subject not found".to_string()))?;

    tracing::info!(
        admin_id = %admin.id,
        subject_id = %subject.id,
        action = "subject_update",
        "Subject updated"
    );

    Ok(Json(SubjectResponse::from_db(subject)))
}

async fn delete_subject(
    Path(subject_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let deleted = repositories::subjects::delete(state.db(), &subject_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete subject"))?;
    if !deleted {
        return Err(ApiError::NotFound("Subject not found".to_string()));
    }

    tracing::info!(
        admin_id = %admin.id,
        subject_id = %subject_id,
        action = "subject_delete",
        "Subject deleted with its grade rows"
    );

    Ok(StatusCode::NO_CONTENT)
}

async fn subject_roster(
    Path(subject_id): Path<String>,
    CurrentStaff(_staff): CurrentStaff,
    State(state): State<AppState>,
) -> Result<Json<Vec<RosterEntry>>, ApiError> {
    let subject = repositories::subjects::find_by_id(state.db(), &subject_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch subject"))?;
    if subject.is_none() {
        return Err(ApiError::NotFound("Subject not found".to_string()));
    }

    let students = repositories::subjects::roster(state.db(), &subject_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load subject roster"))?;

    Ok(Json(students.into_iter().map(RosterEntry::from_db).collect()))
}
