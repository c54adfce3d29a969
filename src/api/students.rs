use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{
    own_student_profile, require_staff_or_owner, CurrentAdmin, CurrentStaff, CurrentUser,
};
use crate::core::state::AppState;
use crate::core::time::{current_academic_year, primitive_now_utc};
use crate::db::models::Student;
use crate::repositories;
use crate::repositories::students::CreateStudent;
use crate::schemas::catalog::CourseResponse;
use crate::schemas::student::{
    CourseStudentsResponse, CourseSubjectsResponse, GradesPageQuery, GradesPageResponse,
    StudentCreate, StudentListQuery, StudentProfile, StudentRecordResponse, StudentResponse,
    StudentWriteResponse, YearGroupResponse,
};
use crate::services::enrollment::{self, AssignmentOutcome};
use crate::services::grade_lifecycle::{self, ReconcileOutcome};
use crate::services::{documents, grouping};

mod uploads;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_students).post(create_student))
        .route("/me", get(my_profile))
        .route("/me/grades", get(my_grades))
        .route("/:student_id", get(get_student).patch(update_student).delete(delete_student))
        .route("/:student_id/record", get(student_record))
        .route("/:student_id/course-subjects", get(course_subjects))
        .route("/:student_id/assign-subjects", post(assign_subjects))
        .route("/:student_id/reconcile", post(reconcile_student))
        .route("/:student_id/documents", get(uploads::list_documents))
        .route(
            "/:student_id/documents/:kind",
            post(uploads::upload_document).delete(uploads::delete_document),
        )
        .route("/:student_id/documents/:kind/download", get(uploads::download_url))
}

pub(in crate::api) async fn fetch_student(
    state: &AppState,
    student_id: &str,
) -> Result<Student, ApiError> {
    repositories::students::find_by_id(state.db(), student_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch student"))?
        .ok_or_else(|| ApiError::NotFound("Student not found".to_string()))
}

async fn list_students(
    Query(params): Query<StudentListQuery>,
    CurrentStaff(_staff): CurrentStaff,
    State(state): State<AppState>,
) -> Result<Json<Vec<CourseStudentsResponse>>, ApiError> {
    let rows = repositories::students::list(state.db(), params.search.as_deref())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list students"))?;

    Ok(Json(
        grouping::group_students_by_course(rows)
            .into_iter()
            .map(CourseStudentsResponse::from_group)
            .collect(),
    ))
}

async fn create_student(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<StudentCreate>,
) -> Result<(StatusCode, Json<StudentWriteResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let student_number = payload.student_number.trim().to_string();
    let mut fields = payload.profile.into_fields().map_err(ApiError::BadRequest)?;
    if fields.first_name.is_none() || fields.last_name.is_none() {
        return Err(ApiError::BadRequest("first_name and last_name are required".to_string()));
    }
    if fields.academic_year.is_none() {
        fields.academic_year = Some(current_academic_year());
    }

    let taken = repositories::students::student_number_taken(state.db(), &student_number)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check student number"))?;
    if taken {
        return Err(ApiError::Conflict("Student number is already registered".to_string()));
    }

    let user_id = match payload.user_email.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
        Some(email) => Some(linkable_user(&state, email).await?),
        None => None,
    };
    if fields.email.is_none() {
        fields.email = payload.user_email.clone().filter(|email| !email.trim().is_empty());
    }

    let write = enrollment::create_student(
        state.db(),
        CreateStudent {
            id: &Uuid::new_v4().to_string(),
            user_id: user_id.as_deref(),
            student_number: &student_number,
            fields,
            created_at: primitive_now_utc(),
        },
    )
    .await?;

    tracing::info!(
        admin_id = %admin.id,
        student_id = %write.student.id,
        action = "student_create",
        "Student created"
    );

    Ok((StatusCode::CREATED, Json(StudentWriteResponse::from_write(write))))
}

/// Account the new profile links to; it must exist and not own a profile yet.
async fn linkable_user(state: &AppState, email: &str) -> Result<String, ApiError> {
    let user = repositories::users::find_by_email(state.db(), email)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to look up user"))?
        .ok_or_else(|| ApiError::NotFound("User with this email not found".to_string()))?;

    let existing = repositories::students::find_by_user_id(state.db(), &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load student profile"))?;
    if existing.is_some() {
        return Err(ApiError::Conflict("User already has a student profile".to_string()));
    }
    Ok(user.id)
}

async fn my_profile(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<StudentResponse>, ApiError> {
    let student = own_student_profile(&state, &user).await?;
    Ok(Json(StudentResponse::from_db(student)))
}

async fn my_grades(
    Query(params): Query<GradesPageQuery>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<GradesPageResponse>, ApiError> {
    let student = own_student_profile(&state, &user).await?;

    let subjects = repositories::subjects::list_for_course_or_department(
        state.db(),
        student.course_id.as_deref(),
        student.department_id.as_deref(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to load subjects"))?;
    let grades = repositories::grades::list_for_student(state.db(), &student.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load grades"))?;

    let years = grouping::group_by_year_and_semester(grouping::pair_with_active_grades(
        subjects, &grades,
    ));
    let page = params.page.as_deref().and_then(|page| page.trim().parse::<usize>().ok());

    Ok(Json(GradesPageResponse::new(student, grouping::paginate_years(years, page))))
}

async fn get_student(
    Path(student_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<StudentResponse>, ApiError> {
    let student = fetch_student(&state, &student_id).await?;
    require_staff_or_owner(&user, &student)?;
    Ok(Json(StudentResponse::from_db(student)))
}

async fn update_student(
    Path(student_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<StudentProfile>,
) -> Result<Json<StudentWriteResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let fields = payload.into_fields().map_err(ApiError::BadRequest)?;

    let write =
        enrollment::update_student(state.db(), state.grade_policy(), &student_id, fields).await?;

    tracing::info!(
        admin_id = %admin.id,
        student_id = %write.student.id,
        action = "student_update",
        "Student updated"
    );

    Ok(Json(StudentWriteResponse::from_write(write)))
}

async fn delete_student(
    Path(student_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    documents::delete_student(state.storage(), state.db(), &student_id).await?;

    tracing::info!(
        admin_id = %admin.id,
        student_id = %student_id,
        action = "student_delete",
        "Student deleted"
    );

    Ok(StatusCode::NO_CONTENT)
}

async fn student_record(
    Path(student_id): Path<String>,
    CurrentStaff(_staff): CurrentStaff,
    State(state): State<AppState>,
) -> Result<Json<StudentRecordResponse>, ApiError> {
    let student = fetch_student(&state, &student_id).await?;

    let subjects = repositories::subjects::list_for_student(state.db(), &student.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load subjects"))?;
    let grades = repositories::grades::list_for_student(state.db(), &student.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load grades"))?;
    let stored = repositories::documents::list_for_student(state.db(), &student.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load documents"))?;

    let record = grouping::build_record(subjects, grades);
    Ok(Json(StudentRecordResponse::new(student, record, stored)))
}

async fn course_subjects(
    Path(student_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<CourseSubjectsResponse>, ApiError> {
    let student = fetch_student(&state, &student_id).await?;
    require_staff_or_owner(&user, &student)?;

    let Some(course_id) = student.course_id.as_deref() else {
        return Ok(Json(CourseSubjectsResponse {
            student_id: student.id,
            course: None,
            years: Vec::new(),
        }));
    };

    let course = repositories::courses::find_by_id(state.db(), course_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch course"))?;
    let subjects = repositories::subjects::list_for_course(state.db(), course_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load course subjects"))?;
    let grades = repositories::grades::list_for_student(state.db(), &student.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load grades"))?;

    Ok(Json(CourseSubjectsResponse {
        student_id: student.id,
        course: course.map(CourseResponse::from_db),
        years: YearGroupResponse::from_groups(grouping::course_overview(subjects, &grades)),
    }))
}

async fn assign_subjects(
    Path(student_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<AssignmentOutcome>, ApiError> {
    let outcome = enrollment::reassign_subjects(state.db(), &student_id).await?;

    tracing::info!(
        admin_id = %admin.id,
        student_id = %student_id,
        action = "assign_subjects",
        "Course subjects re-assigned"
    );

    Ok(Json(outcome))
}

async fn reconcile_student(
    Path(student_id): Path<String>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<ReconcileOutcome>, ApiError> {
    let outcome =
        grade_lifecycle::reconcile_student(state.db(), state.grade_policy(), &student_id).await?;
    Ok(Json(outcome))
}

#[cfg(test)]
mod tests;
