use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentAdmin, CurrentUser};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::{is_foreign_key_violation, is_unique_violation};
use crate::repositories;
use crate::schemas::catalog::{DepartmentCreate, DepartmentResponse};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_departments).post(create_department))
        .route("/:department_id", delete(delete_department))
}

async fn list_departments(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<DepartmentResponse>>, ApiError> {
    let departments = repositories::departments::list(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list departments"))?;

    Ok(Json(departments.into_iter().map(DepartmentResponse::from_db).collect()))
}

async fn create_department(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<DepartmentCreate>,
) -> Result<(StatusCode, Json<DepartmentResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let department =
        repositories::departments::create(state.db(), payload.name.trim(), primitive_now_utc())
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    ApiError::Conflict("Department with this name already exists".to_string())
                } else {
                    ApiError::internal(e, "Failed to create department")
                }
            })?;

    tracing::info!(
        admin_id = %admin.id,
        department_id = %department.id,
        action = "department_create",
        "Department created"
    );

    Ok((StatusCode::CREATED, Json(DepartmentResponse::from_db(department))))
}

async fn delete_department(
    Path(department_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let deleted = repositories::departments::delete(state.db(), &department_id).await.map_err(
        |e| {
            if is_foreign_key_violation(&e) {
                ApiError::Conflict("Department still has courses".to_string())
            } else {
                ApiError::internal(e, "Failed to delete department")
            }
        },
    )?;
    if !deleted {
        return Err(ApiError::NotFound("Department not found".to_string()));
    }

    tracing::info!(
        admin_id = %admin.id,
        department_id = %department_id,
        action = "department_delete",
        "Department deleted"
    );

    Ok(StatusCode::NO_CONTENT)
}
