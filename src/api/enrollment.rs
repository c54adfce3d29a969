//! Enrollment actions on one student. Successes and domain failures share the
//! `{success, ...}` envelope.

use axum::{
    extract::{Path, Query, State},
    routing::{delete, post, put},
    Json, Router,
};

use crate::api::errors::ActionFailure;
use crate::api::guards::CurrentAdmin;
use crate::core::state::AppState;
use crate::schemas::enrollment::{
    ActionResponse, AddSubjectRequest, ChangeSubjectRequest, EditGradeRequest, GradeEcho,
    SubjectAddedEcho, SubjectChangedEcho, SubjectTransitionEcho, TermQuery,
};
use crate::services::grade_lifecycle::{self, AddSubject, ChangeSubject, EditGrade};

type ActionResult<T> = Result<Json<ActionResponse<T>>, ActionFailure>;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/students/:student_id/subjects", post(add_subject))
        .route("/students/:student_id/subjects/:subject_id/change", post(change_subject))
        .route("/students/:student_id/subjects/:subject_id/remove", post(remove_subject))
        .route("/students/:student_id/subjects/:subject_id/restore", post(restore_subject))
        .route("/students/:student_id/subjects/:subject_id/drop", post(drop_subject))
        .route(
            "/students/:student_id/subjects/:subject_id/removed",
            delete(delete_removed_subject),
        )
        .route(
            "/students/:student_id/grades/:subject_id",
            put(edit_grade).delete(delete_grade),
        )
}

async fn add_subject(
    Path(student_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<AddSubjectRequest>,
) -> ActionResult<SubjectAddedEcho> {
    let added = grade_lifecycle::add_subject(
        state.db(),
        AddSubject {
            student_id: student_id.clone(),
            subject_id: payload.subject_id,
            course_id: payload.course_id,
            semester: payload.semester,
        },
    )
    .await?;

    tracing::info!(
        admin_id = %admin.id,
        student_id = %student_id,
        subject_id = %added.subject.id,
        semester = %added.grade.semester,
        academic_year = %added.grade.academic_year,
        reactivated = added.reactivated,
        action = "add_subject",
        "Subject added to student"
    );

    let message = format!("Subject {} added successfully.", added.subject.name);
    Ok(Json(ActionResponse::ok(message, SubjectAddedEcho::from_added(added))))
}

async fn change_subject(
    Path((student_id, subject_id)): Path<(String, String)>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<ChangeSubjectRequest>,
) -> ActionResult<SubjectChangedEcho> {
    let changed = grade_lifecycle::change_subject(
        state.db(),
        ChangeSubject {
            student_id: student_id.clone(),
            old_subject_id: subject_id,
            new_subject_id: payload.new_subject_id,
            semester: payload.semester,
            year_level: payload.year_level,
        },
    )
    .await?;

    tracing::info!(
        admin_id = %admin.id,
        student_id = %student_id,
        old_subject_id = %changed.old_subject.id,
        new_subject_id = %changed.new_subject.id,
        removed_rows = changed.removed_rows,
        reused_existing_row = changed.reused_existing_row,
        action = "change_subject",
        "Student subject changed"
    );

    let message = format!(
        "Subject changed from {} to {} successfully.",
        changed.old_subject.name, changed.new_subject.name
    );
    Ok(Json(ActionResponse::ok(message, SubjectChangedEcho::from_changed(changed))))
}

async fn remove_subject(
    Path((student_id, subject_id)): Path<(String, String)>,
    Query(term): Query<TermQuery>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
) -> ActionResult<SubjectTransitionEcho> {
    let transition =
        grade_lifecycle::remove_subject(state.db(), &student_id, &subject_id, term.into()).await?;

    tracing::info!(
        admin_id = %admin.id,
        student_id = %student_id,
        subject_id = %subject_id,
        action = "remove_subject",
        "Subject removed from student"
    );

    let message = format!("Subject {} removed successfully.", transition.subject.name);
    Ok(Json(ActionResponse::ok(message, SubjectTransitionEcho::from_transition(transition))))
}

async fn restore_subject(
    Path((student_id, subject_id)): Path<(String, String)>,
    Query(term): Query<TermQuery>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
) -> ActionResult<SubjectTransitionEcho> {
    let transition =
        grade_lifecycle::restore_subject(state.db(), &student_id, &subject_id, term.into())
            .await?;

    tracing::info!(
        admin_id = %admin.id,
        student_id = %student_id,
        subject_id = %subject_id,
        action = "restore_subject",
        "Subject restored for student"
    );

    let message = format!("Subject {} restored successfully.", transition.subject.name);
    Ok(Json(ActionResponse::ok(message, SubjectTransitionEcho::from_transition(transition))))
}

async fn drop_subject(
    Path((student_id, subject_id)): Path<(String, String)>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
) -> ActionResult<SubjectTransitionEcho> {
    let transition = grade_lifecycle::drop_subject(state.db(), &student_id, &subject_id).await?;

    tracing::info!(
        admin_id = %admin.id,
        student_id = %student_id,
        subject_id = %subject_id,
        affected_rows = transition.affected_rows,
        action = "drop_subject",
        "Subject dropped for student"
    );

    Ok(Json(ActionResponse::ok(
        "Grades marked inactive and status updated to Drop for the student.",
        SubjectTransitionEcho::from_transition(transition),
    )))
}

async fn delete_removed_subject(
    Path((student_id, subject_id)): Path<(String, String)>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
) -> ActionResult<SubjectTransitionEcho> {
    let transition =
        grade_lifecycle::delete_removed_subject(state.db(), &student_id, &subject_id).await?;

    tracing::info!(
        admin_id = %admin.id,
        student_id = %student_id,
        subject_id = %subject_id,
        affected_rows = transition.affected_rows,
        action = "delete_removed_subject",
        "Removed subject deleted"
    );

    let message = format!("Removed subject {} deleted successfully.", transition.subject.name);
    Ok(Json(ActionResponse::ok(message, SubjectTransitionEcho::from_transition(transition))))
}

async fn edit_grade(
    Path((student_id, subject_id)): Path<(String, String)>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<EditGradeRequest>,
) -> ActionResult<GradeEcho> {
    let change = grade_lifecycle::edit_grade(
        state.db(),
        state.grade_policy(),
        EditGrade {
            student_id: student_id.clone(),
            subject_id,
            semester: payload.semester,
            academic_year: payload.academic_year,
            year_level: payload.year_level,
            grade_value: payload.grade_value,
        },
    )
    .await?;

    tracing::info!(
        admin_id = %admin.id,
        student_id = %student_id,
        grade_id = %change.grade.id,
        status = change.grade.status.label(),
        action = "edit_grade",
        "Grade updated"
    );

    Ok(Json(ActionResponse::ok("Grade updated successfully.", GradeEcho::from_change(change))))
}

async fn delete_grade(
    Path((student_id, subject_id)): Path<(String, String)>,
    Query(term): Query<TermQuery>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
) -> ActionResult<GradeEcho> {
    let change = grade_lifecycle::delete_grade(
        state.db(),
        state.grade_policy(),
        &student_id,
        &subject_id,
        term.into(),
    )
    .await?;

    tracing::info!(
        admin_id = %admin.id,
        student_id = %student_id,
        grade_id = %change.grade.id,
        action = "delete_grade",
        "Grade cleared"
    );

    Ok(Json(ActionResponse::ok("Grade deleted successfully.", GradeEcho::from_change(change))))
}
