//! Subject assignment: keeps a student's grade rows in step with their course.

use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use time::PrimitiveDateTime;

use crate::core::metrics;
use crate::core::time::{current_academic_year, primitive_now_utc};
use crate::db::models::Student;
use crate::db::types::EnrollmentStatus;
use crate::repositories;
use crate::repositories::grades::{NewGrade, TermSlot};
use crate::repositories::students::{CreateStudent, StudentFields};
use crate::services::errors::RecordsError;
use crate::services::grade_lifecycle::{self, ReconcileOutcome};
use crate::services::grade_state::GradePolicy;

/// Semester every automatically assigned grade row starts in.
pub(crate) const ASSIGNMENT_SEMESTER: &str = "1st";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub(crate) enum AssignmentOutcome {
    Assigned { course_id: String, created: u64, existing: u64 },
    NoCourse,
    Skipped { reason: String },
}

/// Assignment runs when a student is created with a course or their course changes.
pub(crate) fn should_assign(
    created: bool,
    previous_course: Option<&str>,
    new_course: Option<&str>,
) -> bool {
    match new_course {
        None => false,
        Some(_) if created => true,
        Some(course) => previous_course != Some(course),
    }
}

/// Ensures a grade row exists for every subject currently in the student's course.
///
/// Existing rows are left untouched and rows of other courses are never removed.
pub(crate) async fn assign_course_subjects(
    conn: &mut PgConnection,
    student: &Student,
    now: PrimitiveDateTime,
) -> Result<AssignmentOutcome, sqlx::Error> {
    let Some(course_id) = student.course_id.as_deref() else {
        return Ok(AssignmentOutcome::NoCourse);
    };

    if repositories::courses::find_by_id(&mut *conn, course_id).await?.is_none() {
        tracing::warn!(
            student_id = %student.id,
            course_id = %course_id,
            "Course missing during subject assignment, skipping"
        );
        return Ok(AssignmentOutcome::Skipped { reason: format!("Course {course_id} not found") });
    }

    let subjects = repositories::subjects::list_for_course(&mut *conn, course_id).await?;
    let academic_year = current_academic_year();
    let mut created = 0_u64;
    for subject in &subjects {
        let inserted = repositories::grades::insert_if_absent(
            &mut *conn,
            NewGrade {
                slot: TermSlot {
                    student_id: &student.id,
                    subject_id: &subject.id,
                    semester: ASSIGNMENT_SEMESTER,
                    academic_year: &academic_year,
                },
                year_level: None,
                grade_value: None,
                status: EnrollmentStatus::CurrentlyTaking,
                is_active: true,
                now,
            },
        )
        .await?;
        if inserted {
            created += 1;
        }
    }

    let existing = subjects.len() as u64 - created;
    metrics::record_subjects_assigned(created);
    tracing::info!(
        student_id = %student.id,
        course_id = %course_id,
        created,
        existing,
        "Course subjects assigned"
    );
    Ok(AssignmentOutcome::Assigned { course_id: course_id.to_string(), created, existing })
}

/// Message for the first course or department the profile names that does not exist.
pub(crate) async fn missing_reference(
    conn: &mut PgConnection,
    fields: &StudentFields,
) -> Result<Option<&'static str>, sqlx::Error> {
    if let Some(course_id) = fields.course_id.as_deref() {
        if repositories::courses::find_by_id(&mut *conn, course_id).await?.is_none() {
            return Ok(Some("Course not found."));
        }
    }
    if let Some(department_id) = fields.department_id.as_deref() {
        if repositories::departments::find_by_id(&mut *conn, department_id).await?.is_none() {
            return Ok(Some("Department not found."));
        }
    }
    Ok(None)
}

async fn check_references(
    conn: &mut PgConnection,
    fields: &StudentFields,
) -> Result<(), RecordsError> {
    match missing_reference(conn, fields).await? {
        Some(message) => Err(RecordsError::not_found(message)),
        None => Ok(()),
    }
}

#[derive(Debug)]
pub(crate) struct StudentWrite {
    pub(crate) student: Student,
    pub(crate) assignment: Option<AssignmentOutcome>,
    pub(crate) reconcile: Option<ReconcileOutcome>,
}

/// Inserts the student and assigns the subjects of their course in one transaction.
pub(crate) async fn create_student(
    pool: &PgPool,
    params: CreateStudent<'_>,
) -> Result<StudentWrite, RecordsError> {
    let now = params.created_at;
    let mut tx = pool.begin().await?;
    check_references(&mut tx, &params.fields).await?;
    let student = repositories::students::create(&mut *tx, params).await?;
    let assignment = if should_assign(true, None, student.course_id.as_deref()) {
        Some(assign_course_subjects(&mut tx, &student, now).await?)
    } else {
        None
    };
    tx.commit().await?;

    Ok(StudentWrite { student, assignment, reconcile: None })
}

/// Applies a partial student update, then re-runs assignment on a course change and
/// reconciles the student's grade rows against the new term.
pub(crate) async fn update_student(
    pool: &PgPool,
    policy: &GradePolicy,
    student_id: &str,
    fields: StudentFields,
) -> Result<StudentWrite, RecordsError> {
    let now = primitive_now_utc();
    let mut tx = pool.begin().await?;
    let previous = repositories::students::find_for_update(&mut *tx, student_id)
        .await?
        .ok_or_else(|| RecordsError::not_found("Student not found"))?;
    check_references(&mut tx, &fields).await?;
    let student = repositories::students::update(&mut *tx, student_id, fields, now)
        .await?
        .ok_or_else(|| RecordsError::not_found("Student not found"))?;

    let assignment = if should_assign(
        false,
        previous.course_id.as_deref(),
        student.course_id.as_deref(),
    ) {
        Some(assign_course_subjects(&mut tx, &student, now).await?)
    } else {
        None
    };
    let reconcile = grade_lifecycle::reconcile(&mut tx, &student, policy, now).await?;
    tx.commit().await?;

    Ok(StudentWrite { student, assignment, reconcile: Some(reconcile) })
}

/// Explicit re-run of assignment for subjects added to a course after enrollment.
pub(crate) async fn reassign_subjects(
    pool: &PgPool,
    student_id: &str,
) -> Result<AssignmentOutcome, RecordsError> {
    let mut tx = pool.begin().await?;
    let student = repositories::students::find_for_update(&mut *tx, student_id)
        .await?
        .ok_or_else(|| RecordsError::not_found("Student not found"))?;
    let outcome = assign_course_subjects(&mut tx, &student, primitive_now_utc()).await?;
    tx.commit().await?;

    metrics::record_enrollment_action("assign_subjects", "ok");
    Ok(outcome)
}
