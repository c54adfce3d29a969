//! Transactional grade and subject operations on one student.
//!
//! Every public operation opens its own transaction, locks the student row first and
//! commits only when all of its writes succeeded.

use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use time::PrimitiveDateTime;

use crate::core::metrics;
use crate::core::time::{current_academic_year, primitive_now_utc};
use crate::db::models::{Grade, Student, Subject};
use crate::db::types::EnrollmentStatus;
use crate::repositories;
use crate::repositories::grades::{GradeWrite, NewGrade, TermSlot};
use crate::services::enrollment::ASSIGNMENT_SEMESTER;
use crate::services::errors::RecordsError;
use crate::services::grade_state::{
    fill_term, non_blank, parse_grade_value, validate_write_semester, validate_year_level,
    GradeInput, GradePolicy, GradeSnapshot, Transition,
};

#[derive(Debug, Clone)]
pub(crate) struct EditGrade {
    pub(crate) student_id: String,
    pub(crate) subject_id: String,
    pub(crate) semester: Option<String>,
    pub(crate) academic_year: Option<String>,
    pub(crate) year_level: Option<String>,
    pub(crate) grade_value: Option<GradeInput>,
}

#[derive(Debug)]
pub(crate) struct GradeChange {
    pub(crate) grade: Grade,
    pub(crate) subject: Subject,
    /// Whether the subject-level status was rewritten.
    pub(crate) subject_status_changed: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct AddSubject {
    pub(crate) student_id: String,
    pub(crate) subject_id: String,
    pub(crate) course_id: Option<String>,
    pub(crate) semester: Option<String>,
}

#[derive(Debug)]
pub(crate) struct SubjectAdded {
    pub(crate) grade: Grade,
    pub(crate) subject: Subject,
    pub(crate) reactivated: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct ChangeSubject {
    pub(crate) student_id: String,
    pub(crate) old_subject_id: String,
    pub(crate) new_subject_id: String,
    pub(crate) semester: Option<String>,
    pub(crate) year_level: Option<String>,
}

#[derive(Debug)]
pub(crate) struct SubjectChanged {
    pub(crate) old_subject: Subject,
    pub(crate) new_subject: Subject,
    pub(crate) grade: Grade,
    pub(crate) removed_rows: u64,
    /// The new subject already had a row in the slot; it is returned as stored, which
    /// may be a removed row.
    pub(crate) reused_existing_row: bool,
}

/// Optional `(semester, academic_year)` narrowing of a subject lookup.
#[derive(Debug, Clone, Default)]
pub(crate) struct TermFilter {
    pub(crate) semester: Option<String>,
    pub(crate) academic_year: Option<String>,
}

impl TermFilter {
    fn pair(&self) -> Option<(&str, &str)> {
        Some((non_blank(self.semester.as_deref())?, non_blank(self.academic_year.as_deref())?))
    }
}

#[derive(Debug)]
pub(crate) struct SubjectTransition {
    pub(crate) subject: Subject,
    pub(crate) grade: Option<Grade>,
    pub(crate) affected_rows: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub(crate) struct ReconcileOutcome {
    pub(crate) backfilled: u64,
    pub(crate) reactivated: u64,
}

/// Records the action outcome before handing the result back.
fn track<T>(action: &'static str, result: Result<T, RecordsError>) -> Result<T, RecordsError> {
    match &result {
        Ok(_) => metrics::record_enrollment_action(action, "ok"),
        Err(err) => {
            metrics::record_enrollment_action(action, err.kind());
            if let RecordsError::Database(source) = err {
                tracing::error!(action, error = %source, "Enrollment action failed");
            } else {
                tracing::debug!(action, error = %err, "Enrollment action rejected");
            }
        }
    }
    result
}

async fn lock_student(conn: &mut PgConnection, student_id: &str) -> Result<Student, RecordsError> {
    repositories::students::find_for_update(conn, student_id)
        .await?
        .ok_or_else(|| RecordsError::not_found("Student not found."))
}

async fn load_subject(conn: &mut PgConnection, subject_id: &str) -> Result<Subject, RecordsError> {
    repositories::subjects::find_by_id(conn, subject_id)
        .await?
        .ok_or_else(|| RecordsError::not_found("Subject not found."))
}

/// Writes the subject-level status when the policy asks for it.
async fn propagate_subject_status(
    conn: &mut PgConnection,
    subject: &mut Subject,
    status: Option<EnrollmentStatus>,
    now: PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let Some(status) = status else {
        return Ok(false);
    };
    let changed = repositories::subjects::set_status(conn, &subject.id, status, now).await?;
    if changed {
        subject.status = status;
        subject.updated_at = now;
    }
    Ok(changed)
}

/// Enters, changes or clears the grade value of one term slot, creating the row if needed.
pub(crate) async fn edit_grade(
    pool: &PgPool,
    policy: &GradePolicy,
    params: EditGrade,
) -> Result<GradeChange, RecordsError> {
    track("edit_grade", edit_grade_inner(pool, policy, params).await)
}

async fn edit_grade_inner(
    pool: &PgPool,
    policy: &GradePolicy,
    params: EditGrade,
) -> Result<GradeChange, RecordsError> {
    let grade_value = parse_grade_value(params.grade_value.as_ref())?;
    let year_level = validate_year_level(params.year_level.as_deref())?;

    let now = primitive_now_utc();
    let mut tx = pool.begin().await?;
    let student = lock_student(&mut tx, &params.student_id).await?;
    let mut subject = load_subject(&mut tx, &params.subject_id).await?;

    let (semester, academic_year) = fill_term(
        params.semester.as_deref(),
        params.academic_year.as_deref(),
        &student,
        policy,
        &current_academic_year(),
    );
    let semester = validate_write_semester(Some(&semester))?;
    let slot = TermSlot {
        student_id: &student.id,
        subject_id: &subject.id,
        semester: &semester,
        academic_year: &academic_year,
    };

    repositories::grades::insert_if_absent(
        &mut *tx,
        NewGrade {
            slot,
            year_level: year_level.as_deref(),
            grade_value,
            status: GradeSnapshot::assigned(grade_value).status(),
            is_active: true,
            now,
        },
    )
    .await?;
    let existing = repositories::grades::find_slot_for_update(&mut *tx, slot)
        .await?
        .ok_or_else(|| RecordsError::not_found("Grade not found."))?;

    let transition = match grade_value {
        Some(value) => Transition::EnterValue(value),
        None => Transition::ClearValue,
    };
    let next = GradeSnapshot::of(&existing).apply(transition)?;
    let grade = repositories::grades::save(
        &mut *tx,
        &existing.id,
        GradeWrite {
            grade_value: next.grade_value,
            semester,
            academic_year,
            year_level: year_level.or_else(|| existing.year_level.clone()),
            is_active: next.is_active,
            status: next.status(),
            updated_at: now,
        },
    )
    .await?;

    let subject_status_changed = propagate_subject_status(
        &mut tx,
        &mut subject,
        policy.subject_status_after_entry(grade.grade_value),
        now,
    )
    .await?;
    tx.commit().await?;
    Ok(GradeChange { grade, subject, subject_status_changed })
}

/// Clears the grade value of a slot. The row stays, back in "Currently Taking".
///
/// Without a complete term the oldest active row of the subject is used.
pub(crate) async fn delete_grade(
    pool: &PgPool,
    policy: &GradePolicy,
    student_id: &str,
    subject_id: &str,
    term: TermFilter,
) -> Result<GradeChange, RecordsError> {
    track("delete_grade", delete_grade_inner(pool, policy, student_id, subject_id, term).await)
}

async fn delete_grade_inner(
    pool: &PgPool,
    policy: &GradePolicy,
    student_id: &str,
    subject_id: &str,
    term: TermFilter,
) -> Result<GradeChange, RecordsError> {
    let now = primitive_now_utc();
    let mut tx = pool.begin().await?;
    let student = lock_student(&mut tx, student_id).await?;
    let mut subject = load_subject(&mut tx, subject_id).await?;

    let existing = match term.pair() {
        Some((semester, academic_year)) => {
            let slot = TermSlot {
                student_id: &student.id,
                subject_id: &subject.id,
                semester,
                academic_year,
            };
            repositories::grades::find_slot_for_update(&mut *tx, slot).await?
        }
        None => {
            repositories::grades::find_first_for_subject(
                &mut *tx,
                &student.id,
                &subject.id,
                true,
                None,
            )
            .await?
        }
    }
    .ok_or_else(|| RecordsError::not_found("Grade not found."))?;

    let next = GradeSnapshot::of(&existing).apply(Transition::ClearValue)?;
    let grade = repositories::grades::save(
        &mut *tx,
        &existing.id,
        GradeWrite {
            grade_value: next.grade_value,
            semester: existing.semester.clone(),
            academic_year: existing.academic_year.clone(),
            year_level: existing.year_level.clone(),
            is_active: next.is_active,
            status: next.status(),
            updated_at: now,
        },
    )
    .await?;

    let subject_status_changed = propagate_subject_status(
        &mut tx,
        &mut subject,
        policy.subject_status_after_delete(),
        now,
    )
    .await?;
    tx.commit().await?;
    Ok(GradeChange { grade, subject, subject_status_changed })
}

/// Assigns one extra subject to a student for an explicit semester.
///
/// Checks run in a fixed order and the first failing one is reported.
pub(crate) async fn add_subject(
    pool: &PgPool,
    params: AddSubject,
) -> Result<SubjectAdded, RecordsError> {
    track("add_subject", add_subject_inner(pool, params).await)
}

async fn add_subject_inner(pool: &PgPool, params: AddSubject) -> Result<SubjectAdded, RecordsError> {
    let now = primitive_now_utc();
    let mut tx = pool.begin().await?;
    let student = lock_student(&mut tx, &params.student_id).await?;
    let subject = load_subject(&mut tx, &params.subject_id).await?;

    let selected_course = match non_blank(params.course_id.as_deref()) {
        Some(course_id) => Some(
            repositories::courses::find_by_id(&mut *tx, course_id)
                .await?
                .ok_or_else(|| RecordsError::not_found("Course not found."))?
                .id,
        ),
        None => student.course_id.clone(),
    };

    if subject.department_id != student.department_id {
        return Err(RecordsError::validation(
            "Selected subject does not belong to the student's department.",
        ));
    }
    if selected_course.as_deref() != Some(subject.course_id.as_str()) {
        return Err(RecordsError::validation(
            "Selected subject does not belong to the selected course.",
        ));
    }
    let semester = validate_write_semester(params.semester.as_deref())?;
    let academic_year = non_blank(student.academic_year.as_deref())
        .map(str::to_string)
        .unwrap_or_else(current_academic_year);

    let slot = TermSlot {
        student_id: &student.id,
        subject_id: &subject.id,
        semester: &semester,
        academic_year: &academic_year,
    };
    let (grade, reactivated) = match repositories::grades::find_slot_for_update(&mut *tx, slot)
        .await?
    {
        Some(existing) if existing.is_active => {
            return Err(RecordsError::DuplicateAssignment(
                "Subject is already assigned to the student for the selected semester and academic year."
                    .to_string(),
            ));
        }
        Some(existing) => {
            let next = GradeSnapshot::of(&existing).apply(Transition::Restore)?;
            let grade = repositories::grades::set_active(
                &mut *tx,
                &existing.id,
                next.is_active,
                next.status(),
                now,
            )
            .await?;
            (grade, true)
        }
        None => {
            repositories::grades::insert_if_absent(
                &mut *tx,
                NewGrade {
                    slot,
                    year_level: None,
                    grade_value: None,
                    status: GradeSnapshot::assigned(None).status(),
                    is_active: true,
                    now,
                },
            )
            .await?;
            let grade = repositories::grades::find_slot_for_update(&mut *tx, slot)
                .await?
                .ok_or_else(|| RecordsError::not_found("Grade not found."))?;
            (grade, false)
        }
    };
    tx.commit().await?;
    Ok(SubjectAdded { grade, subject, reactivated })
}

/// Replaces one assigned subject with another: the old subject's rows are deleted and
/// the new subject's row is fetched or created. A fetched row keeps its activity flag.
pub(crate) async fn change_subject(
    pool: &PgPool,
    params: ChangeSubject,
) -> Result<SubjectChanged, RecordsError> {
    track("change_subject", change_subject_inner(pool, params).await)
}

async fn change_subject_inner(
    pool: &PgPool,
    params: ChangeSubject,
) -> Result<SubjectChanged, RecordsError> {
    if params.old_subject_id == params.new_subject_id {
        return Err(RecordsError::validation("New subject must differ from the current subject."));
    }
    let semester = match non_blank(params.semester.as_deref()) {
        Some(semester) => validate_write_semester(Some(semester))?,
        None => ASSIGNMENT_SEMESTER.to_string(),
    };
    let year_level = validate_year_level(params.year_level.as_deref())?;

    let now = primitive_now_utc();
    let mut tx = pool.begin().await?;
    let student = lock_student(&mut tx, &params.student_id).await?;
    let old_subject = load_subject(&mut tx, &params.old_subject_id).await?;
    let new_subject = load_subject(&mut tx, &params.new_subject_id).await?;

    let removed_rows =
        repositories::grades::delete_for_subject(&mut *tx, &student.id, &old_subject.id).await?;
    if removed_rows == 0 {
        return Err(RecordsError::not_found("Subject is not assigned to the student."));
    }

    let academic_year = current_academic_year();
    let slot = TermSlot {
        student_id: &student.id,
        subject_id: &new_subject.id,
        semester: &semester,
        academic_year: &academic_year,
    };
    let created = repositories::grades::insert_if_absent(
        &mut *tx,
        NewGrade {
            slot,
            year_level: year_level.as_deref(),
            grade_value: None,
            status: GradeSnapshot::assigned(None).status(),
            is_active: true,
            now,
        },
    )
    .await?;
    let mut grade = repositories::grades::find_slot_for_update(&mut *tx, slot)
        .await?
        .ok_or_else(|| RecordsError::not_found("Grade not found."))?;

    if !created && year_level.is_some() && year_level != grade.year_level {
        grade = repositories::grades::save(
            &mut *tx,
            &grade.id,
            GradeWrite {
                grade_value: grade.grade_value,
                semester: grade.semester.clone(),
                academic_year: grade.academic_year.clone(),
                year_level,
                is_active: grade.is_active,
                status: grade.status,
                updated_at: now,
            },
        )
        .await?;
    }
    tx.commit().await?;
    Ok(SubjectChanged {
        old_subject,
        new_subject,
        grade,
        removed_rows,
        reused_existing_row: !created,
    })
}

/// Soft-deletes the oldest active row of a subject (optionally within one term).
pub(crate) async fn remove_subject(
    pool: &PgPool,
    student_id: &str,
    subject_id: &str,
    term: TermFilter,
) -> Result<SubjectTransition, RecordsError> {
    track(
        "remove_subject",
        flip_first(pool, student_id, subject_id, term, Transition::Drop).await,
    )
}

/// Brings back the oldest removed row of a subject. Its status is recomputed from the
/// stored grade value.
pub(crate) async fn restore_subject(
    pool: &PgPool,
    student_id: &str,
    subject_id: &str,
    term: TermFilter,
) -> Result<SubjectTransition, RecordsError> {
    track(
        "restore_subject",
        flip_first(pool, student_id, subject_id, term, Transition::Restore).await,
    )
}

async fn flip_first(
    pool: &PgPool,
    student_id: &str,
    subject_id: &str,
    term: TermFilter,
    transition: Transition,
) -> Result<SubjectTransition, RecordsError> {
    let (want_active, missing) = match transition {
        Transition::Drop => (true, "Active subject not found for the student."),
        _ => (false, "Subject not found for the student or already active."),
    };

    let now = primitive_now_utc();
    let mut tx = pool.begin().await?;
    let student = lock_student(&mut tx, student_id).await?;
    let subject = load_subject(&mut tx, subject_id).await?;
    let existing = repositories::grades::find_first_for_subject(
        &mut *tx,
        &student.id,
        &subject.id,
        want_active,
        term.pair(),
    )
    .await?
    .ok_or_else(|| RecordsError::not_found(missing))?;

    let next = GradeSnapshot::of(&existing).apply(transition)?;
    let grade =
        repositories::grades::set_active(&mut *tx, &existing.id, next.is_active, next.status(), now)
            .await?;
    tx.commit().await?;
    Ok(SubjectTransition { subject, grade: Some(grade), affected_rows: 1 })
}

/// Marks every active row of a subject for the student as dropped.
pub(crate) async fn drop_subject(
    pool: &PgPool,
    student_id: &str,
    subject_id: &str,
) -> Result<SubjectTransition, RecordsError> {
    track("drop_subject", drop_subject_inner(pool, student_id, subject_id).await)
}

async fn drop_subject_inner(
    pool: &PgPool,
    student_id: &str,
    subject_id: &str,
) -> Result<SubjectTransition, RecordsError> {
    let now = primitive_now_utc();
    let mut tx = pool.begin().await?;
    let student = lock_student(&mut tx, student_id).await?;
    let subject = load_subject(&mut tx, subject_id).await?;
    let affected_rows = repositories::grades::deactivate_active_for_subject(
        &mut *tx,
        &student.id,
        &subject.id,
        now,
    )
    .await?;
    if affected_rows == 0 {
        return Err(RecordsError::not_found("Active subject not found for the student."));
    }
    tx.commit().await?;
    Ok(SubjectTransition { subject, grade: None, affected_rows })
}

/// Permanently deletes the oldest removed row of a subject. Active rows never match.
pub(crate) async fn delete_removed_subject(
    pool: &PgPool,
    student_id: &str,
    subject_id: &str,
) -> Result<SubjectTransition, RecordsError> {
    track(
        "delete_removed_subject",
        delete_removed_subject_inner(pool, student_id, subject_id).await,
    )
}

async fn delete_removed_subject_inner(
    pool: &PgPool,
    student_id: &str,
    subject_id: &str,
) -> Result<SubjectTransition, RecordsError> {
    let mut tx = pool.begin().await?;
    let student = lock_student(&mut tx, student_id).await?;
    let subject = load_subject(&mut tx, subject_id).await?;
    let existing = repositories::grades::find_first_for_subject(
        &mut *tx,
        &student.id,
        &subject.id,
        false,
        None,
    )
    .await?
    .filter(|grade| GradeSnapshot::of(grade).can_delete_permanently())
    .ok_or_else(|| RecordsError::not_found("Removed subject not found for the student."))?;

    repositories::grades::delete_by_id(&mut *tx, &existing.id).await?;
    tx.commit().await?;
    Ok(SubjectTransition { subject, grade: None, affected_rows: 1 })
}

/// Brings a student's grade rows in line with the student's current term: blank terms are
/// filled and removed rows sitting in the current (year level, semester, academic year)
/// are reactivated. Running it twice changes nothing the second time.
pub(crate) async fn reconcile(
    conn: &mut PgConnection,
    student: &Student,
    policy: &GradePolicy,
    now: PrimitiveDateTime,
) -> Result<ReconcileOutcome, sqlx::Error> {
    let (semester, academic_year) =
        fill_term(None, None, student, policy, &current_academic_year());
    let backfilled = repositories::grades::backfill_blank_terms(
        &mut *conn,
        &student.id,
        &semester,
        &academic_year,
        now,
    )
    .await?;

    let current_slot = (
        non_blank(student.year_level.as_deref()),
        non_blank(student.semester.as_deref()),
        non_blank(student.academic_year.as_deref()),
    );
    let reactivated = match current_slot {
        (Some(year_level), Some(semester), Some(academic_year)) => {
            repositories::grades::reactivate_matching_slot(
                &mut *conn,
                &student.id,
                year_level,
                semester,
                academic_year,
                now,
            )
            .await?
        }
        _ => 0,
    };

    if backfilled > 0 || reactivated > 0 {
        tracing::info!(student_id = %student.id, backfilled, reactivated, "Student grades reconciled");
    }
    Ok(ReconcileOutcome { backfilled, reactivated })
}

pub(crate) async fn reconcile_student(
    pool: &PgPool,
    policy: &GradePolicy,
    student_id: &str,
) -> Result<ReconcileOutcome, RecordsError> {
    track("reconcile", reconcile_student_inner(pool, policy, student_id).await)
}

async fn reconcile_student_inner(
    pool: &PgPool,
    policy: &GradePolicy,
    student_id: &str,
) -> Result<ReconcileOutcome, RecordsError> {
    let mut tx = pool.begin().await?;
    let student = lock_student(&mut tx, student_id).await?;
    let outcome = reconcile(&mut tx, &student, policy, primitive_now_utc()).await?;
    tx.commit().await?;
    Ok(outcome)
}

#[cfg(test)]
mod tests;
