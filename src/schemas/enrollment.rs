//! Payloads of the enrollment actions and their `{success, message, ...}` envelope.

use serde::{Deserialize, Serialize};

use crate::core::time::format_primitive;
use crate::db::models::Grade;
use crate::db::types::EnrollmentStatus;
use crate::services::grade_lifecycle::{
    GradeChange, SubjectAdded, SubjectChanged, SubjectTransition, TermFilter,
};
use crate::services::grade_state::GradeInput;

#[derive(Debug, Serialize)]
pub(crate) struct GradeResponse {
    pub(crate) id: String,
    pub(crate) student_id: String,
    pub(crate) subject_id: String,
    pub(crate) grade_value: Option<f64>,
    pub(crate) semester: String,
    pub(crate) academic_year: String,
    pub(crate) year_level: Option<String>,
    pub(crate) is_active: bool,
    pub(crate) status: EnrollmentStatus,
    pub(crate) updated_at: String,
}

impl GradeResponse {
    pub(crate) fn from_db(grade: Grade) -> Self {
        Self {
            id: grade.id,
            student_id: grade.student_id,
            subject_id: grade.subject_id,
            grade_value: grade.grade_value,
            semester: grade.semester,
            academic_year: grade.academic_year,
            year_level: grade.year_level,
            is_active: grade.is_active,
            status: grade.status,
            updated_at: format_primitive(grade.updated_at),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct EditGradeRequest {
    #[serde(default)]
    pub(crate) semester: Option<String>,
    #[serde(default)]
    #[serde(alias = "academicYear")]
    pub(crate) academic_year: Option<String>,
    #[serde(default)]
    #[serde(alias = "yearLevel")]
    pub(crate) year_level: Option<String>,
    #[serde(default)]
    #[serde(alias = "gradeValue")]
    pub(crate) grade_value: Option<GradeInput>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TermQuery {
    #[serde(default)]
    pub(crate) semester: Option<String>,
    #[serde(default)]
    #[serde(alias = "academicYear")]
    pub(crate) academic_year: Option<String>,
}

impl From<TermQuery> for TermFilter {
    fn from(query: TermQuery) -> Self {
        TermFilter { semester: query.semester, academic_year: query.academic_year }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct AddSubjectRequest {
    #[serde(alias = "subjectId")]
    pub(crate) subject_id: String,
    #[serde(default)]
    #[serde(alias = "courseId")]
    pub(crate) course_id: Option<String>,
    #[serde(default)]
    pub(crate) semester: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChangeSubjectRequest {
    #[serde(alias = "newSubjectId")]
    pub(crate) new_subject_id: String,
    #[serde(default)]
    pub(crate) semester: Option<String>,
    #[serde(default)]
    #[serde(alias = "yearLevel")]
    pub(crate) year_level: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ActionResponse<T> {
    pub(crate) success: bool,
    pub(crate) message: String,
    #[serde(flatten)]
    pub(crate) data: T,
}

impl<T: Serialize> ActionResponse<T> {
    pub(crate) fn ok(message: impl Into<String>, data: T) -> Self {
        Self { success: true, message: message.into(), data }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ActionFailureBody {
    pub(crate) success: bool,
    pub(crate) kind: &'static str,
    pub(crate) error: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct GradeEcho {
    pub(crate) grade_id: String,
    pub(crate) grade_value: Option<f64>,
    pub(crate) year_level: Option<String>,
    pub(crate) semester: String,
    pub(crate) academic_year: String,
    pub(crate) is_active: bool,
    pub(crate) status: EnrollmentStatus,
    pub(crate) subject_status: EnrollmentStatus,
    pub(crate) subject_status_changed: bool,
}

impl GradeEcho {
    pub(crate) fn from_change(change: GradeChange) -> Self {
        Self {
            grade_id: change.grade.id,
            grade_value: change.grade.grade_value,
            year_level: change.grade.year_level,
            semester: change.grade.semester,
            academic_year: change.grade.academic_year,
            is_active: change.grade.is_active,
            status: change.grade.status,
            subject_status: change.subject.status,
            subject_status_changed: change.subject_status_changed,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SubjectAddedEcho {
    pub(crate) new_subject_id: String,
    pub(crate) new_subject_name: String,
    pub(crate) subject_code: String,
    pub(crate) credits: i32,
    pub(crate) semester_offered: Option<String>,
    pub(crate) semester: String,
    pub(crate) academic_year: String,
    pub(crate) status: EnrollmentStatus,
    pub(crate) reactivated: bool,
}

impl SubjectAddedEcho {
    pub(crate) fn from_added(added: SubjectAdded) -> Self {
        Self {
            new_subject_id: added.subject.id,
            new_subject_name: added.subject.name,
            subject_code: added.subject.code,
            credits: added.subject.credits,
            semester_offered: added.subject.semester_offered,
            semester: added.grade.semester,
            academic_year: added.grade.academic_year,
            status: added.grade.status,
            reactivated: added.reactivated,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SubjectChangedEcho {
    pub(crate) old_subject_id: String,
    pub(crate) new_subject_id: String,
    pub(crate) new_subject_name: String,
    pub(crate) subject_code: String,
    pub(crate) semester: String,
    pub(crate) academic_year: String,
    pub(crate) year_level: Option<String>,
    pub(crate) removed_rows: u64,
    pub(crate) reused_existing_row: bool,
    pub(crate) is_active: bool,
    pub(crate) status: EnrollmentStatus,
}

impl SubjectChangedEcho {
    pub(crate) fn from_changed(changed: SubjectChanged) -> Self {
        Self {
            old_subject_id: changed.old_subject.id,
            new_subject_id: changed.new_subject.id,
            new_subject_name: changed.new_subject.name,
            subject_code: changed.new_subject.code,
            semester: changed.grade.semester,
            academic_year: changed.grade.academic_year,
            year_level: changed.grade.year_level,
            removed_rows: changed.removed_rows,
            reused_existing_row: changed.reused_existing_row,
            is_active: changed.grade.is_active,
            status: changed.grade.status,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SubjectTransitionEcho {
    pub(crate) subject_id: String,
    pub(crate) subject_name: String,
    pub(crate) affected_rows: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) grade: Option<GradeResponse>,
}

impl SubjectTransitionEcho {
    pub(crate) fn from_transition(transition: SubjectTransition) -> Self {
        Self {
            subject_id: transition.subject.id,
            subject_name: transition.subject.name,
            affected_rows: transition.affected_rows,
            grade: transition.grade.map(GradeResponse::from_db),
        }
    }
}
