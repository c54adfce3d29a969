//! Pure rules of the grade lifecycle.
//!
//! A grade row moves between three observable states:
//!
//! ```text
//!   (no row) --assign--> CurrentlyTaking --enter value--> Done
//!                             ^   |                        |
//!                     clear   |   +------drop/remove-------+--> Dropped
//!                             +-------------restore-------------+
//!                                                   Dropped --delete--> (no row)
//! ```
//!
//! Transitions run through [`GradeSnapshot::apply`]. Grade entry decides the status on its
//! own, so a value entered on a removed row reads "Done" while the row stays inactive.

use serde::Deserialize;

use crate::core::config::EnrollmentSettings;
use crate::db::models::{Grade, Student};
use crate::db::types::EnrollmentStatus;
use crate::services::errors::RecordsError;

pub(crate) const WRITE_SEMESTERS: [&str; 2] = ["1st", "2nd"];
pub(crate) const YEAR_LEVELS: [&str; 4] = ["1", "2", "3", "4"];
pub(crate) const MIN_GRADE: f64 = 0.0;
pub(crate) const MAX_GRADE: f64 = 100.0;

/// How grade operations treat the shared subject-level status.
#[derive(Debug, Clone)]
pub(crate) struct GradePolicy {
    pub(crate) propagate_subject_status: bool,
    pub(crate) default_semester: String,
}

impl GradePolicy {
    pub(crate) fn from_settings(settings: &EnrollmentSettings) -> Self {
        Self {
            propagate_subject_status: settings.propagate_subject_status,
            default_semester: settings.default_semester.clone(),
        }
    }

    /// Subject status to write after a grade value is entered or cleared.
    pub(crate) fn subject_status_after_entry(
        &self,
        grade_value: Option<f64>,
    ) -> Option<EnrollmentStatus> {
        match grade_value {
            Some(_) if self.propagate_subject_status => Some(EnrollmentStatus::Done),
            _ => None,
        }
    }

    /// Subject status to write after a grade is deleted.
    pub(crate) fn subject_status_after_delete(&self) -> Option<EnrollmentStatus> {
        self.propagate_subject_status.then_some(EnrollmentStatus::Drop)
    }
}

impl Default for GradePolicy {
    fn default() -> Self {
        Self { propagate_subject_status: true, default_semester: WRITE_SEMESTERS[0].to_string() }
    }
}

/// Status of a row that is (re)activated: "Done" with a value, else "Currently Taking".
pub(crate) fn derive_status(is_active: bool, grade_value: Option<f64>) -> EnrollmentStatus {
    match (is_active, grade_value) {
        (false, _) => EnrollmentStatus::Drop,
        (true, Some(_)) => EnrollmentStatus::Done,
        (true, None) => EnrollmentStatus::CurrentlyTaking,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Transition {
    EnterValue(f64),
    ClearValue,
    Drop,
    Restore,
}

/// The state-bearing columns of a grade row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct GradeSnapshot {
    pub(crate) grade_value: Option<f64>,
    pub(crate) is_active: bool,
    pub(crate) status: EnrollmentStatus,
}

impl GradeSnapshot {
    pub(crate) fn of(grade: &Grade) -> Self {
        Self { grade_value: grade.grade_value, is_active: grade.is_active, status: grade.status }
    }

    /// A freshly assigned active row.
    pub(crate) fn assigned(grade_value: Option<f64>) -> Self {
        Self { grade_value, is_active: true, status: derive_status(true, grade_value) }
    }

    pub(crate) fn status(self) -> EnrollmentStatus {
        self.status
    }

    /// Applies one transition.
    ///
    /// Entering a value always yields "Done" and clearing it "Currently Taking", whatever
    /// the activity flag; the flag itself only moves on drop and restore.
    pub(crate) fn apply(self, transition: Transition) -> Result<Self, RecordsError> {
        match transition {
            Transition::EnterValue(value) => Ok(Self {
                grade_value: Some(check_grade_range(value)?),
                status: EnrollmentStatus::Done,
                ..self
            }),
            Transition::ClearValue => Ok(Self {
                grade_value: None,
                status: EnrollmentStatus::CurrentlyTaking,
                ..self
            }),
            Transition::Drop if self.is_active => {
                Ok(Self { is_active: false, status: EnrollmentStatus::Drop, ..self })
            }
            Transition::Drop => Err(RecordsError::not_found("Active subject not found for the student.")),
            Transition::Restore if !self.is_active => Ok(Self {
                is_active: true,
                status: derive_status(true, self.grade_value),
                ..self
            }),
            Transition::Restore => Err(RecordsError::not_found(
                "Subject not found for the student or already active.",
            )),
        }
    }

    /// Only soft-deleted rows may be removed for good.
    pub(crate) fn can_delete_permanently(self) -> bool {
        !self.is_active
    }
}

/// Grade value as sent by clients: a number, a numeric string, or a blank placeholder.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub(crate) enum GradeInput {
    Number(f64),
    Text(String),
}

/// `None`, `""` and `"-"` clear the value; anything else must be a number in `[0, 100]`.
pub(crate) fn parse_grade_value(input: Option<&GradeInput>) -> Result<Option<f64>, RecordsError> {
    let value = match input {
        None => return Ok(None),
        Some(GradeInput::Number(value)) => *value,
        Some(GradeInput::Text(raw)) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed == "-" {
                return Ok(None);
            }
            trimmed.parse::<f64>().map_err(|_| {
                RecordsError::validation(format!("Invalid grade value '{trimmed}'."))
            })?
        }
    };
    check_grade_range(value).map(Some)
}

fn check_grade_range(value: f64) -> Result<f64, RecordsError> {
    if value.is_finite() && (MIN_GRADE..=MAX_GRADE).contains(&value) {
        Ok(value)
    } else {
        Err(RecordsError::validation(format!(
            "Grade value must be between {MIN_GRADE} and {MAX_GRADE}."
        )))
    }
}

pub(crate) fn validate_write_semester(semester: Option<&str>) -> Result<String, RecordsError> {
    let semester = non_blank(semester)
        .ok_or_else(|| RecordsError::validation("Semester is required."))?;
    if WRITE_SEMESTERS.contains(&semester) {
        Ok(semester.to_string())
    } else {
        Err(RecordsError::validation(format!("Invalid semester '{semester}'.")))
    }
}

pub(crate) fn validate_year_level(year_level: Option<&str>) -> Result<Option<String>, RecordsError> {
    match non_blank(year_level) {
        None => Ok(None),
        Some(level) if YEAR_LEVELS.contains(&level) => Ok(Some(level.to_string())),
        Some(level) => Err(RecordsError::validation(format!("Invalid year level '{level}'."))),
    }
}

/// Resolves the term of a grade write: explicit values first, then the student's
/// current term, then the policy default semester and the current calendar year.
pub(crate) fn fill_term(
    semester: Option<&str>,
    academic_year: Option<&str>,
    student: &Student,
    policy: &GradePolicy,
    current_year: &str,
) -> (String, String) {
    let semester = non_blank(semester)
        .or_else(|| non_blank(student.semester.as_deref()))
        .unwrap_or(&policy.default_semester)
        .to_string();
    let academic_year = non_blank(academic_year)
        .or_else(|| non_blank(student.academic_year.as_deref()))
        .unwrap_or(current_year)
        .to_string();
    (semester, academic_year)
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
