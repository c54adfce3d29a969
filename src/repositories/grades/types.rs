use time::PrimitiveDateTime;

use crate::db::types::EnrollmentStatus;

pub(crate) const COLUMNS: &str = "\
    id, student_id, subject_id, grade_value, semester, academic_year, year_level, \
    is_active, status, created_at, updated_at";

/// The uniqueness key of a grade row: one row per student, subject and term.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TermSlot<'a> {
    pub(crate) student_id: &'a str,
    pub(crate) subject_id: &'a str,
    pub(crate) semester: &'a str,
    pub(crate) academic_year: &'a str,
}

pub(crate) struct NewGrade<'a> {
    pub(crate) slot: TermSlot<'a>,
    pub(crate) year_level: Option<&'a str>,
    pub(crate) grade_value: Option<f64>,
    pub(crate) status: EnrollmentStatus,
    pub(crate) is_active: bool,
    pub(crate) now: PrimitiveDateTime,
}

/// Full replacement of the mutable columns of one grade row.
#[derive(Debug, Clone)]
pub(crate) struct GradeWrite {
    pub(crate) grade_value: Option<f64>,
    pub(crate) semester: String,
    pub(crate) academic_year: String,
    pub(crate) year_level: Option<String>,
    pub(crate) is_active: bool,
    pub(crate) status: EnrollmentStatus,
    pub(crate) updated_at: PrimitiveDateTime,
}
