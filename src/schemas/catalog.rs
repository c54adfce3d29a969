//! Departments, courses and subjects.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{Course, Department, Student, Subject};
use crate::db::types::EnrollmentStatus;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct DepartmentCreate {
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub(crate) name: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct DepartmentResponse {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) created_at: String,
}

impl DepartmentResponse {
    pub(crate) fn from_db(department: Department) -> Self {
        Self {
            id: department.id,
            name: department.name,
            created_at: format_primitive(department.created_at),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct CourseCreate {
    #[validate(length(min = 1, max = 50, message = "code must be 1-50 characters"))]
    pub(crate) code: String,
    #[validate(length(min = 1, max = 255, message = "name must be 1-255 characters"))]
    pub(crate) name: String,
    #[serde(default)]
    #[validate(range(min = 0, message = "credits must be non-negative"))]
    pub(crate) credits: i32,
    /// Department by name; created when missing, "General Studies" when omitted.
    #[serde(default)]
    #[serde(alias = "departmentName")]
    pub(crate) department_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct CourseUpdate {
    #[serde(default)]
    #[validate(length(min = 1, max = 50, message = "code must be 1-50 characters"))]
    pub(crate) code: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "name must be 1-255 characters"))]
    pub(crate) name: Option<String>,
    #[serde(default)]
    #[validate(range(min = 0, message = "credits must be non-negative"))]
    pub(crate) credits: Option<i32>,
    #[serde(default)]
    #[serde(alias = "departmentName")]
    pub(crate) department_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CourseResponse {
    pub(crate) id: String,
    pub(crate) code: String,
    pub(crate) name: String,
    pub(crate) credits: i32,
    pub(crate) department_id: String,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl CourseResponse {
    pub(crate) fn from_db(course: Course) -> Self {
        Self {
            id: course.id,
            code: course.code,
            name: course.name,
            credits: course.credits,
            department_id: course.department_id,
            created_at: format_primitive(course.created_at),
            updated_at: format_primitive(course.updated_at),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SubjectCreate {
    #[validate(length(min = 1, max = 10, message = "code must be 1-10 characters"))]
    pub(crate) code: String,
    #[validate(length(min = 1, max = 255, message = "name must be 1-255 characters"))]
    pub(crate) name: String,
    #[serde(default)]
    #[validate(range(min = 0, message = "credits must be non-negative"))]
    pub(crate) credits: i32,
    #[serde(alias = "courseId")]
    pub(crate) course_id: String,
    /// Defaults to the course's department.
    #[serde(default)]
    #[serde(alias = "departmentId")]
    pub(crate) department_id: Option<String>,
    #[serde(default)]
    #[serde(alias = "semesterOffered")]
    pub(crate) semester_offered: Option<String>,
    #[serde(default)]
    #[serde(alias = "yearLevel")]
    #[validate(range(min = 1, max = 4, message = "year_level must be between 1 and 4"))]
    pub(crate) year_level: Option<i32>,
    #[serde(default)]
    #[serde(alias = "professorName")]
    pub(crate) professor_name: Option<String>,
    #[serde(default)]
    #[serde(alias = "lectureHours")]
    #[validate(range(min = 0, message = "lecture_hours must be non-negative"))]
    pub(crate) lecture_hours: i32,
    #[serde(default)]
    #[serde(alias = "laboratoryHours")]
    #[validate(range(min = 0, message = "laboratory_hours must be non-negative"))]
    pub(crate) laboratory_hours: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SubjectUpdate {
    #[serde(default)]
    #[validate(length(min = 1, max = 10, message = "code must be 1-10 characters"))]
    pub(crate) code: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "name must be 1-255 characters"))]
    pub(crate) name: Option<String>,
    #[serde(default)]
    #[validate(range(min = 0, message = "credits must be non-negative"))]
    pub(crate) credits: Option<i32>,
    #[serde(default)]
    #[serde(alias = "courseId")]
    pub(crate) course_id: Option<String>,
    #[serde(default)]
    #[serde(alias = "departmentId")]
    pub(crate) department_id: Option<String>,
    #[serde(default)]
    #[serde(alias = "semesterOffered")]
    pub(crate) semester_offered: Option<String>,
    #[serde(default)]
    #[serde(alias = "yearLevel")]
    #[validate(range(min = 1, max = 4, message = "year_level must be between 1 and 4"))]
    pub(crate) year_level: Option<i32>,
    #[serde(default)]
    #[serde(alias = "professorName")]
    pub(crate) professor_name: Option<String>,
    #[serde(default)]
    #[serde(alias = "lectureHours")]
    #[validate(range(min = 0, message = "lecture_hours must be non-negative"))]
    pub(crate) lecture_hours: Option<i32>,
    #[serde(default)]
    #[serde(alias = "laboratoryHours")]
    #[validate(range(min = 0, message = "laboratory_hours must be non-negative"))]
    pub(crate) laboratory_hours: Option<i32>,
    /// Administrative status of the subject itself.
    #[serde(default)]
    pub(crate) status: Option<EnrollmentStatus>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubjectListQuery {
    #[serde(default)]
    pub(crate) search: Option<String>,
    #[serde(default)]
    #[serde(alias = "courseId")]
    pub(crate) course_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubjectResponse {
    pub(crate) id: String,
    pub(crate) code: String,
    pub(crate) name: String,
    pub(crate) credits: i32,
    pub(crate) department_id: Option<String>,
    pub(crate) course_id: String,
    pub(crate) semester_offered: Option<String>,
    pub(crate) year_level: Option<i32>,
    pub(crate) professor_name: Option<String>,
    pub(crate) lecture_hours: i32,
    pub(crate) laboratory_hours: i32,
    pub(crate) status: EnrollmentStatus,
    pub(crate) updated_at: String,
}

impl SubjectResponse {
    pub(crate) fn from_db(subject: Subject) -> Self {
        Self {
            id: subject.id,
            code: subject.code,
            name: subject.name,
            credits: subject.credits,
            department_id: subject.department_id,
            course_id: subject.course_id,
            semester_offered: subject.semester_offered,
            year_level: subject.year_level,
            professor_name: subject.professor_name,
            lecture_hours: subject.lecture_hours,
            laboratory_hours: subject.laboratory_hours,
            status: subject.status,
            updated_at: format_primitive(subject.updated_at),
        }
    }
}

/// One row of a subject roster.
#[derive(Debug, Serialize)]
pub(crate) struct RosterEntry {
    pub(crate) student_id: String,
    pub(crate) student_number: String,
    pub(crate) full_name: String,
    pub(crate) year_level: Option<String>,
}

impl RosterEntry {
    pub(crate) fn from_db(student: Student) -> Self {
        let full_name = student.full_name();
        Self {
            student_id: student.id,
            student_number: student.student_number,
            full_name,
            year_level: student.year_level,
        }
    }
}
