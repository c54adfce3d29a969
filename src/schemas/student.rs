use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::{format_date, format_primitive, parse_date};
use crate::db::models::{Student, StudentDocument};
use crate::db::types::StudentStatus;
use crate::repositories::students::StudentFields;
use crate::schemas::catalog::{CourseResponse, SubjectResponse};
use crate::schemas::enrollment::GradeResponse;
use crate::services::enrollment::{AssignmentOutcome, StudentWrite};
use crate::services::grade_lifecycle::ReconcileOutcome;
use crate::services::grade_state::{validate_write_semester, validate_year_level};
use crate::services::grouping::{
    CourseStudents, RemovedSubject, StudentRecord, SubjectWithGrade, YearGroup, YearPage,
};

const STUDENT_TYPES: [&str; 3] = ["new", "old", "transferee"];

/// Profile fields shared by registration, admin entry and updates. Absent fields are left
/// unchanged on update.
#[derive(Debug, Default, Deserialize, Validate)]
pub(crate) struct StudentProfile {
    #[serde(default)]
    #[serde(alias = "firstName")]
    #[validate(length(min = 1, max = 255, message = "first_name must be 1-255 characters"))]
    pub(crate) first_name: Option<String>,
    #[serde(default)]
    #[serde(alias = "middleName")]
    pub(crate) middle_name: Option<String>,
    #[serde(default)]
    #[serde(alias = "lastName")]
    #[validate(length(min = 1, max = 255, message = "last_name must be 1-255 characters"))]
    pub(crate) last_name: Option<String>,
    #[serde(default)]
    #[validate(email(message = "email must be a valid address"))]
    pub(crate) email: Option<String>,
    #[serde(default)]
    pub(crate) gender: Option<String>,
    /// `YYYY-MM-DD`.
    #[serde(default)]
    #[serde(alias = "dateOfBirth")]
    pub(crate) date_of_birth: Option<String>,
    #[serde(default)]
    #[serde(alias = "placeOfBirth")]
    pub(crate) place_of_birth: Option<String>,
    #[serde(default)]
    pub(crate) address: Option<String>,
    #[serde(default)]
    #[serde(alias = "phoneNumber")]
    #[validate(length(max = 20, message = "phone_number must be at most 20 characters"))]
    pub(crate) phone_number: Option<String>,
    #[serde(default)]
    pub(crate) citizenship: Option<String>,
    #[serde(default)]
    #[serde(alias = "civilStatus")]
    pub(crate) civil_status: Option<String>,
    #[serde(default)]
    #[serde(alias = "fatherName")]
    pub(crate) father_name: Option<String>,
    #[serde(default)]
    #[serde(alias = "motherName")]
    pub(crate) mother_name: Option<String>,
    #[serde(default)]
    #[serde(alias = "guardianContactNumber")]
    #[validate(length(max = 20, message = "guardian_contact_number must be at most 20 characters"))]
    pub(crate) guardian_contact_number: Option<String>,
    #[serde(default)]
    #[serde(alias = "schoolName")]
    pub(crate) school_name: Option<String>,
    #[serde(default)]
    #[serde(alias = "studentType")]
    pub(crate) student_type: Option<String>,
    #[serde(default)]
    #[serde(alias = "courseId")]
    pub(crate) course_id: Option<String>,
    #[serde(default)]
    #[serde(alias = "departmentId")]
    pub(crate) department_id: Option<String>,
    #[serde(default)]
    #[serde(alias = "yearLevel")]
    pub(crate) year_level: Option<String>,
    #[serde(default)]
    pub(crate) semester: Option<String>,
    #[serde(default)]
    #[serde(alias = "academicYear")]
    pub(crate) academic_year: Option<String>,
    #[serde(default)]
    #[serde(alias = "studentStatus")]
    pub(crate) student_status: Option<StudentStatus>,
}

impl StudentProfile {
    /// Checks the enumerated fields and converts to repository fields.
    pub(crate) fn into_fields(self) -> Result<StudentFields, String> {
        let date_of_birth = match blank_to_none(self.date_of_birth) {
            Some(value) => Some(
                parse_date(&value)
                    .ok_or_else(|| format!("Invalid date_of_birth '{value}', expected YYYY-MM-DD"))?,
            ),
            None => None,
        };
        let year_level =
            validate_year_level(self.year_level.as_deref()).map_err(|e| e.to_string())?;
        let semester = match blank_to_none(self.semester) {
            Some(value) => Some(validate_write_semester(Some(&value)).map_err(|e| e.to_string())?),
            None => None,
        };
        let student_type = match blank_to_none(self.student_type) {
            Some(value) => {
                let normalized = value.trim().to_ascii_lowercase();
                if !STUDENT_TYPES.contains(&normalized.as_str()) {
                    return Err(format!("Invalid student_type '{value}'"));
                }
                Some(normalized)
            }
            None => None,
        };

        Ok(StudentFields {
            first_name: self.first_name,
            middle_name: self.middle_name,
            last_name: self.last_name,
            email: blank_to_none(self.email),
            gender: self.gender,
            date_of_birth,
            place_of_birth: self.place_of_birth,
            address: self.address,
            phone_number: self.phone_number,
            citizenship: self.citizenship,
            civil_status: self.civil_status,
            father_name: self.father_name,
            mother_name: self.mother_name,
            guardian_contact_number: self.guardian_contact_number,
            school_name: self.school_name,
            student_type,
            course_id: blank_to_none(self.course_id),
            department_id: blank_to_none(self.department_id),
            year_level,
            semester,
            academic_year: blank_to_none(self.academic_year),
            student_status: self.student_status,
        })
    }
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct StudentCreate {
    #[serde(alias = "studentNumber")]
    #[validate(length(min = 1, max = 255, message = "student_number must not be empty"))]
    pub(crate) student_number: String,
    /// Links the profile to an existing account with this e-mail.
    #[serde(default)]
    #[serde(alias = "userEmail")]
    pub(crate) user_email: Option<String>,
    #[serde(flatten)]
    #[validate(nested)]
    pub(crate) profile: StudentProfile,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StudentListQuery {
    #[serde(default)]
    pub(crate) search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GradesPageQuery {
    #[serde(default)]
    pub(crate) page: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentResponse {
    pub(crate) id: String,
    pub(crate) user_id: Option<String>,
    pub(crate) student_number: String,
    pub(crate) full_name: String,
    pub(crate) first_name: String,
    pub(crate) middle_name: Option<String>,
    pub(crate) last_name: String,
    pub(crate) email: Option<String>,
    pub(crate) gender: Option<String>,
    pub(crate) date_of_birth: Option<String>,
    pub(crate) place_of_birth: Option<String>,
    pub(crate) address: Option<String>,
    pub(crate) phone_number: Option<String>,
    pub(crate) citizenship: Option<String>,
    pub(crate) civil_status: Option<String>,
    pub(crate) father_name: Option<String>,
    pub(crate) mother_name: Option<String>,
    pub(crate) guardian_contact_number: Option<String>,
    pub(crate) school_name: Option<String>,
    pub(crate) student_type: Option<String>,
    pub(crate) course_id: Option<String>,
    pub(crate) department_id: Option<String>,
    pub(crate) year_level: Option<String>,
    pub(crate) semester: Option<String>,
    pub(crate) academic_year: Option<String>,
    pub(crate) student_status: StudentStatus,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl StudentResponse {
    pub(crate) fn from_db(student: Student) -> Self {
        let full_name = student.full_name();
        Self {
            id: student.id,
            user_id: student.user_id,
            student_number: student.student_number,
            full_name,
            first_name: student.first_name,
            middle_name: student.middle_name,
            last_name: student.last_name,
            email: student.email,
            gender: student.gender,
            date_of_birth: student.date_of_birth.map(format_date),
            place_of_birth: student.place_of_birth,
            address: student.address,
            phone_number: student.phone_number,
            citizenship: student.citizenship,
            civil_status: student.civil_status,
            father_name: student.father_name,
            mother_name: student.mother_name,
            guardian_contact_number: student.guardian_contact_number,
            school_name: student.school_name,
            student_type: student.student_type,
            course_id: student.course_id,
            department_id: student.department_id,
            year_level: student.year_level,
            semester: student.semester,
            academic_year: student.academic_year,
            student_status: student.student_status,
            created_at: format_primitive(student.created_at),
            updated_at: format_primitive(student.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentWriteResponse {
    pub(crate) student: StudentResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) assignment: Option<AssignmentOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) reconcile: Option<ReconcileOutcome>,
}

impl StudentWriteResponse {
    pub(crate) fn from_write(write: StudentWrite) -> Self {
        Self {
            student: StudentResponse::from_db(write.student),
            assignment: write.assignment,
            reconcile: write.reconcile,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct CourseStudentsResponse {
    pub(crate) course_name: String,
    pub(crate) students: Vec<StudentResponse>,
}

impl CourseStudentsResponse {
    pub(crate) fn from_group(group: CourseStudents) -> Self {
        Self {
            course_name: group.course_name,
            students: group.students.into_iter().map(StudentResponse::from_db).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SubjectWithGradeResponse {
    pub(crate) subject: SubjectResponse,
    pub(crate) grade: Option<GradeResponse>,
}

impl SubjectWithGradeResponse {
    fn from_item(item: SubjectWithGrade) -> Self {
        Self {
            subject: SubjectResponse::from_db(item.subject),
            grade: item.grade.map(GradeResponse::from_db),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SemesterGroupResponse {
    pub(crate) semester: String,
    pub(crate) subjects: Vec<SubjectWithGradeResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct YearGroupResponse {
    pub(crate) year_level: String,
    pub(crate) academic_years: Vec<String>,
    pub(crate) semesters: Vec<SemesterGroupResponse>,
}

impl YearGroupResponse {
    pub(crate) fn from_group(group: YearGroup) -> Self {
        Self {
            year_level: group.year_level,
            academic_years: group.academic_years,
            semesters: group
                .semesters
                .into_iter()
                .map(|semester| SemesterGroupResponse {
                    semester: semester.semester,
                    subjects: semester
                        .subjects
                        .into_iter()
                        .map(SubjectWithGradeResponse::from_item)
                        .collect(),
                })
                .collect(),
        }
    }

    pub(crate) fn from_groups(groups: Vec<YearGroup>) -> Vec<Self> {
        groups.into_iter().map(Self::from_group).collect()
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct RemovedSubjectResponse {
    pub(crate) subject: SubjectResponse,
    pub(crate) grade: GradeResponse,
}

impl RemovedSubjectResponse {
    fn from_removed(removed: RemovedSubject) -> Self {
        Self {
            subject: SubjectResponse::from_db(removed.subject),
            grade: GradeResponse::from_db(removed.grade),
        }
    }
}

/// Staff view of one student's whole record.
#[derive(Debug, Serialize)]
pub(crate) struct StudentRecordResponse {
    pub(crate) student: StudentResponse,
    pub(crate) academic_years: Vec<String>,
    pub(crate) years: Vec<YearGroupResponse>,
    pub(crate) removed: Vec<RemovedSubjectResponse>,
    pub(crate) documents: Vec<DocumentResponse>,
}

impl StudentRecordResponse {
    pub(crate) fn new(
        student: Student,
        record: StudentRecord,
        documents: Vec<StudentDocument>,
    ) -> Self {
        Self {
            student: StudentResponse::from_db(student),
            academic_years: record.academic_years,
            years: YearGroupResponse::from_groups(record.years),
            removed: record.removed.into_iter().map(RemovedSubjectResponse::from_removed).collect(),
            documents: documents.into_iter().map(DocumentResponse::from_db).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct CourseSubjectsResponse {
    pub(crate) student_id: String,
    pub(crate) course: Option<CourseResponse>,
    pub(crate) years: Vec<YearGroupResponse>,
}

/// Student's own grade sheet, one year level per page.
#[derive(Debug, Serialize)]
pub(crate) struct GradesPageResponse {
    pub(crate) student: StudentResponse,
    pub(crate) years: Vec<YearGroupResponse>,
    pub(crate) page: usize,
    pub(crate) total_pages: usize,
    pub(crate) has_previous: bool,
    pub(crate) has_next: bool,
}

impl GradesPageResponse {
    pub(crate) fn new(student: Student, page: YearPage) -> Self {
        Self {
            student: StudentResponse::from_db(student),
            years: YearGroupResponse::from_groups(page.years),
            page: page.page,
            total_pages: page.total_pages,
            has_previous: page.has_previous,
            has_next: page.has_next,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct DocumentResponse {
    pub(crate) kind: String,
    pub(crate) filename: String,
    pub(crate) content_type: String,
    pub(crate) size_bytes: i64,
    pub(crate) sha256: String,
    pub(crate) uploaded_at: String,
}

impl DocumentResponse {
    pub(crate) fn from_db(document: StudentDocument) -> Self {
        Self {
            kind: document.kind,
            filename: document.filename,
            content_type: document.content_type,
            size_bytes: document.size_bytes,
            sha256: document.sha256,
            uploaded_at: format_primitive(document.uploaded_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct DownloadUrlResponse {
    pub(crate) kind: String,
    pub(crate) url: String,
    pub(crate) expires_in_seconds: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_conversion_normalizes_enumerated_fields() {
        let profile = StudentProfile {
            date_of_birth: Some("2004-03-09".to_string()),
            year_level: Some("2".to_string()),
            semester: Some("2nd".to_string()),
            student_type: Some("Transferee".to_string()),
            course_id: Some("  ".to_string()),
            ..StudentProfile::default()
        };

        let fields = profile.into_fields().expect("valid profile");
        assert_eq!(fields.date_of_birth.map(format_date).as_deref(), Some("2004-03-09"));
        assert_eq!(fields.year_level.as_deref(), Some("2"));
        assert_eq!(fields.semester.as_deref(), Some("2nd"));
        assert_eq!(fields.student_type.as_deref(), Some("transferee"));
        assert_eq!(fields.course_id, None);
    }

    #[test]
    fn profile_conversion_rejects_bad_values() {
        let bad_date = StudentProfile {
            date_of_birth: Some("09/03/2004".to_string()),
            ..StudentProfile::default()
        };
        assert!(bad_date.into_fields().is_err());

        let bad_year = StudentProfile { year_level: Some("5".to_string()), ..StudentProfile::default() };
        assert!(bad_year.into_fields().is_err());

        let bad_semester =
            StudentProfile { semester: Some("Summer".to_string()), ..StudentProfile::default() };
        assert!(bad_semester.into_fields().unwrap_err().contains("Summer"));
    }
}
