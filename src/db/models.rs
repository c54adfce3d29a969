use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, PrimitiveDateTime};

use crate::db::types::{EnrollmentStatus, StudentStatus, UserRole};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct User {
    pub(crate) id: String,
    pub(crate) username: String,
    pub(crate) email: Option<String>,
    pub(crate) hashed_password: String,
    pub(crate) full_name: String,
    pub(crate) role: UserRole,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

impl User {
    pub(crate) fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub(crate) fn is_staff_or_admin(&self) -> bool {
        matches!(self.role, UserRole::Admin | UserRole::Staff)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Department {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Course {
    pub(crate) id: String,
    pub(crate) code: String,
    pub(crate) name: String,
    pub(crate) credits: i32,
    pub(crate) department_id: String,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Subject {
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
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Student {
    pub(crate) id: String,
    pub(crate) user_id: Option<String>,
    pub(crate) student_number: String,
    pub(crate) first_name: String,
    pub(crate) middle_name: Option<String>,
    pub(crate) last_name: String,
    pub(crate) email: Option<String>,
    pub(crate) gender: Option<String>,
    pub(crate) date_of_birth: Option<Date>,
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
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

impl Student {
    pub(crate) fn full_name(&self) -> String {
        match self.middle_name.as_deref().filter(|value| !value.is_empty()) {
            Some(middle) => format!("{} {} {}", self.first_name, middle, self.last_name),
            None => format!("{} {}", self.first_name, self.last_name),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Grade {
    pub(crate) id: String,
    pub(crate) student_id: String,
    pub(crate) subject_id: String,
    pub(crate) grade_value: Option<f64>,
    pub(crate) semester: String,
    pub(crate) academic_year: String,
    pub(crate) year_level: Option<String>,
    pub(crate) is_active: bool,
    pub(crate) status: EnrollmentStatus,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct StudentDocument {
    pub(crate) student_id: String,
    pub(crate) kind: String,
    pub(crate) storage_key: String,
    pub(crate) filename: String,
    pub(crate) content_type: String,
    pub(crate) size_bytes: i64,
    pub(crate) sha256: String,
    pub(crate) uploaded_at: PrimitiveDateTime,
}

/// A consumed activation token: who it activates and when it was issued.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct ActivationToken {
    pub(crate) user_id: String,
    pub(crate) created_at: PrimitiveDateTime,
}
