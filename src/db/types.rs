use serde::{Deserialize, Serialize};
use sqlx::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "userrole", rename_all = "lowercase")]
pub(crate) enum UserRole {
    Admin,
    Staff,
    Student,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "studentstatus", rename_all = "lowercase")]
pub(crate) enum StudentStatus {
    #[serde(alias = "enrolled")]
    Enrolled,
    #[serde(alias = "pending")]
    Pending,
    #[serde(alias = "dropped")]
    Dropped,
    #[serde(alias = "graduated")]
    Graduated,
}

/// Status shared by subjects (administrative) and grades (per student and term).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "enrollmentstatus", rename_all = "snake_case")]
pub(crate) enum EnrollmentStatus {
    #[serde(rename = "Currently Taking", alias = "currently_taking")]
    CurrentlyTaking,
    #[serde(rename = "Drop", alias = "drop")]
    Drop,
    #[serde(rename = "Done", alias = "done")]
    Done,
}

impl EnrollmentStatus {
    pub(crate) fn label(self) -> &'static str {
        match self {
            EnrollmentStatus::CurrentlyTaking => "Currently Taking",
            EnrollmentStatus::Drop => "Drop",
            EnrollmentStatus::Done => "Done",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum DocumentKind {
    F137,
    PsaPhotocopy,
    ShsDiplomaPhotocopy,
    GoodMoral,
    HonorableDismissal,
    OriginalTor,
    Pictures,
    ProfilePic,
}

impl DocumentKind {
    pub(crate) const ALL: [DocumentKind; 8] = [
        DocumentKind::F137,
        DocumentKind::PsaPhotocopy,
        DocumentKind::ShsDiplomaPhotocopy,
        DocumentKind::GoodMoral,
        DocumentKind::HonorableDismissal,
        DocumentKind::OriginalTor,
        DocumentKind::Pictures,
        DocumentKind::ProfilePic,
    ];

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            DocumentKind::F137 => "f137",
            DocumentKind::PsaPhotocopy => "psa_photocopy",
            DocumentKind::ShsDiplomaPhotocopy => "shs_diploma_photocopy",
            DocumentKind::GoodMoral => "good_moral",
            DocumentKind::HonorableDismissal => "honorable_dismissal",
            DocumentKind::OriginalTor => "original_tor",
            DocumentKind::Pictures => "pictures",
            DocumentKind::ProfilePic => "profile_pic",
        }
    }

    pub(crate) fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == value)
    }
}
