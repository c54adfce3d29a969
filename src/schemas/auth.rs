use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::schemas::student::StudentProfile;
use crate::schemas::user::UserResponse;
use crate::services::enrollment::AssignmentOutcome;

#[derive(Debug, Serialize)]
pub(crate) struct TokenResponse {
    pub(crate) access_token: String,
    pub(crate) token_type: String,
    pub(crate) user: UserResponse,
}

/// `username` accepts the e-mail address as well.
#[derive(Debug, Deserialize)]
pub(crate) struct UserLogin {
    pub(crate) username: String,
    pub(crate) password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct StaffSignup {
    #[validate(length(min = 3, max = 150, message = "username must be 3-150 characters"))]
    pub(crate) username: String,
    #[validate(email(message = "email must be a valid address"))]
    pub(crate) email: String,
    pub(crate) password: String,
    #[serde(alias = "fullName")]
    #[validate(length(min = 1, message = "full_name must not be empty"))]
    pub(crate) full_name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct StudentSignup {
    #[validate(length(min = 3, max = 150, message = "username must be 3-150 characters"))]
    pub(crate) username: String,
    #[validate(email(message = "email must be a valid address"))]
    pub(crate) email: String,
    pub(crate) password: String,
    #[serde(alias = "studentNumber")]
    #[validate(length(min = 1, max = 255, message = "student_number must not be empty"))]
    pub(crate) student_number: String,
    #[serde(flatten)]
    #[validate(nested)]
    pub(crate) profile: StudentProfile,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ActivateRequest {
    pub(crate) token: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct SignupResponse {
    pub(crate) message: String,
    pub(crate) user: UserResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) student_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) assignment: Option<AssignmentOutcome>,
    /// Returned outside production only, where no mailer delivers it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) activation_token: Option<String>,
}
