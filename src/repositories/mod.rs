pub(crate) mod activation_tokens;
pub(crate) mod courses;
pub(crate) mod departments;
pub(crate) mod documents;
pub(crate) mod grades;
pub(crate) mod students;
pub(crate) mod subjects;
pub(crate) mod users;
