pub(crate) mod auth;
pub(crate) mod courses;
pub(crate) mod departments;
pub(crate) mod enrollment;
pub(crate) mod errors;
pub(crate) mod guards;
pub(crate) mod handlers;
pub(crate) mod pagination;
pub(crate) mod router;
pub(crate) mod students;
pub(crate) mod subjects;
pub(crate) mod users;
pub(crate) mod validation;
