pub(crate) mod accounts;
pub(crate) mod documents;
pub(crate) mod enrollment;
pub(crate) mod errors;
pub(crate) mod grade_lifecycle;
pub(crate) mod grade_state;
pub(crate) mod grouping;
pub(crate) mod storage;
