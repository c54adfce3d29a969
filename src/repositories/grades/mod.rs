mod commands;
mod queries;
mod types;

pub(crate) use commands::{
    backfill_blank_terms, deactivate_active_for_subject, delete_by_id, delete_for_subject,
    insert_if_absent, reactivate_matching_slot, save, set_active,
};
pub(crate) use queries::{find_first_for_subject, find_slot_for_update, list_for_student};
pub(crate) use types::{GradeWrite, NewGrade, TermSlot};
