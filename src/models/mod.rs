pub mod check_types;
pub mod classify_types;
