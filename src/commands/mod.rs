pub mod classify;
pub mod consistency;
