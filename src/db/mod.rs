//! Typed access to the hosted backend's tables. Table and column names
//! match the existing schema exactly.

pub mod forum;
pub mod milestones;
pub mod profiles;
pub mod study_logs;
