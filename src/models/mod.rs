pub mod forum;
pub mod milestone;
pub mod profile;
pub mod study_log;
