pub mod analytics;
pub mod auth;
pub mod forum;
pub mod leaderboard;
pub mod milestone;
pub mod profile;
pub mod study_log;
