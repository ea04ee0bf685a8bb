pub mod analytics;
pub mod auth_client;
pub mod jwt;
pub mod validation;
pub mod xp;
