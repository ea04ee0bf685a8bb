use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use validator::Validate;
use log::info;
use crate::db::{milestones, profiles, study_logs};
use crate::errors::AppError;
use crate::models::profile::Profile;
use crate::utils::jwt::AuthUser;
use crate::utils::validation::{require_text, validate_payload};

#[derive(Deserialize, Validate)]
pub struct ProfileUpdate {
    #[validate(length(min = 1, max = 50, message = "Username must be between 1 and 50 characters"))]
    username: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetResponse {
    profile: Profile,
    deleted_logs: u64,
    deleted_milestones: u64,
}

// GET /v1/profile
pub async fn get_profile(
    user: AuthUser,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let profile = profiles::ensure(&pool, user.id, user.email.as_deref()).await?;
    Ok(HttpResponse::Ok().json(profile))
}

// PATCH /v1/profile
pub async fn update_profile(
    user: AuthUser,
    pool: web::Data<PgPool>,
    updates: web::Json<ProfileUpdate>,
) -> Result<HttpResponse, AppError> {
    let username = require_text(&updates.username, "Username")?;
    validate_payload(&ProfileUpdate { username: username.clone() })?;

    let profile = profiles::update_username(&pool, user.id, &username)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))?;

    info!("User {} renamed to {}", user.id, username);
    Ok(HttpResponse::Ok().json(profile))
}

// POST /v1/profile/reset
pub async fn reset_progress(
    user: AuthUser,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let mut tx = pool.begin().await?;

    let deleted_logs = study_logs::delete_for_user(&mut tx, user.id).await?;
    let deleted_milestones = milestones::delete_claims_for_user(&mut tx, user.id).await?;
    let profile = profiles::reset_stats(&mut tx, user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))?;

    tx.commit().await?;
    info!(
        "User {} cleared progress ({} logs, {} milestones)",
        user.id, deleted_logs, deleted_milestones
    );

    Ok(HttpResponse::Ok().json(ResetResponse { profile, deleted_logs, deleted_milestones }))
}
