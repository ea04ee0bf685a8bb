use actix_web::{web, HttpResponse};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;
use crate::db::profiles;
use crate::errors::AppError;
use crate::models::profile::Profile;

#[derive(Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    rank: usize,
    user_id: Uuid,
    username: String,
    xp: i32,
    level: i32,
    study_hours: f64,
}

/// Expects profiles already sorted by XP, highest first.
fn rank(profiles: Vec<Profile>) -> Vec<LeaderboardEntry> {
    profiles
        .into_iter()
        .enumerate()
        .map(|(i, profile)| LeaderboardEntry {
            rank: i + 1,
            user_id: profile.id,
            username: profile.display_name().to_string(),
            xp: profile.xp,
            level: profile.level,
            study_hours: profile.study_hours,
        })
        .collect()
}

// GET /v1/leaderboard
pub async fn get_leaderboard(pool: web::Data<PgPool>) -> Result<HttpResponse, AppError> {
    let profiles = profiles::list_by_xp(&pool).await?;
    Ok(HttpResponse::Ok().json(rank(profiles)))
}
