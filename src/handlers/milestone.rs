use std::collections::HashMap;

use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use log::warn;
use crate::db::milestones::{self, ClaimOutcome};
use crate::db::profiles;
use crate::errors::AppError;
use crate::models::milestone::{Milestone, UserMilestone};
use crate::models::profile::Profile;
use crate::models::study_log::StudyLog;
use crate::utils::jwt::AuthUser;

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneView {
    #[serde(flatten)]
    milestone: Milestone,
    claimed: bool,
    claimed_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ClaimResponse {
    milestone: Milestone,
    profile: Profile,
    log: StudyLog,
    message: String,
}

fn with_claims(all: Vec<Milestone>, claims: &[UserMilestone]) -> Vec<MilestoneView> {
    let claimed: HashMap<i64, DateTime<Utc>> = claims
        .iter()
        .map(|claim| (claim.milestone_id, claim.claimed_at))
        .collect();

    all.into_iter()
        .map(|milestone| {
            let claimed_at = claimed.get(&milestone.id).copied();
            MilestoneView { milestone, claimed: claimed_at.is_some(), claimed_at }
        })
        .collect()
}

// GET /v1/milestones
pub async fn get_milestones(
    user: AuthUser,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let all = milestones::list(&pool).await?;
    let claims = milestones::claimed_by(&pool, user.id).await?;
    Ok(HttpResponse::Ok().json(with_claims(all, &claims)))
}

// POST /v1/milestones/{milestoneId}/claim
pub async fn claim_milestone(
    user: AuthUser,
    pool: web::Data<PgPool>,
    milestone_id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    profiles::ensure(&pool, user.id, user.email.as_deref()).await?;

    let outcome = milestones::claim(&pool, user.id, *milestone_id).await?;
    if matches!(outcome, ClaimOutcome::AlreadyClaimed) {
        warn!("User {} tried to claim milestone {} twice", user.id, milestone_id);
    }
    claim_result(outcome).map(|claimed| HttpResponse::Ok().json(claimed))
}

/// Maps a claim attempt onto the response body or the error status.
fn claim_result(outcome: ClaimOutcome) -> Result<ClaimResponse, AppError> {
    match outcome {
        ClaimOutcome::Claimed { milestone, profile, log } => {
            let message = format!("Milestone claimed! You earned {} XP", milestone.xp_reward);
            Ok(ClaimResponse { milestone, profile, log, message })
        }
        ClaimOutcome::AlreadyClaimed => Err(AppError::Conflict("Milestone already claimed".to_string())),
        ClaimOutcome::UnknownMilestone => Err(AppError::NotFound("Milestone not found".to_string())),
        ClaimOutcome::MissingProfile => Err(AppError::NotFound("Profile not found".to_string())),
    }
}
