use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use validator::Validate;
use chrono::Utc;
use log::info;
use crate::db::{profiles, study_logs};
use crate::errors::AppError;
use crate::models::profile::Profile;
use crate::models::study_log::StudyLog;
use crate::utils::jwt::AuthUser;
use crate::utils::validation::{validate_activity_type, validate_payload};
use crate::utils::xp::{calculate_xp, explain_xp, xp_breakdown, XpBreakdown};

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StudyLogRequest {
    #[validate(required(message = "Activity type is required"))]
    #[validate(length(min = 1, message = "Activity type cannot be empty"))]
    activity_type: Option<String>,

    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    description: Option<String>,

    #[validate(required(message = "Duration is required"))]
    #[validate(range(min = 1, max = 1440, message = "Duration must be between 1 and 1440 minutes"))]
    duration: Option<i32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyLogResponse {
    log: StudyLog,
    profile: Profile,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplainQuery {
    activity_type: String,
    duration: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplainResponse {
    breakdown: XpBreakdown,
    random_bonus_min: i32,
    random_bonus_max: i32,
    explanation: String,
}

// GET /v1/study-logs
pub async fn get_study_logs(
    user: AuthUser,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let logs = study_logs::list_for_user(&pool, user.id).await?;
    Ok(HttpResponse::Ok().json(logs))
}

// POST /v1/study-logs
pub async fn create_study_log(
    user: AuthUser,
    pool: web::Data<PgPool>,
    payload: web::Json<StudyLogRequest>,
) -> Result<HttpResponse, AppError> {
    validate_payload(&*payload)?;

    let activity_type = validate_activity_type(payload.activity_type.as_deref().unwrap_or_default())?;
    let duration = payload.duration.unwrap_or_default();
    let description = payload
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty());

    let xp_earned = calculate_xp(activity_type.as_str(), f64::from(duration), &mut rand::thread_rng());

    // Make sure a profile exists before locking it.
    profiles::ensure(&pool, user.id, user.email.as_deref()).await?;

    let mut tx = pool.begin().await?;
    let profile = profiles::lock(&mut tx, user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))?;

    let log = study_logs::insert(
        &mut tx,
        study_logs::NewStudyLog {
            user_id: user.id,
            activity_type: activity_type.as_str(),
            description,
            duration,
            xp_earned,
            logged_at: Utc::now(),
        },
    )
    .await?;
    let profile = profiles::add_progress(&mut tx, &profile, xp_earned, f64::from(duration) / 60.0).await?;
    tx.commit().await?;

    info!(
        "User {} logged {} min of {} (+{} XP)",
        user.id, duration, activity_type, xp_earned
    );

    Ok(HttpResponse::Created().json(StudyLogResponse { log, profile }))
}

// GET /v1/xp/explain
pub async fn explain(query: web::Query<ExplainQuery>) -> Result<HttpResponse, AppError> {
    if !query.duration.is_finite() || query.duration < 0.0 {
        return Err(AppError::BadRequest("Duration must be a non-negative number".to_string()));
    }

    Ok(HttpResponse::Ok().json(ExplainResponse {
        breakdown: xp_breakdown(&query.activity_type, query.duration),
        random_bonus_min: 1,
        random_bonus_max: 10,
        explanation: explain_xp(&query.activity_type, query.duration),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::utils::jwt::generate_token;
    use actix_web::test::{call_and_read_body_json, call_service, init_service, TestRequest};
    use actix_web::{http::StatusCode, App};
    use uuid::Uuid;

    async fn post_log(body: serde_json::Value) -> StatusCode {
        let config = Config::for_tests();
        let pool = PgPool::connect_lazy(&config.database_url).unwrap();
        let token = generate_token(Uuid::new_v4(), "a@b.co", &config.jwt_secret);
        let app = init_service(
            App::new()
                .app_data(web::Data::new(config))
                .app_data(web::Data::new(pool))
                .route("/v1/study-logs", web::post().to(create_study_log)),
        )
        .await;

        let req = TestRequest::post()
            .uri("/v1/study-logs")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .set_json(body)
            .to_request();
        call_service(&app, req).await.status()
    }

    #[actix_web::test]
    async fn milestone_type_cannot_be_logged() {
        let status = post_log(serde_json::json!({ "activityType": "Milestone", "duration": 30 })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn zero_duration_is_rejected() {
        let status = post_log(serde_json::json!({ "activityType": "Reading", "duration": 0 })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn missing_type_is_rejected() {
        let status = post_log(serde_json::json!({ "duration": 15 })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn explain_reports_breakdown() {
        let app = init_service(App::new().route("/v1/xp/explain", web::get().to(explain))).await;
        let req = TestRequest::get()
            .uri("/v1/xp/explain?activityType=Grammar&duration=60")
            .to_request();
        let body: serde_json::Value = call_and_read_body_json(&app, req).await;

        assert_eq!(body["breakdown"]["base"], 300.0);
        assert_eq!(body["breakdown"]["sessionBonus"], 75.0);
        assert_eq!(body["randomBonusMax"], 10);
        assert!(body["explanation"].as_str().unwrap().contains("Total: ~525 XP"));
    }
}
