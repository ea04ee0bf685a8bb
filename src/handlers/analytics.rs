use actix_web::{web, HttpResponse};
use chrono::{FixedOffset, Utc};
use serde::Deserialize;
use sqlx::PgPool;
use crate::db::study_logs;
use crate::errors::AppError;
use crate::utils::analytics::{build_report, Timeframe};
use crate::utils::jwt::AuthUser;
use crate::utils::validation::validate_tz_offset;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsQuery {
    timeframe: Option<String>,
    /// Minutes east of UTC.
    tz_offset: Option<i32>,
}

impl AnalyticsQuery {
    fn timeframe(&self) -> Result<Timeframe, AppError> {
        self.timeframe
            .as_deref()
            .map(str::parse::<Timeframe>)
            .transpose()
            .map_err(AppError::BadRequest)
            .map(Option::unwrap_or_default)
    }

    fn offset(&self) -> Result<FixedOffset, AppError> {
        let minutes = self.tz_offset.unwrap_or(0);
        validate_tz_offset(minutes)?;
        FixedOffset::east_opt(minutes * 60)
            .ok_or_else(|| AppError::BadRequest("Invalid timezone offset".to_string()))
    }
}

// GET /v1/analytics
pub async fn get_analytics(
    user: AuthUser,
    pool: web::Data<PgPool>,
    query: web::Query<AnalyticsQuery>,
) -> Result<HttpResponse, AppError> {
    let timeframe = query.timeframe()?;
    let offset = query.offset()?;

    let logs = study_logs::list_for_user(&pool, user.id).await?;
    let now = Utc::now().with_timezone(&offset);

    Ok(HttpResponse::Ok().json(build_report(&logs, timeframe, now)))
}
