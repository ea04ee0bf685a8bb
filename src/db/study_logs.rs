use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use chrono::{DateTime, Utc};

use crate::models::study_log::StudyLog;

pub struct NewStudyLog<'a> {
    pub user_id: Uuid,
    pub activity_type: &'a str,
    pub description: Option<&'a str>,
    pub duration: i32,
    pub xp_earned: i32,
    pub logged_at: DateTime<Utc>,
}

pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<StudyLog>, sqlx::Error> {
    sqlx::query_as::<_, StudyLog>(
        "SELECT id, user_id, activity_type, description, duration, xp_earned, logged_at
        FROM study_logs WHERE user_id = $1 ORDER BY logged_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn insert(conn: &mut PgConnection, log: NewStudyLog<'_>) -> Result<StudyLog, sqlx::Error> {
    sqlx::query_as::<_, StudyLog>(
        "INSERT INTO study_logs (user_id, activity_type, description, duration, xp_earned, logged_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, user_id, activity_type, description, duration, xp_earned, logged_at",
    )
    .bind(log.user_id)
    .bind(log.activity_type)
    .bind(log.description)
    .bind(log.duration)
    .bind(log.xp_earned)
    .bind(log.logged_at)
    .fetch_one(conn)
    .await
}

pub async fn delete_for_user(conn: &mut PgConnection, user_id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM study_logs WHERE user_id = $1")
        .bind(user_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}
