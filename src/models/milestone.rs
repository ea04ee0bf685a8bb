use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::Utc;

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub xp_reward: i32,
    pub badge: Option<String>,
}

/// At most one row per (user_id, milestone_id).
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserMilestone {
    pub user_id: Uuid,
    pub milestone_id: i64,
    pub claimed_at: chrono::DateTime<Utc>,
}
