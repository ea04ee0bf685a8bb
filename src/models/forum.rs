use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::Utc;

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ForumPost {
    pub id: i64,
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    pub video_url: Option<String>,
    pub created_at: chrono::DateTime<Utc>,
    pub updated_at: Option<chrono::DateTime<Utc>>,
}

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ForumComment {
    pub id: i64,
    pub post_id: i64,
    pub user_id: Uuid,
    pub content: String,
    pub created_at: chrono::DateTime<Utc>,
}

#[derive(sqlx::FromRow, Debug)]
pub struct CommentCount {
    pub post_id: i64,
    pub count: i64,
}
