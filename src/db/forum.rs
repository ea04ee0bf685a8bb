use std::collections::HashMap;

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::forum::{CommentCount, ForumComment, ForumPost};

const POST_COLUMNS: &str = "id, user_id, title, content, video_url, created_at, updated_at";
const COMMENT_COLUMNS: &str = "id, post_id, user_id, content, created_at";

pub struct PostFilter<'a> {
    pub search: Option<&'a str>,
    pub limit: Option<i64>,
}

/// Posts newest first, optionally matching `search` in title or content.
pub async fn list_posts(pool: &PgPool, filter: PostFilter<'_>) -> Result<Vec<ForumPost>, sqlx::Error> {
    let pattern = filter.search.map(|q| format!("%{}%", escape_like(q)));
    let sql = format!(
        "SELECT {} FROM forum_posts
        WHERE ($1::text IS NULL OR title ILIKE $1 OR content ILIKE $1)
        ORDER BY created_at DESC
        LIMIT $2",
        POST_COLUMNS
    );
    sqlx::query_as::<_, ForumPost>(&sql)
        .bind(pattern)
        .bind(filter.limit)
        .fetch_all(pool)
        .await
}

fn escape_like(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

pub async fn comment_counts(pool: &PgPool, post_ids: &[i64]) -> Result<HashMap<i64, i64>, sqlx::Error> {
    if post_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = sqlx::query_as::<_, CommentCount>(
        "SELECT post_id, COUNT(*) AS count FROM forum_comments WHERE post_id = ANY($1) GROUP BY post_id",
    )
    .bind(post_ids)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|row| (row.post_id, row.count)).collect())
}

pub async fn find_post(pool: &PgPool, post_id: i64) -> Result<Option<ForumPost>, sqlx::Error> {
    sqlx::query_as::<_, ForumPost>(&format!("SELECT {} FROM forum_posts WHERE id = $1", POST_COLUMNS))
        .bind(post_id)
        .fetch_optional(pool)
        .await
}

pub async fn insert_post(
    pool: &PgPool,
    user_id: Uuid,
    title: &str,
    content: &str,
    video_url: Option<&str>,
) -> Result<ForumPost, sqlx::Error> {
    sqlx::query_as::<_, ForumPost>(&format!(
        "INSERT INTO forum_posts (user_id, title, content, video_url) VALUES ($1, $2, $3, $4) RETURNING {}",
        POST_COLUMNS
    ))
    .bind(user_id)
    .bind(title)
    .bind(content)
    .bind(video_url)
    .fetch_one(pool)
    .await
}

pub async fn update_post(
    pool: &PgPool,
    post_id: i64,
    title: &str,
    content: &str,
    video_url: Option<&str>,
) -> Result<Option<ForumPost>, sqlx::Error> {
    sqlx::query_as::<_, ForumPost>(&format!(
        "UPDATE forum_posts SET title = $1, content = $2, video_url = $3, updated_at = $4
        WHERE id = $5 RETURNING {}",
        POST_COLUMNS
    ))
    .bind(title)
    .bind(content)
    .bind(video_url)
    .bind(Utc::now())
    .bind(post_id)
    .fetch_optional(pool)
    .await
}

/// Deletes the post and its comments together.
pub async fn delete_post(pool: &PgPool, post_id: i64) -> Result<u64, sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM forum_comments WHERE post_id = $1")
        .bind(post_id)
        .execute(&mut *tx)
        .await?;
    let deleted = sqlx::query("DELETE FROM forum_posts WHERE id = $1")
        .bind(post_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    tx.commit().await?;
    Ok(deleted)
}

pub async fn list_comments(pool: &PgPool, post_id: i64) -> Result<Vec<ForumComment>, sqlx::Error> {
    sqlx::query_as::<_, ForumComment>(&format!(
        "SELECT {} FROM forum_comments WHERE post_id = $1 ORDER BY created_at ASC",
        COMMENT_COLUMNS
    ))
    .bind(post_id)
    .fetch_all(pool)
    .await
}

pub async fn insert_comment(
    pool: &PgPool,
    post_id: i64,
    user_id: Uuid,
    content: &str,
) -> Result<ForumComment, sqlx::Error> {
    sqlx::query_as::<_, ForumComment>(&format!(
        "INSERT INTO forum_comments (post_id, user_id, content) VALUES ($1, $2, $3) RETURNING {}",
        COMMENT_COLUMNS
    ))
    .bind(post_id)
    .bind(user_id)
    .bind(content)
    .fetch_one(pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("100%_done\\"), "100\\%\\_done\\\\");
        assert_eq!(escape_like("kanji"), "kanji");
    }
}
