use std::collections::HashMap;

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;
use log::info;
use crate::db::{forum, profiles};
use crate::errors::AppError;
use crate::models::forum::{ForumComment, ForumPost};
use crate::utils::jwt::AuthUser;
use crate::utils::validation::{normalize_video_url, require_text, validate_payload};

const ANONYMOUS: &str = "Anonymous";

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PostSort {
    #[default]
    Latest,
    Popular,
}

#[derive(Deserialize)]
pub struct PostsQuery {
    #[serde(default)]
    sort: PostSort,
    limit: Option<i64>,
    q: Option<String>,
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PostRequest {
    #[validate(length(max = 200, message = "Title must be at most 200 characters"))]
    title: String,

    #[validate(length(max = 20000, message = "Content must be at most 20000 characters"))]
    content: String,

    video_url: Option<String>,
}

#[derive(Deserialize, Validate)]
pub struct CommentRequest {
    #[validate(length(max = 5000, message = "Comment must be at most 5000 characters"))]
    content: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PostSummary {
    #[serde(flatten)]
    post: ForumPost,
    username: String,
    comment_count: i64,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    #[serde(flatten)]
    comment: ForumComment,
    username: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDetail {
    #[serde(flatten)]
    post: ForumPost,
    username: String,
    comments: Vec<CommentView>,
}

fn author_name(names: &HashMap<Uuid, String>, user_id: &Uuid) -> String {
    names.get(user_id).cloned().unwrap_or_else(|| ANONYMOUS.to_string())
}

fn unique_authors<'a>(ids: impl Iterator<Item = &'a Uuid>) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = ids.copied().collect();
    ids.sort();
    ids.dedup();
    ids
}

/// Joins authors and comment counts onto posts. Popular ordering is by
/// comment count, keeping newest-first among equals.
fn summarize(
    posts: Vec<ForumPost>,
    names: &HashMap<Uuid, String>,
    counts: &HashMap<i64, i64>,
    sort: PostSort,
) -> Vec<PostSummary> {
    let mut summaries: Vec<PostSummary> = posts
        .into_iter()
        .map(|post| PostSummary {
            username: author_name(names, &post.user_id),
            comment_count: counts.get(&post.id).copied().unwrap_or(0),
            post,
        })
        .collect();

    if sort == PostSort::Popular {
        summaries.sort_by(|a, b| b.comment_count.cmp(&a.comment_count));
    }
    summaries
}

async fn owned_post(pool: &PgPool, post_id: i64, user: &AuthUser) -> Result<ForumPost, AppError> {
    let post = forum::find_post(pool, post_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;
    if post.user_id != user.id {
        return Err(AppError::Forbidden("You don't have permission to change this post.".to_string()));
    }
    Ok(post)
}

struct CleanPost {
    title: String,
    content: String,
    video_url: Option<String>,
}

fn clean_post(payload: &PostRequest) -> Result<CleanPost, AppError> {
    validate_payload(payload)?;
    if payload.title.trim().is_empty() || payload.content.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Please provide both a title and content for your post.".to_string(),
        ));
    }
    Ok(CleanPost {
        title: require_text(&payload.title, "Title")?,
        content: require_text(&payload.content, "Content")?,
        video_url: normalize_video_url(payload.video_url.as_deref())?,
    })
}

// GET /v1/forum/posts
pub async fn list_posts(
    pool: web::Data<PgPool>,
    query: web::Query<PostsQuery>,
) -> Result<HttpResponse, AppError> {
    if let Some(limit) = query.limit {
        if !(1..=100).contains(&limit) {
            return Err(AppError::BadRequest("Limit must be between 1 and 100".to_string()));
        }
    }
    let search = query.q.as_deref().map(str::trim).filter(|q| !q.is_empty());

    let posts = forum::list_posts(&pool, forum::PostFilter { search, limit: query.limit }).await?;
    let post_ids: Vec<i64> = posts.iter().map(|post| post.id).collect();
    let author_ids = unique_authors(posts.iter().map(|post| &post.user_id));

    let (names, counts) = tokio::try_join!(
        profiles::usernames(&pool, &author_ids),
        forum::comment_counts(&pool, &post_ids),
    )?;

    Ok(HttpResponse::Ok().json(summarize(posts, &names, &counts, query.sort)))
}

// POST /v1/forum/posts
pub async fn create_post(
    user: AuthUser,
    pool: web::Data<PgPool>,
    payload: web::Json<PostRequest>,
) -> Result<HttpResponse, AppError> {
    let post = clean_post(&payload)?;
    let created = forum::insert_post(&pool, user.id, &post.title, &post.content, post.video_url.as_deref()).await?;
    info!("User {} created post {}", user.id, created.id);
    Ok(HttpResponse::Created().json(created))
}

// GET /v1/forum/posts/{postId}
pub async fn get_post(
    pool: web::Data<PgPool>,
    post_id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let post_id = post_id.into_inner();
    let (post, comments) = tokio::try_join!(
        forum::find_post(&pool, post_id),
        forum::list_comments(&pool, post_id),
    )?;
    let post = post.ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

    let author_ids = unique_authors(
        comments.iter().map(|c| &c.user_id).chain(std::iter::once(&post.user_id)),
    );
    let names = profiles::usernames(&pool, &author_ids).await?;

    let comments = comments
        .into_iter()
        .map(|comment| CommentView { username: author_name(&names, &comment.user_id), comment })
        .collect();

    Ok(HttpResponse::Ok().json(PostDetail {
        username: author_name(&names, &post.user_id),
        post,
        comments,
    }))
}

// PATCH /v1/forum/posts/{postId}
pub async fn update_post(
    user: AuthUser,
    pool: web::Data<PgPool>,
    post_id: web::Path<i64>,
    payload: web::Json<PostRequest>,
) -> Result<HttpResponse, AppError> {
    let post = clean_post(&payload)?;
    let existing = owned_post(&pool, *post_id, &user).await?;

    let updated = forum::update_post(&pool, existing.id, &post.title, &post.content, post.video_url.as_deref())
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;
    info!("User {} edited post {}", user.id, updated.id);
    Ok(HttpResponse::Ok().json(updated))
}

// DELETE /v1/forum/posts/{postId}
pub async fn delete_post(
    user: AuthUser,
    pool: web::Data<PgPool>,
    post_id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let existing = owned_post(&pool, *post_id, &user).await?;
    forum::delete_post(&pool, existing.id).await?;
    info!("User {} deleted post {}", user.id, existing.id);
    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Post deleted successfully" })))
}

// POST /v1/forum/posts/{postId}/comments
pub async fn create_comment(
    user: AuthUser,
    pool: web::Data<PgPool>,
    post_id: web::Path<i64>,
    payload: web::Json<CommentRequest>,
) -> Result<HttpResponse, AppError> {
    validate_payload(&*payload)?;
    let content = require_text(&payload.content, "Comment")?;

    let post = forum::find_post(&pool, *post_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;
    let comment = forum::insert_comment(&pool, post.id, user.id, &content).await?;
    Ok(HttpResponse::Created().json(comment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::utils::jwt::generate_token;
    use actix_web::test::{call_service, init_service, TestRequest};
    use actix_web::{http::StatusCode, App};
    use chrono::{Duration, Utc};

    fn post(id: i64, user_id: Uuid, minutes_ago: i64) -> ForumPost {
        ForumPost {
            id,
            user_id,
            title: format!("Post {}", id),
            content: "本を読みました".to_string(),
            video_url: None,
            created_at: Utc::now() - Duration::minutes(minutes_ago),
            updated_at: None,
        }
    }

    #[test]
    fn popular_sorts_by_comments_and_keeps_order_on_ties() {
        let alice = Uuid::new_v4();
        let posts = vec![post(3, alice, 1), post(2, Uuid::new_v4(), 2), post(1, alice, 3)];
        let names = HashMap::from([(alice, "alice".to_string())]);
        let counts = HashMap::from([(1, 4), (2, 1), (3, 1)]);

        let latest = summarize(posts.clone(), &names, &counts, PostSort::Latest);
        assert_eq!(latest.iter().map(|s| s.post.id).collect::<Vec<_>>(), vec![3, 2, 1]);

        let popular = summarize(posts, &names, &counts, PostSort::Popular);
        assert_eq!(popular.iter().map(|s| s.post.id).collect::<Vec<_>>(), vec![1, 3, 2]);
        assert_eq!(popular[0].username, "alice");
        assert_eq!(popular[2].username, "Anonymous");
    }

    #[test]
    fn missing_counts_default_to_zero() {
        let summaries = summarize(vec![post(9, Uuid::nil(), 0)], &HashMap::new(), &HashMap::new(), PostSort::Latest);
        assert_eq!(summaries[0].comment_count, 0);
    }

    #[test]
    fn summary_json_is_camel_case() {
        let mut with_video = post(4, Uuid::nil(), 0);
        with_video.video_url = Some("https://www.youtube.com/embed/abc".to_string());
        let summaries = summarize(vec![with_video], &HashMap::new(), &HashMap::from([(4, 2)]), PostSort::Latest);

        let json = serde_json::to_value(&summaries[0]).unwrap();
        assert_eq!(json["videoUrl"], "https://www.youtube.com/embed/abc");
        assert_eq!(json["commentCount"], 2);
        assert!(json.get("userId").is_some());
        assert!(json.get("createdAt").is_some());
        assert!(json.get("video_url").is_none());
    }

    #[test]
    fn unique_authors_dedups() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let ids = unique_authors([a, b, a].iter());
        assert_eq!(ids.len(), 2);
    }

    #[test]
    fn clean_post_requires_title_and_content() {
        let empty = PostRequest { title: "  ".into(), content: "body".into(), video_url: None };
        assert!(clean_post(&empty).is_err());

        let with_video = PostRequest {
            title: " Tips ".into(),
            content: "Shadowing helps".into(),
            video_url: Some("https://youtu.be/abc".into()),
        };
        let cleaned = clean_post(&with_video).unwrap();
        assert_eq!(cleaned.title, "Tips");
        assert_eq!(cleaned.video_url.as_deref(), Some("https://www.youtube.com/embed/abc"));
    }

    #[actix_web::test]
    async fn creating_post_needs_auth_and_valid_video() {
        let config = Config::for_tests();
        let pool = PgPool::connect_lazy(&config.database_url).unwrap();
        let token = generate_token(Uuid::new_v4(), "a@b.co", &config.jwt_secret);
        let app = init_service(
            App::new()
                .app_data(web::Data::new(config))
                .app_data(web::Data::new(pool))
                .route("/v1/forum/posts", web::post().to(create_post)),
        )
        .await;

        let body = serde_json::json!({ "title": "Hi", "content": "Hello", "videoUrl": "https://vimeo.com/1" });

        let anonymous = TestRequest::post().uri("/v1/forum/posts").set_json(&body).to_request();
        assert_eq!(call_service(&app, anonymous).await.status(), StatusCode::UNAUTHORIZED);

        let bad_video = TestRequest::post()
            .uri("/v1/forum/posts")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .set_json(&body)
            .to_request();
        assert_eq!(call_service(&app, bad_video).await.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn list_rejects_out_of_range_limit() {
        let config = Config::for_tests();
        let pool = PgPool::connect_lazy(&config.database_url).unwrap();
        let app = init_service(
            App::new()
                .app_data(web::Data::new(pool))
                .route("/v1/forum/posts", web::get().to(list_posts)),
        )
        .await;

        let req = TestRequest::get().uri("/v1/forum/posts?limit=0").to_request();
        assert_eq!(call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }
}
