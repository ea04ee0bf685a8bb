use std::collections::HashMap;

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::profile::{Profile, ProfileName};
use crate::utils::xp::level_for_xp;

pub async fn find(pool: &PgPool, user_id: Uuid) -> Result<Option<Profile>, sqlx::Error> {
    sqlx::query_as::<_, Profile>("SELECT id, username, xp, level, study_hours FROM profiles WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

/// Returns the profile, creating a fresh one (level 1, no XP) if missing.
pub async fn ensure(pool: &PgPool, user_id: Uuid, username: Option<&str>) -> Result<Profile, sqlx::Error> {
    if let Some(profile) = find(pool, user_id).await? {
        return Ok(profile);
    }

    sqlx::query(
        "INSERT INTO profiles (id, username, xp, level, study_hours) VALUES ($1, $2, 0, 1, 0)
        ON CONFLICT (id) DO NOTHING",
    )
    .bind(user_id)
    .bind(username)
    .execute(pool)
    .await?;

    find(pool, user_id).await?.ok_or(sqlx::Error::RowNotFound)
}

pub async fn update_username(pool: &PgPool, user_id: Uuid, username: &str) -> Result<Option<Profile>, sqlx::Error> {
    sqlx::query_as::<_, Profile>(
        "UPDATE profiles SET username = $1 WHERE id = $2 RETURNING id, username, xp, level, study_hours",
    )
    .bind(username)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// Locks the profile row for the rest of the transaction.
pub async fn lock(conn: &mut PgConnection, user_id: Uuid) -> Result<Option<Profile>, sqlx::Error> {
    sqlx::query_as::<_, Profile>(
        "SELECT id, username, xp, level, study_hours FROM profiles WHERE id = $1 FOR UPDATE",
    )
    .bind(user_id)
    .fetch_optional(conn)
    .await
}

/// XP, level and study hours after adding the deltas. XP saturates at the
/// `int4` bounds instead of overflowing.
pub fn next_totals(profile: &Profile, xp_delta: i32, hours_delta: f64) -> (i32, i32, f64) {
    let xp = profile.xp.saturating_add(xp_delta);
    (xp, level_for_xp(xp), profile.study_hours + hours_delta)
}

/// Adds XP and study hours to a locked profile and recomputes its level.
pub async fn add_progress(
    conn: &mut PgConnection,
    profile: &Profile,
    xp_delta: i32,
    hours_delta: f64,
) -> Result<Profile, sqlx::Error> {
    let (xp, level, study_hours) = next_totals(profile, xp_delta, hours_delta);
    sqlx::query_as::<_, Profile>(
        "UPDATE profiles SET xp = $1, level = $2, study_hours = $3 WHERE id = $4
        RETURNING id, username, xp, level, study_hours",
    )
    .bind(xp)
    .bind(level)
    .bind(study_hours)
    .bind(profile.id)
    .fetch_one(conn)
    .await
}

pub async fn reset_stats(conn: &mut PgConnection, user_id: Uuid) -> Result<Option<Profile>, sqlx::Error> {
    sqlx::query_as::<_, Profile>(
        "UPDATE profiles SET xp = 0, level = 1, study_hours = 0 WHERE id = $1
        RETURNING id, username, xp, level, study_hours",
    )
    .bind(user_id)
    .fetch_optional(conn)
    .await
}

pub async fn list_by_xp(pool: &PgPool) -> Result<Vec<Profile>, sqlx::Error> {
    sqlx::query_as::<_, Profile>("SELECT id, username, xp, level, study_hours FROM profiles ORDER BY xp DESC")
        .fetch_all(pool)
        .await
}

/// Usernames for the given ids; ids without a profile are absent.
pub async fn usernames(pool: &PgPool, ids: &[Uuid]) -> Result<HashMap<Uuid, String>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = sqlx::query_as::<_, ProfileName>("SELECT id, username FROM profiles WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(pool)
        .await?;
    Ok(rows
        .into_iter()
        .filter_map(|row| row.username.map(|name| (row.id, name)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(xp: i32, study_hours: f64) -> Profile {
        Profile { id: Uuid::nil(), username: None, xp, level: level_for_xp(xp), study_hours }
    }

    #[test]
    fn totals_add_xp_hours_and_level() {
        let (xp, level, hours) = next_totals(&profile(950, 1.5), 100, 0.5);
        assert_eq!(xp, 1050);
        assert_eq!(level, 2);
        assert_eq!(hours, 2.0);
    }

    #[test]
    fn xp_saturates_instead_of_overflowing() {
        let (xp, level, _) = next_totals(&profile(i32::MAX - 10, 0.0), 500, 0.0);
        assert_eq!(xp, i32::MAX);
        assert_eq!(level, i32::MAX / 1000 + 1);
    }
}
