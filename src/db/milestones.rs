use chrono::Utc;
use log::info;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::db::{profiles, study_logs};
use crate::models::milestone::{Milestone, UserMilestone};
use crate::models::profile::Profile;
use crate::models::study_log::{ActivityType, StudyLog};

pub async fn list(pool: &PgPool) -> Result<Vec<Milestone>, sqlx::Error> {
    sqlx::query_as::<_, Milestone>(
        "SELECT id, title, description, xp_reward, badge FROM milestones ORDER BY xp_reward ASC",
    )
    .fetch_all(pool)
    .await
}

pub async fn find(conn: &mut PgConnection, milestone_id: i64) -> Result<Option<Milestone>, sqlx::Error> {
    sqlx::query_as::<_, Milestone>("SELECT id, title, description, xp_reward, badge FROM milestones WHERE id = $1")
        .bind(milestone_id)
        .fetch_optional(conn)
        .await
}

pub async fn claimed_by(pool: &PgPool, user_id: Uuid) -> Result<Vec<UserMilestone>, sqlx::Error> {
    sqlx::query_as::<_, UserMilestone>(
        "SELECT user_id, milestone_id, claimed_at FROM user_milestones WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn delete_claims_for_user(conn: &mut PgConnection, user_id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM user_milestones WHERE user_id = $1")
        .bind(user_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

#[derive(Debug)]
pub enum ClaimOutcome {
    Claimed {
        milestone: Milestone,
        profile: Profile,
        log: StudyLog,
    },
    AlreadyClaimed,
    UnknownMilestone,
    MissingProfile,
}

/// Claims a milestone at most once per user.
///
/// The caller's profile row is locked first, so concurrent claims for the
/// same user run one after the other and the second sees the first's row.
pub async fn claim(pool: &PgPool, user_id: Uuid, milestone_id: i64) -> Result<ClaimOutcome, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let Some(profile) = profiles::lock(&mut tx, user_id).await? else {
        return Ok(ClaimOutcome::MissingProfile);
    };
    let Some(milestone) = find(&mut tx, milestone_id).await? else {
        return Ok(ClaimOutcome::UnknownMilestone);
    };

    let now = Utc::now();
    let inserted = sqlx::query(
        "INSERT INTO user_milestones (user_id, milestone_id, claimed_at)
        SELECT $1, $2, $3
        WHERE NOT EXISTS (SELECT 1 FROM user_milestones WHERE user_id = $1 AND milestone_id = $2)",
    )
    .bind(user_id)
    .bind(milestone_id)
    .bind(now)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if inserted == 0 {
        return Ok(ClaimOutcome::AlreadyClaimed);
    }

    let profile = profiles::add_progress(&mut tx, &profile, milestone.xp_reward, 0.0).await?;
    let description = format!("Achieved: {}", milestone.title);
    let log = study_logs::insert(
        &mut tx,
        study_logs::NewStudyLog {
            user_id,
            activity_type: ActivityType::Milestone.as_str(),
            description: Some(&description),
            duration: 0,
            xp_earned: milestone.xp_reward,
            logged_at: now,
        },
    )
    .await?;

    tx.commit().await?;
    info!("User {} claimed milestone {} (+{} XP)", user_id, milestone.id, milestone.xp_reward);

    Ok(ClaimOutcome::Claimed { milestone, profile, log })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seed(pool: &PgPool, xp_reward: i32) -> Result<(Uuid, i64), sqlx::Error> {
        let user_id = Uuid::new_v4();
        profiles::ensure(pool, user_id, Some("gakusei")).await?;
        let (milestone_id,): (i64,) = sqlx::query_as(
            "INSERT INTO milestones (title, description, xp_reward, badge) VALUES ('N5 Kanji', NULL, $1, NULL) RETURNING id",
        )
        .bind(xp_reward)
        .fetch_one(pool)
        .await?;
        Ok((user_id, milestone_id))
    }

    // Runs against DATABASE_URL: `cargo test -- --ignored`.
    #[ignore = "needs a Postgres DATABASE_URL"]
    #[sqlx::test(migrations = "./migrations")]
    async fn second_claim_is_rejected_and_counted_once(pool: PgPool) -> sqlx::Result<()> {
        let (user_id, milestone_id) = seed(&pool, 500).await?;

        let first = claim(&pool, user_id, milestone_id).await?;
        assert!(matches!(first, ClaimOutcome::Claimed { ref profile, .. } if profile.xp == 500));

        let second = claim(&pool, user_id, milestone_id).await?;
        assert!(matches!(second, ClaimOutcome::AlreadyClaimed));

        let (claims,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM user_milestones WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&pool)
            .await?;
        assert_eq!(claims, 1);

        let (logs,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM study_logs WHERE user_id = $1 AND activity_type = 'Milestone'",
        )
        .bind(user_id)
        .fetch_one(&pool)
        .await?;
        assert_eq!(logs, 1);

        let profile = profiles::find(&pool, user_id).await?.ok_or(sqlx::Error::RowNotFound)?;
        assert_eq!(profile.xp, 500);
        assert_eq!(profile.level, 1);
        Ok(())
    }

    #[ignore = "needs a Postgres DATABASE_URL"]
    #[sqlx::test(migrations = "./migrations")]
    async fn unknown_milestone_and_missing_profile(pool: PgPool) -> sqlx::Result<()> {
        let (user_id, _) = seed(&pool, 100).await?;
        assert!(matches!(claim(&pool, user_id, 9_999).await?, ClaimOutcome::UnknownMilestone));
        assert!(matches!(claim(&pool, Uuid::new_v4(), 1).await?, ClaimOutcome::MissingProfile));
        Ok(())
    }
}
