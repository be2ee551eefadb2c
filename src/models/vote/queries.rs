use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use super::types::VoteSummary;
use crate::errors::{AppError, DbViolation, classify};

/// Two concurrent first votes for the same (subject, viewer) pair both see no
/// row to lock, so one insert loses on the unique constraint; the loser
/// re-runs the toggle against the row that now exists. Later rounds always
/// serialize on the row lock, so collisions cannot pile up.
const TOGGLE_MAX_ATTEMPTS: u32 = 8;

#[derive(sqlx::FromRow)]
struct ExistingVote {
    id: Uuid,
    value: i32,
}

/// Toggle one viewer's vote on a decision post.
///
/// Runs as a single transaction: the (decision, viewer) vote row is locked
/// with FOR UPDATE, exactly one of insert/delete/update is applied, and the
/// summary is computed before commit so the returned tallies reflect the
/// committed state. A concurrent toggle for the same pair blocks on the row
/// lock until this transaction completes.
pub async fn toggle_decision_vote(
    pool: &PgPool,
    decision_id: Uuid,
    viewer_id: Uuid,
    value: i32,
) -> Result<VoteSummary, AppError> {
    let mut last_collision = None;
    for _ in 0..TOGGLE_MAX_ATTEMPTS {
        match try_toggle_decision_vote(pool, decision_id, viewer_id, value).await {
            Ok(summary) => return Ok(summary),
            Err(e) if classify_app(&e) == DbViolation::Unique => last_collision = Some(e),
            Err(e) => return Err(e),
        }
    }
    Err(last_collision.unwrap_or(AppError::Conflict("vote could not be applied")))
}

async fn try_toggle_decision_vote(
    pool: &PgPool,
    decision_id: Uuid,
    viewer_id: Uuid,
    value: i32,
) -> Result<VoteSummary, AppError> {
    let mut tx = pool.begin().await?;

    let existing = sqlx::query_as::<_, ExistingVote>(
        "SELECT id, value \
         FROM decision_votes \
         WHERE decision_id = $1 AND voter_viewer_id = $2 \
         FOR UPDATE",
    )
    .bind(decision_id)
    .bind(viewer_id)
    .fetch_optional(&mut *tx)
    .await?;

    match existing {
        None => {
            sqlx::query(
                "INSERT INTO decision_votes (id, decision_id, voter_viewer_id, value) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(Uuid::new_v4())
            .bind(decision_id)
            .bind(viewer_id)
            .bind(value)
            .execute(&mut *tx)
            .await?;
        }
        Some(vote) if vote.value == value => {
            // Same value again: toggle off.
            sqlx::query("DELETE FROM decision_votes WHERE id = $1")
                .bind(vote.id)
                .execute(&mut *tx)
                .await?;
        }
        Some(vote) => {
            sqlx::query("UPDATE decision_votes SET value = $1, created_at = now() WHERE id = $2")
                .bind(value)
                .bind(vote.id)
                .execute(&mut *tx)
                .await?;
        }
    }

    let summary = decision_vote_summary(&mut *tx, decision_id, Some(viewer_id)).await?;
    tx.commit().await?;

    Ok(summary)
}

/// Vote tallies for a decision post. Takes any executor so it runs both
/// inside the toggle transaction and against the pool for reads.
pub async fn decision_vote_summary<'e, E>(
    executor: E,
    decision_id: Uuid,
    viewer_id: Option<Uuid>,
) -> Result<VoteSummary, AppError>
where
    E: PgExecutor<'e>,
{
    let summary = sqlx::query_as::<_, VoteSummary>(
        "SELECT \
             COALESCE(SUM(value), 0)::int AS score, \
             COUNT(*) FILTER (WHERE value = 1)::int AS upvotes, \
             COUNT(*) FILTER (WHERE value = -1)::int AS downvotes, \
             COALESCE(MAX(CASE WHEN $2::uuid IS NOT NULL AND voter_viewer_id = $2::uuid \
                              THEN value END), 0)::int AS my_vote \
         FROM decision_votes \
         WHERE decision_id = $1",
    )
    .bind(decision_id)
    .bind(viewer_id)
    .fetch_one(executor)
    .await?;

    Ok(summary)
}

/// Sum and count of votes on a decision post, as the recommendation engine
/// consumes them.
pub async fn decision_vote_totals(
    pool: &PgPool,
    decision_id: Uuid,
) -> Result<(i64, i64), AppError> {
    let totals: (i64, i64) = sqlx::query_as(
        "SELECT COALESCE(SUM(value), 0)::bigint AS vote_sum, COUNT(*)::bigint AS vote_count \
         FROM decision_votes \
         WHERE decision_id = $1",
    )
    .bind(decision_id)
    .fetch_one(pool)
    .await?;

    Ok(totals)
}

/// Toggle one viewer's vote on an individual response. Same state machine and
/// locking discipline as decision votes, against the response_votes table.
pub async fn toggle_response_vote(
    pool: &PgPool,
    response_id: Uuid,
    viewer_id: Uuid,
    value: i32,
) -> Result<VoteSummary, AppError> {
    let mut last_collision = None;
    for _ in 0..TOGGLE_MAX_ATTEMPTS {
        match try_toggle_response_vote(pool, response_id, viewer_id, value).await {
            Ok(summary) => return Ok(summary),
            Err(e) if classify_app(&e) == DbViolation::Unique => last_collision = Some(e),
            Err(e) => return Err(e),
        }
    }
    Err(last_collision.unwrap_or(AppError::Conflict("vote could not be applied")))
}

async fn try_toggle_response_vote(
    pool: &PgPool,
    response_id: Uuid,
    viewer_id: Uuid,
    value: i32,
) -> Result<VoteSummary, AppError> {
    let mut tx = pool.begin().await?;

    let existing = sqlx::query_as::<_, ExistingVote>(
        "SELECT id, value \
         FROM response_votes \
         WHERE response_id = $1 AND voter_viewer_id = $2 \
         FOR UPDATE",
    )
    .bind(response_id)
    .bind(viewer_id)
    .fetch_optional(&mut *tx)
    .await?;

    match existing {
        None => {
            sqlx::query(
                "INSERT INTO response_votes (id, response_id, voter_viewer_id, value) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(Uuid::new_v4())
            .bind(response_id)
            .bind(viewer_id)
            .bind(value)
            .execute(&mut *tx)
            .await?;
        }
        Some(vote) if vote.value == value => {
            sqlx::query("DELETE FROM response_votes WHERE id = $1")
                .bind(vote.id)
                .execute(&mut *tx)
                .await?;
        }
        Some(vote) => {
            sqlx::query("UPDATE response_votes SET value = $1, created_at = now() WHERE id = $2")
                .bind(value)
                .bind(vote.id)
                .execute(&mut *tx)
                .await?;
        }
    }

    let summary = response_vote_summary(&mut *tx, response_id, Some(viewer_id)).await?;
    tx.commit().await?;

    Ok(summary)
}

pub async fn response_vote_summary<'e, E>(
    executor: E,
    response_id: Uuid,
    viewer_id: Option<Uuid>,
) -> Result<VoteSummary, AppError>
where
    E: PgExecutor<'e>,
{
    let summary = sqlx::query_as::<_, VoteSummary>(
        "SELECT \
             COALESCE(SUM(value), 0)::int AS score, \
             COUNT(*) FILTER (WHERE value = 1)::int AS upvotes, \
             COUNT(*) FILTER (WHERE value = -1)::int AS downvotes, \
             COALESCE(MAX(CASE WHEN $2::uuid IS NOT NULL AND voter_viewer_id = $2::uuid \
                              THEN value END), 0)::int AS my_vote \
         FROM response_votes \
         WHERE response_id = $1",
    )
    .bind(response_id)
    .bind(viewer_id)
    .fetch_one(executor)
    .await?;

    Ok(summary)
}

fn classify_app(err: &AppError) -> DbViolation {
    match err {
        AppError::Db(e) => classify(e),
        _ => DbViolation::Other,
    }
}
