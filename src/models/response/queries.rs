use sqlx::PgPool;
use uuid::Uuid;

use super::types::{DecisionStats, EmojiCount, NewResponse, ResponseCard, ResponseSignal, SuggestionBuckets};
use crate::errors::{AppError, DbViolation, classify};
use crate::scoring;

/// Insert a viewer's single response for a decision. The unique constraint on
/// (decision_id, viewer_id) turns a repeat submission into a conflict.
pub async fn create(pool: &PgPool, new: &NewResponse) -> Result<Uuid, AppError> {
    let id = Uuid::new_v4();
    let result = sqlx::query(
        "INSERT INTO responses (id, decision_id, viewer_id, rating, suggestion, emoji, comment) \
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(id)
    .bind(new.decision_id)
    .bind(new.viewer_id)
    .bind(new.rating)
    .bind(new.suggestion)
    .bind(&new.emoji)
    .bind(&new.comment)
    .execute(pool)
    .await;

    match result {
        Ok(_) => Ok(id),
        Err(e) if classify(&e) == DbViolation::Unique => Err(AppError::Conflict(
            "viewer already submitted a response for this decision",
        )),
        Err(e) => Err(e.into()),
    }
}

pub async fn exists(pool: &PgPool, response_id: Uuid) -> Result<bool, AppError> {
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM responses WHERE id = $1)")
            .bind(response_id)
            .fetch_one(pool)
            .await?;
    Ok(exists)
}

/// Rating distribution, suggestion buckets, and emoji tallies for a decision,
/// computed by aggregate queries over the stored rows.
pub async fn load_stats(pool: &PgPool, decision_id: Uuid) -> Result<DecisionStats, AppError> {
    #[derive(sqlx::FromRow)]
    struct Row {
        response_count: i32,
        r1: i32,
        r2: i32,
        r3: i32,
        r4: i32,
        r5: i32,
        s1: i32,
        s2: i32,
        s3: i32,
        avg_rating: f64,
    }

    let row = sqlx::query_as::<_, Row>(
        "SELECT \
             COUNT(*)::int AS response_count, \
             COUNT(*) FILTER (WHERE rating = 1)::int AS r1, \
             COUNT(*) FILTER (WHERE rating = 2)::int AS r2, \
             COUNT(*) FILTER (WHERE rating = 3)::int AS r3, \
             COUNT(*) FILTER (WHERE rating = 4)::int AS r4, \
             COUNT(*) FILTER (WHERE rating = 5)::int AS r5, \
             COUNT(*) FILTER (WHERE suggestion = 1)::int AS s1, \
             COUNT(*) FILTER (WHERE suggestion = 2)::int AS s2, \
             COUNT(*) FILTER (WHERE suggestion = 3)::int AS s3, \
             COALESCE(AVG(rating), 0)::float8 AS avg_rating \
         FROM responses \
         WHERE decision_id = $1",
    )
    .bind(decision_id)
    .fetch_one(pool)
    .await?;

    let emoji_counts = sqlx::query_as::<_, EmojiCount>(
        "SELECT emoji, COUNT(*)::int AS count \
         FROM responses \
         WHERE decision_id = $1 \
         GROUP BY emoji \
         ORDER BY count DESC, emoji ASC",
    )
    .bind(decision_id)
    .fetch_all(pool)
    .await?;

    let top_emoji = emoji_counts
        .first()
        .map(|e| e.emoji.clone())
        .unwrap_or_default();

    Ok(DecisionStats {
        response_count: row.response_count,
        rating_counts: [row.r1, row.r2, row.r3, row.r4, row.r5],
        avg_rating: row.avg_rating,
        net_sentiment: scoring::net_sentiment(row.avg_rating),
        categories: SuggestionBuckets {
            do_it: row.s3,
            dont_do_it: row.s1,
            mixed: row.s2,
        },
        emoji_counts,
        top_emoji,
    })
}

/// The columns the recommendation engine blends, one row per response.
pub async fn signals(pool: &PgPool, decision_id: Uuid) -> Result<Vec<ResponseSignal>, AppError> {
    let rows = sqlx::query_as::<_, ResponseSignal>(
        "SELECT suggestion, rating, comment \
         FROM responses \
         WHERE decision_id = $1",
    )
    .bind(decision_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn cards(pool: &PgPool, decision_id: Uuid) -> Result<Vec<ResponseCard>, AppError> {
    let rows = sqlx::query_as::<_, ResponseCard>(
        "SELECT id, rating, suggestion, emoji, comment, created_at \
         FROM responses \
         WHERE decision_id = $1 \
         ORDER BY created_at DESC",
    )
    .bind(decision_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn viewer_has_responded(
    pool: &PgPool,
    decision_id: Uuid,
    viewer_id: Option<Uuid>,
) -> Result<bool, AppError> {
    let Some(viewer_id) = viewer_id else {
        return Ok(false);
    };

    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM responses WHERE decision_id = $1 AND viewer_id = $2)",
    )
    .bind(decision_id)
    .bind(viewer_id)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}
