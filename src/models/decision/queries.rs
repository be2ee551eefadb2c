use sqlx::PgPool;
use uuid::Uuid;

use super::types::{Decision, NewDecision};
use crate::errors::{AppError, DbViolation, classify};
use crate::slug;

const SLUG_MAX_ATTEMPTS: u32 = 8;

/// Insert a decision under a freshly generated slug.
///
/// The random 5-char suffix is regenerated on unique-constraint collisions up
/// to a fixed ceiling; at this suffix length the collision probability makes
/// exhausting the ceiling a conflict, not something to loop on forever.
pub async fn create_with_unique_slug(
    pool: &PgPool,
    new: &NewDecision,
) -> Result<(Uuid, String), AppError> {
    let id = Uuid::new_v4();
    let mut base = slug::slugify(&new.title);
    if base.is_empty() {
        base = slug::SLUG_FALLBACK_BASE.to_string();
    }

    for _ in 0..SLUG_MAX_ATTEMPTS {
        let candidate = format!("{}-{}", base, slug::random_suffix(slug::SLUG_SUFFIX_LEN));
        let result = sqlx::query(
            "INSERT INTO decisions (id, slug, title, description, closes_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(id)
        .bind(&candidate)
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.closes_at)
        .execute(pool)
        .await;

        match result {
            Ok(_) => return Ok((id, candidate)),
            Err(e) if classify(&e) == DbViolation::Unique => continue,
            Err(e) => return Err(e.into()),
        }
    }

    Err(AppError::Conflict("failed to generate a unique slug"))
}

pub async fn find_by_slug(pool: &PgPool, slug_param: &str) -> Result<Option<Decision>, AppError> {
    let decision = sqlx::query_as::<_, Decision>(
        "SELECT id, slug, title, description, closes_at, created_at \
         FROM decisions \
         WHERE slug = $1",
    )
    .bind(slug_param)
    .fetch_optional(pool)
    .await?;

    Ok(decision)
}
