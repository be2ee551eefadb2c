use actix_web::{HttpResponse, web};
use chrono::Utc;
use serde::Deserialize;
use sqlx::PgPool;

use crate::errors::AppError;
use crate::models::{decision, response};
use crate::rate_limit::RateLimits;
use crate::validate;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateResponseRequest {
    viewer_id: String,
    /// Older clients still send a direct rating; the emoji mapping is
    /// authoritative and this field is ignored.
    #[serde(default)]
    #[allow(dead_code)]
    rating: Option<i32>,
    suggestion: i32,
    emoji: String,
    #[serde(default)]
    comment: Option<String>,
}

/// POST /api/decisions/{slug}/responses
pub async fn create_response(
    pool: web::Data<PgPool>,
    limits: web::Data<RateLimits>,
    path: web::Path<String>,
    body: web::Json<CreateResponseRequest>,
) -> Result<HttpResponse, AppError> {
    let slug = validate::normalize_slug_param(&path.into_inner())?;

    let viewer_id = validate::parse_viewer_id(&body.viewer_id)?;
    super::check_viewer_limit(&limits, &viewer_id)?;
    validate::validate_suggestion(body.suggestion)?;

    let emoji = body.emoji.trim();
    let rating = validate::rating_for_emoji(emoji)
        .ok_or_else(|| AppError::Validation("emoji is invalid".to_string()))?;

    let decision = decision::find_by_slug(&pool, &slug)
        .await?
        .ok_or(AppError::NotFound("decision not found"))?;
    if decision.is_closed(Utc::now()) {
        return Err(AppError::Conflict("decision is closed"));
    }

    let comment = validate::normalize_optional_text(
        body.comment.as_deref(),
        validate::COMMENT_MAX_LEN,
        "comment",
        true,
    )?;

    let new = response::NewResponse {
        decision_id: decision.id,
        viewer_id,
        rating,
        suggestion: body.suggestion,
        emoji: emoji.to_string(),
        comment,
    };
    let id = response::create(&pool, &new).await?;

    Ok(HttpResponse::Created().json(serde_json::json!({ "id": id })))
}
