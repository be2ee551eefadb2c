use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{decision, response, vote};
use crate::rate_limit::RateLimits;
use crate::validate;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VoteRequest {
    #[serde(alias = "voter_viewer_id")]
    viewer_id: String,
    value: i32,
}

#[derive(Debug, Serialize)]
struct DecisionVoteView {
    decision_id: Uuid,
    score: i32,
    upvotes: i32,
    downvotes: i32,
    my_vote: i32,
}

#[derive(Debug, Serialize)]
struct ResponseVoteView {
    response_id: Uuid,
    score: i32,
    upvotes: i32,
    downvotes: i32,
    my_vote: i32,
}

/// POST /api/decisions/{slug}/vote (and alias /votes)
pub async fn decision_vote(
    pool: web::Data<PgPool>,
    limits: web::Data<RateLimits>,
    path: web::Path<String>,
    body: web::Json<VoteRequest>,
) -> Result<HttpResponse, AppError> {
    let slug = validate::normalize_slug_param(&path.into_inner())?;

    let viewer_id = validate::parse_viewer_id(&body.viewer_id)?;
    super::check_viewer_limit(&limits, &viewer_id)?;
    validate::validate_vote_value(body.value)?;

    let decision = decision::find_by_slug(&pool, &slug)
        .await?
        .ok_or(AppError::NotFound("decision not found"))?;

    let summary = vote::toggle_decision_vote(&pool, decision.id, viewer_id, body.value).await?;

    Ok(HttpResponse::Ok().json(DecisionVoteView {
        decision_id: decision.id,
        score: summary.score,
        upvotes: summary.upvotes,
        downvotes: summary.downvotes,
        my_vote: summary.my_vote,
    }))
}

/// POST /api/responses/{response_id}/vote (and alias /votes)
pub async fn response_vote(
    pool: web::Data<PgPool>,
    limits: web::Data<RateLimits>,
    path: web::Path<String>,
    body: web::Json<VoteRequest>,
) -> Result<HttpResponse, AppError> {
    let response_id = Uuid::parse_str(path.into_inner().trim())
        .map_err(|_| AppError::Validation("response_id must be a valid UUID".to_string()))?;

    let viewer_id = validate::parse_viewer_id(&body.viewer_id)?;
    super::check_viewer_limit(&limits, &viewer_id)?;
    validate::validate_vote_value(body.value)?;

    if !response::exists(&pool, response_id).await? {
        return Err(AppError::NotFound("response not found"));
    }

    let summary = vote::toggle_response_vote(&pool, response_id, viewer_id, body.value).await?;

    Ok(HttpResponse::Ok().json(ResponseVoteView {
        response_id,
        score: summary.score,
        upvotes: summary.upvotes,
        downvotes: summary.downvotes,
        my_vote: summary.my_vote,
    }))
}
