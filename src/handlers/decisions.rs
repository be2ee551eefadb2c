use actix_web::{HttpResponse, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{decision, response, vote};
use crate::rate_limit::RateLimits;
use crate::scoring;
use crate::validate;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateDecisionRequest {
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    closes_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
struct CreateDecisionResponse {
    id: Uuid,
    slug: String,
    share_url: String,
}

/// POST /api/decisions
pub async fn create_decision(
    pool: web::Data<PgPool>,
    body: web::Json<CreateDecisionRequest>,
) -> Result<HttpResponse, AppError> {
    let title = validate::normalize_required_text(
        &body.title,
        validate::TITLE_MIN_LEN,
        validate::TITLE_MAX_LEN,
        "title",
        false,
    )?;
    let description = validate::normalize_optional_text(
        body.description.as_deref(),
        validate::DESCRIPTION_MAX_LEN,
        "description",
        true,
    )?;
    let closes_at = validate::normalize_closes_at(body.closes_at)?;

    let new = decision::NewDecision {
        title,
        description,
        closes_at,
    };
    let (id, slug) = decision::create_with_unique_slug(&pool, &new).await?;

    let share_url = format!("/d/{slug}");
    Ok(HttpResponse::Created().json(CreateDecisionResponse { id, slug, share_url }))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DecisionQuery {
    #[serde(default)]
    viewer_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct DecisionEnvelope {
    decision: decision::Decision,
    stats: response::DecisionStats,
    recommendation: scoring::Recommendation,
    post_vote: vote::VoteSummary,
    viewer_has_responded: bool,
    responses: Vec<response::ResponseCard>,
}

/// GET /api/decisions/{slug}
///
/// The envelope is assembled from several queries without a shared snapshot;
/// stats and the response list may disagree briefly under concurrent writes.
pub async fn get_decision(
    pool: web::Data<PgPool>,
    limits: web::Data<RateLimits>,
    path: web::Path<String>,
    query: web::Query<DecisionQuery>,
) -> Result<HttpResponse, AppError> {
    let slug = validate::normalize_slug_param(&path.into_inner())?;

    let viewer_id = match query.viewer_id.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(validate::parse_viewer_id(raw)?),
    };
    if let Some(viewer_id) = &viewer_id {
        super::check_viewer_limit(&limits, viewer_id)?;
    }

    let decision = decision::find_by_slug(&pool, &slug)
        .await?
        .ok_or(AppError::NotFound("decision not found"))?;

    let stats = response::load_stats(&pool, decision.id).await?;
    let signals = response::signals(&pool, decision.id).await?;
    let (vote_sum, vote_count) = vote::decision_vote_totals(&pool, decision.id).await?;
    let recommendation = scoring::recommend(&signals, vote_sum, vote_count);
    let post_vote = vote::decision_vote_summary(pool.get_ref(), decision.id, viewer_id).await?;
    let viewer_has_responded =
        response::viewer_has_responded(&pool, decision.id, viewer_id).await?;
    let responses = response::cards(&pool, decision.id).await?;

    Ok(HttpResponse::Ok().json(DecisionEnvelope {
        decision,
        stats,
        recommendation,
        post_vote,
        viewer_has_responded,
        responses,
    }))
}
