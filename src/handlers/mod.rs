pub mod decisions;
pub mod health;
pub mod responses;
pub mod votes;

use actix_web::middleware::from_fn;
use actix_web::web;
use uuid::Uuid;

use crate::errors::AppError;
use crate::middleware::require_write_api_key;
use crate::rate_limit::{RateLimits, retry_after_secs};

pub const MAX_DECISION_BODY_BYTES: usize = 4 * 1024;
pub const MAX_RESPONSE_BODY_BYTES: usize = 4 * 1024;
pub const MAX_VOTE_BODY_BYTES: usize = 2 * 1024;

/// Configure all routes. Write routes sit behind the API-key gate and carry
/// per-endpoint JSON body ceilings.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health::health));
    cfg.service(
        web::scope("/api")
            .service(
                web::resource("/decisions/{slug}")
                    .app_data(query_config())
                    .route(web::get().to(decisions::get_decision)),
            )
            .service(
                web::scope("")
                    .wrap(from_fn(require_write_api_key))
                    .service(
                        web::resource("/decisions")
                            .app_data(json_config(MAX_DECISION_BODY_BYTES))
                            .route(web::post().to(decisions::create_decision)),
                    )
                    .service(
                        web::resource("/decisions/{slug}/responses")
                            .app_data(json_config(MAX_RESPONSE_BODY_BYTES))
                            .route(web::post().to(responses::create_response)),
                    )
                    .service(
                        web::resource("/decisions/{slug}/vote")
                            .app_data(json_config(MAX_VOTE_BODY_BYTES))
                            .route(web::post().to(votes::decision_vote)),
                    )
                    .service(
                        web::resource("/decisions/{slug}/votes")
                            .app_data(json_config(MAX_VOTE_BODY_BYTES))
                            .route(web::post().to(votes::decision_vote)),
                    )
                    .service(
                        web::resource("/responses/{response_id}/vote")
                            .app_data(json_config(MAX_VOTE_BODY_BYTES))
                            .route(web::post().to(votes::response_vote)),
                    )
                    .service(
                        web::resource("/responses/{response_id}/votes")
                            .app_data(json_config(MAX_VOTE_BODY_BYTES))
                            .route(web::post().to(votes::response_vote)),
                    ),
            ),
    );
}

/// Body ceiling plus a uniform `{"error": ...}` shape for payload rejections,
/// applied before any handler runs. Oversized bodies are refused up front.
fn json_config(limit: usize) -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(limit)
        .error_handler(move |err, _req| {
            let message = match &err {
                actix_web::error::JsonPayloadError::Overflow { .. }
                | actix_web::error::JsonPayloadError::OverflowKnownLength { .. } => {
                    format!("request body must be {limit} bytes or fewer")
                }
                actix_web::error::JsonPayloadError::ContentType => {
                    "Content-Type must be application/json".to_string()
                }
                other => format!("invalid JSON: {other}"),
            };
            AppError::Validation(message).into()
        })
}

fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|err, _req| AppError::Validation(format!("invalid query: {err}")).into())
}

/// Secondary fixed-window limit for operations carrying a viewer identity.
pub(crate) fn check_viewer_limit(limits: &RateLimits, viewer_id: &Uuid) -> Result<(), AppError> {
    limits
        .viewer
        .check(&format!("viewer:{viewer_id}"))
        .map_err(|retry| AppError::RateLimited {
            retry_after_secs: retry_after_secs(retry),
        })
}
