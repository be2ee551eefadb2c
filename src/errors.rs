use actix_web::http::header;
use actix_web::{HttpResponse, ResponseError};
use std::fmt;

/// Store error classes the service reacts to specifically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbViolation {
    Unique,
    ForeignKey,
    UndefinedColumn,
    Other,
}

/// Classify a store error by SQLSTATE so call sites never see driver codes.
pub fn classify(err: &sqlx::Error) -> DbViolation {
    let code = match err {
        sqlx::Error::Database(db_err) => db_err.code(),
        _ => None,
    };
    match code.as_deref() {
        Some("23505") => DbViolation::Unique,
        Some("23503") => DbViolation::ForeignKey,
        Some("42703") => DbViolation::UndefinedColumn,
        _ => DbViolation::Other,
    }
}

#[derive(Debug)]
pub enum AppError {
    Validation(String),
    NotFound(&'static str),
    Conflict(&'static str),
    Auth(&'static str),
    RateLimited { retry_after_secs: u64 },
    SchemaMismatch,
    Db(sqlx::Error),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(msg) => write!(f, "{msg}"),
            AppError::NotFound(msg) => write!(f, "{msg}"),
            AppError::Conflict(msg) => write!(f, "{msg}"),
            AppError::Auth(msg) => write!(f, "{msg}"),
            AppError::RateLimited { retry_after_secs } => {
                write!(f, "rate limit exceeded, retry after {retry_after_secs}s")
            }
            AppError::SchemaMismatch => write!(f, "database schema is out of date"),
            AppError::Db(e) => write!(f, "Database error: {e}"),
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::Validation(msg) => error_json(HttpResponse::BadRequest(), msg),
            AppError::NotFound(msg) => error_json(HttpResponse::NotFound(), msg),
            AppError::Conflict(msg) => error_json(HttpResponse::Conflict(), msg),
            AppError::Auth(msg) => error_json(HttpResponse::Unauthorized(), msg),
            AppError::RateLimited { retry_after_secs } => {
                rate_limited_response(*retry_after_secs)
            }
            AppError::SchemaMismatch => error_json(
                HttpResponse::InternalServerError(),
                "database schema is out of date. Run migrations and restart the server",
            ),
            AppError::Db(e) => {
                log::error!("Database error: {e}");
                error_json(HttpResponse::InternalServerError(), "internal server error")
            }
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        // Undefined column means the running binary is newer than the schema,
        // which the operator can fix; everything else stays generic.
        if classify(&e) == DbViolation::UndefinedColumn {
            AppError::SchemaMismatch
        } else {
            AppError::Db(e)
        }
    }
}

fn error_json(mut builder: actix_web::HttpResponseBuilder, message: &str) -> HttpResponse {
    builder.json(serde_json::json!({ "error": message }))
}

/// 429 with the retry hint both as a header and in the body.
pub fn rate_limited_response(retry_after_secs: u64) -> HttpResponse {
    HttpResponse::TooManyRequests()
        .insert_header((header::RETRY_AFTER, retry_after_secs.to_string()))
        .json(serde_json::json!({
            "error": "rate limit exceeded",
            "retry_after_seconds": retry_after_secs,
        }))
}
