use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::AppError;

pub const TITLE_MIN_LEN: usize = 4;
pub const TITLE_MAX_LEN: usize = 100;
pub const DESCRIPTION_MAX_LEN: usize = 500;
pub const COMMENT_MAX_LEN: usize = 180;
pub const SLUG_MAX_LEN: usize = 128;

/// Grace period for `closes_at` slightly in the past, to absorb clock skew
/// between clients and the server.
const CLOCK_SKEW_TOLERANCE_SECS: i64 = 60;

/// Emoji reactions and the rating each one derives. The table is
/// authoritative; a client-sent rating is ignored.
pub const EMOJI_RATINGS: [(&str, i32); 5] = [
    ("\u{1FAE0}", 1), // 🫠
    ("\u{1F62D}", 2), // 😭
    ("\u{1F62C}", 3), // 😬
    ("\u{1F604}", 4), // 😄
    ("\u{1FAE1}", 5), // 🫡
];

pub fn rating_for_emoji(emoji: &str) -> Option<i32> {
    EMOJI_RATINGS
        .iter()
        .find(|(allowed, _)| *allowed == emoji)
        .map(|(_, rating)| *rating)
}

/// Trim, normalize line breaks, and bounds-check a required text field.
/// An empty field is reported as missing, not as too short.
pub fn normalize_required_text(
    raw: &str,
    min_len: usize,
    max_len: usize,
    field: &str,
    allow_newlines: bool,
) -> Result<String, AppError> {
    let normalized = normalize_line_breaks(raw).trim().to_string();
    if normalized.is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    if has_disallowed_control_chars(&normalized, allow_newlines) {
        return Err(AppError::Validation(format!(
            "{field} contains unsupported control characters"
        )));
    }
    let length = normalized.chars().count();
    if length < min_len || length > max_len {
        return Err(AppError::Validation(format!(
            "{field} must be between {min_len} and {max_len} characters"
        )));
    }
    Ok(normalized)
}

/// Like `normalize_required_text`, but empty-after-trim collapses to absent.
pub fn normalize_optional_text(
    raw: Option<&str>,
    max_len: usize,
    field: &str,
    allow_newlines: bool,
) -> Result<Option<String>, AppError> {
    let Some(raw) = raw else {
        return Ok(None);
    };

    let normalized = normalize_line_breaks(raw).trim().to_string();
    if normalized.is_empty() {
        return Ok(None);
    }
    if has_disallowed_control_chars(&normalized, allow_newlines) {
        return Err(AppError::Validation(format!(
            "{field} contains unsupported control characters"
        )));
    }
    if normalized.chars().count() > max_len {
        return Err(AppError::Validation(format!(
            "{field} must be {max_len} characters or fewer"
        )));
    }
    Ok(Some(normalized))
}

fn normalize_line_breaks(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

fn has_disallowed_control_chars(input: &str, allow_newlines: bool) -> bool {
    input.chars().any(|c| {
        c.is_control() && !(allow_newlines && (c == '\n' || c == '\t'))
    })
}

/// Validate a slug path parameter: bounded length, `[a-z0-9-]`, no hyphen at
/// either end.
pub fn normalize_slug_param(raw: &str) -> Result<String, AppError> {
    let slug = raw.trim();
    if slug.is_empty() {
        return Err(AppError::Validation("slug is required".to_string()));
    }
    if slug.len() > SLUG_MAX_LEN {
        return Err(AppError::Validation(format!(
            "slug must be {SLUG_MAX_LEN} characters or fewer"
        )));
    }
    if !is_valid_slug(slug) {
        return Err(AppError::Validation("slug is invalid".to_string()));
    }
    Ok(slug.to_string())
}

fn is_valid_slug(slug: &str) -> bool {
    if slug.starts_with('-') || slug.ends_with('-') {
        return false;
    }
    slug.bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

/// A close timestamp may not lie in the past, modulo the skew tolerance.
pub fn normalize_closes_at(
    raw: Option<DateTime<Utc>>,
) -> Result<Option<DateTime<Utc>>, AppError> {
    let Some(closes_at) = raw else {
        return Ok(None);
    };

    let cutoff = Utc::now() - chrono::Duration::seconds(CLOCK_SKEW_TOLERANCE_SECS);
    if closes_at < cutoff {
        return Err(AppError::Validation(
            "closes_at must be in the future".to_string(),
        ));
    }
    Ok(Some(closes_at))
}

pub fn parse_viewer_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| AppError::Validation("viewer_id must be a valid UUID".to_string()))
}

pub fn validate_suggestion(suggestion: i32) -> Result<(), AppError> {
    if !(1..=3).contains(&suggestion) {
        return Err(AppError::Validation(
            "suggestion must be 1 (don't do it), 2 (mixed), or 3 (do it)".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_vote_value(value: i32) -> Result<(), AppError> {
    if value != -1 && value != 1 {
        return Err(AppError::Validation(
            "value must be -1 or 1".to_string(),
        ));
    }
    Ok(())
}
