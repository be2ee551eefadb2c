use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Validated input for a new response. The rating is already derived from the
/// emoji by the time this is built.
#[derive(Debug, Clone)]
pub struct NewResponse {
    pub decision_id: Uuid,
    pub viewer_id: Uuid,
    pub rating: i32,
    pub suggestion: i32,
    pub emoji: String,
    pub comment: Option<String>,
}

/// One response as shown on the decision page. Viewer identity is not exposed.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ResponseCard {
    pub id: Uuid,
    pub rating: i32,
    pub suggestion: i32,
    pub emoji: String,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The per-response columns the recommendation blends.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ResponseSignal {
    pub suggestion: i32,
    pub rating: i32,
    pub comment: Option<String>,
}

/// Aggregate rating/suggestion tallies for one decision.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionStats {
    pub response_count: i32,
    /// Responses at each rating value 1..5, in that order.
    pub rating_counts: [i32; 5],
    pub avg_rating: f64,
    pub net_sentiment: f64,
    pub categories: SuggestionBuckets,
    pub emoji_counts: Vec<EmojiCount>,
    pub top_emoji: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SuggestionBuckets {
    pub do_it: i32,
    pub dont_do_it: i32,
    pub mixed: i32,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct EmojiCount {
    pub emoji: String,
    pub count: i32,
}
