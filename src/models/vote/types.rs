use serde::Serialize;

/// Aggregate vote tallies for one subject, including the caller's own vote
/// (0 when the caller has no standing vote or sent no viewer id).
#[derive(Debug, Clone, Copy, Serialize, sqlx::FromRow)]
pub struct VoteSummary {
    pub score: i32,
    pub upvotes: i32,
    pub downvotes: i32,
    pub my_vote: i32,
}
