use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A decision as stored. Immutable after creation; the only removal path is a
/// cascading delete in the store.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Decision {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub closes_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Decision {
    pub fn is_closed(&self, now: DateTime<Utc>) -> bool {
        self.closes_at.is_some_and(|closes_at| now > closes_at)
    }
}

/// Validated input for a new decision; the slug is chosen at insert time.
#[derive(Debug, Clone)]
pub struct NewDecision {
    pub title: String,
    pub description: Option<String>,
    pub closes_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decision(closes_at: Option<DateTime<Utc>>) -> Decision {
        Decision {
            id: Uuid::new_v4(),
            slug: "move-abroad-k3x9p".to_string(),
            title: "Move abroad".to_string(),
            description: None,
            closes_at,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn decision_without_close_timestamp_never_closes() {
        assert!(!decision(None).is_closed(Utc::now()));
    }

    #[test]
    fn decision_closes_strictly_after_the_timestamp() {
        let closes_at = Utc::now();
        let d = decision(Some(closes_at));
        assert!(!d.is_closed(closes_at));
        assert!(d.is_closed(closes_at + chrono::Duration::seconds(1)));
        assert!(!d.is_closed(closes_at - chrono::Duration::seconds(1)));
    }
}
