use std::collections::HashSet;
use std::sync::LazyLock;

use serde::Serialize;

use crate::models::response::ResponseSignal;

pub const SUGGESTION_WEIGHT: f64 = 0.35;
pub const RATING_WEIGHT: f64 = 0.30;
pub const COMMENT_SENTIMENT_WEIGHT: f64 = 0.20;
pub const POST_VOTE_WEIGHT: f64 = 0.15;

/// Scores at or above this recommend going ahead. A decision with zero signal
/// therefore lands on "yes".
const RECOMMENDATION_YES_THRESHOLD: f64 = 0.0;

static POSITIVE_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "amazing",
        "better",
        "benefit",
        "best",
        "excellent",
        "good",
        "great",
        "growth",
        "happy",
        "love",
        "opportunity",
        "positive",
        "safe",
        "smart",
        "strong",
        "support",
        "upside",
        "worth",
        "yes",
        "win",
    ]
    .into_iter()
    .collect()
});

static NEGATIVE_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "bad",
        "concern",
        "costly",
        "difficult",
        "downside",
        "expensive",
        "hard",
        "hate",
        "loss",
        "negative",
        "no",
        "problem",
        "risk",
        "risky",
        "stress",
        "unsafe",
        "worse",
        "worst",
    ]
    .into_iter()
    .collect()
});

/// Average rating rescaled from [1,5] to [-1,1].
pub fn net_sentiment(avg_rating: f64) -> f64 {
    ((avg_rating - 3.0) / 2.0).clamp(-1.0, 1.0)
}

pub fn suggestion_score(suggestion: i32) -> f64 {
    match suggestion {
        1 => -1.0,
        2 => 0.0,
        3 => 1.0,
        _ => 0.0,
    }
}

pub fn rating_score(rating: i32) -> f64 {
    ((f64::from(rating) - 3.0) / 2.0).clamp(-1.0, 1.0)
}

/// Lexicon hit balance of one comment: (positive - negative) / total hits,
/// 0 when no word of the comment appears in either lexicon.
pub fn comment_sentiment(comment: &str) -> f64 {
    let lowered = comment.to_lowercase();
    let mut positive = 0i32;
    let mut negative = 0i32;

    for token in lowered.split(|c: char| !c.is_alphanumeric() && c != '\'') {
        if token.is_empty() {
            continue;
        }
        let word = token.replace('\'', "");
        if POSITIVE_WORDS.contains(word.as_str()) {
            positive += 1;
        }
        if NEGATIVE_WORDS.contains(word.as_str()) {
            negative += 1;
        }
    }

    let hits = positive + negative;
    if hits == 0 {
        return 0.0;
    }
    (f64::from(positive - negative) / f64::from(hits)).clamp(-1.0, 1.0)
}

#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub decision: &'static str,
    pub score: f64,
    pub suggestion_score: f64,
    pub rating_score: f64,
    pub comment_sentiment: f64,
    pub post_vote_score: f64,
}

/// Blend the four signals into one score. Each signal is the mean of its
/// per-row mapping, already clamped to [-1,1]; a signal without input rows
/// contributes 0 without renormalizing the others.
pub fn recommend(signals: &[ResponseSignal], vote_sum: i64, vote_count: i64) -> Recommendation {
    let mut suggestion_total = 0.0;
    let mut rating_total = 0.0;
    let mut sentiment_total = 0.0;
    let mut comment_count = 0usize;

    for signal in signals {
        suggestion_total += suggestion_score(signal.suggestion);
        rating_total += rating_score(signal.rating);
        if let Some(comment) = &signal.comment {
            sentiment_total += comment_sentiment(comment);
            comment_count += 1;
        }
    }

    let response_count = signals.len();
    let suggestion = if response_count > 0 {
        suggestion_total / response_count as f64
    } else {
        0.0
    };
    let rating = if response_count > 0 {
        rating_total / response_count as f64
    } else {
        0.0
    };
    let sentiment = if comment_count > 0 {
        sentiment_total / comment_count as f64
    } else {
        0.0
    };
    let post_vote = if vote_count > 0 {
        (vote_sum as f64 / vote_count as f64).clamp(-1.0, 1.0)
    } else {
        0.0
    };

    let score = (SUGGESTION_WEIGHT * suggestion
        + RATING_WEIGHT * rating
        + COMMENT_SENTIMENT_WEIGHT * sentiment
        + POST_VOTE_WEIGHT * post_vote)
        .clamp(-1.0, 1.0);

    let decision = if score >= RECOMMENDATION_YES_THRESHOLD {
        "yes"
    } else {
        "no"
    };

    Recommendation {
        decision,
        score,
        suggestion_score: suggestion,
        rating_score: rating,
        comment_sentiment: sentiment,
        post_vote_score: post_vote,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn signal(suggestion: i32, rating: i32, comment: Option<&str>) -> ResponseSignal {
        ResponseSignal {
            suggestion,
            rating,
            comment: comment.map(String::from),
        }
    }

    #[test]
    fn net_sentiment_hits_the_anchor_points() {
        assert!((net_sentiment(3.0)).abs() < EPSILON);
        assert!((net_sentiment(5.0) - 1.0).abs() < EPSILON);
        assert!((net_sentiment(1.0) + 1.0).abs() < EPSILON);
    }

    #[test]
    fn net_sentiment_is_monotonic_and_bounded() {
        let averages = [0.0, 1.0, 1.7, 2.5, 3.0, 3.9, 4.4, 5.0];
        let mut previous = f64::NEG_INFINITY;
        for avg in averages {
            let s = net_sentiment(avg);
            assert!(s >= previous);
            assert!((-1.0..=1.0).contains(&s));
            previous = s;
        }
    }

    #[test]
    fn balanced_comment_scores_zero() {
        // "great" and "opportunity" against "no" and "risk".
        let s = comment_sentiment("This is a great opportunity, no risk");
        assert!(s.abs() < EPSILON);
    }

    #[test]
    fn purely_positive_comment_scores_one() {
        assert!((comment_sentiment("amazing and safe") - 1.0).abs() < EPSILON);
    }

    #[test]
    fn comment_without_lexicon_words_scores_zero() {
        assert!(comment_sentiment("the weather was cloudy today").abs() < EPSILON);
        assert!(comment_sentiment("").abs() < EPSILON);
    }

    #[test]
    fn tokenizer_strips_apostrophes_and_case() {
        // "don't" becomes "dont", which is in neither lexicon; "RISKY" matches.
        assert!((comment_sentiment("don't, it's RISKY") + 1.0).abs() < EPSILON);
    }

    #[test]
    fn suggestion_mapping_matches_the_categories() {
        assert_eq!(suggestion_score(1), -1.0);
        assert_eq!(suggestion_score(2), 0.0);
        assert_eq!(suggestion_score(3), 1.0);
    }

    #[test]
    fn all_signals_at_max_recommend_yes_with_full_score() {
        let signals = vec![signal(3, 5, Some("amazing and safe"))];
        let rec = recommend(&signals, 3, 3);
        assert!((rec.score - 1.0).abs() < EPSILON);
        assert_eq!(rec.decision, "yes");
        assert!((rec.suggestion_score - 1.0).abs() < EPSILON);
        assert!((rec.rating_score - 1.0).abs() < EPSILON);
        assert!((rec.comment_sentiment - 1.0).abs() < EPSILON);
        assert!((rec.post_vote_score - 1.0).abs() < EPSILON);
    }

    #[test]
    fn all_signals_at_min_recommend_no_with_full_negative_score() {
        let signals = vec![signal(1, 1, Some("risky problem"))];
        let rec = recommend(&signals, -2, 2);
        assert!((rec.score + 1.0).abs() < EPSILON);
        assert_eq!(rec.decision, "no");
    }

    #[test]
    fn zero_signal_ties_to_yes() {
        let rec = recommend(&[], 0, 0);
        assert_eq!(rec.score, 0.0);
        assert_eq!(rec.decision, "yes");
        assert_eq!(rec.suggestion_score, 0.0);
        assert_eq!(rec.rating_score, 0.0);
        assert_eq!(rec.comment_sentiment, 0.0);
        assert_eq!(rec.post_vote_score, 0.0);
    }

    #[test]
    fn missing_signals_contribute_zero_without_renormalizing() {
        // One response, no comment, no post votes: only suggestion and rating
        // weigh in.
        let signals = vec![signal(3, 5, None)];
        let rec = recommend(&signals, 0, 0);
        assert!((rec.score - (SUGGESTION_WEIGHT + RATING_WEIGHT)).abs() < EPSILON);
        assert_eq!(rec.comment_sentiment, 0.0);
        assert_eq!(rec.post_vote_score, 0.0);
    }

    #[test]
    fn post_vote_signal_is_the_clamped_mean_vote() {
        let rec = recommend(&[], 1, 3);
        assert!((rec.post_vote_score - 1.0 / 3.0).abs() < EPSILON);
        assert!((rec.score - POST_VOTE_WEIGHT / 3.0).abs() < EPSILON);
        assert_eq!(rec.decision, "yes");
    }

    #[test]
    fn mixed_signals_average_per_row() {
        let signals = vec![
            signal(3, 5, Some("great upside")),
            signal(1, 1, Some("pure stress")),
        ];
        let rec = recommend(&signals, 0, 0);
        assert!(rec.suggestion_score.abs() < EPSILON);
        assert!(rec.rating_score.abs() < EPSILON);
        assert!(rec.comment_sentiment.abs() < EPSILON);
        assert!(rec.score.abs() < EPSILON);
        assert_eq!(rec.decision, "yes");
    }
}
