//! Video ranking over one batch of search results.
//!
//! `score = w.views * normalized_view_log + w.recency * recency_decay
//!        + w.position * inverse_rank (+ w.comment_bonus if comments > 0)`
//!
//! View counts are normalized against the batch maximum, so a batch must come
//! from a single search call.

use crate::config::RankingWeights;
use crate::models::VideoCandidate;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;

const RECENCY_WINDOW_DAYS: f64 = 365.0;

fn view_log(candidate: &VideoCandidate) -> f64 {
    (candidate.view_count.unwrap_or(0) as f64 + 1.0).log10()
}

/// `max(0, 1 - min(age_days, 365) / 365)`, or 0 without a publish time.
pub fn recency_decay(published_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
    let Some(published) = published_at else {
        return 0.0;
    };
    let age_days = (now - published).num_seconds().max(0) as f64 / 86_400.0;
    (1.0 - age_days.min(RECENCY_WINDOW_DAYS) / RECENCY_WINDOW_DAYS).max(0.0)
}

pub fn inverse_rank(search_rank: usize) -> f64 {
    1.0 / (search_rank as f64 + 1.0)
}

/// Annotate every candidate with its score without reordering.
pub fn score_batch(candidates: &mut [VideoCandidate], weights: &RankingWeights, now: DateTime<Utc>) {
    let max_log = candidates.iter().map(view_log).fold(0.0_f64, f64::max);

    for candidate in candidates.iter_mut() {
        let normalized_views = if max_log > 0.0 {
            view_log(candidate) / max_log
        } else {
            0.0
        };
        let mut score = weights.views * normalized_views
            + weights.recency * recency_decay(candidate.published_at, now)
            + weights.position * inverse_rank(candidate.search_rank);
        if candidate.comment_count.unwrap_or(0) > 0 {
            score += weights.comment_bonus;
        }
        candidate.score = score;
    }
}

/// Score, sort by score descending (ties by search rank ascending) and keep `limit`.
pub fn rank_videos(
    mut candidates: Vec<VideoCandidate>,
    weights: &RankingWeights,
    now: DateTime<Utc>,
    limit: usize,
) -> Vec<VideoCandidate> {
    score_batch(&mut candidates, weights, now);
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.search_rank.cmp(&b.search_rank))
    });
    candidates.truncate(limit);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn candidate(
        id: &str,
        views: Option<u64>,
        age_days: Option<i64>,
        rank: usize,
        comments: Option<u64>,
    ) -> VideoCandidate {
        let mut c = VideoCandidate::new(id, id, "channel", rank);
        c.view_count = views;
        c.published_at = age_days.map(|d| now() - Duration::days(d));
        c.comment_count = comments;
        c
    }

    fn ids(ranked: &[VideoCandidate]) -> Vec<&str> {
        ranked.iter().map(|c| c.video_id.as_str()).collect()
    }

    #[test]
    fn test_reference_batch_order() {
        let batch = vec![
            candidate("a", Some(100_000), Some(1), 0, Some(10)),
            candidate("b", Some(500), Some(400), 1, Some(0)),
            candidate("c", Some(10), Some(40), 2, Some(3)),
        ];

        let ranked = rank_videos(batch.clone(), &RankingWeights::default(), now(), 10);
        assert_eq!(ids(&ranked), vec!["a", "c", "b"]);

        // Same input, same output
        let again = rank_videos(batch, &RankingWeights::default(), now(), 10);
        assert_eq!(ranked, again);
    }

    #[test]
    fn test_reference_batch_scores() {
        let mut batch = vec![
            candidate("a", Some(100_000), Some(1), 0, Some(10)),
            candidate("b", Some(500), Some(400), 1, Some(0)),
        ];
        score_batch(&mut batch, &RankingWeights::default(), now());

        let expected_a = 0.35 * 1.0 + 0.25 * (1.0 - 1.0 / 365.0) + 0.40 * 1.0 + 0.05;
        let expected_b = 0.35 * (501f64.log10() / 100_001f64.log10()) + 0.0 + 0.40 * 0.5;
        assert!((batch[0].score - expected_a).abs() < 1e-9);
        assert!((batch[1].score - expected_b).abs() < 1e-9);
    }

    #[test]
    fn test_missing_metadata_keeps_search_order() {
        let batch = vec![
            candidate("first", None, None, 0, None),
            candidate("second", None, None, 1, None),
            candidate("third", None, None, 2, None),
        ];

        let ranked = rank_videos(batch, &RankingWeights::default(), now(), 10);
        assert_eq!(ids(&ranked), vec!["first", "second", "third"]);
        assert!((ranked[0].score - 0.40).abs() < 1e-9);
    }

    #[test]
    fn test_ties_broken_by_search_rank() {
        let weights = RankingWeights {
            views: 0.0,
            recency: 0.0,
            position: 0.0,
            comment_bonus: 0.0,
        };
        let batch = vec![
            candidate("z", Some(5), None, 2, None),
            candidate("x", Some(9), None, 0, None),
            candidate("y", Some(1), None, 1, None),
        ];

        let ranked = rank_videos(batch, &weights, now(), 10);
        assert_eq!(ids(&ranked), vec!["x", "y", "z"]);
    }

    #[test]
    fn test_truncates_to_limit() {
        let batch = (0..8)
            .map(|i| candidate(&format!("v{}", i), Some(100), Some(3), i, None))
            .collect();

        let ranked = rank_videos(batch, &RankingWeights::default(), now(), 3);
        assert_eq!(ids(&ranked), vec!["v0", "v1", "v2"]);
    }

    #[test]
    fn test_recency_decay_bounds() {
        assert_eq!(recency_decay(None, now()), 0.0);
        assert_eq!(recency_decay(Some(now() - Duration::days(500)), now()), 0.0);
        assert_eq!(recency_decay(Some(now()), now()), 1.0);
        // Future timestamps count as brand new
        assert_eq!(recency_decay(Some(now() + Duration::days(2)), now()), 1.0);
    }

    #[test]
    fn test_comment_bonus_applies_only_with_comments() {
        let mut batch = vec![
            candidate("with", None, None, 0, Some(1)),
            candidate("without", None, None, 0, Some(0)),
        ];
        score_batch(&mut batch, &RankingWeights::default(), now());
        assert!((batch[0].score - batch[1].score - 0.05).abs() < 1e-9);
    }
}
