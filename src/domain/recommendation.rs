//! Related-post scoring.
//!
//! A candidate earns 3 points per category it shares with the anchor post, 2
//! per shared tag, and up to 5 for title overlap. Title overlap is the number
//! of anchor title words that also occur in the candidate title, divided by
//! the longer of the two word counts.

use std::cmp::Ordering;

use uuid::Uuid;

pub const CATEGORY_WEIGHT: f64 = 3.0;
pub const TAG_WEIGHT: f64 = 2.0;
pub const TITLE_WEIGHT: f64 = 5.0;

/// The attributes a post is compared on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostFeatures {
    pub category_ids: Vec<Uuid>,
    pub tag_ids: Vec<Uuid>,
    pub title: String,
}

impl PostFeatures {
    pub fn new(category_ids: Vec<Uuid>, tag_ids: Vec<Uuid>, title: impl Into<String>) -> Self {
        Self {
            category_ids,
            tag_ids,
            title: title.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scored<T> {
    pub item: T,
    pub score: f64,
}

/// Lowercase the title and split it on runs of whitespace. Leading and
/// trailing whitespace yields no empty words, so a blank title has none.
/// No stemming and no stopword removal.
pub fn title_words(title: &str) -> Vec<String> {
    title
        .to_lowercase()
        .split_whitespace()
        .map(str::to_owned)
        .collect()
}

fn shared_count(anchor: &[Uuid], candidate: &[Uuid]) -> usize {
    anchor.iter().filter(|id| candidate.contains(id)).count()
}

pub fn title_similarity(anchor: &str, candidate: &str) -> f64 {
    let anchor_words = title_words(anchor);
    let candidate_words = title_words(candidate);
    let common = anchor_words
        .iter()
        .filter(|word| candidate_words.contains(word))
        .count();
    let denominator = anchor_words.len().max(candidate_words.len()).max(1);
    common as f64 / denominator as f64
}

pub fn relatedness_score(anchor: &PostFeatures, candidate: &PostFeatures) -> f64 {
    let categories = shared_count(&anchor.category_ids, &candidate.category_ids) as f64;
    let tags = shared_count(&anchor.tag_ids, &candidate.tag_ids) as f64;
    let title = title_similarity(&anchor.title, &candidate.title);

    CATEGORY_WEIGHT * categories + TAG_WEIGHT * tags + TITLE_WEIGHT * title
}

/// Score every candidate against `anchor` and keep the best `limit`.
///
/// The sort is stable: candidates with equal scores stay in the order they
/// were supplied.
pub fn rank_related<T, F>(
    anchor: &PostFeatures,
    candidates: Vec<T>,
    limit: usize,
    features: F,
) -> Vec<Scored<T>>
where
    F: Fn(&T) -> &PostFeatures,
{
    let mut scored: Vec<Scored<T>> = candidates
        .into_iter()
        .map(|item| {
            let score = relatedness_score(anchor, features(&item));
            Scored { item, score }
        })
        .collect();

    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    scored.truncate(limit);
    scored
}
