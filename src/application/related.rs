use std::sync::Arc;

use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::application::content::LocalizedTaxonomy;
use crate::application::repos::{PostsRepo, RelatedCandidate, RepoError};
use crate::domain::recommendation::rank_related;
use crate::domain::types::Locale;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelatedPost {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub summary: Option<String>,
    pub categories: Vec<LocalizedTaxonomy>,
}

/// Recommends other published posts in the same locale.
#[derive(Clone)]
pub struct RelatedPostsService {
    posts: Arc<dyn PostsRepo>,
}

impl RelatedPostsService {
    pub fn new(posts: Arc<dyn PostsRepo>) -> Self {
        Self { posts }
    }

    /// Unknown anchors yield an empty list.
    pub async fn related_posts(
        &self,
        post_id: Uuid,
        locale: Locale,
        limit: usize,
    ) -> Result<Vec<RelatedPost>, RepoError> {
        let Some(anchor) = self.posts.load_features(post_id).await? else {
            return Ok(Vec::new());
        };

        let candidates = self.posts.list_related_candidates(locale, post_id).await?;
        let considered = candidates.len();

        let ranked = rank_related(&anchor, candidates, limit, |candidate: &RelatedCandidate| {
            &candidate.features
        });

        debug!(
            target = "lumblog::application::related",
            post_id = %post_id,
            locale = %locale,
            considered,
            returned = ranked.len(),
            "ranked related posts"
        );

        Ok(ranked
            .into_iter()
            .map(|scored| {
                let candidate = scored.item;
                RelatedPost {
                    id: candidate.id,
                    slug: candidate.slug,
                    title: candidate.title,
                    summary: candidate.summary,
                    categories: candidate
                        .categories
                        .iter()
                        .map(|category| LocalizedTaxonomy::from_record(category, locale))
                        .collect(),
                }
            })
            .collect())
    }
}
