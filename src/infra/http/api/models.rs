use serde::{Deserialize, Serialize};

use crate::application::admin::posts::{CreatePostCommand, UpdatePostCommand};
use crate::application::admin::taxonomy::{TranslationInput, UpsertTaxonomyCommand};
use crate::application::content::LatestPostsQuery;
use crate::domain::entities::PostRecord;
use crate::domain::types::{Locale, PostStatus};

use super::error::ApiError;
use super::handlers::domain_to_api;

/// Body of `POST /api/posts`. Every field is optional on the wire so that
/// missing values surface as the service's own validation messages.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PostCreateRequest {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub locale: Option<String>,
    pub slug: Option<String>,
    pub status: Option<String>,
    pub categories: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
}

impl PostCreateRequest {
    pub fn into_command(self) -> Result<CreatePostCommand, ApiError> {
        let locale = match self.locale.as_deref().map(str::trim) {
            None | Some("") => Locale::default(),
            Some(code) => code.parse::<Locale>().map_err(domain_to_api)?,
        };

        Ok(CreatePostCommand {
            title: self.title,
            summary: self.summary,
            content: self.content,
            locale,
            slug: self.slug,
            status: PostStatus::from_editor_input(self.status.as_deref()),
            categories: self.categories,
            tags: self.tags,
        })
    }
}

/// Body of `PUT /api/posts`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PostUpdateRequest {
    pub id: Option<String>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub status: Option<String>,
    pub categories: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
}

impl From<PostUpdateRequest> for UpdatePostCommand {
    fn from(request: PostUpdateRequest) -> Self {
        Self {
            id: request.id,
            title: request.title,
            summary: request.summary,
            content: request.content,
            status: request
                .status
                .map(|status| PostStatus::from_editor_input(Some(&status))),
            categories: request.categories,
            tags: request.tags,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PostDeleteQuery {
    pub id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TranslationRequest {
    pub locale: Option<String>,
    pub name: Option<String>,
}

/// Body of `POST /api/categories` and `POST /api/tags`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TaxonomyUpsertRequest {
    pub slug: Option<String>,
    pub translations: Vec<TranslationRequest>,
}

impl From<TaxonomyUpsertRequest> for UpsertTaxonomyCommand {
    fn from(request: TaxonomyUpsertRequest) -> Self {
        Self {
            slug: request.slug,
            translations: request
                .translations
                .into_iter()
                .map(|translation| TranslationInput {
                    locale: translation.locale,
                    name: translation.name,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LatestPostsParams {
    pub take: Option<u32>,
    pub category: Option<String>,
    pub tag: Option<String>,
}

impl From<LatestPostsParams> for LatestPostsQuery {
    fn from(params: LatestPostsParams) -> Self {
        Self {
            take: params.take,
            category_slug: params.category,
            tag_slug: params.tag,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SubscribeRequest {
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UnsubscribeQuery {
    pub token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SessionRequest {
    pub key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

impl OkResponse {
    pub const OK: Self = Self { ok: true };
}

#[derive(Debug, Serialize)]
pub struct PostMutationResponse {
    pub ok: bool,
    pub post: PostRecord,
}

#[derive(Debug, Serialize)]
pub struct SubscriberCountResponse {
    pub count: u64,
}
